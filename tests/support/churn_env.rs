use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Sets environment variables for the guard's lifetime and restores them on drop.
pub struct ChurnEnvGuard {
    previous: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ChurnEnvGuard {
    pub fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let mut previous = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            previous.push((*key, std::env::var(key).ok()));
            apply(key, value.map(str::to_string));
        }
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for ChurnEnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..).rev() {
            apply(key, value);
        }
    }
}

fn apply(key: &str, value: Option<String>) {
    match value {
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        Some(value) => unsafe { std::env::set_var(key, value) },
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        None => unsafe { std::env::remove_var(key) },
    }
}

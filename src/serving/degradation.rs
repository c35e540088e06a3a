use serde::Serialize;

/// A request value that was replaced by a zero default instead of encoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// A field with a declared rule was absent or null.
    MissingField { field: String },
    /// A numeric field could not be parsed.
    NumericDefaulted { field: String, raw: String },
    /// A categorical value the model never saw in training.
    UnseenCategory { field: String, value: String },
    /// A categorical value outside the schema when the dropped reference
    /// category is unknown; it is either unseen or the reference itself.
    UnmatchedCategory { field: String, value: String },
}

impl Degradation {
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::NumericDefaulted { field, .. }
            | Self::UnseenCategory { field, .. }
            | Self::UnmatchedCategory { field, .. } => field,
        }
    }
}

/// Degradations observed while encoding one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DegradationReport {
    events: Vec<Degradation>,
}

impl DegradationReport {
    pub fn push(&mut self, event: Degradation) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Degradation] {
        &self.events
    }

    pub fn contains(&self, event: &Degradation) -> bool {
        self.events.contains(event)
    }

    /// Emit one log line per event.
    pub fn log(&self) {
        for event in &self.events {
            match event {
                Degradation::MissingField { field } => {
                    tracing::warn!(field = %field, "Missing field defaulted to 0");
                }
                Degradation::NumericDefaulted { field, raw } => {
                    tracing::warn!(field = %field, raw = %raw, "Unparsable numeric value defaulted to 0");
                }
                Degradation::UnseenCategory { field, value } => {
                    tracing::warn!(field = %field, value = %value, "Unseen category encoded as all zeros");
                }
                Degradation::UnmatchedCategory { field, value } => {
                    tracing::debug!(field = %field, value = %value, "Category outside schema encoded as all zeros");
                }
            }
        }
    }
}

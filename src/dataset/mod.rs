//! Tabular training data: an ordered columnar frame, a JSON-lines loader and a
//! deterministic train/test split.

mod frame;
pub mod loader;
pub mod split;

pub use frame::{Column, Frame, FrameError};
pub use loader::{DatasetLoadError, load_jsonl, parse_jsonl};
pub use split::{Split, stratified_split};

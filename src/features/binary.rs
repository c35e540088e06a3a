use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Fixed maps for the two-valued fields of the serving form.
///
/// These are used verbatim when no training-time encoding plan is available.
pub const CANONICAL_BINARY_FIELDS: [(&str, &str, &str); 5] = [
    ("gender", "Female", "Male"),
    ("Partner", "No", "Yes"),
    ("Dependents", "No", "Yes"),
    ("PhoneService", "No", "Yes"),
    ("PaperlessBilling", "No", "Yes"),
];

/// Mapping of a two-valued categorical field onto `{0, 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryMap {
    /// Category encoded as `0`.
    pub zero: String,
    /// Category encoded as `1`.
    pub one: String,
}

impl BinaryMap {
    pub fn new(zero: impl Into<String>, one: impl Into<String>) -> Self {
        Self {
            zero: zero.into(),
            one: one.into(),
        }
    }

    /// Decide the map for a set of observed categories.
    ///
    /// `{No, Yes}` maps `No -> 0, Yes -> 1` and `{Female, Male}` maps
    /// `Female -> 0, Male -> 1`. Any other pair is ordered by byte-wise
    /// string comparison and the smaller value becomes `0`. Returns `None`
    /// unless exactly two categories are present.
    pub fn derive(categories: &BTreeSet<String>) -> Option<Self> {
        if categories.len() != 2 {
            return None;
        }
        if categories.contains("Yes") && categories.contains("No") {
            return Some(Self::new("No", "Yes"));
        }
        if categories.contains("Male") && categories.contains("Female") {
            return Some(Self::new("Female", "Male"));
        }
        let mut iter = categories.iter();
        let zero = iter.next()?;
        let one = iter.next()?;
        Some(Self::new(zero.as_str(), one.as_str()))
    }

    /// Encode a category, or `None` when it is neither known value.
    pub fn encode(&self, category: &str) -> Option<u8> {
        if category == self.zero {
            Some(0)
        } else if category == self.one {
            Some(1)
        } else {
            None
        }
    }
}

//! Categories
//!
//! Edge labels and predictions are category numbers. Category `0` is reserved
//! for unknown values, label values of a data set start at [`FIRST_CATEGORY`].
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category number.
pub type Category = usize;

/// Category reserved for missing values.
pub const UNKNOWN_CATEGORY: Category = 0;
/// First category used by real values.
pub const FIRST_CATEGORY: Category = 1;

/// Category number paired with a human readable description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AugCategory {
    pub category: Category,
    pub description: String,
}

impl AugCategory {
    pub fn new(category: Category, description: impl Into<String>) -> Self {
        AugCategory {
            category,
            description: description.into(),
        }
    }

    pub fn unknown() -> Self {
        AugCategory::new(UNKNOWN_CATEGORY, "?")
    }

    pub fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }
}

impl fmt::Display for AugCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Category of the 0-based value index `i`.
#[inline]
pub fn category_of(i: usize) -> Category {
    i + FIRST_CATEGORY
}

/// 0-based value index of a known category.
#[inline]
pub fn index_of(category: Category) -> Option<usize> {
    category.checked_sub(FIRST_CATEGORY)
}

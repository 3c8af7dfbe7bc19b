//! Display ordering for the note list

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Order in which the note list is displayed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Descending by timestamp
    #[default]
    NewestFirst,
    /// Ascending by timestamp
    OldestFirst,
    /// Case-insensitive title, A to Z
    TitleAscending,
    /// Case-insensitive title, Z to A
    TitleDescending,
}

impl SortOrder {
    pub const ALL: [Self; 4] = [
        Self::NewestFirst,
        Self::OldestFirst,
        Self::TitleAscending,
        Self::TitleDescending,
    ];

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewestFirst => "Newest First",
            Self::OldestFirst => "Oldest First",
            Self::TitleAscending => "Title (A-Z)",
            Self::TitleDescending => "Title (Z-A)",
        }
    }

    /// Short token used on the command line
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::NewestFirst => "newest",
            Self::OldestFirst => "oldest",
            Self::TitleAscending => "title-asc",
            Self::TitleDescending => "title-desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|order| {
                order.token() == normalized || order.label().to_ascii_lowercase() == normalized
            })
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Unknown sort order '{s}' (expected newest, oldest, title-asc, or title-desc)"
                ))
            })
    }
}

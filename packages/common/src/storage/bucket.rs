use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A fixed-name media subdirectory under the upload root.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Avatars,
    Bands,
    Members,
    Events,
    Community,
}

impl Bucket {
    pub const ALL: &'static [Bucket] = &[
        Self::Avatars,
        Self::Bands,
        Self::Members,
        Self::Events,
        Self::Community,
    ];

    /// Directory name under the upload root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::Bands => "bands",
            Self::Members => "members",
            Self::Events => "events",
            Self::Community => "community",
        }
    }

    /// Prefix used by upload handlers for files named after their entity,
    /// e.g. `band_<slug>_<timestamp>.png` in `bands/`.
    pub fn named_prefix(&self) -> &'static str {
        match self {
            Self::Avatars => "avatar",
            Self::Bands => "band",
            Self::Members => "member",
            Self::Events => "event",
            Self::Community => "post",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown bucket name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBucketError {
    invalid: String,
}

impl fmt::Display for ParseBucketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid bucket '{}'. Valid values: {}",
            self.invalid,
            Bucket::ALL
                .iter()
                .map(|b| b.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseBucketError {}

impl FromStr for Bucket {
    type Err = ParseBucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ParseBucketError {
                invalid: s.to_string(),
            })
    }
}

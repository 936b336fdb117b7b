//! Media URL and upload filename conventions.
//!
//! Upload handlers name files in one of two ways:
//!
//! * named: `<prefix>_<slug>_<timestamp>.<ext>`, where the prefix identifies the
//!   bucket (`band`, `member`, ...) and the slug is derived from the owning
//!   entity's name;
//! * anonymous: `<timestamp>_<original>.<ext>`, which encodes no owner.
//!
//! Timestamps are runs of at least eight ASCII digits.

use super::Bucket;

/// Extensions eligible for reclamation. Anything else in a bucket is left alone.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const MIN_TIMESTAMP_DIGITS: usize = 8;

/// Classification of a file found in a bucket directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobName {
    Named {
        slug: String,
        timestamp: String,
        ext: String,
    },
    Anonymous {
        timestamp: String,
        original: String,
    },
    Unrecognized,
}

impl BlobName {
    /// Classify `filename` according to the naming conventions of `bucket`.
    pub fn parse(bucket: Bucket, filename: &str) -> Self {
        let Some((stem, ext)) = filename.rsplit_once('.') else {
            return Self::Unrecognized;
        };

        if let Some(rest) = stem
            .strip_prefix(bucket.named_prefix())
            .and_then(|r| r.strip_prefix('_'))
            && let Some((slug, timestamp)) = rest.rsplit_once('_')
            && !slug.is_empty()
            && is_timestamp(timestamp)
        {
            return Self::Named {
                slug: slug.to_string(),
                timestamp: timestamp.to_string(),
                ext: ext.to_ascii_lowercase(),
            };
        }

        if let Some((timestamp, original)) = filename.split_once('_')
            && is_timestamp(timestamp)
        {
            return Self::Anonymous {
                timestamp: timestamp.to_string(),
                original: original.to_string(),
            };
        }

        Self::Unrecognized
    }

    /// The owner slug, for named files.
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::Named { slug, .. } => Some(slug),
            _ => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous { .. })
    }
}

fn is_timestamp(s: &str) -> bool {
    s.len() >= MIN_TIMESTAMP_DIGITS && s.bytes().all(|b| b.is_ascii_digit())
}

/// Whether the file has one of the image extensions, case-insensitively.
pub fn is_image(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Turn an entity name into the slug embedded in named uploads.
pub fn slugify(name: &str) -> String {
    name.replace([' ', '/', '\\'], "_")
}

/// Resolve a stored media URL to the filename inside its bucket.
///
/// Accepts `/uploads/<bucket>/<file>`, `/<bucket>/<file>`, absolute URLs and
/// bare filenames. Query strings and fragments are dropped.
pub fn media_filename(url: &str) -> Option<&str> {
    let url = url.trim();
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let name = url[..end].rsplit('/').next()?;
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

//! Dataset slug extraction.
//!
//! A Kaggle dataset is canonically identified by an `owner/name` pair. Users
//! paste full URLs (`https://www.kaggle.com/datasets/owner/name`), so this
//! module reduces a URL to that pair.

use thiserror::Error;
use url::Url;

/// Error returned when a dataset reference cannot be reduced to a slug.
#[derive(Debug, Error)]
#[error("invalid dataset URL '{url}': {reason}")]
pub struct SlugError {
    /// The original input, verbatim.
    pub url: String,
    pub reason: String,
}

/// Canonical `owner/name` identifier for a dataset on Kaggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSlug {
    owner: String,
    name: String,
}

impl DatasetSlug {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for DatasetSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Extract the dataset slug from a Kaggle URL.
///
/// If a path segment is literally `datasets`, the slug is the two segments
/// that follow it. Otherwise the last two path segments are used. Query
/// strings and trailing slashes never affect the result.
pub fn extract_slug(link: &str) -> Result<DatasetSlug, SlugError> {
    let url = Url::parse(link).map_err(|source| SlugError {
        url: link.to_string(),
        reason: source.to_string(),
    })?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|iter| iter.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if let Some(idx) = segments.iter().position(|seg| *seg == "datasets") {
        if segments.len() > idx + 2 {
            return Ok(DatasetSlug {
                owner: segments[idx + 1].to_string(),
                name: segments[idx + 2].to_string(),
            });
        }
    }

    if segments.len() >= 2 {
        return Ok(DatasetSlug {
            owner: segments[segments.len() - 2].to_string(),
            name: segments[segments.len() - 1].to_string(),
        });
    }

    Err(SlugError {
        url: link.to_string(),
        reason: "expected at least two path segments".to_string(),
    })
}

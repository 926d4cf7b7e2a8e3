//! Structured image references.
//!
//! Splits `repository[:tag][@digest]` into its components. A colon only
//! starts a tag when it appears after the last `/`, so registry ports such
//! as `localhost:5000/app` stay part of the repository.

use std::fmt;

use baseline_common::error::{BaselineError, Result};

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// Repository name, including any registry host and path.
    pub repository: String,
    /// Tag component, if present.
    pub tag: Option<String>,
    /// Content digest component, if present.
    pub digest: Option<String>,
}

impl ImageRef {
    /// Parses a reference string.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::Config` if the repository component is empty.
    pub fn parse(reference: &str) -> Result<Self> {
        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (reference, None),
        };

        let last_segment = name.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match name[last_segment..].rfind(':') {
            Some(i) => {
                let split = last_segment + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };

        if repository.is_empty() {
            return Err(BaselineError::config(format!(
                "image reference `{reference}` has no repository"
            )));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// Builds a `repository:tag` reference.
    #[must_use]
    pub fn tagged(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: Some(tag.into()),
            digest: None,
        }
    }

    /// Returns whether this reference names `repository`, ignoring tag and
    /// digest.
    #[must_use]
    pub fn is_repository(&self, repository: &str) -> bool {
        self.repository == repository
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

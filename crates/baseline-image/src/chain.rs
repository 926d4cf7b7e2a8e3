//! Ordered build chains.
//!
//! A chain lists an application's build steps in build order; each step
//! derives from the image produced by the previous one.

use std::fmt;

use baseline_common::error::{BaselineError, Result};
use serde::{Deserialize, Serialize};

/// Non-empty, ordered sequence of build step names.
///
/// Step names are expected to be unique but the type does not enforce it:
/// lookups resolve to the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct BuildChain {
    steps: Vec<String>,
}

impl BuildChain {
    /// Creates a chain from step names in build order.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::Config` if `steps` is empty.
    pub fn new<I, S>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps: Vec<String> = steps.into_iter().map(Into::into).collect();
        if steps.is_empty() {
            return Err(BaselineError::config("build chain has no steps"));
        }
        Ok(Self { steps })
    }

    /// Returns the suffix of the chain starting at the first `name`.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::NotFound` if `name` is not in the chain.
    pub fn get(&self, name: &str) -> Result<Self> {
        let start = self
            .steps
            .iter()
            .position(|step| step == name)
            .ok_or_else(|| BaselineError::NotFound {
                kind: "build step",
                id: name.to_string(),
            })?;
        Ok(Self {
            steps: self.steps[start..].to_vec(),
        })
    }

    /// Returns a single-step chain holding the last (most derived) step.
    #[must_use]
    pub fn final_step(&self) -> Self {
        let start = self.steps.len() - 1;
        Self {
            steps: self.steps[start..].to_vec(),
        }
    }

    /// Name of the first step.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.steps[0]
    }

    /// Name of the last step.
    #[must_use]
    pub fn last(&self) -> &str {
        &self.steps[self.steps.len() - 1]
    }

    /// Iterates over step names in build order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(String::as_str)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`; chains are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names appearing more than once, in order of first repeat.
    #[must_use]
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut repeated = Vec::new();
        for step in self.iter() {
            if !seen.insert(step) && !repeated.contains(&step) {
                repeated.push(step);
            }
        }
        repeated
    }
}

impl TryFrom<Vec<String>> for BuildChain {
    type Error = BaselineError;

    fn try_from(steps: Vec<String>) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<BuildChain> for Vec<String> {
    fn from(chain: BuildChain) -> Self {
        chain.steps
    }
}

impl fmt::Display for BuildChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> BuildChain {
        BuildChain::new(["base", "deps", "app"]).unwrap()
    }

    #[test]
    fn empty_chain_is_rejected() {
        let err = BuildChain::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, BaselineError::Config { .. }));
    }

    #[test]
    fn get_returns_suffix_ending_at_final() {
        let c = chain();
        for name in ["base", "deps", "app"] {
            let suffix = c.get(name).unwrap();
            assert_eq!(suffix.head(), name);
            assert_eq!(suffix.final_step(), c.final_step());
        }
        assert_eq!(c.get("deps").unwrap().iter().collect::<Vec<_>>(), vec!["deps", "app"]);
    }

    #[test]
    fn get_unknown_step_is_not_found() {
        let err = chain().get("release").unwrap_err();
        assert!(matches!(err, BaselineError::NotFound { kind: "build step", .. }));
    }

    #[test]
    fn get_does_not_match_partial_names() {
        assert!(chain().get("dep").is_err());
        assert!(chain().get("").is_err());
    }

    #[test]
    fn get_resolves_first_occurrence() {
        let c = BuildChain::new(["a", "b", "a", "c"]).unwrap();
        assert_eq!(c.get("a").unwrap().len(), 4);
        assert_eq!(c.duplicates(), vec!["a"]);
    }

    #[test]
    fn final_step_is_single_last_element() {
        let f = chain().final_step();
        assert_eq!(f.len(), 1);
        assert_eq!(f.head(), "app");
        assert_eq!(f.to_string(), "app");
    }

    #[test]
    fn display_is_head_name() {
        assert_eq!(chain().get("deps").unwrap().to_string(), "deps");
    }

    #[test]
    fn deserializes_from_json_array() {
        let c: BuildChain = serde_json::from_str(r#"["os", "runtime"]"#).unwrap();
        assert_eq!(c.last(), "runtime");
        assert!(serde_json::from_str::<BuildChain>("[]").is_err());
    }
}

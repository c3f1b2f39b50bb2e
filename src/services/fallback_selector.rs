//! Local fallback messages.
//!
//! Used whenever the narrator cannot produce a usable message, and as the
//! displayed message before the first successful narrative cycle.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::errors::{DomainError, DomainResult};

const BUILTIN_MESSAGES: &[&str] = &[
    "All systems nominal. Maintaining watch.",
    "Telemetry stable. Continuing passive observation.",
    "Sensors holding steady. No anomalies flagged.",
    "Link quiet. Local monitoring remains active.",
    "Standing by. Metrics within expected envelope.",
    "Observation continues. Coverage expanding on schedule.",
    "No remote guidance received. Proceeding on local routine.",
    "Signal clear. Tracking loop running autonomously.",
];

/// Uniform random pick from a fixed, non-empty pool of messages.
#[derive(Debug, Clone)]
pub struct FallbackSelector {
    pool: Vec<String>,
}

impl Default for FallbackSelector {
    fn default() -> Self {
        Self {
            pool: BUILTIN_MESSAGES.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

impl FallbackSelector {
    /// Create a selector over `pool`. Blank entries are dropped; a pool with
    /// nothing left is rejected.
    pub fn new<I, S>(pool: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool: Vec<String> = pool
            .into_iter()
            .map(Into::into)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if pool.is_empty() {
            return Err(DomainError::ValidationFailed(
                "fallback message pool must contain at least one non-blank message".to_string(),
            ));
        }
        Ok(Self { pool })
    }

    /// Configured pool, or the built-in one when `messages` is empty.
    pub fn from_config(messages: &[String]) -> DomainResult<Self> {
        if messages.is_empty() {
            Ok(Self::default())
        } else {
            Self::new(messages.iter().cloned())
        }
    }

    /// Pick a message using the thread-local generator.
    pub fn select(&self) -> String {
        self.select_with(&mut rand::thread_rng())
    }

    /// Pick a message using `rng`.
    pub fn select_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        // The pool is never empty, see `new`.
        self.pool
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| BUILTIN_MESSAGES[0].to_string())
    }

    pub fn contains(&self, message: &str) -> bool {
        self.pool.iter().any(|m| m == message)
    }

    pub fn messages(&self) -> &[String] {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_default_pool_is_not_empty() {
        let selector = FallbackSelector::default();
        assert!(!selector.messages().is_empty());
        let picked = selector.select();
        assert!(!picked.is_empty());
        assert!(selector.contains(&picked));
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(FallbackSelector::new(Vec::<String>::new()).is_err());
        assert!(FallbackSelector::new(vec!["  ", ""]).is_err());
    }

    #[test]
    fn test_blank_entries_dropped() {
        let selector = FallbackSelector::new(vec!["", "Holding position."]).unwrap();
        assert_eq!(selector.messages(), ["Holding position.".to_string()]);
    }

    #[test]
    fn test_from_config_uses_builtin_when_empty() {
        let selector = FallbackSelector::from_config(&[]).unwrap();
        assert_eq!(selector.messages().len(), BUILTIN_MESSAGES.len());
    }

    #[test]
    fn test_selection_covers_pool() {
        let selector = FallbackSelector::new(vec!["a", "b", "c"]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let seen: HashSet<String> = (0..200).map(|_| selector.select_with(&mut rng)).collect();
        assert_eq!(seen.len(), 3);
    }
}

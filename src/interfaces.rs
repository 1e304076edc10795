//! External Collaborator Contracts
//!
//! The engine does not crawl transaction histories, fetch contract sources
//! or run static analysis itself. Upstream tools supply those artifacts
//! through the traits here; downstream consumers receive the mined roles
//! and the derived policy set.

use crate::error::MiningResult;
use crate::history::CallRecord;
use crate::policy::RwSummary;
use std::collections::HashMap;

/// Supplies the observed caller→function invocation records
pub trait HistorySource {
    /// Produce all call records for one contract
    fn records(&self) -> MiningResult<Vec<CallRecord>>;
}

/// Maps 4-byte selectors (`0x`-prefixed hex) to method names
pub trait SelectorResolver {
    /// Name for `selector`, or `None` when unknown
    fn resolve(&self, selector: &str) -> Option<String>;
}

/// Resolver that knows nothing; selectors stay hex strings
pub struct NullResolver;

impl SelectorResolver for NullResolver {
    fn resolve(&self, _selector: &str) -> Option<String> {
        None
    }
}

impl SelectorResolver for HashMap<String, String> {
    fn resolve(&self, selector: &str) -> Option<String> {
        self.get(selector).cloned()
    }
}

/// Supplies the static read/write summary for the contract's functions
pub trait RwSummarySource {
    /// The summary, or `None` when static analysis is unavailable.
    /// A missing summary downgrades the run to roles-only output.
    fn summary(&self) -> MiningResult<Option<RwSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_resolver() {
        assert_eq!(NullResolver.resolve("0xdeadbeef"), None);
    }

    #[test]
    fn test_map_resolver() {
        let mut map = HashMap::new();
        map.insert("0x40c10f19".to_string(), "mint".to_string());
        assert_eq!(map.resolve("0x40c10f19"), Some("mint".to_string()));
        assert_eq!(map.resolve("0x00000000"), None);
    }
}

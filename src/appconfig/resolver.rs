use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AppError, AppResult, ConfigError};
use crate::model::{Chain, Eid};

/// Keyed config level: candidate keys are eid digits, chain names or
/// "default"
pub type FallbackMap<T> = BTreeMap<String, T>;

/// One keyed level of a config lookup. Candidates are ordered most
/// specific first and end with "default".
#[derive(Debug, Clone)]
pub struct Dimension {
    candidates: Vec<String>,
}

impl Dimension {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// Fallback order for sections keyed by endpoint id only
    pub fn eid_or_default(eid: Eid) -> Self {
        Self::new(vec![eid.to_string(), "default".to_string()])
    }

    /// Fallback order for sections keyed by endpoint id or chain name
    pub fn eid_chain_or_default(eid: Eid, chain: Chain) -> Self {
        Self::new(vec![
            eid.to_string(),
            chain.as_str().to_string(),
            "default".to_string(),
        ])
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.candidates.join("|"))
    }
}

/// First candidate present in the map wins. The choice is final for the
/// rest of the lookup; deeper misses never reopen it.
fn pick<'a, T>(map: &'a FallbackMap<T>, dimension: &Dimension) -> Option<&'a T> {
    dimension.candidates().iter().find_map(|k| map.get(k))
}

fn not_found(section: &str, dimensions: &[&Dimension]) -> AppError {
    let path = dimensions
        .iter()
        .fold(section.to_string(), |acc, d| format!("{}[{}]", acc, d));
    ConfigError::NotFound { path }.into()
}

/// Resolve a single keyed level under a fixed section path
pub fn resolve_one<'a, T>(
    section: &str,
    map: &'a FallbackMap<T>,
    dimension: &Dimension,
) -> AppResult<&'a T> {
    pick(map, dimension).ok_or_else(|| not_found(section, &[dimension]))
}

/// Resolve two nested keyed levels under a fixed section path
pub fn resolve_two<'a, T>(
    section: &str,
    map: &'a FallbackMap<FallbackMap<T>>,
    first: &Dimension,
    second: &Dimension,
) -> AppResult<&'a T> {
    let inner = pick(map, first).ok_or_else(|| not_found(section, &[first, second]))?;
    pick(inner, second).ok_or_else(|| not_found(section, &[first, second]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stage;

    fn two_level(entries: &[(&str, &[(&str, u64)])]) -> FallbackMap<FallbackMap<u64>> {
        entries
            .iter()
            .map(|(outer, inner)| {
                (
                    outer.to_string(),
                    inner
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v))
                        .collect::<FallbackMap<u64>>(),
                )
            })
            .collect()
    }

    #[test]
    fn test_most_specific_candidate_wins() {
        let eth = Eid::of(Chain::Ethereum, Stage::Mainnet);
        let bsc = Eid::of(Chain::Bsc, Stage::Mainnet);
        let map = two_level(&[
            ("30101", &[("30102", 15), ("bsc", 10), ("default", 5)]),
            ("default", &[("default", 1)]),
        ]);
        let first = Dimension::eid_chain_or_default(eth, Chain::Ethereum);
        let second = Dimension::eid_chain_or_default(bsc, Chain::Bsc);
        assert_eq!(*resolve_two("confirmations", &map, &first, &second).unwrap(), 15);
    }

    #[test]
    fn test_chain_name_beats_default() {
        let eth = Eid::of(Chain::Ethereum, Stage::Mainnet);
        let bsc = Eid::of(Chain::Bsc, Stage::Mainnet);
        let map = two_level(&[("ethereum", &[("bsc", 10), ("default", 5)])]);
        let first = Dimension::eid_chain_or_default(eth, Chain::Ethereum);
        let second = Dimension::eid_chain_or_default(bsc, Chain::Bsc);
        assert_eq!(*resolve_two("confirmations", &map, &first, &second).unwrap(), 10);
    }

    #[test]
    fn test_default_default_applies_to_any_pair() {
        let map = two_level(&[("default", &[("default", 6)])]);
        for local in Chain::all() {
            for remote in Chain::all() {
                let first =
                    Dimension::eid_chain_or_default(Eid::of(local, Stage::Mainnet), local);
                let second =
                    Dimension::eid_chain_or_default(Eid::of(remote, Stage::Mainnet), remote);
                assert_eq!(*resolve_two("confirmations", &map, &first, &second).unwrap(), 6);
            }
        }
    }

    #[test]
    fn test_no_backtracking_after_commit() {
        let eth = Eid::of(Chain::Ethereum, Stage::Mainnet);
        let bsc = Eid::of(Chain::Bsc, Stage::Mainnet);
        // First level commits to "30101" even though its subtree cannot
        // satisfy the second level, and "default" could have.
        let map = two_level(&[
            ("30101", &[("polygon", 99)]),
            ("default", &[("default", 1)]),
        ]);
        let first = Dimension::eid_chain_or_default(eth, Chain::Ethereum);
        let second = Dimension::eid_chain_or_default(bsc, Chain::Bsc);
        let err = resolve_two("confirmations", &map, &first, &second).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_not_found_names_full_path() {
        let eth = Eid::of(Chain::Ethereum, Stage::Mainnet);
        let bsc = Eid::of(Chain::Bsc, Stage::Mainnet);
        let map: FallbackMap<FallbackMap<u64>> = FallbackMap::new();
        let first = Dimension::eid_chain_or_default(eth, Chain::Ethereum);
        let second = Dimension::eid_chain_or_default(bsc, Chain::Bsc);
        let err = resolve_two("verifier.sendUln.confirmations", &map, &first, &second)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("verifier.sendUln.confirmations"));
        assert!(message.contains("30101|ethereum|default"));
        assert!(message.contains("30102|bsc|default"));
    }

    #[test]
    fn test_resolve_one_eid_or_default() {
        let eth = Eid::of(Chain::Ethereum, Stage::Mainnet);
        let mut map: FallbackMap<String> = FallbackMap::new();
        map.insert("default".to_string(), "fallback".to_string());
        let dim = Dimension::eid_or_default(eth);
        assert_eq!(resolve_one("peer", &map, &dim).unwrap(), "fallback");

        map.insert("30101".to_string(), "specific".to_string());
        assert_eq!(resolve_one("peer", &map, &dim).unwrap(), "specific");
    }
}

//! JSON serialization for test outcomes.

use serde::Serialize;

use crate::result::{ClusterOutcome, ConditionMasks, GlobalVerdict};

/// Outcome types that can be written as JSON.
pub trait JsonOutcome: Serialize {}

impl JsonOutcome for ClusterOutcome {}
impl JsonOutcome for GlobalVerdict {}
impl JsonOutcome for ConditionMasks {}

/// Serialize an outcome to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (only possible for non-finite
/// floats, which validated inputs never produce).
pub fn to_json<T: JsonOutcome>(outcome: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(outcome)
}

/// Serialize an outcome to a pretty-printed JSON string.
///
/// # Errors
///
/// See [`to_json`].
pub fn to_json_pretty<T: JsonOutcome>(outcome: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Metadata, TestKind};

    fn make_verdict() -> GlobalVerdict {
        GlobalVerdict {
            significant: true,
            observed: 2.5,
            lower: -1.0,
            upper: 1.0,
            warnings: Vec::new(),
            metadata: Metadata {
                kind: TestKind::Global,
                n_surr: 1000,
                seed: 42,
                n_baseline: 20,
                n_condition: 20,
                shape: (1, 1),
                runtime_secs: 0.5,
            },
        }
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&make_verdict()).unwrap();
        assert!(json.contains("\"significant\":true"));
        assert!(json.contains("\"observed\":2.5"));
        assert!(json.contains("\"seed\":42"));
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json_pretty(&make_verdict()).unwrap();
        assert!(json.contains('\n'));
        let back: GlobalVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, make_verdict());
    }
}

//! Removal of non-identifiable quantities.
//!
//! Some states cannot be recovered from the observed outputs of their system
//! (e.g. `x7` in biohydrogenation). They are removed from both the ground
//! truth and the estimates so they never enter an error pool.

use std::collections::BTreeMap;

use pebench_core::ExperimentRun;
use tracing::debug;

/// Strip the configured keys from a run in place. Returns how many were removed.
pub fn strip_non_identifiable(
    run: &mut ExperimentRun,
    non_identifiable: &BTreeMap<String, Vec<String>>,
) -> usize {
    let Some(keys) = non_identifiable.get(&run.system) else {
        return 0;
    };
    let mut removed = 0;
    for key in keys {
        if run.true_values.remove(key).is_some() {
            removed += 1;
        }
        run.estimated_values.remove(key);
    }
    if removed > 0 {
        debug!(id = %run.id, removed, "stripped non-identifiable quantities");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pebench_core::NoiseLevel;

    fn run(system: &str) -> ExperimentRun {
        ExperimentRun {
            id: "r".into(),
            method: "odepe".into(),
            system: system.into(),
            noise: NoiseLevel::new(0.0),
            has_result: true,
            true_values: BTreeMap::from([("k1".to_string(), 1.0), ("x7".to_string(), 2.0)]),
            estimated_values: BTreeMap::from([
                ("k1".to_string(), 1.1),
                ("x7".to_string(), 9.0),
            ]),
            runtime_seconds: 1.0,
        }
    }

    fn map() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([("biohydrogenation".to_string(), vec!["x7".to_string()])])
    }

    #[test]
    fn strips_from_truth_and_estimates() {
        let mut r = run("biohydrogenation");
        assert_eq!(strip_non_identifiable(&mut r, &map()), 1);
        assert!(!r.true_values.contains_key("x7"));
        assert!(!r.estimated_values.contains_key("x7"));
        assert_eq!(r.parameter_count(), 1);
    }

    #[test]
    fn other_systems_are_untouched() {
        let mut r = run("lotka_volterra");
        assert_eq!(strip_non_identifiable(&mut r, &map()), 0);
        assert_eq!(r.parameter_count(), 2);
    }
}

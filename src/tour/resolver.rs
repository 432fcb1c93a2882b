//! Target resolution — asks the host page whether a step's anchor exists.

use std::collections::HashSet;
use std::sync::RwLock;

use super::step::Step;

/// Host capability: does an element matching `target` exist right now?
pub trait TargetResolver: Send + Sync {
    fn resolves(&self, target: &str) -> bool;
}

impl<F> TargetResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn resolves(&self, target: &str) -> bool {
        self(target)
    }
}

/// Keep only the steps whose targets currently resolve, in order.
pub fn filter_steps(steps: &[Step], resolver: &dyn TargetResolver) -> Vec<Step> {
    steps
        .iter()
        .filter(|step| resolver.resolves(&step.target))
        .cloned()
        .collect()
}

/// A fixed, mutable set of present targets. Useful for headless hosts and tests.
#[derive(Debug, Default)]
pub struct StaticTargets {
    present: RwLock<HashSet<String>>,
}

impl StaticTargets {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            present: RwLock::new(targets.into_iter().map(Into::into).collect()),
        }
    }

    pub fn insert(&self, target: &str) {
        if let Ok(mut present) = self.present.write() {
            present.insert(target.to_string());
        }
    }

    pub fn remove(&self, target: &str) {
        if let Ok(mut present) = self.present.write() {
            present.remove(target);
        }
    }
}

impl TargetResolver for StaticTargets {
    fn resolves(&self, target: &str) -> bool {
        self.present
            .read()
            .map(|present| present.contains(target))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(target: &str) -> Step {
        Step::new(target, target, "")
    }

    #[test]
    fn filters_out_missing_targets_preserving_order() {
        let resolver = StaticTargets::new(["#a", "#c"]);
        let filtered = filter_steps(&[step("#a"), step("#b"), step("#c")], &resolver);
        let targets: Vec<_> = filtered.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(targets, ["#a", "#c"]);
    }

    #[test]
    fn static_targets_track_dom_changes() {
        let resolver = StaticTargets::new(["#a"]);
        assert!(resolver.resolves("#a"));
        resolver.remove("#a");
        resolver.insert("#b");
        assert!(!resolver.resolves("#a"));
        assert!(resolver.resolves("#b"));
    }

    #[test]
    fn closures_are_resolvers() {
        let resolver = |target: &str| target.starts_with('#');
        let filtered = filter_steps(&[step("#id"), step(".class")], &resolver);
        assert_eq!(filtered.len(), 1);
    }
}

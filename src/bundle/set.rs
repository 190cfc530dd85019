//! The managed collection of bundles.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::Bundle;
use crate::config::ConfigError;

/// All bundles, indexed by id, with the composite parent relation.
#[derive(Debug, Default)]
pub struct BundleSet {
    bundles: Vec<Arc<Bundle>>,
    index: FxHashMap<String, usize>,
    /// child id -> ids of composites listing it directly
    parents: FxHashMap<String, Vec<String>>,
}

impl BundleSet {
    /// Index bundles, rejecting duplicate ids, unknown children and
    /// composite cycles.
    pub fn new(bundles: Vec<Bundle>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for bundle in bundles {
            if set.index.contains_key(&bundle.id) {
                return Err(ConfigError::DuplicateBundle(bundle.id));
            }
            set.index.insert(bundle.id.clone(), set.bundles.len());
            set.bundles.push(Arc::new(bundle));
        }

        for bundle in &set.bundles {
            for child in bundle.children() {
                if !set.index.contains_key(child) {
                    return Err(ConfigError::UnknownChild {
                        composite: bundle.id.clone(),
                        child: child.clone(),
                    });
                }
                set.parents
                    .entry(child.clone())
                    .or_default()
                    .push(bundle.id.clone());
            }
        }

        for bundle in set.bundles.iter().filter(|b| b.is_composite()) {
            set.check_cycle(&bundle.id, &mut Vec::new())?;
        }
        Ok(set)
    }

    fn check_cycle<'a>(&'a self, id: &'a str, stack: &mut Vec<&'a str>) -> Result<(), ConfigError> {
        if stack.contains(&id) {
            return Err(ConfigError::CompositeCycle(id.to_string()));
        }
        let Some(bundle) = self.get(id) else {
            return Ok(());
        };
        stack.push(id);
        for child in bundle.children() {
            self.check_cycle(child, stack)?;
        }
        stack.pop();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Bundle>> {
        self.index.get(id).map(|&i| &self.bundles[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Bundle>> {
        self.bundles.iter()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Child bundles of a composite, in declared order.
    pub fn children_of(&self, bundle: &Bundle) -> Vec<Arc<Bundle>> {
        bundle
            .children()
            .iter()
            .filter_map(|id| self.get(id).cloned())
            .collect()
    }

    /// Every composite that contains `id`, directly or transitively.
    pub fn ancestors(&self, id: &str) -> Vec<Arc<Bundle>> {
        let mut seen = FxHashSet::default();
        let mut queue = vec![id.to_string()];
        let mut out = Vec::new();
        while let Some(current) = queue.pop() {
            for parent in self.parents.get(&current).into_iter().flatten() {
                if seen.insert(parent.clone())
                    && let Some(bundle) = self.get(parent)
                {
                    out.push(Arc::clone(bundle));
                    queue.push(parent.clone());
                }
            }
        }
        out
    }

    fn depth(&self, bundle: &Bundle) -> usize {
        bundle
            .children()
            .iter()
            .filter_map(|id| self.get(id))
            .map(|child| 1 + self.depth(child))
            .max()
            .unwrap_or(0)
    }

    /// Bundles in build order: simple bundles in configuration order, then
    /// composites from the innermost outwards.
    pub fn build_order(&self) -> Vec<Arc<Bundle>> {
        let mut order: Vec<(usize, Arc<Bundle>)> = self
            .bundles
            .iter()
            .map(|b| (self.depth(b), Arc::clone(b)))
            .collect();
        order.sort_by_key(|(depth, _)| *depth);
        order.into_iter().map(|(_, b)| b).collect()
    }

    /// Distinct non-empty request prefixes, longest first.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .bundles
            .iter()
            .map(|b| b.prefix.clone())
            .filter(|p| !p.is_empty())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceType;

    fn js(id: &str) -> Bundle {
        Bundle::simple(id, ResourceType::Js, [format!("{id}.src")])
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = BundleSet::new(vec![js("a.js"), js("a.js")]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBundle(id) if id == "a.js"));
    }

    #[test]
    fn test_unknown_child_rejected() {
        let all = Bundle::composite("all.js", ResourceType::Js, ["a.js", "nope.js"]);
        let err = BundleSet::new(vec![js("a.js"), all]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownChild { child, .. } if child == "nope.js"));
    }

    #[test]
    fn test_cycle_rejected() {
        let x = Bundle::composite("x.js", ResourceType::Js, ["y.js"]);
        let y = Bundle::composite("y.js", ResourceType::Js, ["x.js"]);
        assert!(matches!(
            BundleSet::new(vec![x, y]),
            Err(ConfigError::CompositeCycle(_))
        ));
    }

    #[test]
    fn test_ancestors_are_transitive() {
        let set = BundleSet::new(vec![
            Bundle::composite("outer.js", ResourceType::Js, ["inner.js", "c.js"]),
            Bundle::composite("inner.js", ResourceType::Js, ["a.js", "b.js"]),
            js("a.js"),
            js("b.js"),
            js("c.js"),
        ])
        .unwrap();

        let mut ids: Vec<_> = set.ancestors("a.js").iter().map(|b| b.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, ["inner.js", "outer.js"]);
        assert_eq!(set.ancestors("c.js").len(), 1);
        assert!(set.ancestors("outer.js").is_empty());

        let order: Vec<_> = set.build_order().iter().map(|b| b.id.clone()).collect();
        assert_eq!(order, ["a.js", "b.js", "c.js", "inner.js", "outer.js"]);
    }

    #[test]
    fn test_prefixes_longest_first() {
        let set = BundleSet::new(vec![
            js("a.js").with_prefix("r/"),
            js("b.js").with_prefix("res/v2/"),
            js("c.js").with_prefix("r/"),
            js("d.js"),
        ])
        .unwrap();
        assert_eq!(set.prefixes(), ["res/v2/", "r/"]);
    }
}

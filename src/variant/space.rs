use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{VariantMap, VariantSet, variant_key};
use crate::core::BundlingError;

/// All variant axes of a bundle, keyed by variant type.
///
/// Axes are kept sorted by type so enumeration order is stable for a given
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantSpace(BTreeMap<String, VariantSet>);

impl VariantSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, variant_type: &str) -> Option<&VariantSet> {
        self.0.get(variant_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn sets(&self) -> impl Iterator<Item = &VariantSet> {
        self.0.values()
    }

    pub fn insert(&mut self, set: VariantSet) {
        self.0.insert(set.variant_type.clone(), set);
    }

    /// Every combination of one value per axis, followed by `None` for the
    /// "no variant" build.
    ///
    /// Axes iterate in type order and values in declared order, so
    /// `{locale: [en, fr], theme: [light, dark]}` yields
    /// `(en,light) (en,dark) (fr,light) (fr,dark) None`.
    pub fn enumerate(&self) -> Vec<Option<VariantMap>> {
        let mut combos: Vec<VariantMap> = Vec::new();
        for (variant_type, set) in &self.0 {
            if set.values.is_empty() {
                continue;
            }
            combos = if combos.is_empty() {
                set.values
                    .iter()
                    .map(|value| VariantMap::from([(variant_type.clone(), value.clone())]))
                    .collect()
            } else {
                combos
                    .iter()
                    .flat_map(|base| {
                        set.values.iter().map(move |value| {
                            let mut map = base.clone();
                            map.insert(variant_type.clone(), value.clone());
                            map
                        })
                    })
                    .collect()
            };
        }

        let mut all: Vec<Option<VariantMap>> = combos.into_iter().map(Some).collect();
        all.push(None);
        all
    }

    /// Variant keys of [`enumerate`](Self::enumerate), in the same order.
    pub fn keys(&self) -> Vec<String> {
        self.enumerate()
            .iter()
            .map(|v| v.as_ref().map(variant_key).unwrap_or_default())
            .collect()
    }

    /// Add the values of `set`, keeping the existing default when the type
    /// is already present.
    pub fn insert_value(&mut self, set: VariantSet) {
        match self.0.get_mut(&set.variant_type) {
            Some(existing) => {
                for value in set.values {
                    existing.push(value);
                }
            }
            None => self.insert(set),
        }
    }

    /// Merge two spaces.
    ///
    /// For a type present in both, the value lists are unioned (own values
    /// first). Differing default values are a configuration error.
    pub fn concat(&self, other: &Self) -> Result<Self, BundlingError> {
        let mut merged = self.clone();
        for (variant_type, incoming) in &other.0 {
            match merged.0.get_mut(variant_type) {
                Some(existing) => {
                    if !existing.has_same_default(incoming) {
                        return Err(BundlingError::ConflictingDefaultVariant {
                            variant_type: variant_type.clone(),
                            first: existing.default.clone(),
                            second: incoming.default.clone(),
                        });
                    }
                    for value in &incoming.values {
                        existing.push(value.clone());
                    }
                }
                None => {
                    merged.0.insert(variant_type.clone(), incoming.clone());
                }
            }
        }
        Ok(merged)
    }

    /// Restrict a requested variant map to this space's axes, replacing
    /// unknown values with the axis default.
    pub fn resolve(&self, requested: &VariantMap) -> VariantMap {
        self.0
            .iter()
            .map(|(variant_type, set)| {
                let value = requested
                    .get(variant_type)
                    .filter(|v| set.contains(v))
                    .unwrap_or(&set.default);
                (variant_type.clone(), value.clone())
            })
            .collect()
    }
}

impl FromIterator<VariantSet> for VariantSpace {
    fn from_iter<I: IntoIterator<Item = VariantSet>>(iter: I) -> Self {
        let mut space = Self::new();
        for set in iter {
            space.insert(set);
        }
        space
    }
}

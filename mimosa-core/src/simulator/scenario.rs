use crate::variable::FloatValue;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// A what-if variation of a simulation run
///
/// Fixed variables are written from data before the run and their equations are
/// skipped. Deactivated equations are skipped too, leaving whatever values the
/// state was seeded with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    name: String,
    fixed: BTreeMap<String, ArrayD<FloatValue>>,
    deactivated: BTreeSet<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Prescribe the full trajectory of a variable
    pub fn with_fixed(mut self, variable: impl Into<String>, values: ArrayD<FloatValue>) -> Self {
        self.fixed.insert(variable.into(), values);
        self
    }

    /// Prescribe a trajectory loaded through `cache`
    ///
    /// The loader only runs if `key` is not cached yet.
    pub fn with_cached<E>(
        self,
        variable: impl Into<String>,
        cache: &mut DataCache<ArrayD<FloatValue>>,
        key: &str,
        loader: impl FnOnce() -> Result<ArrayD<FloatValue>, E>,
    ) -> Result<Self, E> {
        let values = cache.get_or_try_load(key, loader)?;
        Ok(self.with_fixed(variable, values.as_ref().clone()))
    }

    /// Skip the equation for `variable`
    pub fn deactivate(mut self, variable: impl Into<String>) -> Self {
        self.deactivated.insert(variable.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fixed(&self) -> impl Iterator<Item = (&str, &ArrayD<FloatValue>)> {
        self.fixed.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True if the equation for `variable` must not be evaluated
    pub fn skips(&self, variable: &str) -> bool {
        self.fixed.contains_key(variable) || self.deactivated.contains(variable)
    }
}

/// Loaded reference data keyed by source name
///
/// A cache is created by the caller and passed to whatever needs it, so its lifetime
/// is explicit and nothing leaks between unrelated runs.
#[derive(Debug, Clone)]
pub struct DataCache<V> {
    entries: HashMap<String, Arc<V>>,
}

impl<V> Default for DataCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> DataCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert(key.into(), value.clone());
        value
    }

    /// Return the cached value, loading and storing it first if needed
    ///
    /// A failed load leaves the cache unchanged.
    pub fn get_or_try_load<E>(
        &mut self,
        key: &str,
        loader: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        Ok(self.insert(key, loader()?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn loader_runs_once_per_key() {
        let mut cache: DataCache<ArrayD<f64>> = DataCache::new();
        let mut loads = 0;

        for _ in 0..3 {
            let values = cache
                .get_or_try_load("ssp2_emissions", || {
                    loads += 1;
                    Ok::<_, String>(array![1.0, 2.0].into_dyn())
                })
                .unwrap();
            assert_eq!(values.len(), 2);
        }
        assert_eq!(loads, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let mut cache: DataCache<f64> = DataCache::new();
        let result = cache.get_or_try_load("missing", || Err("not found".to_string()));
        assert_eq!(result, Err("not found".to_string()));
        assert!(cache.is_empty());
    }

    #[test]
    fn separate_caches_do_not_share_entries() {
        let mut first: DataCache<f64> = DataCache::new();
        first.insert("a", 1.0);
        let second: DataCache<f64> = DataCache::new();
        assert!(second.get("a").is_none());
    }

    #[test]
    fn scenario_skips_fixed_and_deactivated() {
        let mut cache = DataCache::new();
        let scenario = Scenario::new("high emissions")
            .with_cached("E", &mut cache, "E_high", || {
                Ok::<_, String>(array![10.0, 12.0].into_dyn())
            })
            .unwrap()
            .deactivate("damages");

        assert!(scenario.skips("E"));
        assert!(scenario.skips("damages"));
        assert!(!scenario.skips("T"));
        assert_eq!(scenario.name(), "high emissions");
        assert!(cache.get("E_high").is_some());
    }
}

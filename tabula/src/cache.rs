//! FILENAME: tabula/src/cache.rs
//! PURPOSE: Computed grids keyed by arrangement.
//! CONTEXT: Tables derived from one another share a cache, so switching
//! back to an arrangement that was already rendered costs a map lookup.
//! Each entry is a `OnceCell`: concurrent readers of a missing entry wait
//! for one computation instead of each arranging the store themselves.

use arrangement_engine::{ArrangeError, ArrangementSpec, Grid};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Slot = Arc<OnceCell<Arc<Grid>>>;

#[derive(Debug, Default)]
pub struct GridCache {
    entries: RwLock<FxHashMap<ArrangementSpec, Slot>>,
}

impl GridCache {
    pub fn new() -> Self {
        GridCache::default()
    }

    /// Returns the cached grid for `spec`, computing it on a miss.
    /// A failed computation leaves the entry empty.
    pub fn get_or_compute<F>(&self, spec: &ArrangementSpec, compute: F) -> Result<Arc<Grid>, ArrangeError>
    where
        F: FnOnce() -> Result<Grid, ArrangeError>,
    {
        let slot = self.slot(spec);
        if let Some(grid) = slot.get() {
            log::trace!("Grid cache hit");
            return Ok(Arc::clone(grid));
        }
        let grid = slot.get_or_try_init(|| {
            log::debug!(
                "Grid cache miss: rows {:?}, columns {:?}, facets {:?}",
                spec.rows,
                spec.columns,
                spec.facets
            );
            compute().map(Arc::new)
        })?;
        Ok(Arc::clone(grid))
    }

    fn slot(&self, spec: &ArrangementSpec) -> Slot {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = entries.get(spec) {
                return Arc::clone(slot);
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(spec.clone()).or_default())
    }

    /// True when a grid for `spec` has been computed.
    pub fn contains(&self, spec: &ArrangementSpec) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(spec)
            .map_or(false, |slot| slot.get().is_some())
    }

    /// Number of computed grids.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrangement_engine::{arrange, AggregatorRegistry};
    use model::{Assignment, Cell, CellStore, DimensionIndex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> CellStore {
        let index = DimensionIndex::new().with_dimension("V1", ["A", "B"]).unwrap();
        let cells = [("A", 1.0), ("B", 2.0)]
            .into_iter()
            .map(|(v1, n)| Cell::new(Assignment::new().with("V1", v1), "n", n));
        CellStore::from_cells(Arc::new(index), cells).unwrap()
    }

    #[test]
    fn test_computes_once_per_spec() {
        let store = store();
        let registry = AggregatorRegistry::new();
        let cache = GridCache::new();
        let calls = AtomicUsize::new(0);
        let rows = ArrangementSpec::new().with_rows(["V1"]);
        let columns = ArrangementSpec::new().with_columns(["V1"]);

        let compute = |spec: &ArrangementSpec| {
            calls.fetch_add(1, Ordering::SeqCst);
            arrange(&store, spec, &registry)
        };

        let first = cache.get_or_compute(&rows, || compute(&rows)).unwrap();
        let second = cache.get_or_compute(&rows, || compute(&rows)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.get_or_compute(&columns, || compute(&columns)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&columns));
    }

    #[test]
    fn test_failed_computation_is_not_cached() {
        let cache = GridCache::new();
        let spec = ArrangementSpec::new().with_rows(["Missing"]);
        let result = cache.get_or_compute(&spec, || Err(ArrangeError::UnknownAggregator("x".into())));
        assert!(result.is_err());
        assert!(!cache.contains(&spec));
        assert!(cache.is_empty());

        let store = store();
        let ok = ArrangementSpec::new().with_rows(["V1"]);
        cache
            .get_or_compute(&ok, || arrange(&store, &ok, &AggregatorRegistry::new()))
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}

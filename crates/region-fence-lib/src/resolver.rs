//! RegionResolver - Top-level façade over the store, index and cache
//!
//! This module provides the high-level API: open a dataset once, then resolve
//! coordinates to the fences containing them from any number of threads.

use crate::cache::{CacheStats, ResultCache};
use crate::quadtree::{IndexStats, SpatialIndex};
use crate::store::{FenceStore, StoreOptions};
use crate::{Fence, FenceError, FenceIndex, Result, containment, utils};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Where to load the dataset from and how to serve it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Location of the dataset file
    pub database_path: PathBuf,
    /// Options applied to the store, index and cache
    pub options: StoreOptions,
}

impl ResolverConfig {
    /// Configuration with default options for the given dataset
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            options: StoreOptions::default(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }
}

/// Information about a loaded resolver
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    /// Number of fences loaded
    pub fence_count: usize,
    /// Total number of polygon vertices
    pub vertex_count: usize,
    /// Shape of the spatial index
    pub index: IndexStats,
    /// Cache counters, `None` when caching is disabled
    pub cache: Option<CacheStats>,
}

/// Resolves coordinates to the fences containing them
///
/// Immutable after construction apart from the optional result cache, so a single
/// instance can be shared behind an `Arc` by concurrent callers.
#[derive(Debug)]
pub struct RegionResolver {
    store: FenceStore,
    index: SpatialIndex,
    cache: Option<ResultCache>,
    options: StoreOptions,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RegionResolver {
    /// Load the dataset named by the configuration and build the index
    pub fn open(config: &ResolverConfig) -> Result<Self> {
        let store = FenceStore::open(&config.database_path, &config.options)?;
        Self::new(store, &config.options)
    }

    /// Build a resolver over an already loaded store
    pub fn new(store: FenceStore, options: &StoreOptions) -> Result<Self> {
        let start = Instant::now();
        let index = SpatialIndex::build(&store, options.max_depth)?;
        let cache = ResultCache::new(options.cache_capacity);

        let stats = index.stats();
        tracing::info!(
            fences = store.len(),
            nodes = stats.node_count,
            max_level = stats.max_level,
            cache_capacity = options.cache_capacity,
            "Built spatial index in {:?}",
            start.elapsed()
        );

        Ok(Self {
            store,
            index,
            cache,
            options: options.clone(),
        })
    }

    /// Fences containing the coordinate, most specific first
    ///
    /// An empty vector means no fence contains the point. Coordinates outside the
    /// valid WGS84 range, or not finite, are rejected with `InvalidCoordinate`.
    pub fn resolve(&self, lat: f64, lng: f64) -> Result<Vec<&Fence>> {
        let coord = utils::validate_coordinate(lat, lng)?;

        if let Some(cache) = &self.cache
            && let Some(cached) = cache.get(coord)
        {
            if self.options.debug {
                tracing::debug!(lat, lng, matches = cached.len(), "cache hit");
            }
            return self.fences_for(&cached);
        }

        let candidates = self.index.candidates(coord)?;
        if self.options.debug {
            tracing::debug!(lat, lng, ?candidates, "index candidates");
        }

        let fences =
            containment::filter_and_order(&self.store, &candidates, coord, self.options.debug)?;

        if let Some(cache) = &self.cache {
            let indices: Arc<[FenceIndex]> = fences.iter().map(|f| f.storage_index()).collect();
            cache.put(coord, indices);
        }

        Ok(fences)
    }

    /// Attribute value of the most specific fence containing the coordinate
    ///
    /// Returns `None` when no fence matches or the top fence lacks the attribute.
    pub fn primary_code(&self, lat: f64, lng: f64, attribute: &str) -> Result<Option<&str>> {
        let fences = self.resolve(lat, lng)?;
        Ok(fences.first().and_then(|fence| fence.attribute(attribute)))
    }

    fn fences_for(&self, indices: &[FenceIndex]) -> Result<Vec<&Fence>> {
        indices
            .iter()
            .map(|&index| {
                self.store
                    .get(index)
                    .ok_or_else(|| FenceError::IndexInconsistency {
                        reason: format!("cached fence {index} is not in the store"),
                    })
            })
            .collect()
    }

    /// Summary of the loaded dataset, index and cache
    pub fn info(&self) -> ResolverInfo {
        ResolverInfo {
            fence_count: self.store.len(),
            vertex_count: self.store.fences().iter().map(|f| f.vertex_count()).sum(),
            index: self.index.stats(),
            cache: self.cache.as_ref().map(|c| c.stats()),
        }
    }

    /// Underlying fence store
    pub fn store(&self) -> &FenceStore {
        &self.store
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Dataset path, if loaded from disk
    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Dataset, StoredFence};
    use crate::PrecedenceRule;

    fn square(id: &str, min: (f64, f64), max: (f64, f64)) -> StoredFence {
        StoredFence::new(id)
            .with_polygon(
                &[(min.0, min.1), (min.0, max.1), (max.0, max.1), (max.0, min.1)],
                &[],
            )
            .with_attribute("iso", id.to_uppercase())
    }

    fn nested() -> Dataset {
        Dataset::new(vec![
            square("country", (0.0, 0.0), (20.0, 20.0)),
            square("state", (2.0, 2.0), (10.0, 10.0)),
            square("city", (4.0, 4.0), (6.0, 6.0)),
        ])
    }

    fn resolver(options: StoreOptions) -> RegionResolver {
        let store = FenceStore::from_dataset(nested(), &options).unwrap();
        RegionResolver::new(store, &options).unwrap()
    }

    fn ids(fences: &[&Fence]) -> Vec<String> {
        fences.iter().map(|f| f.id().to_string()).collect()
    }

    #[test]
    fn test_resolve_nested() {
        let resolver = resolver(StoreOptions::default());

        assert_eq!(ids(&resolver.resolve(5.0, 5.0).unwrap()), vec!["city", "state", "country"]);
        assert_eq!(ids(&resolver.resolve(8.0, 8.0).unwrap()), vec!["state", "country"]);
        assert_eq!(ids(&resolver.resolve(15.0, 15.0).unwrap()), vec!["country"]);
        assert!(resolver.resolve(-30.0, 100.0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let resolver = resolver(StoreOptions::default());

        for (lat, lng) in [(91.0, 0.0), (0.0, 181.0), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            let err = resolver.resolve(lat, lng).unwrap_err();
            assert!(matches!(err, FenceError::InvalidCoordinate { .. }));
        }
        // Range limits are valid
        assert!(resolver.resolve(90.0, -180.0).unwrap().is_empty());
    }

    #[test]
    fn test_primary_code() {
        let resolver = resolver(StoreOptions::default());

        assert_eq!(resolver.primary_code(5.0, 5.0, "iso").unwrap(), Some("CITY"));
        assert_eq!(resolver.primary_code(5.0, 5.0, "missing").unwrap(), None);
        assert_eq!(resolver.primary_code(50.0, 50.0, "iso").unwrap(), None);
    }

    #[test]
    fn test_cache_is_transparent() {
        let cached = resolver(StoreOptions {
            cache_capacity: 4,
            ..Default::default()
        });
        let uncached = resolver(StoreOptions::default());

        for _ in 0..3 {
            for (lat, lng) in [(5.0, 5.0), (8.0, 8.0), (15.0, 15.0), (30.0, 30.0)] {
                assert_eq!(
                    ids(&cached.resolve(lat, lng).unwrap()),
                    ids(&uncached.resolve(lat, lng).unwrap())
                );
            }
        }

        let stats = cached.info().cache.unwrap();
        assert_eq!(stats.misses, 4);
        assert_eq!(stats.hits, 8);
        assert_eq!(stats.entries, 4);
        assert!(uncached.info().cache.is_none());
    }

    #[test]
    fn test_cache_capacity_respected() {
        let resolver = resolver(StoreOptions {
            cache_capacity: 2,
            ..Default::default()
        });

        for i in 0..10 {
            resolver.resolve(i as f64, i as f64).unwrap();
        }
        let stats = resolver.info().cache.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.capacity, 2);
    }

    #[test]
    fn test_authored_precedence() {
        let options = StoreOptions {
            precedence: PrecedenceRule::Authored,
            ..Default::default()
        };
        let dataset = Dataset::new(vec![
            square("big", (0.0, 0.0), (10.0, 10.0)).with_rank(1),
            square("small", (4.0, 4.0), (6.0, 6.0)).with_rank(2),
            square("unranked", (3.0, 3.0), (7.0, 7.0)),
        ]);
        let store = FenceStore::from_dataset(dataset, &options).unwrap();
        let resolver = RegionResolver::new(store, &options).unwrap();

        assert_eq!(ids(&resolver.resolve(5.0, 5.0).unwrap()), vec!["big", "small", "unranked"]);
    }

    #[test]
    fn test_concurrent_resolve() {
        let resolver = resolver(StoreOptions {
            cache_capacity: 8,
            debug: true,
            ..Default::default()
        });

        std::thread::scope(|s| {
            for t in 0..4 {
                let resolver = &resolver;
                s.spawn(move || {
                    for i in 0..100 {
                        let lat = ((i + t) % 20) as f64;
                        let result = resolver.resolve(lat, lat).unwrap();
                        let expected = match lat {
                            l if (4.0..=6.0).contains(&l) => 3,
                            l if (2.0..=10.0).contains(&l) => 2,
                            _ => 1,
                        };
                        assert_eq!(result.len(), expected);
                    }
                });
            }
        });

        assert!(resolver.info().cache.unwrap().entries <= 8);
    }

    #[test]
    fn test_info() {
        let resolver = resolver(StoreOptions::default());
        let info = resolver.info();

        assert_eq!(info.fence_count, 3);
        // Rings are stored closed
        assert_eq!(info.vertex_count, 15);
        assert!(info.index.node_count >= 1);
        assert!(resolver.path().is_none());
    }
}

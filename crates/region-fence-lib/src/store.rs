//! FenceStore - Read-only fence records loaded from a dataset file
//!
//! The on-disk dataset is a single JSON document. Vertices are stored as
//! `[lat, lng]` pairs, the first ring of each polygon is its outer boundary and
//! any further rings are holes. The store never writes; [`Dataset::save`] exists
//! for the tooling that builds datasets.

use crate::fence::{Fence, FenceIndex, PrecedenceRule};
use crate::quadtree::DEFAULT_MAX_DEPTH;
use crate::{FenceError, Result};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Dataset format version understood by this library
pub const DATASET_VERSION: u32 = 1;

/// Options recognized when opening a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Log query internals (candidates, containment decisions, cache hits)
    pub debug: bool,
    /// Maximum number of cached results, 0 disables the result cache
    pub cache_capacity: usize,
    /// How overlapping fences are ordered
    pub precedence: PrecedenceRule,
    /// Depth of the spatial index, deeper means smaller cells
    pub max_depth: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            debug: false,
            cache_capacity: 0,
            precedence: PrecedenceRule::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A fence record as persisted in the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFence {
    /// Storage key of the record
    pub id: String,
    /// Polygons as lists of rings of `[lat, lng]` vertices
    pub polygons: Vec<Vec<Vec<[f64; 2]>>>,
    /// Attribute data
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Explicit precedence rank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl StoredFence {
    /// Create a record without geometry
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            polygons: Vec::new(),
            data: BTreeMap::new(),
            rank: None,
        }
    }

    /// Add a polygon given its outer ring and holes as `(lat, lng)` vertices
    pub fn with_polygon(mut self, outer: &[(f64, f64)], holes: &[&[(f64, f64)]]) -> Self {
        let to_ring = |ring: &[(f64, f64)]| -> Vec<[f64; 2]> {
            ring.iter().map(|&(lat, lng)| [lat, lng]).collect()
        };
        let mut rings = vec![to_ring(outer)];
        rings.extend(holes.iter().map(|&hole| to_ring(hole)));
        self.polygons.push(rings);
        self
    }

    /// Set an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Set the explicit precedence rank
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Convert the stored rings to `geo` polygons (x = lng, y = lat)
    fn to_multipolygon(&self) -> Result<MultiPolygon<f64>> {
        let to_line = |ring: &Vec<[f64; 2]>| {
            LineString::from(
                ring.iter()
                    .map(|&[lat, lng]| Coord { x: lng, y: lat })
                    .collect::<Vec<_>>(),
            )
        };

        let polygons = self
            .polygons
            .iter()
            .map(|rings| {
                let (outer, holes) = rings.split_first().ok_or_else(|| {
                    let id = &self.id;
                    FenceError::InvalidGeometry(format!("fence {id} has a polygon without rings"))
                })?;
                Ok(Polygon::new(to_line(outer), holes.iter().map(to_line).collect()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MultiPolygon::new(polygons))
    }
}

/// Serialized form of a whole store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Format version
    pub version: u32,
    /// Records in storage order
    pub fences: Vec<StoredFence>,
}

impl Dataset {
    /// Create a dataset at the current format version
    pub fn new(fences: Vec<StoredFence>) -> Self {
        Self {
            version: DATASET_VERSION,
            fences,
        }
    }

    /// Write the dataset to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }
}

/// Read-only collection of fences
///
/// Fences are owned by the store for its whole lifetime. Everything else (index,
/// cache, results) refers to them by [`FenceIndex`] or by borrow.
#[derive(Debug)]
pub struct FenceStore {
    /// Where the store was loaded from (None for in-memory datasets)
    path: Option<PathBuf>,
    /// Fences in storage order
    fences: Vec<Fence>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FenceStore {
    /// Open a store from a dataset file
    ///
    /// Every failure (missing file, permissions, malformed JSON, unsupported version,
    /// invalid fence) is reported as [`FenceError::StorageUnavailable`].
    pub fn open<P: AsRef<Path>>(path: P, options: &StoreOptions) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("store::open");

        let path = path.as_ref();
        let start = Instant::now();

        let file = File::open(path).map_err(|e| FenceError::storage(path, e))?;
        let dataset: Dataset = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| FenceError::storage(path, e))?;

        let mut store = Self::from_dataset(dataset, options).map_err(|e| match e {
            FenceError::StorageUnavailable { reason, .. } => FenceError::storage(path, reason),
            other => FenceError::storage(path, other),
        })?;
        store.path = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            fences = store.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Opened fence store"
        );

        Ok(store)
    }

    /// Build a store from an in-memory dataset
    pub fn from_dataset(dataset: Dataset, options: &StoreOptions) -> Result<Self> {
        if dataset.version != DATASET_VERSION {
            return Err(FenceError::storage(
                "<memory>",
                format!(
                    "unsupported dataset version {} (expected {DATASET_VERSION})",
                    dataset.version
                ),
            ));
        }

        {
            let mut seen = HashSet::with_capacity(dataset.fences.len());
            if let Some(duplicate) = dataset.fences.iter().find(|f| !seen.insert(f.id.as_str())) {
                return Err(FenceError::storage(
                    "<memory>",
                    format!("duplicate fence id {}", duplicate.id),
                ));
            }
        }

        // Build fences in parallel, collect keeps storage order
        let rule = options.precedence;
        let fences = dataset
            .fences
            .into_par_iter()
            .enumerate()
            .map(|(index, record)| {
                let boundary = record.to_multipolygon()?;
                Fence::new(index, record.id, boundary, record.data, record.rank, rule)
            })
            .collect::<Result<Vec<Fence>>>()
            .map_err(|e| FenceError::storage("<memory>", e))?;

        Ok(Self { path: None, fences })
    }

    /// Path the store was opened from
    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All fences in storage order
    #[inline]
    pub fn fences(&self) -> &[Fence] {
        &self.fences
    }

    /// Get a fence by storage index
    #[inline]
    pub fn get(&self, index: FenceIndex) -> Option<&Fence> {
        self.fences.get(index)
    }

    /// Find a fence by id
    pub fn find(&self, id: &str) -> Option<&Fence> {
        self.fences.iter().find(|f| f.id() == id)
    }

    /// Number of fences
    #[inline]
    pub fn len(&self) -> usize {
        self.fences.len()
    }

    /// Check if the store holds no fences
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

//! Region Fence Library - Point-in-Region Resolution Engine
//!
//! This library resolves a WGS84 coordinate to the set of polygonal regions ("fences")
//! containing it, ordered by precedence so that the first result is the most specific
//! region (a city before its state, a state before its country).
//!
//! # Architecture
//!
//! - **[`FenceStore`]**: Read-only fence records loaded from a single dataset file
//! - **[`SpatialIndex`]**: Earth-rooted quadtree narrowing a point to candidate fences
//! - **[`containment`]**: Exact point-in-polygon filtering and precedence ordering
//! - **[`ResultCache`]**: Optional bounded LRU memoization of resolved coordinates
//! - **[`RegionResolver`]**: High-level façade combining all of the above
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(F × C) where F=fences, C=cells touched per bounding box, parallelized
//! - **Query Time**: O(D + K × V) where D=depth, K=candidates, V=vertices per candidate
//! - **Memory**: O(V) for raw polygons + O(F × C) for the index

mod cache;
pub mod containment;
mod fence;
mod quadtree;
mod resolver;
mod store;
pub mod utils;

// Public API exports
pub use cache::{CacheStats, ResultCache};
pub use fence::{Fence, FenceIndex, PrecedenceRule};
pub use quadtree::{IndexStats, SpatialIndex};
pub use resolver::{RegionResolver, ResolverConfig, ResolverInfo};
pub use store::{Dataset, FenceStore, StoreOptions, StoredFence, DATASET_VERSION};

use std::path::PathBuf;

/// Error types for region resolution
#[derive(Debug, thiserror::Error)]
pub enum FenceError {
    #[error("Storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Index inconsistency: {reason}")]
    IndexInconsistency { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FenceError {
    /// Build a `StorageUnavailable` error for the given store path
    pub fn storage(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        FenceError::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error was caused by caller input rather than the dataset
    pub fn is_client_error(&self) -> bool {
        matches!(self, FenceError::InvalidCoordinate { .. })
    }
}

pub type Result<T> = std::result::Result<T, FenceError>;

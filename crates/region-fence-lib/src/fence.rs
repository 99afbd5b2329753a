//! Fence storage module
//!
//! This module provides the `Fence` struct: one polygonal region with its attribute
//! data and the metadata (bounding box, precedence rank) precomputed at load time.

use crate::{FenceError, Result, utils};
use geo::{Area, BoundingRect, Coord, LineString, MultiPolygon, Rect, Validation};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Position of a fence in its store, which is also its final tie-breaker
pub type FenceIndex = usize;

/// Rule used to derive the precedence rank of each fence
///
/// Lower ranks sort first, so the first fence of a result is the most specific one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceRule {
    /// Smallest bounding box area first
    #[default]
    BoundingBoxArea,
    /// Smallest polygon area first (holes subtracted)
    PolygonArea,
    /// Explicit rank authored in the dataset, unranked fences last
    Authored,
}

/// A single region with raw geometry and precomputed metadata
#[derive(Clone, Debug)]
pub struct Fence {
    /// Stable identifier (storage key)
    id: String,
    /// Polygons with holes, x = longitude and y = latitude
    boundary: MultiPolygon<f64>,
    /// Precomputed bounding box in degrees
    bounding_box: Rect<f64>,
    /// Attribute data, e.g. "iso" -> "FR"
    data: BTreeMap<String, String>,
    /// Ordering key, lower is more specific
    precedence_rank: f64,
    /// Position in the store
    storage_index: FenceIndex,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Fence {
    /// Create a new Fence from its geometry and attributes
    ///
    /// # Arguments
    /// * `storage_index` - Position of the record in the store
    /// * `id` - Stable identifier of the record
    /// * `boundary` - Polygons in (x = lng, y = lat) order
    /// * `data` - Attribute data
    /// * `authored_rank` - Explicit rank, only consulted by [`PrecedenceRule::Authored`]
    /// * `rule` - How the precedence rank is derived
    ///
    /// # Returns
    /// The fence on success, or an error if the geometry is empty or invalid
    pub fn new(
        storage_index: FenceIndex,
        id: String,
        boundary: MultiPolygon<f64>,
        data: BTreeMap<String, String>,
        authored_rank: Option<u32>,
        rule: PrecedenceRule,
    ) -> Result<Self> {
        Self::validate(&id, &boundary)?;

        let bounding_box = boundary
            .bounding_rect()
            .ok_or_else(|| FenceError::InvalidGeometry(format!("fence {id} has no extent")))?;

        let precedence_rank = match rule {
            PrecedenceRule::BoundingBoxArea => utils::rect_area(&bounding_box),
            PrecedenceRule::PolygonArea => boundary.unsigned_area(),
            PrecedenceRule::Authored => authored_rank.map_or(f64::INFINITY, f64::from),
        };

        Ok(Fence {
            id,
            boundary,
            bounding_box,
            data,
            precedence_rank,
            storage_index,
        })
    }

    /// Check ring sizes, coordinate ranges and polygon validity
    ///
    /// Each polygon is validated on its own, so parts of one fence may share edges
    /// or vertices.
    fn validate(id: &str, boundary: &MultiPolygon<f64>) -> Result<()> {
        if boundary.0.is_empty() {
            return Err(FenceError::InvalidGeometry(format!(
                "fence {id} has no polygons"
            )));
        }

        for polygon in &boundary.0 {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                let distinct = distinct_vertex_count(ring);
                if distinct < 3 {
                    return Err(FenceError::InvalidGeometry(format!(
                        "fence {id} has a ring with {distinct} distinct vertices, need at least 3"
                    )));
                }
                if let Some(bad) = ring
                    .coords()
                    .find(|c| !utils::is_valid_coordinate(c.y, c.x))
                {
                    return Err(FenceError::InvalidGeometry(format!(
                        "fence {id} has an out of range vertex ({}, {})",
                        bad.y, bad.x
                    )));
                }
            }

            // Self-intersecting rings, holes crossing or escaping the exterior
            polygon.check_validation().map_err(|e| {
                FenceError::InvalidGeometry(format!("fence {id} has an invalid polygon: {e}"))
            })?;
        }

        Ok(())
    }

    /// Get the stable identifier
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the polygons of this fence
    #[inline]
    pub fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }

    /// Get the bounding box in degrees
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// Access the attribute data
    #[inline]
    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    /// Get a single attribute value
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    /// Get the precedence rank (lower is more specific)
    #[inline]
    pub fn precedence_rank(&self) -> f64 {
        self.precedence_rank
    }

    /// Get the position of this fence in its store
    #[inline]
    pub fn storage_index(&self) -> FenceIndex {
        self.storage_index
    }

    /// Total order used for results: rank ascending, then storage order
    pub fn cmp_precedence(&self, other: &Fence) -> Ordering {
        self.precedence_rank
            .total_cmp(&other.precedence_rank)
            .then(self.storage_index.cmp(&other.storage_index))
    }

    /// Total number of vertices across all rings
    pub fn vertex_count(&self) -> usize {
        self.boundary
            .0
            .iter()
            .map(|p| {
                p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
            })
            .sum()
    }
}

/// Count distinct vertices of a ring, ignoring the closing vertex
fn distinct_vertex_count(ring: &LineString<f64>) -> usize {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    coords.dedup();
    coords.len()
}

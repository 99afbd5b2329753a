//! Quadtree spatial index for candidate fence lookup
//!
//! This module provides an Earth-rooted quadtree over longitude/latitude degrees.
//! Each fence is registered in every node its bounding box intersects, stopping at
//! nodes fully covered by the bounding box or at the maximum depth. A point lookup
//! walks a single root-to-leaf path, so the candidate set is an over-approximation
//! by bounding box: it may contain fences that do not contain the point but never
//! misses one that does.

use crate::store::FenceStore;
use crate::{FenceError, FenceIndex, Result, utils};
use geo::{Coord, Rect};
use rayon::prelude::*;
use smallvec::SmallVec;

/// Hard limit on the depth of the quadtree to bound memory use
pub const MAX_DEPTH: u32 = 20;

/// Default depth, giving leaf cells of roughly 0.35° × 0.18°
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Fence list stored in a node, most nodes hold only a few entries
type NodeFences = SmallVec<[FenceIndex; 4]>;

/// Statistics about the shape of the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of allocated nodes
    pub node_count: usize,
    /// Deepest level that holds a node
    pub max_level: u32,
    /// Total fence entries across all nodes
    pub entry_count: usize,
}

/// Root container for the quadtree spatial index
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// Root node covering the entire Earth
    root: QuadtreeNode,
    /// Bounding box of every fence, indexed by storage order
    bounds: Vec<Rect<f64>>,
    /// Maximum depth used while inserting
    max_depth: u32,
}

/// A single node in the quadtree
#[derive(Debug, Clone)]
struct QuadtreeNode {
    /// Bounding box in degrees (x = lng, y = lat)
    bounding_box: Rect<f64>,
    /// Depth level in the tree (0 = root)
    level: u32,
    /// Fences registered at this node
    fences: NodeFences,
    /// Child nodes (NW, NE, SW, SE) if subdivided
    children: Option<Box<[QuadtreeNode; 4]>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialIndex {
    /// Create a new empty index with Earth bounds
    pub fn new(max_depth: u32) -> Self {
        Self {
            root: QuadtreeNode::new_root(),
            bounds: Vec::new(),
            max_depth: max_depth.min(MAX_DEPTH),
        }
    }

    /// Build the index for every fence of a store
    pub fn build(store: &FenceStore, max_depth: u32) -> Result<Self> {
        let bounds = store.fences().iter().map(|f| f.bounding_box()).collect();
        Self::from_bounds(bounds, max_depth)
    }

    /// Build the index from bounding boxes given in storage order
    ///
    /// A tree is built per fence in parallel, then the trees are merged
    /// sequentially. Merging is cheap because all trees share the same shape.
    pub fn from_bounds(bounds: Vec<Rect<f64>>, max_depth: u32) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("index::from_bounds");

        let mut index = Self::new(max_depth);
        let depth = index.max_depth;

        let trees: Vec<QuadtreeNode> = bounds
            .par_iter()
            .enumerate()
            .map(|(fence, bbox)| {
                let mut root = QuadtreeNode::new_root();
                root.insert_fence(fence, bbox, depth);
                root
            })
            .collect();

        // Sequential merge keeps node lists in storage order
        for tree in trees {
            index.root.merge_with(tree)?;
        }
        index.bounds = bounds;

        Ok(index)
    }

    /// Candidate fences whose bounding box contains the coordinate
    ///
    /// Returns storage indices, deduplicated and sorted. An empty vector means no
    /// fence can contain the point.
    pub fn candidates(&self, coord: Coord<f64>) -> Result<Vec<FenceIndex>> {
        let mut raw = Vec::new();
        self.root.collect_along_path(coord, &mut raw);

        raw.sort_unstable();
        raw.dedup();

        let mut results = Vec::with_capacity(raw.len());
        for fence in raw {
            let bbox = self
                .bounds
                .get(fence)
                .ok_or_else(|| FenceError::IndexInconsistency {
                    reason: format!(
                        "cell references fence {fence} but only {} are indexed",
                        self.bounds.len()
                    ),
                })?;
            if utils::rect_contains_coord(bbox, coord) {
                results.push(fence);
            }
        }

        Ok(results)
    }

    /// Number of indexed fences
    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Check if the index holds no fences
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Maximum depth of the tree
    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Walk the tree and compute its statistics
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats::default();
        self.root.accumulate_stats(&mut stats);
        stats
    }
}

impl QuadtreeNode {
    /// Create a root node covering the entire Earth
    fn new_root() -> Self {
        Self::new_child(utils::earth_bounds(), 0)
    }

    /// Create a child node with the given bounding box and level
    fn new_child(bounding_box: Rect<f64>, level: u32) -> Self {
        Self {
            bounding_box,
            level,
            fences: NodeFences::new(),
            children: None,
        }
    }

    /// Midpoint of this node, the split lines of its children
    #[inline]
    fn midpoint(&self) -> Coord<f64> {
        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        Coord {
            x: (min.x + max.x) / 2.0,
            y: (min.y + max.y) / 2.0,
        }
    }

    /// Subdivide this node into 4 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return; // Already subdivided
        }

        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        let mid = self.midpoint();
        let child_level = self.level + 1;

        // Create 4 children: NW, NE, SW, SE
        let nw = QuadtreeNode::new_child(
            Rect::new(Coord { x: min.x, y: mid.y }, Coord { x: mid.x, y: max.y }),
            child_level,
        );
        let ne = QuadtreeNode::new_child(
            Rect::new(Coord { x: mid.x, y: mid.y }, Coord { x: max.x, y: max.y }),
            child_level,
        );
        let sw = QuadtreeNode::new_child(
            Rect::new(Coord { x: min.x, y: min.y }, Coord { x: mid.x, y: mid.y }),
            child_level,
        );
        let se = QuadtreeNode::new_child(
            Rect::new(Coord { x: mid.x, y: min.y }, Coord { x: max.x, y: mid.y }),
            child_level,
        );

        self.children = Some(Box::new([nw, ne, sw, se]));
    }

    /// Index of the child a coordinate is routed to
    ///
    /// Points on a split line go east/north. The chosen child always contains the
    /// point because child bounds are closed.
    #[inline]
    fn child_for(&self, coord: Coord<f64>) -> usize {
        let mid = self.midpoint();
        let is_east = coord.x >= mid.x;
        let is_north = coord.y >= mid.y;

        match (is_east, is_north) {
            (false, true) => 0,  // NW
            (true, true) => 1,   // NE
            (false, false) => 2, // SW
            (true, false) => 3,  // SE
        }
    }

    /// Register a fence in every node its bounding box intersects
    fn insert_fence(&mut self, fence: FenceIndex, bbox: &Rect<f64>, max_depth: u32) {
        if !utils::rects_intersect(&self.bounding_box, bbox) {
            return;
        }

        // Fully covered nodes and leaves store the fence, deeper nodes add nothing
        if self.level >= max_depth || utils::rect_contains_rect(bbox, &self.bounding_box) {
            self.fences.push(fence);
            return;
        }

        if self.children.is_none() {
            self.subdivide();
        }

        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                child.insert_fence(fence, bbox, max_depth);
            }
        }
    }

    /// Merge another node into this one
    fn merge_with(&mut self, other: QuadtreeNode) -> Result<()> {
        if self.level != other.level {
            return Err(FenceError::IndexInconsistency {
                reason: format!(
                    "node levels do not match: {} vs {}",
                    self.level, other.level
                ),
            });
        }
        if self.bounding_box != other.bounding_box {
            return Err(FenceError::IndexInconsistency {
                reason: "node bounding boxes do not match".to_string(),
            });
        }

        self.fences.extend(other.fences);

        match (&mut self.children, other.children) {
            (_, None) => {}
            (None, Some(other_children)) => {
                self.children = Some(other_children);
            }
            (Some(self_children), Some(other_children)) => {
                for (self_child, other_child) in
                    self_children.iter_mut().zip(other_children.into_iter())
                {
                    self_child.merge_with(other_child)?;
                }
            }
        }

        Ok(())
    }

    /// Collect the fences of every node on the path to the leaf containing `coord`
    fn collect_along_path(&self, coord: Coord<f64>, results: &mut Vec<FenceIndex>) {
        if !utils::rect_contains_coord(&self.bounding_box, coord) {
            return;
        }

        let mut node = self;
        loop {
            results.extend_from_slice(&node.fences);
            match &node.children {
                Some(children) => node = &children[node.child_for(coord)],
                None => break,
            }
        }
    }

    /// Add this subtree to the statistics
    fn accumulate_stats(&self, stats: &mut IndexStats) {
        stats.node_count += 1;
        stats.max_level = stats.max_level.max(self.level);
        stats.entry_count += self.fences.len();

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.accumulate_stats(stats);
            }
        }
    }
}

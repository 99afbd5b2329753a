//! Exact point-in-fence tests and precedence ordering
//!
//! Points on a boundary (outer ring or hole ring, edge or vertex) are treated as
//! inside. The decision comes from `geo`'s robust predicates, so repeated queries
//! for the same coordinate always agree.

use crate::store::FenceStore;
use crate::{Fence, FenceError, FenceIndex, Result, utils};
use geo::Coord;
use geo::coordinate_position::{CoordPos, CoordinatePosition};

/// Position of a coordinate relative to a fence
///
/// Each part is tested on its own. A point on an edge shared by two parts, or on
/// an island filling a hole, lies on the boundary of both and stays contained.
pub fn classify(fence: &Fence, coord: Coord<f64>) -> CoordPos {
    if !utils::rect_contains_coord(&fence.bounding_box(), coord) {
        return CoordPos::Outside;
    }

    let mut position = CoordPos::Outside;
    for polygon in &fence.boundary().0 {
        match polygon.coordinate_position(&coord) {
            CoordPos::Inside => return CoordPos::Inside,
            CoordPos::OnBoundary => position = CoordPos::OnBoundary,
            CoordPos::Outside => {}
        }
    }
    position
}

/// Whether a fence contains a coordinate, boundary included
#[inline]
pub fn contains(fence: &Fence, coord: Coord<f64>) -> bool {
    !matches!(classify(fence, coord), CoordPos::Outside)
}

/// Keep the candidates containing the coordinate, most specific first
///
/// Survivors are sorted by precedence rank, ties broken by storage order. An empty
/// result means no fence contains the point.
pub fn filter_and_order<'a>(
    store: &'a FenceStore,
    candidates: &[FenceIndex],
    coord: Coord<f64>,
    debug: bool,
) -> Result<Vec<&'a Fence>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("containment::filter_and_order");

    let mut matches = Vec::with_capacity(candidates.len());
    for &index in candidates {
        let fence = store
            .get(index)
            .ok_or_else(|| FenceError::IndexInconsistency {
                reason: format!("candidate {index} is not in the store ({} fences)", store.len()),
            })?;

        let position = classify(fence, coord);
        if debug {
            tracing::debug!(
                fence = fence.id(),
                lat = coord.y,
                lng = coord.x,
                ?position,
                "containment test"
            );
        }
        if position != CoordPos::Outside {
            matches.push(fence);
        }
    }

    matches.sort_by(|a, b| a.cmp_precedence(b));
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Dataset, StoreOptions, StoredFence};

    /// Square given by its (lat, lng) corners
    fn square(id: &str, min: (f64, f64), max: (f64, f64)) -> StoredFence {
        StoredFence::new(id)
            .with_polygon(
                &[(min.0, min.1), (min.0, max.1), (max.0, max.1), (max.0, min.1)],
                &[],
            )
            .with_attribute("name", id)
    }

    fn store(records: Vec<StoredFence>) -> FenceStore {
        FenceStore::from_dataset(Dataset::new(records), &StoreOptions::default()).unwrap()
    }

    fn ids(fences: &[&Fence]) -> Vec<String> {
        fences.iter().map(|f| f.id().to_string()).collect()
    }

    #[test]
    fn test_classify_inside_outside() {
        let store = store(vec![square("a", (0.0, 0.0), (10.0, 10.0))]);
        let fence = store.get(0).unwrap();

        assert_eq!(classify(fence, utils::latlng_to_coord(5.0, 5.0)), CoordPos::Inside);
        assert_eq!(classify(fence, utils::latlng_to_coord(15.0, 5.0)), CoordPos::Outside);
        assert!(!contains(fence, utils::latlng_to_coord(-1.0, -1.0)));
    }

    #[test]
    fn test_boundary_points_are_inside() {
        let store = store(vec![square("a", (0.0, 0.0), (10.0, 10.0))]);
        let fence = store.get(0).unwrap();

        let edge = utils::latlng_to_coord(0.0, 5.0);
        let vertex = utils::latlng_to_coord(10.0, 10.0);
        for _ in 0..10 {
            assert_eq!(classify(fence, edge), CoordPos::OnBoundary);
            assert_eq!(classify(fence, vertex), CoordPos::OnBoundary);
            assert!(contains(fence, edge));
            assert!(contains(fence, vertex));
        }
    }

    #[test]
    fn test_holes_are_excluded() {
        let holed = StoredFence::new("ring").with_polygon(
            &[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)],
            &[&[(4.0, 4.0), (4.0, 6.0), (6.0, 6.0), (6.0, 4.0)]],
        );
        let store = store(vec![holed]);
        let fence = store.get(0).unwrap();

        assert!(contains(fence, utils::latlng_to_coord(2.0, 2.0)));
        assert!(!contains(fence, utils::latlng_to_coord(5.0, 5.0)));
        // Hole edge belongs to the boundary
        assert!(contains(fence, utils::latlng_to_coord(4.0, 5.0)));
    }

    #[test]
    fn test_multi_polygon_fence() {
        let islands = StoredFence::new("islands")
            .with_polygon(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)], &[])
            .with_polygon(&[(5.0, 5.0), (5.0, 6.0), (6.0, 6.0), (6.0, 5.0)], &[]);
        let store = store(vec![islands]);
        let fence = store.get(0).unwrap();

        assert!(contains(fence, utils::latlng_to_coord(0.5, 0.5)));
        assert!(contains(fence, utils::latlng_to_coord(5.5, 5.5)));
        // Inside the bounding box but between the islands
        assert!(!contains(fence, utils::latlng_to_coord(3.0, 3.0)));
    }

    #[test]
    fn test_parts_sharing_an_edge() {
        let split = StoredFence::new("split")
            .with_polygon(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)], &[])
            .with_polygon(&[(0.0, 1.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0)], &[]);
        let store = store(vec![split]);
        let fence = store.get(0).unwrap();

        assert!(contains(fence, utils::latlng_to_coord(0.5, 0.5)));
        // Interior of the union, on the shared lng = 1 edge
        assert_eq!(classify(fence, utils::latlng_to_coord(0.5, 1.0)), CoordPos::OnBoundary);
        // Shared vertex
        assert!(contains(fence, utils::latlng_to_coord(1.0, 1.0)));

        let result =
            filter_and_order(&store, &[0], utils::latlng_to_coord(0.5, 1.0), false).unwrap();
        assert_eq!(ids(&result), vec!["split"]);
    }

    #[test]
    fn test_parts_touching_at_a_corner() {
        let diagonal = StoredFence::new("diagonal")
            .with_polygon(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)], &[])
            .with_polygon(&[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0)], &[]);
        let store = store(vec![diagonal]);
        let fence = store.get(0).unwrap();

        assert!(contains(fence, utils::latlng_to_coord(1.0, 1.0)));
        assert!(!contains(fence, utils::latlng_to_coord(0.5, 1.5)));
    }

    #[test]
    fn test_island_filling_a_hole() {
        let lake_island = StoredFence::new("lake_island")
            .with_polygon(
                &[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)],
                &[&[(4.0, 4.0), (4.0, 6.0), (6.0, 6.0), (6.0, 4.0)]],
            )
            .with_polygon(&[(4.0, 4.0), (4.0, 6.0), (6.0, 6.0), (6.0, 4.0)], &[]);
        let store = store(vec![lake_island]);
        let fence = store.get(0).unwrap();

        assert_eq!(classify(fence, utils::latlng_to_coord(5.0, 5.0)), CoordPos::Inside);
        assert!(contains(fence, utils::latlng_to_coord(4.0, 5.0)));
        assert!(contains(fence, utils::latlng_to_coord(6.0, 6.0)));
    }

    #[test]
    fn test_nested_fences_smallest_first() {
        let store = store(vec![
            square("country", (0.0, 0.0), (20.0, 20.0)),
            square("city", (4.0, 4.0), (6.0, 6.0)),
            square("state", (2.0, 2.0), (10.0, 10.0)),
        ]);

        let result =
            filter_and_order(&store, &[0, 1, 2], utils::latlng_to_coord(5.0, 5.0), false).unwrap();
        assert_eq!(ids(&result), vec!["city", "state", "country"]);

        let result =
            filter_and_order(&store, &[0, 1, 2], utils::latlng_to_coord(8.0, 8.0), false).unwrap();
        assert_eq!(ids(&result), vec!["state", "country"]);
    }

    #[test]
    fn test_equal_rank_uses_storage_order() {
        let store = store(vec![
            square("first", (0.0, 0.0), (2.0, 2.0)),
            square("second", (1.0, 1.0), (3.0, 3.0)),
        ]);

        let result =
            filter_and_order(&store, &[1, 0], utils::latlng_to_coord(1.5, 1.5), false).unwrap();
        assert_eq!(ids(&result), vec!["first", "second"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let store = store(vec![square("a", (0.0, 0.0), (1.0, 1.0))]);
        let result =
            filter_and_order(&store, &[0], utils::latlng_to_coord(50.0, 50.0), true).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_candidate_is_an_error() {
        let store = store(vec![square("a", (0.0, 0.0), (1.0, 1.0))]);
        let err =
            filter_and_order(&store, &[3], utils::latlng_to_coord(0.5, 0.5), false).unwrap_err();
        assert!(matches!(err, FenceError::IndexInconsistency { .. }));
    }
}

//! 3×3 grid construction and per-cell hazard counting.

use geo::Polygon;

use super::{CellLabel, ClusterHistogram};
use crate::error::MeasurementError;
use crate::geometry::Extent;
use crate::spatial::SpatialQuery;

/// Split `extent` into nine equal cells in `CellLabel::ALL` order.
///
/// Edge coordinates are computed as `min + span · i / 3` so the outer edges
/// coincide exactly with the extent and neighbouring cells share edges.
pub fn grid_cells(extent: &Extent) -> [Polygon<f64>; 9] {
    let xs = edges(extent.xmin, extent.xmax);
    let ys = edges(extent.ymin, extent.ymax);
    std::array::from_fn(|i| {
        let (row, col) = (i / 3, i % 3);
        Extent::new(xs[col], ys[row], xs[col + 1], ys[row + 1])
            .to_rect()
            .to_polygon()
    })
}

fn edges(min: f64, max: f64) -> [f64; 4] {
    let span = max - min;
    [min, min + span / 3.0, min + span * 2.0 / 3.0, max]
}

/// Count hazards per grid cell of `area`.
///
/// A hazard counts towards a cell when it lies strictly within both `area`
/// and the cell. Layers are queried independently and their counts summed,
/// so a hazard present in two layers is counted twice. A hazard lying
/// exactly on a shared cell edge is counted in neither cell.
///
/// Degenerate extents (zero width or height) yield an all-zero histogram
/// without querying the layers.
pub fn cluster_histogram(
    area: &Polygon<f64>,
    hazard_layers: &[&dyn SpatialQuery],
) -> Result<ClusterHistogram, MeasurementError> {
    let mut histogram = ClusterHistogram::default();
    let extent = match geo::BoundingRect::bounding_rect(area) {
        Some(rect) => Extent::from(rect),
        None => return Ok(histogram),
    };
    if extent.is_degenerate() {
        tracing::debug!(?extent, "degenerate extent, histogram left empty");
        return Ok(histogram);
    }

    let cells = grid_cells(&extent);
    for (label, cell) in CellLabel::ALL.into_iter().zip(cells.iter()) {
        let mut in_cell = 0u64;
        for layer in hazard_layers {
            in_cell += layer.count_within(&[area, cell])?;
        }
        tracing::trace!(cell = %label, count = in_cell, "cell counted");
        histogram[label] = in_cell;
    }
    Ok(histogram)
}

/// Hazards within `area`, summed over all layers.
pub fn hazard_total(
    area: &Polygon<f64>,
    hazard_layers: &[&dyn SpatialQuery],
) -> Result<u64, MeasurementError> {
    let mut total = 0u64;
    for layer in hazard_layers {
        total += layer.count_within(&[area])?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FeatureGeometry;
    use crate::layer::{Feature, FeatureLayer};
    use approx::assert_relative_eq;
    use geo::{point, polygon, BoundingRect};

    fn area() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 90.0, y: 0.0), (x: 90.0, y: 30.0), (x: 0.0, y: 30.0)]
    }

    fn hazards(points: &[(f64, f64)]) -> FeatureLayer {
        let mut l = FeatureLayer::new("hazards");
        for (i, &(x, y)) in points.iter().enumerate() {
            l.push(Feature::new(i as i64, FeatureGeometry::Point(point!(x: x, y: y))));
        }
        l
    }

    #[test]
    fn cells_tile_the_extent_bottom_row_first() {
        let cells = grid_cells(&Extent::new(0.0, 0.0, 90.0, 30.0));
        let sw = cells[0].bounding_rect().unwrap();
        assert_relative_eq!(sw.min().x, 0.0);
        assert_relative_eq!(sw.max().x, 30.0);
        assert_relative_eq!(sw.max().y, 10.0);
        let se = cells[2].bounding_rect().unwrap();
        assert_relative_eq!(se.min().x, 60.0);
        assert_relative_eq!(se.min().y, 0.0);
        let ne = cells[8].bounding_rect().unwrap();
        assert_relative_eq!(ne.max().x, 90.0);
        assert_relative_eq!(ne.max().y, 30.0);
        assert_relative_eq!(ne.min().y, 20.0);
    }

    #[test]
    fn no_hazards_gives_empty_histogram() {
        let layer = hazards(&[(200.0, 200.0)]);
        let h = cluster_histogram(&area(), &[&layer]).unwrap();
        assert!(h.is_empty());
    }

    #[test]
    fn counts_land_in_their_cells() {
        let layer = hazards(&[(5.0, 5.0), (6.0, 6.0), (45.0, 15.0), (85.0, 25.0), (150.0, 15.0)]);
        let h = cluster_histogram(&area(), &[&layer]).unwrap();
        assert_eq!(h[CellLabel::SouthWest], 2);
        assert_eq!(h[CellLabel::Center], 1);
        assert_eq!(h[CellLabel::NorthEast], 1);
        assert_eq!(h.total(), 4);
        assert_eq!(hazard_total(&area(), &[&layer]).unwrap(), 4);
    }

    #[test]
    fn layers_are_summed_without_deduplication() {
        let a = hazards(&[(45.0, 15.0)]);
        let b = hazards(&[(45.0, 15.0)]);
        let h = cluster_histogram(&area(), &[&a, &b]).unwrap();
        assert_eq!(h[CellLabel::Center], 2);
    }

    #[test]
    fn hazard_on_cell_edge_is_not_attributed() {
        let layer = hazards(&[(30.0, 5.0), (45.0, 15.0)]);
        let h = cluster_histogram(&area(), &[&layer]).unwrap();
        assert_eq!(h.total(), 1);
        assert_eq!(hazard_total(&area(), &[&layer]).unwrap(), 2);
    }

    #[test]
    fn hazards_outside_the_area_but_inside_the_extent_are_ignored() {
        // Right triangle: the upper-left half of the extent is outside it.
        let triangle = polygon![(x: 0.0, y: 0.0), (x: 90.0, y: 0.0), (x: 90.0, y: 90.0)];
        let layer = hazards(&[(10.0, 80.0), (80.0, 10.0)]);
        let h = cluster_histogram(&triangle, &[&layer]).unwrap();
        assert_eq!(h[CellLabel::NorthWest], 0);
        assert_eq!(h[CellLabel::SouthEast], 1);
    }

    #[test]
    fn degenerate_extent_skips_counting() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 20.0, y: 0.0)];
        let layer = hazards(&[(5.0, 0.0)]);
        assert!(cluster_histogram(&sliver, &[&layer]).unwrap().is_empty());
    }
}

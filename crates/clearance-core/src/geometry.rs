//! Feature geometry: a tagged point/polygon variant with capability queries.
//!
//! Distances are Euclidean in the layer's coordinate units, so proximity
//! buffers assume a projected, metric spatial reference.

use geo::{coord, BoundingRect, Centroid, Contains, Distance, Euclidean, InteriorPoint, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
}

/// Axis-aligned bounding box of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// True when the box has no area.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(coord! { x: self.xmin, y: self.ymin }, coord! { x: self.xmax, y: self.ymax })
    }
}

impl From<Rect<f64>> for Extent {
    fn from(r: Rect<f64>) -> Self {
        Extent::new(r.min().x, r.min().y, r.max().x, r.max().y)
    }
}

impl FeatureGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureGeometry::Point(_) => "point",
            FeatureGeometry::Polygon(_) => "polygon",
        }
    }

    /// Only polygons span an area that can be gridded.
    pub fn has_extent(&self) -> bool {
        matches!(self, FeatureGeometry::Polygon(_))
    }

    pub fn has_centroid(&self) -> bool {
        self.centroid().is_some()
    }

    pub fn as_polygon(&self) -> Option<&Polygon<f64>> {
        match self {
            FeatureGeometry::Polygon(p) => Some(p),
            FeatureGeometry::Point(_) => None,
        }
    }

    /// Bounding box; `None` for points and empty polygons.
    pub fn extent(&self) -> Option<Extent> {
        match self {
            FeatureGeometry::Polygon(p) => p.bounding_rect().map(Extent::from),
            FeatureGeometry::Point(_) => None,
        }
    }

    pub fn centroid(&self) -> Option<Point<f64>> {
        match self {
            FeatureGeometry::Point(p) => Some(*p),
            FeatureGeometry::Polygon(p) => p.centroid(),
        }
    }

    /// Point used for raster sampling: the point itself, or a point
    /// guaranteed to lie inside the polygon. A concave polygon's centroid
    /// can fall outside it.
    pub fn representative_point(&self) -> Option<Point<f64>> {
        match self {
            FeatureGeometry::Point(p) => Some(*p),
            FeatureGeometry::Polygon(p) => p.interior_point(),
        }
    }

    /// Strictly inside `area`; a feature touching the boundary is not within.
    pub fn is_within(&self, area: &Polygon<f64>) -> bool {
        match self {
            FeatureGeometry::Point(p) => area.contains(p),
            FeatureGeometry::Polygon(p) => area.contains(p),
        }
    }

    pub fn distance_to(&self, other: &FeatureGeometry) -> f64 {
        use FeatureGeometry::{Point as Pt, Polygon as Pg};
        match (self, other) {
            (Pt(a), Pt(b)) => Euclidean.distance(a, b),
            (Pt(a), Pg(b)) | (Pg(b), Pt(a)) => Euclidean.distance(a, b),
            (Pg(a), Pg(b)) => Euclidean.distance(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{point, polygon, Intersects};

    fn square() -> FeatureGeometry {
        FeatureGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 30.0, y: 0.0),
            (x: 30.0, y: 30.0),
            (x: 0.0, y: 30.0),
        ])
    }

    #[test]
    fn polygon_capabilities() {
        let g = square();
        assert!(g.has_extent());
        assert!(g.has_centroid());
        let e = g.extent().unwrap();
        assert_relative_eq!(e.xmin, 0.0);
        assert_relative_eq!(e.xmax, 30.0);
        assert_relative_eq!(e.height(), 30.0);
        let c = g.centroid().unwrap();
        assert_relative_eq!(c.x(), 15.0);
        assert_relative_eq!(c.y(), 15.0);
    }

    #[test]
    fn point_has_centroid_but_no_extent() {
        let g = FeatureGeometry::Point(point!(x: 3.0, y: 4.0));
        assert!(!g.has_extent());
        assert!(g.extent().is_none());
        assert_eq!(g.centroid(), Some(point!(x: 3.0, y: 4.0)));
    }

    #[test]
    fn representative_point_lies_inside_concave_polygon() {
        // C shape opening east; the centroid falls in the notch.
        let c = polygon![
            (x: 0.0, y: 0.0), (x: 90.0, y: 0.0), (x: 90.0, y: 30.0), (x: 30.0, y: 30.0),
            (x: 30.0, y: 60.0), (x: 90.0, y: 60.0), (x: 90.0, y: 90.0), (x: 0.0, y: 90.0),
        ];
        let g = FeatureGeometry::Polygon(c.clone());
        let centroid = g.centroid().unwrap();
        assert!(!c.contains(&centroid));
        let inside = g.representative_point().unwrap();
        assert!(c.intersects(&inside));
    }

    #[test]
    fn boundary_point_is_not_within() {
        let area = square();
        let area = area.as_polygon().unwrap();
        assert!(FeatureGeometry::Point(point!(x: 1.0, y: 1.0)).is_within(area));
        assert!(!FeatureGeometry::Point(point!(x: 0.0, y: 10.0)).is_within(area));
        assert!(!FeatureGeometry::Point(point!(x: 40.0, y: 10.0)).is_within(area));
    }

    #[test]
    fn distance_to_polygon_is_zero_inside() {
        let area = square();
        let inside = FeatureGeometry::Point(point!(x: 5.0, y: 5.0));
        let outside = FeatureGeometry::Point(point!(x: 33.0, y: 34.0));
        assert_relative_eq!(inside.distance_to(&area), 0.0);
        assert_relative_eq!(outside.distance_to(&area), 5.0);
        assert_relative_eq!(area.distance_to(&outside), 5.0);
    }
}

//! Polygon geometry helpers shared by the pool, the engine, and the
//! perimeter reconstruction.
//!
//! All functions operate on boundary polygons given as ordered point
//! slices (closed implicitly, no first==last duplicate) and degrade to
//! neutral defaults on degenerate input — fewer points than required,
//! zero-length edges, zero vectors — instead of panicking or returning
//! errors.

use glam::Vec2;

/// A point sampled on a polygon boundary together with the direction of
/// the edge it lies on. Ephemeral: only used while building frontiers.
#[derive(Clone, Copy, Debug)]
pub struct PerimeterSample {
    pub pos: Vec2,
    pub tangent: Vec2,
}

/// Signed area via the shoelace formula. Positive for counter-clockwise
/// winding. Returns `0.0` for fewer than 3 points.
pub fn signed_area(points: &[Vec2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area2 = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area2 += a.x * b.y - b.x * a.y;
    }
    area2 * 0.5
}

/// Vertex average of the polygon. Returns `Vec2::ZERO` for an empty slice.
pub fn centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

/// Total boundary length, wrapping from the last vertex back to the first.
/// Returns `0.0` for fewer than 2 points.
pub fn perimeter(points: &[Vec2]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        total += (b - a).length();
    }
    total
}

/// Samples the boundary at the given arclength from vertex 0, walking
/// edges and interpolating linearly within the edge that contains the
/// target. The tangent is the containing edge's direction.
///
/// Zero-length edges are skipped. If the target lies at or beyond the
/// full perimeter (or the polygon is degenerate) the first vertex is
/// returned with whatever tangent was seen last.
pub fn sample_at_arclength(points: &[Vec2], target: f32) -> PerimeterSample {
    if points.is_empty() {
        return PerimeterSample {
            pos: Vec2::ZERO,
            tangent: Vec2::ZERO,
        };
    }

    let mut walked = 0.0;
    let mut tangent = Vec2::ZERO;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let edge = b - a;
        let len = edge.length();
        if len <= f32::EPSILON {
            continue;
        }
        tangent = edge / len;
        if target <= walked + len {
            let t = ((target - walked) / len).clamp(0.0, 1.0);
            return PerimeterSample {
                pos: a + edge * t,
                tangent,
            };
        }
        walked += len;
    }

    PerimeterSample {
        pos: points[0],
        tangent,
    }
}

/// Picks the unit perpendicular of `tangent` that points away from
/// `center` as seen from `at`: the one with the larger dot product
/// against `at - center`. Returns `Vec2::ZERO` for a zero tangent.
pub fn outward_perpendicular(tangent: Vec2, at: Vec2, center: Vec2) -> Vec2 {
    let t = tangent.normalize_or_zero();
    if t == Vec2::ZERO {
        return Vec2::ZERO;
    }
    let perp = t.perp();
    let radial = at - center;
    if perp.dot(radial) >= (-perp).dot(radial) {
        perp
    } else {
        -perp
    }
}

/// Even–odd ray-casting containment test. Returns `false` for polygons
/// with fewer than 3 points.
pub fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[j];
        if (a.y > p.y) != (b.y > p.y) {
            let t = (p.y - a.y) / (b.y - a.y);
            if p.x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closest point on segment `ab` to `p`, clamped to the segment.
/// A zero-length segment yields `a`.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Minimum distance from `p` to any boundary edge. Returns `f32::MAX`
/// for fewer than 2 points so degenerate boundaries never constrain.
pub fn distance_to_polygon(p: Vec2, points: &[Vec2]) -> f32 {
    if points.len() < 2 {
        return f32::MAX;
    }
    let mut best = f32::MAX;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let q = closest_point_on_segment(p, a, b);
        best = best.min((p - q).length());
    }
    best
}

fn cross(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ab = b - a;
    let ac = c - a;
    ab.x * ac.y - ab.y * ac.x
}

/// Andrew's monotone chain convex hull, counter-clockwise.
///
/// Points are sorted by x then y and near-duplicates merged; chain
/// candidates that do not make a strictly counter-clockwise turn are
/// discarded, so collinear interior points are dropped. Inputs with
/// fewer than 3 distinct points are returned as-is.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| (*a - *b).length_squared() < 1e-12);
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Vec2> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Vec2> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square(side: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ]
    }

    #[test]
    fn signed_area_is_positive_for_ccw_and_zero_when_degenerate() {
        assert_eq!(signed_area(&square(2.0)), 4.0);
        let cw: Vec<Vec2> = square(2.0).into_iter().rev().collect();
        assert_eq!(signed_area(&cw), -4.0);
        assert_eq!(signed_area(&[]), 0.0);
        assert_eq!(signed_area(&[Vec2::ZERO, Vec2::X]), 0.0);
    }

    #[test]
    fn centroid_of_square_is_its_center() {
        assert_eq!(centroid(&square(60.0)), Vec2::new(30.0, 30.0));
        assert_eq!(centroid(&[]), Vec2::ZERO);
    }

    #[test]
    fn perimeter_wraps_around() {
        assert_eq!(perimeter(&square(60.0)), 240.0);
        assert_eq!(perimeter(&[Vec2::ZERO]), 0.0);
    }

    #[test]
    fn sample_at_arclength_walks_edges() {
        let poly = square(60.0);

        let s = sample_at_arclength(&poly, 20.0);
        assert_eq!(s.pos, Vec2::new(20.0, 0.0));
        assert_eq!(s.tangent, Vec2::new(1.0, 0.0));

        // 80 lands 20 into the second edge.
        let s = sample_at_arclength(&poly, 80.0);
        assert_eq!(s.pos, Vec2::new(60.0, 20.0));
        assert_eq!(s.tangent, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn sample_at_arclength_skips_zero_length_edges() {
        let poly = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0), // duplicated vertex
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let s = sample_at_arclength(&poly, 5.0);
        assert_eq!(s.pos, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn outward_perpendicular_points_away_from_center() {
        let center = Vec2::new(30.0, 30.0);
        // Bottom edge of a square, tangent pointing +x: outward is -y.
        let d = outward_perpendicular(Vec2::X, Vec2::new(30.0, 0.0), center);
        assert_eq!(d, Vec2::new(0.0, -1.0));
        // Degenerate tangent.
        assert_eq!(outward_perpendicular(Vec2::ZERO, Vec2::ZERO, center), Vec2::ZERO);
    }

    #[test]
    fn point_in_polygon_basic_cases() {
        let poly = square(10.0);
        assert!(point_in_polygon(Vec2::new(5.0, 5.0), &poly));
        assert!(!point_in_polygon(Vec2::new(15.0, 5.0), &poly));
        assert!(!point_in_polygon(Vec2::new(5.0, -1.0), &poly));
        assert!(!point_in_polygon(Vec2::ZERO, &[Vec2::ZERO, Vec2::X]));
    }

    #[test]
    fn closest_point_on_segment_clamps_and_handles_degenerate() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(closest_point_on_segment(Vec2::new(5.0, 3.0), a, b), Vec2::new(5.0, 0.0));
        assert_eq!(closest_point_on_segment(Vec2::new(-4.0, 3.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec2::new(14.0, -3.0), a, b), b);
        assert_eq!(closest_point_on_segment(Vec2::new(1.0, 1.0), a, a), a);
    }

    #[test]
    fn distance_to_polygon_measures_nearest_edge() {
        let poly = square(10.0);
        assert_eq!(distance_to_polygon(Vec2::new(5.0, -3.0), &poly), 3.0);
        assert_eq!(distance_to_polygon(Vec2::new(5.0, 5.0), &poly), 5.0);
        assert_eq!(distance_to_polygon(Vec2::ZERO, &[Vec2::X]), f32::MAX);
    }

    #[test]
    fn convex_hull_of_square_with_interior_points_is_the_square() {
        let mut pts = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            // interior points
            Vec2::new(0.5, 0.5),
            Vec2::new(0.25, 0.75),
            Vec2::new(0.6, 0.2),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4, "hull should be exactly the 4 corners");
        assert!(signed_area(&hull) > 0.0, "hull should wind counter-clockwise");
        for corner in &pts[..4] {
            assert!(hull.contains(corner), "missing corner {corner:?}");
        }

        // Order of input must not matter.
        pts.reverse();
        assert_eq!(convex_hull(&pts).len(), 4);
    }

    proptest! {
        #[test]
        fn convex_hull_contains_all_input_points(
            raw in prop::collection::vec((-100.0f32..100.0, -100.0f32..100.0), 3..40)
        ) {
            let pts: Vec<Vec2> = raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
            let hull = convex_hull(&pts);
            prop_assume!(hull.len() >= 3);

            // Every input point lies on or left of every CCW hull edge.
            for &p in &pts {
                for i in 0..hull.len() {
                    let a = hull[i];
                    let b = hull[(i + 1) % hull.len()];
                    prop_assert!(
                        cross(a, b, p) >= -1e-2,
                        "point {:?} outside hull edge {:?} -> {:?}",
                        p, a, b
                    );
                }
            }
        }
    }
}

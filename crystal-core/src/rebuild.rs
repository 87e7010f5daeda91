//! Perimeter reconstruction: solidifies a finished lattice into a new
//! boundary polygon.
//!
//! The primary algorithm is a radial envelope: the angular range around
//! the previous centroid is split into sectors and only the farthest
//! sample per sector survives. This is deliberately *not* a convex
//! hull — concavities that fall between sector samples are flattened,
//! trading fidelity for a bounded vertex count, and downstream
//! consumers rely on that flattening. The true hull is only the
//! fallback when the envelope degenerates below 3 points.
//!
//! Pipeline: envelope → collinear simplification → minimum spacing →
//! vertex cap → push outside the previous boundary → non-shrink guard.

use crate::config::RebuildConfig;
use crate::geometry;
use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Builds a new boundary polygon from the previous boundary, the frozen
/// lattice positions, and the targets of still-open frontier slots.
///
/// The result contains the lattice, never shrinks below ~99.5% of the
/// previous area, stays clear of the previous boundary, and respects
/// the configured vertex cap. A degenerate previous boundary (fewer
/// than 3 points) is returned unchanged.
pub fn rebuild_boundary(
    prev: &[Vec2],
    lattice: &[Vec2],
    open_slot_targets: &[Vec2],
    spacing: f32,
    cfg: &RebuildConfig,
) -> Vec<Vec2> {
    if prev.len() < 3 {
        return prev.to_vec();
    }
    let center = geometry::centroid(prev);

    let mut points = radial_envelope(prev, lattice, open_slot_targets, center, cfg);
    if points.len() < 3 {
        points = hull_fallback(lattice, spacing, cfg);
        if points.len() < 3 {
            return prev.to_vec();
        }
    } else {
        simplify_collinear(&mut points, cfg.collinear_dot, cfg.collinear_deviation);
        points = enforce_min_spacing(points, cfg.min_point_spacing);
        reduce_vertices(&mut points, cfg.max_vertices);
    }

    push_outside(&mut points, prev, center, cfg);
    apply_area_guard(&mut points, prev, cfg);
    points
}

/// Per-sector radial maximum around `center`.
///
/// Previous-boundary vertices are biased outward by a constant, lattice
/// particles enter unbiased, and open-slot targets get a partial bias.
/// Each non-empty sector emits one point at its maximum radius.
fn radial_envelope(
    prev: &[Vec2],
    lattice: &[Vec2],
    open_slot_targets: &[Vec2],
    center: Vec2,
    cfg: &RebuildConfig,
) -> Vec<Vec2> {
    let sectors = (cfg.max_vertices.max(prev.len()) * 2).clamp(cfg.min_sectors, cfg.max_sectors);

    let mut best_r = vec![0.0f32; sectors];
    let mut best_dir = vec![Vec2::ZERO; sectors];

    let samples = prev
        .iter()
        .map(|&p| (p, cfg.outward_bias))
        .chain(lattice.iter().map(|&p| (p, 0.0)))
        .chain(
            open_slot_targets
                .iter()
                .map(|&p| (p, cfg.outward_bias * cfg.slot_bias_factor)),
        );

    for (p, bias) in samples {
        let radial = p - center;
        let r = radial.length();
        if r <= f32::EPSILON {
            continue;
        }
        let dir = radial / r;
        let sector = sector_index(dir, sectors);
        let biased = r + bias;
        if biased > best_r[sector] {
            best_r[sector] = biased;
            best_dir[sector] = dir;
        }
    }

    (0..sectors)
        .filter(|&s| best_r[s] > 0.0)
        .map(|s| center + best_dir[s] * best_r[s])
        .collect()
}

fn sector_index(dir: Vec2, sectors: usize) -> usize {
    let angle = dir.y.atan2(dir.x); // [-PI, PI]
    let t = (angle + PI) / TAU;
    ((t * sectors as f32) as usize).min(sectors - 1)
}

/// Deduplicate-and-hull fallback for starved episodes: merges lattice
/// positions closer than a fraction of the spacing, then takes their
/// monotone-chain convex hull.
fn hull_fallback(lattice: &[Vec2], spacing: f32, cfg: &RebuildConfig) -> Vec<Vec2> {
    let merge2 = (spacing * cfg.hull_merge_frac).powi(2);
    let mut merged: Vec<Vec2> = Vec::with_capacity(lattice.len());
    for &p in lattice {
        if !merged.iter().any(|&q| (q - p).length_squared() < merge2) {
            merged.push(p);
        }
    }
    geometry::convex_hull(&merged)
}

/// Drops points whose neighbor edges are near-parallel and whose
/// perpendicular deviation from the line through the neighbors is
/// small, until no point qualifies or only 3 remain.
fn simplify_collinear(points: &mut Vec<Vec2>, dot_threshold: f32, max_deviation: f32) {
    'outer: while points.len() > 3 {
        let n = points.len();
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];

            let e1 = (curr - prev).normalize_or_zero();
            let e2 = (next - curr).normalize_or_zero();
            if e1.dot(e2) <= dot_threshold {
                continue;
            }
            if deviation_from_line(curr, prev, next) >= max_deviation {
                continue;
            }
            points.remove(i);
            continue 'outer;
        }
        break;
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
/// Coincident endpoints yield the distance to `a`.
fn deviation_from_line(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len = ab.length();
    if len <= f32::EPSILON {
        return (p - a).length();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

/// Greedy pass keeping only points at least `min_dist` from the last
/// kept point; the final point is dropped if it would close the loop
/// too near the first.
fn enforce_min_spacing(points: Vec<Vec2>, min_dist: f32) -> Vec<Vec2> {
    if points.len() <= 3 {
        return points;
    }
    let mut kept: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        match kept.last() {
            Some(&last) if (p - last).length() < min_dist => {}
            _ => kept.push(p),
        }
    }
    if kept.len() > 3 {
        let first = kept[0];
        if let Some(&last) = kept.last()
            && (last - first).length() < min_dist
        {
            kept.pop();
        }
    }
    kept
}

/// Cheapest-corner elimination: while above the cap, deletes the point
/// forming the smallest-area triangle with its neighbors. Never drops
/// below 3 vertices.
fn reduce_vertices(points: &mut Vec<Vec2>, max_vertices: usize) {
    while points.len() > max_vertices.max(3) {
        let n = points.len();
        let mut cheapest = 0;
        let mut cheapest_area = f32::MAX;
        for i in 0..n {
            let a = points[(i + n - 1) % n];
            let b = points[i];
            let c = points[(i + 1) % n];
            let area = ((b - a).x * (c - a).y - (b - a).y * (c - a).x).abs() * 0.5;
            if area < cheapest_area {
                cheapest_area = area;
                cheapest = i;
            }
        }
        points.remove(cheapest);
    }
}

/// Steps each point outward along its centroid ray until it is outside
/// the previous boundary with at least the configured clearance, within
/// a bounded step budget.
fn push_outside(points: &mut [Vec2], prev: &[Vec2], center: Vec2, cfg: &RebuildConfig) {
    for p in points.iter_mut() {
        let dir = (*p - center).normalize_or_zero();
        if dir == Vec2::ZERO {
            continue;
        }
        let mut steps = 0;
        while steps < cfg.max_push_steps
            && (geometry::point_in_polygon(*p, prev)
                || geometry::distance_to_polygon(*p, prev) < cfg.min_clearance)
        {
            *p += dir * cfg.push_step;
            steps += 1;
        }
    }
}

/// Uniformly rescales the candidate about its own centroid whenever its
/// absolute area falls below the configured fraction of the previous
/// boundary's, guaranteeing the crystal never shrinks.
fn apply_area_guard(points: &mut [Vec2], prev: &[Vec2], cfg: &RebuildConfig) {
    let prev_area = geometry::signed_area(prev).abs();
    let cand_area = geometry::signed_area(points).abs();
    if cand_area <= f32::EPSILON || cand_area >= prev_area * cfg.area_guard_ratio {
        return;
    }
    let scale = (prev_area / cand_area).sqrt() * cfg.area_guard_scale;
    let center = geometry::centroid(points);
    for p in points.iter_mut() {
        *p = center + (*p - center) * scale;
    }
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

    /// Lattice ring at the given radius around the square's center.
    fn lattice_ring(center: Vec2, radius: f32, count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|i| {
                let a = i as f32 / count as f32 * TAU;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect()
    }

    #[test]
    fn rebuild_contains_the_lattice_growth() {
        let prev = square(60.0);
        let center = Vec2::new(30.0, 30.0);
        let lattice = lattice_ring(center, 60.0, 16);

        let out = rebuild_boundary(&prev, &lattice, &[], 20.0, &RebuildConfig::default());

        assert!(out.len() >= 3);
        // The envelope must reach at least as far as the lattice ring.
        let max_r = out
            .iter()
            .map(|p| (*p - center).length())
            .fold(0.0f32, f32::max);
        assert!(max_r >= 60.0 - 1e-3, "envelope radius {max_r} too small");
    }

    #[test]
    fn rebuild_never_shrinks_area() {
        let prev = square(60.0);
        // Lattice hugging the boundary: raw envelope area would be close
        // to (or below) the previous area, forcing the guard to act.
        let lattice = lattice_ring(Vec2::new(30.0, 30.0), 25.0, 12);

        let out = rebuild_boundary(&prev, &lattice, &[], 20.0, &RebuildConfig::default());

        let prev_area = geometry::signed_area(&prev).abs();
        let out_area = geometry::signed_area(&out).abs();
        assert!(
            out_area >= prev_area * 0.995,
            "area shrank: {out_area} vs {prev_area}"
        );
    }

    #[test]
    fn rebuild_output_stays_clear_of_the_previous_boundary() {
        let prev = square(60.0);
        let cfg = RebuildConfig::default();
        let lattice = lattice_ring(Vec2::new(30.0, 30.0), 70.0, 24);

        let out = rebuild_boundary(&prev, &lattice, &[], 20.0, &cfg);

        for p in &out {
            assert!(
                !geometry::point_in_polygon(*p, &prev),
                "vertex {p:?} inside previous boundary"
            );
            assert!(
                geometry::distance_to_polygon(*p, &prev) >= cfg.min_clearance - 1e-3,
                "vertex {p:?} too close to previous boundary"
            );
        }
    }

    #[test]
    fn rebuild_respects_the_vertex_cap() {
        let prev = square(60.0);
        let cfg = RebuildConfig {
            max_vertices: 8,
            ..RebuildConfig::default()
        };
        let lattice = lattice_ring(Vec2::new(30.0, 30.0), 80.0, 64);

        let out = rebuild_boundary(&prev, &lattice, &[], 20.0, &cfg);
        assert!(out.len() <= 8, "got {} vertices", out.len());
        assert!(out.len() >= 3);
    }

    #[test]
    fn degenerate_previous_boundary_is_returned_unchanged() {
        let prev = vec![Vec2::ZERO, Vec2::new(1.0, 0.0)];
        let out = rebuild_boundary(&prev, &[], &[], 20.0, &RebuildConfig::default());
        assert_eq!(out, prev);
    }

    #[test]
    fn simplify_collinear_drops_midpoints_of_straight_runs() {
        let mut points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0), // collinear on the bottom edge
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        simplify_collinear(&mut points, 0.995, 0.75);
        assert_eq!(points.len(), 4);
        assert!(!points.contains(&Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn simplify_collinear_keeps_genuine_corners() {
        let mut points = square(10.0);
        simplify_collinear(&mut points, 0.995, 0.75);
        assert_eq!(points, square(10.0));
    }

    #[test]
    fn enforce_min_spacing_drops_crowded_points_and_the_closing_point() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0), // too close to the first
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 1.0), // closes too near the first
        ];
        let kept = enforce_min_spacing(points, 6.0);
        assert_eq!(
            kept,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 0.0),
                Vec2::new(10.0, 10.0),
                Vec2::new(0.0, 10.0),
            ]
        );
    }

    #[test]
    fn reduce_vertices_removes_cheapest_corners_first() {
        // An octagon with one nearly-flat corner: that corner goes first.
        let mut points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.05), // nearly flat
            Vec2::new(10.0, 0.0),
            Vec2::new(14.0, 5.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(5.0, 12.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(-4.0, 5.0),
        ];
        reduce_vertices(&mut points, 7);
        assert_eq!(points.len(), 7);
        assert!(!points.contains(&Vec2::new(5.0, 0.05)));

        // Never reduces below 3.
        reduce_vertices(&mut points, 0);
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn hull_fallback_merges_duplicates_before_hulling() {
        let lattice = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.2), // merges with the first at spacing 20
            Vec2::new(40.0, 0.0),
            Vec2::new(40.0, 40.0),
            Vec2::new(0.0, 40.0),
            Vec2::new(20.0, 20.0), // interior
        ];
        let hull = hull_fallback(&lattice, 20.0, &RebuildConfig::default());
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn area_guard_rescales_small_candidates() {
        let prev = square(60.0); // area 3600
        let mut cand = square(30.0); // area 900
        apply_area_guard(&mut cand, &prev, &RebuildConfig::default());

        let area = geometry::signed_area(&cand).abs();
        assert!(
            area >= 3600.0 * 0.995,
            "guard failed to restore area, got {area}"
        );
    }

    #[test]
    fn area_guard_leaves_large_candidates_alone() {
        let prev = square(60.0);
        let mut cand = square(80.0);
        let before = cand.clone();
        apply_area_guard(&mut cand, &prev, &RebuildConfig::default());
        assert_eq!(cand, before);
    }

    proptest! {
        #[test]
        fn rebuild_area_never_drops_below_the_guard_ratio(
            radius in 5.0f32..120.0,
            count in 4usize..32,
        ) {
            let prev = square(60.0);
            let lattice = lattice_ring(Vec2::new(30.0, 30.0), radius, count);
            let out = rebuild_boundary(&prev, &lattice, &[], 20.0, &RebuildConfig::default());

            prop_assume!(out.len() >= 3);
            let prev_area = geometry::signed_area(&prev).abs();
            let out_area = geometry::signed_area(&out).abs();
            prop_assert!(out_area >= prev_area * 0.995 * (1.0 - 1e-4));
        }
    }
}

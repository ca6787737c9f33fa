// src/analytics/geometry.rs
//
// Pure 2D geometry for zone evaluation. No state, no allocation on the
// hot path.

/// Midpoint of a bbox's bottom edge. Approximates a standing person's foot
/// position; used as the zone-containment reference point instead of the
/// box center.
pub fn bottom_center(bbox: &[f64; 4]) -> [f64; 2] {
    [(bbox[0] + bbox[2]) * 0.5, bbox[3]]
}

/// Ray-casting / even-odd containment test. A horizontal ray is cast from
/// `p`; an odd number of edge crossings means inside. Degenerate polygons
/// (fewer than 3 vertices) are never "inside".
pub fn point_in_polygon(p: [f64; 2], polygon: &[[f64; 2]]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i][0], polygon[i][1]);
        let (xj, yj) = (polygon[j][0], polygon[j][1]);

        let crosses = (yi > p[1]) != (yj > p[1]);
        if crosses && p[0] < (xj - xi) * (p[1] - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the segment `a`..`b`: perpendicular distance to the
/// segment, with the projection parameter clamped to [0, 1] so points past
/// either endpoint measure to that endpoint.
pub fn point_to_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;

    // Zero-length edge collapses to a point
    if len_sq <= f64::EPSILON {
        return ((p[0] - a[0]).powi(2) + (p[1] - a[1]).powi(2)).sqrt();
    }

    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (a[0] + t * dx, a[1] + t * dy);
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}

/// Distance from `p` to the polygon boundary: 0 if `p` is inside, otherwise
/// the minimum point-to-segment distance over all edges.
pub fn point_to_polygon_distance(p: [f64; 2], polygon: &[[f64; 2]]) -> f64 {
    if point_in_polygon(p, polygon) {
        return 0.0;
    }

    let mut min_dist = f64::INFINITY;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let d = point_to_segment_distance(p, polygon[j], polygon[i]);
        if d < min_dist {
            min_dist = d;
        }
        j = i;
    }
    min_dist
}

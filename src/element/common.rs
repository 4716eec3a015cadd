use egui::{Pos2, Rect, Vec2};

/// Scale components below this are treated as degenerate and not drawn or hit
pub const MIN_SCALE: f32 = 1e-4;

/// Whether `p` (local coordinates, origin at the top-left) lies inside a rounded rectangle
pub(crate) fn rounded_rect_contains(p: Pos2, size: Vec2, corner_radius: f32) -> bool {
    if p.x < 0.0 || p.y < 0.0 || p.x > size.x || p.y > size.y {
        return false;
    }
    let r = corner_radius.clamp(0.0, size.x.min(size.y) / 2.0);
    if r <= 0.0 {
        return true;
    }

    // Only the four corner squares need the distance check
    let cx = p.x.clamp(r, size.x - r);
    let cy = p.y.clamp(r, size.y - r);
    let dx = p.x - cx;
    let dy = p.y - cy;
    dx * dx + dy * dy <= r * r
}

/// Whether `p` lies inside the ellipse inscribed in the local box of `size`
pub(crate) fn ellipse_contains(p: Pos2, size: Vec2) -> bool {
    let rx = size.x / 2.0;
    let ry = size.y / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let nx = (p.x - rx) / rx;
    let ny = (p.y - ry) / ry;
    nx * nx + ny * ny <= 1.0
}

/// Calculate distance from a point to a line segment
pub(crate) fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Calculate the bounding box for a set of points
pub(crate) fn calculate_bounds(points: &[Pos2], padding: f32) -> Rect {
    if points.is_empty() {
        return Rect::NOTHING;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect::from_min_max(
        Pos2::new(min_x - padding, min_y - padding),
        Pos2::new(max_x + padding, max_y + padding),
    )
}

/// Rotate `v` by `angle` radians
pub(crate) fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    #[test]
    fn test_rounded_rect_corners() {
        let size = vec2(100.0, 50.0);
        assert!(rounded_rect_contains(pos2(50.0, 25.0), size, 10.0));
        assert!(rounded_rect_contains(pos2(0.0, 25.0), size, 10.0));
        // The very corner is cut away by the radius
        assert!(!rounded_rect_contains(pos2(0.5, 0.5), size, 10.0));
        assert!(rounded_rect_contains(pos2(0.5, 0.5), size, 0.0));
        assert!(!rounded_rect_contains(pos2(101.0, 25.0), size, 0.0));
    }

    #[test]
    fn test_ellipse_contains() {
        let size = vec2(100.0, 100.0);
        assert!(ellipse_contains(pos2(50.0, 50.0), size));
        assert!(ellipse_contains(pos2(50.0, 0.5), size));
        assert!(!ellipse_contains(pos2(2.0, 2.0), size));
    }

    #[test]
    fn test_distance_to_segment() {
        let d = distance_to_line_segment(pos2(5.0, 3.0), pos2(0.0, 0.0), pos2(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-5);
        let past_end = distance_to_line_segment(pos2(13.0, 4.0), pos2(0.0, 0.0), pos2(10.0, 0.0));
        assert!((past_end - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_with_padding() {
        let rect = calculate_bounds(&[pos2(10.0, 20.0), pos2(30.0, 5.0)], 1.5);
        assert_eq!(rect.min, pos2(8.5, 3.5));
        assert_eq!(rect.max, pos2(31.5, 21.5));
        assert_eq!(calculate_bounds(&[], 1.0), Rect::NOTHING);
    }
}

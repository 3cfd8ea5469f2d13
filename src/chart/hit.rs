//! Inverse of the sunburst layout: pointer position to segment.

use std::f32::consts::TAU;

use egui::Pos2;

use crate::chart::layout::Segment;

/// Find the segment under a point, or `None` for empty space.
///
/// The point is converted to polar form around `center`; containment is
/// inclusive on both the radial and angular bounds. Well-formed segment
/// lists never overlap, so at most one true match exists; a point exactly
/// on a shared edge may resolve to either neighbor.
pub fn find_segment_at<'a>(
    segments: &'a [Segment],
    point: Pos2,
    center: Pos2,
) -> Option<&'a Segment> {
    let delta = point - center;
    let radius = delta.length();
    let mut angle = delta.y.atan2(delta.x);
    if angle < 0.0 {
        angle += TAU;
    }

    segments.iter().find(|segment| {
        segment.inner_radius <= radius
            && radius <= segment.outer_radius
            && segment.start_angle <= angle
            && angle <= segment.end_angle
    })
}

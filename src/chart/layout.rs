//! Sunburst layout: proportional angular partition of the date tree.
//!
//! Pure geometry: (tree, exclusion set, canvas size) in, ordered segment
//! list out. Rendering and hit-testing both consume the same segment list;
//! it is recomputed in full on every pass and never persisted.

use std::collections::HashSet;
use std::f32::consts::TAU;

use egui::{Color32, Pos2, Vec2};

use crate::chart::tree::{DateTree, NodeId};
use crate::theme;

/// Hole radius as a fraction of the chart radius.
pub const CENTER_HOLE_RADIUS: f32 = 0.35;
/// Width of each ring as a fraction of the chart radius.
pub const RING_WIDTH: f32 = 0.25;
/// Rings rendered: year, month, day. Deeper structure is not drawn.
pub const MAX_DEPTH: usize = 3;

/// Fraction of the half-canvas the chart may occupy.
const CANVAS_MARGIN: f32 = 0.9;

/// Label function injected by the host; the engine never hardcodes
/// month-name translation.
pub type LabelFn = dyn Fn(&DateTree, NodeId) -> String;

/// Geometric projection of one tree node at one ring.
#[derive(Debug, Clone)]
pub struct Segment {
    pub node: NodeId,
    /// Ring index, 0 = years.
    pub level: usize,
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Radians in `[0, 2π)`.
    pub start_angle: f32,
    pub end_angle: f32,
    pub color: Color32,
    pub label: String,
}

impl Segment {
    pub fn angular_width(&self) -> f32 {
        self.end_angle - self.start_angle
    }

    /// Midpoint of the segment in Cartesian coordinates, for label
    /// placement and hit-test round trips.
    pub fn mid_point(&self, center: Pos2) -> Pos2 {
        let radius = (self.inner_radius + self.outer_radius) / 2.0;
        let angle = (self.start_angle + self.end_angle) / 2.0;
        center + Vec2::angled(angle) * radius
    }
}

/// Sunburst layout parameters
pub struct SunburstLayout {
    pub hole_radius: f32,
    pub ring_width: f32,
    pub max_depth: usize,
}

impl Default for SunburstLayout {
    fn default() -> Self {
        Self {
            hole_radius: CENTER_HOLE_RADIUS,
            ring_width: RING_WIDTH,
            max_depth: MAX_DEPTH,
        }
    }
}

impl SunburstLayout {
    /// Compute the full segment list for one redraw.
    ///
    /// Nodes directly in `disabled` (and anything beneath them) take no
    /// angle; remaining siblings split their parent's span proportionally
    /// to value. A childless root or a degenerate canvas yields an empty
    /// list, never an error.
    pub fn compute_segments(
        &self,
        tree: &DateTree,
        disabled: &HashSet<NodeId>,
        canvas: Vec2,
        label: &LabelFn,
    ) -> Vec<Segment> {
        let root = tree.node(tree.root());
        if root.children.is_empty() && root.aggregated_children.is_empty() {
            return Vec::new();
        }

        let max_radius = canvas.min_elem() / 2.0 * CANVAS_MARGIN;
        if max_radius <= 0.0 {
            return Vec::new();
        }

        let top: Vec<NodeId> = root
            .children
            .iter()
            .chain(root.aggregated_children.iter())
            .copied()
            .collect();

        let mut segments = Vec::new();
        self.ring_segments(
            tree,
            &top,
            disabled,
            0,
            0.0,
            TAU,
            max_radius,
            label,
            &mut segments,
        );
        segments
    }

    #[allow(clippy::too_many_arguments)]
    fn ring_segments(
        &self,
        tree: &DateTree,
        nodes: &[NodeId],
        disabled: &HashSet<NodeId>,
        level: usize,
        start_angle: f32,
        end_angle: f32,
        max_radius: f32,
        label: &LabelFn,
        out: &mut Vec<Segment>,
    ) {
        if level >= self.max_depth {
            return;
        }

        let inner_radius = (self.hole_radius + level as f32 * self.ring_width) * max_radius;
        let outer_radius = inner_radius + self.ring_width * max_radius;

        let total: f64 = nodes
            .iter()
            .filter(|id| !disabled.contains(id))
            .map(|&id| tree.node(id).value)
            .sum();
        if total <= 0.0 {
            return;
        }

        let span = end_angle - start_angle;
        let mut current = start_angle;

        for &id in nodes {
            if disabled.contains(&id) {
                continue;
            }
            let node = tree.node(id);
            if node.value <= 0.0 {
                continue;
            }

            let sweep = (node.value / total) as f32 * span;
            let segment_end = current + sweep;

            out.push(Segment {
                node: id,
                level,
                inner_radius,
                outer_radius,
                start_angle: current,
                end_angle: segment_end,
                color: theme::segment_color(&node.name, level),
                label: label(tree, id),
            });

            if level + 1 < self.max_depth {
                let descend: Vec<NodeId> = node
                    .children
                    .iter()
                    .chain(node.aggregated_children.iter())
                    .copied()
                    .collect();
                if !descend.is_empty() {
                    self.ring_segments(
                        tree,
                        &descend,
                        disabled,
                        level + 1,
                        current,
                        segment_end,
                        max_radius,
                        label,
                        out,
                    );
                }
            }

            current = segment_end;
        }
    }
}

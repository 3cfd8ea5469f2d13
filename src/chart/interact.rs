//! Pointer interaction over the sunburst chart.
//!
//! [`ChartController`] glues the layout engine, hit tester, and selection
//! state together: it caches the last segment list, tracks hover, builds
//! tooltip text, and turns clicks into selection toggles. Segments are
//! recomputed after every mutation so callers never hit-test stale
//! geometry.

use anyhow::Result;
use egui::{Pos2, Vec2};

use crate::chart::hit;
use crate::chart::layout::{Segment, SunburstLayout};
use crate::chart::selection::SelectionState;
use crate::chart::tree::{DateTree, NodeId};

/// Host-injected label function.
pub type LabelFn = Box<dyn Fn(&DateTree, NodeId) -> String>;

type HoverObserver = Box<dyn FnMut(Option<&Segment>) -> Result<()>>;

/// Orchestrates pointer events against the chart engine.
pub struct ChartController {
    layout: SunburstLayout,
    label: LabelFn,
    segments: Vec<Segment>,
    canvas: Vec2,
    center: Pos2,
    hovered: Option<NodeId>,
    hover_observers: Vec<HoverObserver>,
}

impl ChartController {
    pub fn new(label: LabelFn) -> Self {
        Self {
            layout: SunburstLayout::default(),
            label,
            segments: Vec::new(),
            canvas: Vec2::ZERO,
            center: Pos2::ZERO,
            hovered: None,
            hover_observers: Vec::new(),
        }
    }

    /// Segment list from the last layout pass, in draw order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn center(&self) -> Pos2 {
        self.center
    }

    /// Node currently under the pointer, if any.
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Register a hover observer; failures are logged and isolated like
    /// selection observers.
    pub fn add_hover_observer(
        &mut self,
        observer: impl FnMut(Option<&Segment>) -> Result<()> + 'static,
    ) {
        self.hover_observers.push(Box::new(observer));
    }

    /// Recompute segments for the given canvas. Called once per redraw and
    /// internally after click mutations. A node hovered before the pass
    /// that no longer has a segment gets its hover cleared.
    pub fn relayout(&mut self, tree: &DateTree, selection: &SelectionState, canvas: Vec2) {
        self.canvas = canvas;
        self.center = Pos2::new(canvas.x / 2.0, canvas.y / 2.0);
        self.segments =
            self.layout
                .compute_segments(tree, selection.disabled(), canvas, &*self.label);

        if let Some(hovered) = self.hovered {
            if !self.segments.iter().any(|s| s.node == hovered) {
                self.hovered = None;
                self.notify_hover(None);
            }
        }
    }

    /// Handle pointer movement; returns tooltip text for the segment under
    /// the pointer, or `None` over empty space. Hover observers fire only
    /// when the hovered node actually changes.
    pub fn pointer_moved(
        &mut self,
        tree: &DateTree,
        selection: &SelectionState,
        pos: Pos2,
    ) -> Option<String> {
        let hit = hit::find_segment_at(&self.segments, pos, self.center).cloned();
        let hit_node = hit.as_ref().map(|s| s.node);

        if hit_node != self.hovered {
            self.hovered = hit_node;
            self.notify_hover(hit.as_ref());
        }

        hit.map(|segment| self.tooltip(tree, selection, &segment))
    }

    /// Pointer left the chart area.
    pub fn pointer_left(&mut self) {
        if self.hovered.take().is_some() {
            self.notify_hover(None);
        }
    }

    /// Handle a click: toggle the hit node and recompute segments. Returns
    /// false when the click landed on empty space.
    pub fn click(&mut self, tree: &DateTree, selection: &mut SelectionState, pos: Pos2) -> bool {
        let Some(node) =
            hit::find_segment_at(&self.segments, pos, self.center).map(|s| s.node)
        else {
            return false;
        };

        selection.toggle(tree, node);
        self.relayout(tree, selection, self.canvas);
        tracing::debug!(disabled = selection.is_disabled(node), "segment toggled");
        true
    }

    /// Tooltip text for a segment.
    pub fn tooltip(&self, tree: &DateTree, selection: &SelectionState, segment: &Segment) -> String {
        let value = tree.node(segment.node).value as u64;
        if selection.is_effectively_disabled(tree, segment.node) {
            format!("{}: {value} messages (disabled)", segment.label)
        } else {
            format!("{}: {value} messages", segment.label)
        }
    }

    fn notify_hover(&mut self, segment: Option<&Segment>) {
        let mut observers = std::mem::take(&mut self.hover_observers);
        for observer in observers.iter_mut() {
            if let Err(err) = observer(segment) {
                tracing::error!(%err, "hover observer failed");
            }
        }
        self.hover_observers = observers;
    }
}

#[cfg(test)]
#[path = "interact_tests.rs"]
mod tests;

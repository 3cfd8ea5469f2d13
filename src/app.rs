//! Main application state and UI.
//!
//! Thin presentation layer over the chart engine: it paints the segment
//! list, forwards pointer events, and exposes the bulk date filters as
//! buttons. All aggregation, layout, and filtering logic lives under
//! `crate::chart` and `crate::dates`.

use eframe::egui::{self, Align2, FontId, Pos2, Vec2};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::chart::layout::Segment;
use crate::chart::{ChartController, DateLevel, DateTree, NodeId, SelectionEvent, SelectionState};
use crate::dates::{DateIndex, FilterStats};
use crate::loader::{self, Message};
use crate::theme;

/// Segments narrower than this get no label text (radians).
const MIN_ANGLE_FOR_TEXT: f32 = 0.1;

/// Storage key for the persisted exclusion set.
const DISABLED_DATES_KEY: &str = "disabled_dates";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Display label for a tree node: month numbers become month names,
/// everything else renders as-is. Injected into the controller so the
/// engine stays free of translation concerns.
fn segment_label(tree: &DateTree, id: NodeId) -> String {
    let node = tree.node(id);
    if node.date_level == DateLevel::Month {
        if let Some(month) = node
            .name
            .parse::<usize>()
            .ok()
            .filter(|m| (1..=12).contains(m))
        {
            return MONTH_NAMES[month - 1].to_string();
        }
    }
    node.name.clone()
}

/// Main analysis window
pub struct AnalysisApp {
    chat_name: Option<String>,
    tree: Rc<DateTree>,
    index: Rc<DateIndex>,
    selection: SelectionState,
    controller: ChartController,
    /// Updated by the statistics observer on every selection change.
    stats: Rc<RefCell<FilterStats>>,
    tooltip: Option<String>,
    load_error: Option<String>,
}

impl AnalysisApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let mut chat_name = None;
        let mut load_error = None;
        let messages: Vec<Message> = match std::env::args().nth(1).map(PathBuf::from) {
            Some(path) => match loader::load_export(&path) {
                Ok(export) => {
                    chat_name = export.name.clone();
                    export.messages
                }
                Err(err) => {
                    tracing::error!(%err, "failed to load chat export");
                    load_error = Some(format!("{err:#}"));
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let tree = Rc::new(DateTree::build(&messages));
        tracing::debug!(nodes = tree.len(), "analysis tree built");
        let index = Rc::new(DateIndex::build(&messages, &tree));
        let mut selection = SelectionState::new(&tree);

        let stats = Rc::new(RefCell::new(index.statistics(&tree, selection.disabled())));
        let stats_tree = Rc::clone(&tree);
        let stats_index = Rc::clone(&index);
        let stats_cell = Rc::clone(&stats);
        selection.add_observer(move |event| {
            match event {
                SelectionEvent::SelectionChanged(disabled) => {
                    let updated = stats_index.statistics(&stats_tree, disabled);
                    tracing::debug!(
                        enabled_days = updated.enabled_days,
                        enabled_messages = updated.enabled_messages,
                        "statistics updated"
                    );
                    *stats_cell.borrow_mut() = updated;
                }
                SelectionEvent::FilteredValueChanged(value) => {
                    tracing::debug!(filtered = value, "filter changed");
                }
            }
            Ok(())
        });

        // Restore the exclusion set from the previous session; paths that
        // no longer match the rebuilt tree are dropped.
        if let Some(paths) = cc
            .storage
            .and_then(|storage| eframe::get_value::<Vec<String>>(storage, DISABLED_DATES_KEY))
        {
            selection.set_disabled_paths(&tree, &paths);
        }

        let mut controller = ChartController::new(Box::new(segment_label));
        controller.add_hover_observer(|segment| {
            tracing::trace!(segment = ?segment.map(|s| &s.label), "hover changed");
            Ok(())
        });

        Self {
            chat_name,
            tree,
            index,
            selection,
            controller,
            stats,
            tooltip: None,
            load_error,
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading(self.chat_name.as_deref().unwrap_or("Chat analysis"));
        if let Some(err) = &self.load_error {
            ui.colored_label(egui::Color32::from_rgb(239, 68, 68), err);
        }
        if let Some((first, last)) = self.index.date_range() {
            ui.colored_label(
                theme::text::MUTED,
                format!(
                    "{first} to {last}, {} active days",
                    self.index.available_dates().count()
                ),
            );
        }
        ui.separator();

        let stats = self.stats.borrow().clone();
        egui::Grid::new("filter_stats")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.colored_label(theme::text::MUTED, "Days");
                ui.colored_label(
                    theme::text::PRIMARY,
                    format!("{} of {}", stats.enabled_days, stats.total_days),
                );
                ui.end_row();

                ui.colored_label(theme::text::MUTED, "Messages");
                ui.colored_label(
                    theme::text::PRIMARY,
                    format!("{} of {}", stats.enabled_messages, stats.total_messages),
                );
                ui.end_row();

                ui.colored_label(theme::text::MUTED, "Enabled");
                ui.colored_label(
                    theme::text::PRIMARY,
                    format!("{:.1}%", stats.enabled_percentage),
                );
                ui.end_row();
            });

        ui.separator();
        ui.colored_label(theme::text::SECONDARY, "Filters");

        if ui.button("Enable all").clicked() {
            self.selection.enable_all(&self.tree);
        }
        if ui.button("Disable all days").clicked() {
            let leaves = self.tree.day_leaves(self.tree.root());
            self.selection.disable_all(&self.tree, leaves);
        }
        ui.horizontal(|ui| {
            if ui.button("Weekends off").clicked() {
                let nodes = self.index.nodes_for_weekends();
                self.selection.disable_many(&self.tree, nodes);
            }
            if ui.button("Weekends on").clicked() {
                let nodes = self.index.nodes_for_weekends();
                self.selection.enable_many(&self.tree, nodes);
            }
        });
        if ui.button("Keep last 30 days").clicked() {
            if let Some((first, last)) = self.index.date_range() {
                if let Some(cutoff) = last.checked_sub_days(chrono::Days::new(30)) {
                    let nodes = self.index.nodes_for_range(first, cutoff);
                    self.selection.disable_many(&self.tree, nodes);
                }
            }
        }

        for year in self.index.available_years() {
            ui.horizontal(|ui| {
                ui.colored_label(theme::text::SECONDARY, year.to_string());
                if ui.small_button("off").clicked() {
                    let nodes = self.index.nodes_for_year(year);
                    self.selection.disable_many(&self.tree, nodes);
                }
                if ui.small_button("on").clicked() {
                    let nodes = self.index.nodes_for_year(year);
                    self.selection.enable_many(&self.tree, nodes);
                }
            });
            ui.horizontal_wrapped(|ui| {
                for month in self.index.available_months(year) {
                    let name = MONTH_NAMES[(month - 1) as usize];
                    if ui.small_button(name).clicked() {
                        let nodes = self.index.nodes_for_month(year, month);
                        // Toggle the whole month: re-enable when every day
                        // is already off.
                        let all_off = nodes
                            .iter()
                            .all(|&n| self.selection.is_effectively_disabled(&self.tree, n));
                        if all_off {
                            self.selection.enable_many(&self.tree, nodes);
                        } else {
                            self.selection.disable_many(&self.tree, nodes);
                        }
                    }
                }
            });
        }

        if let Some(text) = &self.tooltip {
            ui.separator();
            ui.colored_label(theme::text::SECONDARY, text);
        }
    }

    fn chart_panel(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click());
        let rect = response.rect;
        let origin = rect.min;

        self.controller
            .relayout(&self.tree, &self.selection, rect.size());

        if self.controller.segments().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No data",
                FontId::proportional(16.0),
                theme::text::MUTED,
            );
            return;
        }

        let center = origin + self.controller.center().to_vec2();
        for segment in self.controller.segments() {
            let hovered = self.controller.hovered() == Some(segment.node);
            paint_segment(&painter, segment, center, hovered);
        }

        // Center readout: messages remaining under the filter.
        painter.text(
            center,
            Align2::CENTER_BOTTOM,
            format!("{:.0}", self.selection.filtered_value()),
            FontId::proportional(24.0),
            theme::text::PRIMARY,
        );
        painter.text(
            center + Vec2::new(0.0, 4.0),
            Align2::CENTER_TOP,
            format!("of {:.0} messages", self.tree.node(self.tree.root()).value),
            FontId::proportional(12.0),
            theme::text::MUTED,
        );

        if let Some(pos) = response.hover_pos() {
            let local = (pos - origin).to_pos2();
            self.tooltip = self
                .controller
                .pointer_moved(&self.tree, &self.selection, local);
        } else {
            self.controller.pointer_left();
            self.tooltip = None;
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = (pos - origin).to_pos2();
                self.controller
                    .click(&self.tree, &mut self.selection, local);
            }
        }

        if let Some(text) = self.tooltip.clone() {
            egui::show_tooltip_at_pointer(
                ui.ctx(),
                ui.layer_id(),
                egui::Id::new("segment_tooltip"),
                |ui| {
                    ui.label(text);
                },
            );
        }
    }
}

impl eframe::App for AnalysisApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(
            storage,
            DISABLED_DATES_KEY,
            &self.selection.disabled_paths(&self.tree),
        );
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::right("controls")
            .default_width(240.0)
            .frame(
                egui::Frame::default()
                    .fill(theme::bg::PANEL)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(theme::bg::CHART))
            .show(ctx, |ui| self.chart_panel(ui));
    }
}

/// Paint one annular sector by sampling its arcs.
fn paint_segment(painter: &egui::Painter, segment: &Segment, center: Pos2, hovered: bool) {
    use egui::epaint::{PathShape, PathStroke};

    let steps = ((segment.angular_width() / 0.03).ceil() as usize).clamp(2, 256);
    let mut points = Vec::with_capacity(2 * steps + 2);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let angle = segment.start_angle + t * segment.angular_width();
        points.push(center + Vec2::angled(angle) * segment.outer_radius);
    }
    for i in (0..=steps).rev() {
        let t = i as f32 / steps as f32;
        let angle = segment.start_angle + t * segment.angular_width();
        points.push(center + Vec2::angled(angle) * segment.inner_radius);
    }

    let stroke = if hovered {
        PathStroke::new(2.0, theme::state::HOVER)
    } else {
        PathStroke::new(1.0, theme::state::OUTLINE)
    };
    painter.add(PathShape {
        points,
        closed: true,
        fill: segment.color,
        stroke,
    });

    if segment.angular_width() > MIN_ANGLE_FOR_TEXT {
        painter.text(
            segment.mid_point(center),
            Align2::CENTER_CENTER,
            &segment.label,
            FontId::proportional(11.0),
            theme::text::PRIMARY,
        );
    }
}

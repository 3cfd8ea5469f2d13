//! Chatlight
//!
//! A desktop analyzer for chat exports: message volume over a year/month/day
//! hierarchy as an interactive sunburst, with date-range filtering for
//! downstream conversion.

mod app;
mod chart;
mod dates;
mod loader;
mod theme;

use eframe::egui;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 800.0])
            .with_title("Chatlight"),
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(
        "Chatlight",
        options,
        Box::new(|cc| Ok(Box::new(app::AnalysisApp::new(cc)))),
    )
}

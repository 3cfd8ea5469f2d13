//! Sunburst chart engine: date tree, layout, hit-testing, and selection.

pub mod hit;
pub mod interact;
pub mod layout;
pub mod selection;
pub mod tree;

pub use interact::ChartController;
pub use layout::{Segment, SunburstLayout};
pub use selection::{SelectionEvent, SelectionState};
pub use tree::{DateLevel, DateTree, NodeId};

//! User interface projection

pub mod controls;

pub use controls::{Control, ControlPanel, ControllerView};

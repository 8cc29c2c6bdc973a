//! Terminal presentation
//!
//! The viewport (virtualization), the render context snapshot, the ratatui
//! renderer and the app that hosts a grid in a terminal.

pub mod actions;
pub mod grid_app;
pub mod grid_renderer;
pub mod render_context;
pub mod viewport;

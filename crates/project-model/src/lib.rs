//! MuvidGen Project Model
//!
//! Defines the data contract of a render project:
//! - **Project:** schema version, ordered clips, soundtrack, output path
//! - **Layers:** text captions and spectrograph visualizations, stacked
//!   in declaration order
//!
//! Overlay positions are fractional `[0.0, 1.0]` coordinates relative to
//! the output frame.

pub mod layer;
pub mod project;

pub use layer::*;
pub use project::*;

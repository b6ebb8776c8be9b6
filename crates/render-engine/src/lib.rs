//! MuvidGen Render Engine
//!
//! Renders a project with two ffmpeg passes: the clips are concatenated
//! into a video-only intermediate, then overlays and the soundtrack are
//! applied in a second pass. The second pass is skipped when there is
//! nothing to add.
//!
//! # Pipeline Architecture
//!
//! ```text
//! clip 1 ──┐
//! clip 2 ──┼── Concat (H.264, video only) ──► concat_video.mp4
//! clip N ──┘                                        │
//!                                ┌──────────────────┤
//!                                │                  │ no audio, no layers
//! layers ──── filter graph ──┐   ▼                  ▼
//!                            ├── Mux ─────────► output.mp4
//! soundtrack ────────────────┘
//! ```

pub mod duration;
pub mod engine;
pub mod filter_graph;
pub mod pipeline;

pub use duration::*;
pub use engine::*;
pub use filter_graph::*;
pub use pipeline::*;

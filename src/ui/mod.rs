//! Output rendering.
//!
//! - **renderer**: Echo policy, VT100 cursor control and printed text

pub mod renderer;

pub use renderer::Renderer;

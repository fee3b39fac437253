pub use driver::{CpuRenderer, RenderError, DEFAULT_BLOCK_SIZE};
pub use renderer::CpuRenderSettings;

mod driver;
mod renderer;
pub mod geometry;
pub mod stats;

//! Reference CPU path tracer: scenes, devices, sessions and image output.

pub use common::scene::Scene;
pub use session::{BufferParams, SceneParams, Session, SessionParams};

pub mod common;
pub mod cpu;
pub mod device;
pub mod loader;
pub mod output;
pub mod session;

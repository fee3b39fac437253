pub mod math;
pub mod progress;
pub mod scene;
pub mod util;

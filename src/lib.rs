//! Drives a render session of the `tracer` engine from configuration to finished image.
//!
//! [driver::Driver] owns the session, the command line tool and [bridge::Bridge] are
//! thin adapters around it.

pub mod bridge;
pub mod config;
pub mod driver;
pub mod engine;
pub mod ffi;
pub mod logging;
pub mod status;

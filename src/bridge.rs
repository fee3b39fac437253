//! Entry points for a host application that embeds the renderer.
//!
//! Unlike the command line tool, failures never end the process: they are logged and
//! handed back to the caller.

use std::path::PathBuf;
use std::sync::Arc;

use tracer::common::progress::StatusObserver;
use tracer::common::scene::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use tracing::error;

use crate::config::{Config, DEFAULT_DEVICE, DEFAULT_SHADING_SYSTEM};
use crate::driver::{Driver, DriverState, InitError};
use crate::engine::{CpuEngine, Engine};
use crate::logging;
use crate::status::ConsoleStatus;

/// Flat set of options as a host application provides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeParams {
    pub width: u32,
    pub height: u32,
    pub filepath: String,
    pub samples: i32,
    pub threads: usize,
    pub shading_system: String,
    pub use_auto_tile: bool,
    pub tile_size: u32,
    pub background: bool,
    pub quiet: bool,
    pub use_profiling: bool,
    pub device: String,
    /// Empty means no image is written.
    pub output_path: String,
}

impl Default for BridgeParams {
    fn default() -> Self {
        BridgeParams {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            filepath: String::new(),
            samples: 0,
            threads: 0,
            shading_system: DEFAULT_SHADING_SYSTEM.to_owned(),
            use_auto_tile: false,
            tile_size: 0,
            background: true,
            quiet: false,
            use_profiling: false,
            device: DEFAULT_DEVICE.to_owned(),
            output_path: String::new(),
        }
    }
}

impl BridgeParams {
    pub fn to_config(&self) -> Config {
        Config {
            width: self.width,
            height: self.height,
            filepath: PathBuf::from(&self.filepath),
            samples: self.samples,
            threads: self.threads,
            shading_system: self.shading_system.clone(),
            device: self.device.clone(),
            tile_size: self.tile_size,
            use_auto_tile: self.use_auto_tile,
            background: self.background,
            quiet: self.quiet,
            use_profiling: self.use_profiling,
            output_path: (!self.output_path.is_empty()).then(|| PathBuf::from(&self.output_path)),
        }
    }
}

pub struct Bridge<E: Engine = CpuEngine> {
    driver: Driver<E>,
}

impl Bridge<CpuEngine> {
    /// A bridge rendering on the CPU engine, printing progress to stdout.
    ///
    /// The host owns the console, so cleanup only ends the progress line.
    pub fn new() -> Self {
        Bridge::with_engine(CpuEngine, Arc::new(ConsoleStatus::stdout().without_finish_line()))
    }
}

impl Default for Bridge<CpuEngine> {
    fn default() -> Self {
        Bridge::new()
    }
}

impl<E: Engine> Bridge<E> {
    pub fn with_engine(engine: E, observer: Arc<dyn StatusObserver>) -> Self {
        logging::init_embedded();
        Bridge { driver: Driver::with_observer(engine, observer) }
    }

    pub fn initialize(&mut self, params: &BridgeParams) -> Result<(), InitError> {
        self.driver.initialize(&params.to_config()).map_err(|e| {
            error!("{}", e.report());
            e
        })
    }

    pub fn render(&mut self) {
        self.driver.render();
    }

    pub fn cleanup(&mut self) {
        self.driver.cleanup();
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    pub fn driver(&self) -> &Driver<E> {
        &self.driver
    }
}

use std::any::Any;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use itertools::Itertools;
use tracing::{debug, error, info, warn};

use crate::common::progress::Progress;
use crate::common::scene::{Scene, ShadingSystem};
use crate::cpu::{CpuRenderSettings, CpuRenderer, RenderError, DEFAULT_BLOCK_SIZE};
use crate::device::{DeviceInfo, DeviceType};
use crate::output::OutputDriver;

pub const STATUS_UPDATING: &str = "Updating Scene";
pub const STATUS_RENDERING: &str = "Rendering";
pub const STATUS_FINISHED: &str = "Finished";
pub const STATUS_CANCELLED: &str = "Cancelled";
pub const STATUS_ERROR: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub device: DeviceInfo,
    /// Samples per pixel, zero means the scene integrator decides.
    pub samples: u32,
    /// Worker count, zero means one per logical core.
    pub threads: usize,
    pub background: bool,
    pub tile_size: u32,
    pub use_auto_tile: bool,
    pub use_profiling: bool,
}

impl Default for SessionParams {
    fn default() -> Self {
        SessionParams {
            device: DeviceInfo::cpu(),
            samples: 0,
            threads: 0,
            background: false,
            tile_size: 0,
            use_auto_tile: false,
            use_profiling: false,
        }
    }
}

impl SessionParams {
    pub fn block_size(&self) -> u32 {
        if self.use_auto_tile && self.tile_size > 0 {
            self.tile_size
        } else {
            DEFAULT_BLOCK_SIZE
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SceneParams {
    pub shading_system: ShadingSystem,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferParams {
    pub width: u32,
    pub height: u32,
    pub full_width: u32,
    pub full_height: u32,
}

impl BufferParams {
    pub fn new(width: u32, height: u32) -> Self {
        BufferParams { width, height, full_width: width, full_height: height }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("device {0} is not available in this build")]
    UnsupportedDevice(DeviceType),
    #[error("session was already started")]
    AlreadyStarted,
    #[error("failed to spawn session thread")]
    Spawn(#[from] std::io::Error),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Completion {
    done: Mutex<bool>,
    signal: Condvar,
}

impl Completion {
    fn reset(&self) {
        *lock(&self.done) = false;
    }

    fn wait(&self) {
        let mut done = lock(&self.done);
        while !*done {
            done = self.signal.wait(done).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn is_done(&self) -> bool {
        *lock(&self.done)
    }
}

/// Marks the session complete when dropped, so waiters wake up even if rendering panics.
struct CompleteOnDrop(Arc<Completion>);

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        *lock(&self.0.done) = true;
        self.0.signal.notify_all();
    }
}

/// A single render of a scene, running on its own thread once started.
pub struct Session {
    params: SessionParams,
    buffer: BufferParams,
    scene: Arc<Scene>,
    progress: Arc<Progress>,
    output: Option<Box<dyn OutputDriver>>,
    completion: Arc<Completion>,
    thread: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(params: SessionParams, scene_params: SceneParams, scene: Scene) -> Result<Session, SessionError> {
        if !params.device.is_cpu() {
            return Err(SessionError::UnsupportedDevice(params.device.device_type));
        }

        debug!("creating session on {} with {} shading", params.device.description, scene_params.shading_system);
        let buffer = BufferParams::new(scene.camera.full_width, scene.camera.full_height);

        Ok(Session {
            params,
            buffer,
            scene: Arc::new(scene),
            progress: Arc::new(Progress::new()),
            output: None,
            completion: Arc::new(Completion::default()),
            thread: None,
        })
    }

    pub fn set_output_driver(&mut self, driver: Box<dyn OutputDriver>) {
        self.output = Some(driver);
    }

    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Stops any running render and prepares for a new one with the given parameters.
    pub fn reset(&mut self, params: SessionParams, buffer: BufferParams) {
        self.stop();
        self.params = params;
        self.buffer = buffer;
        self.progress.reset();
        self.completion.reset();
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.thread.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        let job = RenderJob {
            params: self.params.clone(),
            buffer: self.buffer,
            scene: Arc::clone(&self.scene),
            progress: Arc::clone(&self.progress),
            output: self.output.take(),
        };
        let completion = Arc::clone(&self.completion);
        completion.reset();
        let progress = Arc::clone(&self.progress);

        let handle = std::thread::Builder::new()
            .name("session".to_owned())
            .spawn(move || {
                let _complete = CompleteOnDrop(completion);
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| job.run())) {
                    let message = panic_message(&*panic);
                    error!("render panicked: {}", message);
                    progress.set_status(STATUS_ERROR, message);
                }
            })?;

        self.thread = Some(handle);
        Ok(())
    }

    /// Blocks until the render finished or was cancelled, returns immediately if it was never started.
    pub fn wait(&self) {
        if self.thread.is_some() {
            self.completion.wait();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_some() && self.completion.is_done()
    }

    /// Whether the render ended with an error, including a panic on the render thread.
    pub fn is_failed(&self) -> bool {
        self.is_finished() && self.progress.get_status().0 == STATUS_ERROR
    }

    pub fn cancel(&self) {
        self.progress.set_cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.progress.get_cancel()
    }

    fn stop(&mut self) {
        if let Some(handle) = self.thread.take() {
            self.cancel();
            if handle.join().is_err() {
                warn!("session thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

struct RenderJob {
    params: SessionParams,
    buffer: BufferParams,
    scene: Arc<Scene>,
    progress: Arc<Progress>,
    output: Option<Box<dyn OutputDriver>>,
}

impl RenderJob {
    fn run(mut self) {
        let progress = &*self.progress;
        let profiling = self.params.use_profiling;
        let start = Instant::now();

        progress.set_status(STATUS_UPDATING, "");
        let integrator = self.scene.integrator;
        let samples = if self.params.samples == 0 { integrator.samples } else { self.params.samples };
        let renderer = CpuRenderer {
            settings: CpuRenderSettings { samples, max_bounces: integrator.max_bounces, anti_alias: true },
            block_size: self.params.block_size(),
            threads: self.params.threads,
            progress,
        };
        if profiling {
            info!(target: "profile", "scene update: {:?}", start.elapsed());
        }

        progress.set_status(STATUS_RENDERING, "");
        let render_start = Instant::now();
        let result = renderer.render(&self.scene, self.buffer.width, self.buffer.height);
        if profiling {
            info!(target: "profile", "render {}x{} at {} samples: {:?}", self.buffer.width, self.buffer.height, samples, render_start.elapsed());
        }

        let image = match result {
            Ok(image) => image,
            Err(RenderError::Cancelled) => {
                progress.set_status(STATUS_CANCELLED, "");
                return;
            }
            Err(e) => {
                error!("render failed: {}", e);
                progress.set_status(STATUS_ERROR, e.to_string());
                return;
            }
        };

        if let Some(output) = &mut self.output {
            let write_start = Instant::now();
            for pass in &self.scene.passes {
                if let Err(e) = output.write_render(&pass.name, image.as_ref()) {
                    error!("{}", error_chain(&e));
                    progress.set_status(STATUS_ERROR, e.to_string());
                    return;
                }
            }
            if profiling {
                info!(target: "profile", "write output: {:?}", write_start.elapsed());
            }
        }

        let elapsed = start.elapsed();
        progress.update(1.0, STATUS_FINISHED, format!("Total time {:.2}s", elapsed.as_secs_f64()));
        if profiling {
            info!(target: "profile", "total: {:?}", elapsed);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Joins an error with its sources, `outer: inner: ...`.
fn error_chain(e: &(dyn Error + 'static)) -> String {
    std::iter::successors(Some(e), |&e| e.source()).join(": ")
}

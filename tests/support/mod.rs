#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::bail;
use tracer::common::progress::{ProgressSnapshot, StatusObserver};
use tracer::common::scene::ShadingSystem;
use tracer::device::{DeviceInfo, DeviceType};
use tracer::BufferParams;
use tracer_cli::engine::{DeviceSelector, Engine, RenderSession, SceneLoader, SceneSetup, SessionSetup};

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn gpu() -> DeviceInfo {
    DeviceInfo {
        device_type: DeviceType::Cuda,
        description: "Fake GPU".to_owned(),
        id: "CUDA_0".to_owned(),
        num_threads: 0,
        display_device: false,
    }
}

/// Scene with only a camera size, remembers what the driver did to it.
#[derive(Debug, Clone, Default)]
pub struct FakeScene {
    pub resolution: (u32, u32),
    pub viewplane_computed: bool,
    pub passes: Vec<String>,
}

impl SceneSetup for FakeScene {
    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = (width, height);
    }

    fn compute_auto_viewplane(&mut self) {
        self.viewplane_computed = true;
    }

    fn add_output_pass(&mut self, name: &str) {
        self.passes.push(name.to_owned());
    }
}

/// What the driver handed to [FakeEngine::create_session].
#[derive(Debug, Clone)]
pub struct RecordedSetup {
    pub device: DeviceType,
    pub samples: u32,
    pub shading_system: ShadingSystem,
    pub use_auto_tile: bool,
    pub buffer: BufferParams,
    pub scene: FakeScene,
    pub output: Option<PathBuf>,
    pub observer_attached: bool,
}

#[derive(Debug, Default)]
pub struct Record {
    pub loaded: Vec<PathBuf>,
    pub setups: Vec<RecordedSetup>,
    pub started: usize,
}

/// Engine stand-in: declares a fixed camera size and renders by sleeping.
#[derive(Clone)]
pub struct FakeEngine {
    pub devices: Vec<DeviceInfo>,
    pub camera: (u32, u32),
    pub render_time: Duration,
    /// Sessions end with an error instead of an image.
    pub fail_render: bool,
    pub record: Arc<Mutex<Record>>,
    pub live_sessions: Arc<AtomicUsize>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        FakeEngine {
            devices: vec![DeviceInfo::cpu()],
            camera: (800, 600),
            render_time: Duration::from_millis(50),
            fail_render: false,
            record: Arc::default(),
            live_sessions: Arc::default(),
        }
    }
}

impl FakeEngine {
    pub fn with_gpu() -> Self {
        FakeEngine { devices: vec![DeviceInfo::cpu(), gpu()], ..FakeEngine::default() }
    }

    pub fn record(&self) -> MutexGuard<'_, Record> {
        lock(&self.record)
    }

    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::SeqCst)
    }
}

impl DeviceSelector for FakeEngine {
    fn available_devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }
}

impl SceneLoader for FakeEngine {
    type Scene = FakeScene;

    fn load_scene(&self, path: &Path) -> anyhow::Result<FakeScene> {
        if path.to_string_lossy().contains("missing") {
            bail!("no such scene");
        }
        self.record().loaded.push(path.to_owned());
        Ok(FakeScene { resolution: self.camera, ..FakeScene::default() })
    }
}

impl Engine for FakeEngine {
    type Session = FakeSession;

    fn create_session(&self, setup: SessionSetup<FakeScene>) -> anyhow::Result<FakeSession> {
        self.record().setups.push(RecordedSetup {
            device: setup.session.device.device_type,
            samples: setup.session.samples,
            shading_system: setup.scene_params.shading_system,
            use_auto_tile: setup.session.use_auto_tile,
            buffer: setup.buffer,
            scene: setup.scene,
            output: setup.output,
            observer_attached: setup.observer.is_some(),
        });
        self.live_sessions.fetch_add(1, Ordering::SeqCst);

        Ok(FakeSession {
            render_time: self.render_time,
            fail_render: self.fail_render,
            observer: setup.observer,
            record: Arc::clone(&self.record),
            live_sessions: Arc::clone(&self.live_sessions),
            done: Arc::default(),
            cancelled: Arc::default(),
            thread: None,
        })
    }
}

pub struct FakeSession {
    render_time: Duration,
    fail_render: bool,
    observer: Option<Arc<dyn StatusObserver>>,
    record: Arc<Mutex<Record>>,
    live_sessions: Arc<AtomicUsize>,
    done: Arc<(Mutex<bool>, Condvar)>,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RenderSession for FakeSession {
    fn start(&mut self) -> anyhow::Result<()> {
        lock(&self.record).started += 1;

        let render_time = self.render_time;
        let observer = self.observer.clone();
        let done = Arc::clone(&self.done);
        let cancelled = Arc::clone(&self.cancelled);

        self.thread = Some(std::thread::spawn(move || {
            let steps = 4;
            for i in 1..=steps {
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                std::thread::sleep(render_time / steps);
                if let Some(observer) = &observer {
                    observer.update(&ProgressSnapshot {
                        progress: i as f64 / steps as f64,
                        status: "Rendering".to_owned(),
                        substatus: format!("Sample {}", i),
                    });
                }
            }

            let (flag, signal) = &*done;
            *lock(flag) = true;
            signal.notify_all();
        }));
        Ok(())
    }

    fn wait(&self) {
        if self.thread.is_none() {
            return;
        }
        let (flag, signal) = &*self.done;
        let mut finished = lock(flag);
        while !*finished {
            finished = signal.wait(finished).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn is_failed(&self) -> bool {
        self.fail_render && self.is_done()
    }
}

impl FakeSession {
    pub fn is_done(&self) -> bool {
        *lock(&self.done.0)
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.live_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Observer collecting everything it is told.
#[derive(Default)]
pub struct RecordingObserver {
    pub updates: Mutex<Vec<ProgressSnapshot>>,
    pub finished: AtomicBool,
}

impl StatusObserver for RecordingObserver {
    fn update(&self, snapshot: &ProgressSnapshot) {
        lock(&self.updates).push(snapshot.clone());
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// A tiny scene for the CPU engine: a lit sphere in front of a gray background.
pub const SMALL_SCENE: &str = r#"{
    "camera": { "width": 16, "height": 8, "fov": 40 },
    "background": [0.3, 0.3, 0.3],
    "integrator": { "samples": 2, "max_bounces": 2 },
    "objects": [
        { "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": { "emission": [1, 0.5, 0.2] } }
    ]
}"#;

pub fn write_scene(dir: &Path) -> PathBuf {
    let path = dir.join("scene.json");
    std::fs::write(&path, SMALL_SCENE).expect("write scene");
    path
}

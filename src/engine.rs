//! The seams between the driver and the render engine.
//!
//! The driver only talks to these traits, [CpuEngine] implements them on top of the
//! `tracer` crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracer::common::progress::StatusObserver;
use tracer::common::scene::{PassType, Scene};
use tracer::device::{available_devices, DeviceInfo, DeviceType};
use tracer::loader::load_scene;
use tracer::output::ImageOutputDriver;
use tracer::{BufferParams, SceneParams, Session, SessionParams};

/// Name of the pass written to the output file.
pub const OUTPUT_PASS: &str = "combined";

pub trait DeviceSelector {
    fn available_devices(&self) -> Vec<DeviceInfo>;

    /// The first available device whose type matches `name`, ignoring case.
    fn resolve_device(&self, name: &str) -> Option<DeviceInfo> {
        let device_type = DeviceType::from_name(name);
        if device_type == DeviceType::None {
            return None;
        }
        self.available_devices().into_iter().find(|d| d.device_type == device_type)
    }
}

/// What the driver needs to adjust on a loaded scene before rendering it.
pub trait SceneSetup {
    /// The camera's declared output size.
    fn resolution(&self) -> (u32, u32);
    fn set_resolution(&mut self, width: u32, height: u32);
    fn compute_auto_viewplane(&mut self);
    fn add_output_pass(&mut self, name: &str);
}

pub trait SceneLoader {
    type Scene: SceneSetup;

    fn load_scene(&self, path: &Path) -> anyhow::Result<Self::Scene>;
}

pub trait RenderSession {
    /// Starts rendering in the background and returns immediately.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Blocks until all samples are done or the render was cancelled.
    fn wait(&self);

    fn cancel(&self);

    fn is_cancelled(&self) -> bool;

    /// Whether the render ended with an error instead of an image.
    fn is_failed(&self) -> bool;
}

/// Everything needed to build a session, fully resolved by the driver.
pub struct SessionSetup<S> {
    pub session: SessionParams,
    pub scene_params: SceneParams,
    pub buffer: BufferParams,
    pub scene: S,
    pub output: Option<PathBuf>,
    pub observer: Option<Arc<dyn StatusObserver>>,
}

pub trait Engine: DeviceSelector + SceneLoader {
    type Session: RenderSession;

    /// Builds a session ready to be started, no work is done yet.
    fn create_session(&self, setup: SessionSetup<Self::Scene>) -> anyhow::Result<Self::Session>;
}

/// The built-in CPU path tracer.
#[derive(Debug, Default, Copy, Clone)]
pub struct CpuEngine;

impl DeviceSelector for CpuEngine {
    fn available_devices(&self) -> Vec<DeviceInfo> {
        available_devices(None)
    }
}

impl SceneSetup for Scene {
    fn resolution(&self) -> (u32, u32) {
        (self.camera.full_width, self.camera.full_height)
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.camera.full_width = width;
        self.camera.full_height = height;
    }

    fn compute_auto_viewplane(&mut self) {
        self.camera.compute_auto_viewplane();
    }

    fn add_output_pass(&mut self, name: &str) {
        self.add_pass(name, PassType::Combined);
    }
}

impl SceneLoader for CpuEngine {
    type Scene = Scene;

    fn load_scene(&self, path: &Path) -> anyhow::Result<Scene> {
        Ok(load_scene(path)?)
    }
}

impl Engine for CpuEngine {
    type Session = Session;

    fn create_session(&self, setup: SessionSetup<Scene>) -> anyhow::Result<Session> {
        let SessionSetup { session: params, scene_params, buffer, scene, output, observer } = setup;

        if let Some(path) = &output {
            if !ImageOutputDriver::supports(path) {
                bail!("unsupported output format {}, expected .png or .exr", path.display());
            }
        }

        let mut session = Session::new(params.clone(), scene_params, scene)
            .context("failed to create session")?;

        if let Some(path) = output {
            session.set_output_driver(Box::new(ImageOutputDriver::new(path, OUTPUT_PASS)));
        }
        if let Some(observer) = observer {
            session.progress().set_update_callback(observer);
        }

        session.reset(params, buffer);
        Ok(session)
    }
}

impl RenderSession for Session {
    fn start(&mut self) -> anyhow::Result<()> {
        Ok(Session::start(self)?)
    }

    fn wait(&self) {
        Session::wait(self)
    }

    fn cancel(&self) {
        Session::cancel(self)
    }

    fn is_cancelled(&self) -> bool {
        Session::is_cancelled(self)
    }

    fn is_failed(&self) -> bool {
        Session::is_failed(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cpu_engine_resolves_cpu_only() {
        let engine = CpuEngine;
        assert!(engine.resolve_device("cpu").is_some_and(|d| d.is_cpu()));
        assert!(engine.resolve_device("CUDA").is_none());
        assert!(engine.resolve_device("nonsense").is_none());
    }

    #[test]
    fn scene_setup_adds_pass_once() {
        let mut scene = Scene::default();
        scene.set_resolution(800, 600);
        scene.add_output_pass(OUTPUT_PASS);
        scene.add_output_pass(OUTPUT_PASS);

        assert_eq!((800, 600), SceneSetup::resolution(&scene));
        assert_eq!(1, scene.passes.len());
    }

    #[test]
    fn rejects_unsupported_output_before_creating_session() {
        let setup = SessionSetup {
            session: SessionParams::default(),
            scene_params: SceneParams::default(),
            buffer: BufferParams::new(4, 4),
            scene: Scene::default(),
            output: Some("render.tiff".into()),
            observer: None,
        };
        let error = CpuEngine.create_session(setup).err().expect("should fail");
        assert!(error.to_string().contains("render.tiff"));
    }

    #[test]
    fn non_cpu_session_fails() {
        let mut device = DeviceInfo::cpu();
        device.device_type = DeviceType::Metal;
        let setup = SessionSetup {
            session: SessionParams { device, ..SessionParams::default() },
            scene_params: SceneParams::default(),
            buffer: BufferParams::new(4, 4),
            scene: Scene::default(),
            output: None,
            observer: None,
        };
        assert!(CpuEngine.create_session(setup).is_err());
    }
}

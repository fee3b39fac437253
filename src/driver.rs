use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use itertools::Itertools;
use tracer::common::progress::StatusObserver;
use tracer::BufferParams;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::engine::{Engine, RenderSession, SceneSetup, SessionSetup, OUTPUT_PASS};

/// Lifecycle of the session owned by a [Driver].
///
/// ```text
/// Uninitialized -> Initializing -> Running -> Completed | Cancelled | Failed -> Released
/// ```
///
/// `Failed` means the session ended with an error, the image may be missing.
/// A failed initialization goes back to the state it started from, `cleanup` always
/// ends in `Released` and a released driver can be initialized again.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DriverState {
    Uninitialized,
    Initializing,
    Running,
    Completed,
    Cancelled,
    Failed,
    Released,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("a session is already active, call cleanup first")]
    SessionActive,
    #[error("failed to load scene {}", path.display())]
    SceneLoad { path: PathBuf, #[source] source: anyhow::Error },
    #[error("render resolution {width}x{height} is empty")]
    EmptyResolution { width: u32, height: u32 },
    #[error("failed to set up session")]
    Session(#[source] anyhow::Error),
}

impl InitError {
    pub fn is_config(&self) -> bool {
        matches!(self, InitError::Config(_))
    }

    /// The error followed by all of its causes, `outer: inner: ...`.
    pub fn report(&self) -> String {
        std::iter::successors(Some(self as &(dyn Error + 'static)), |&e| e.source()).join(": ")
    }
}

/// Owns at most one render session and sequences its lifecycle:
/// [Driver::initialize], then [Driver::render], then [Driver::cleanup].
pub struct Driver<E: Engine> {
    engine: E,
    observer: Option<Arc<dyn StatusObserver>>,
    attached_observer: Option<Arc<dyn StatusObserver>>,
    session: Option<E::Session>,
    state: DriverState,
    resolution: Option<(u32, u32)>,
}

impl<E: Engine> Driver<E> {
    pub fn new(engine: E) -> Self {
        Driver {
            engine,
            observer: None,
            attached_observer: None,
            session: None,
            state: DriverState::Uninitialized,
            resolution: None,
        }
    }

    /// The observer is only attached to sessions that run in the background and are not quiet.
    pub fn with_observer(engine: E, observer: Arc<dyn StatusObserver>) -> Self {
        let mut driver = Driver::new(engine);
        driver.observer = Some(observer);
        driver
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The resolution of the live session.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    /// Validates `config`, loads the scene and starts rendering it.
    ///
    /// Nothing is allocated if validation fails. On success the session is running in
    /// the background and [Driver::render] can be used to wait for it.
    pub fn initialize(&mut self, config: &Config) -> Result<(), InitError> {
        if self.session.is_some() {
            return Err(InitError::SessionActive);
        }

        let previous = self.state;
        self.state = DriverState::Initializing;

        match self.start_session(config) {
            Ok((session, resolution, observer)) => {
                info!("rendering {} at {}x{}", config.filepath.display(), resolution.0, resolution.1);
                self.session = Some(session);
                self.resolution = Some(resolution);
                self.attached_observer = observer;
                self.state = DriverState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn start_session(&self, config: &Config) -> Result<(E::Session, (u32, u32), Option<Arc<dyn StatusObserver>>), InitError> {
        let validated = config.validate(&self.engine)?;
        debug!("using device {} ({})", validated.device.device_type, validated.device.description);

        let mut scene = self.engine.load_scene(&config.filepath)
            .map_err(|source| InitError::SceneLoad { path: config.filepath.clone(), source })?;

        let (width, height) = effective_resolution(config.width, config.height, scene.resolution());
        if width == 0 || height == 0 {
            return Err(InitError::EmptyResolution { width, height });
        }
        scene.set_resolution(width, height);
        scene.compute_auto_viewplane();
        scene.add_output_pass(OUTPUT_PASS);

        let observer = if config.background && !config.quiet {
            self.observer.clone()
        } else {
            None
        };

        let setup = SessionSetup {
            session: validated.session_params(),
            scene_params: validated.scene_params(),
            buffer: BufferParams::new(width, height),
            scene,
            output: config.output_path.clone(),
            observer: observer.clone(),
        };

        let mut session = self.engine.create_session(setup).map_err(InitError::Session)?;
        session.start().map_err(InitError::Session)?;

        Ok((session, (width, height), observer))
    }

    /// Blocks until the running session has finished, does nothing without one.
    pub fn render(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if self.state != DriverState::Running {
            return;
        }

        session.wait();
        self.state = if session.is_failed() {
            DriverState::Failed
        } else if session.is_cancelled() {
            DriverState::Cancelled
        } else {
            DriverState::Completed
        };
        debug!("session ended as {:?}", self.state);
    }

    /// Releases the session if there is one, safe to call any number of times.
    pub fn cleanup(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session);
            debug!("session released");
        }
        if let Some(observer) = self.attached_observer.take() {
            observer.finish();
        }

        self.resolution = None;
        self.state = DriverState::Released;
    }
}

impl<E: Engine> Drop for Driver<E> {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.cleanup();
        }
    }
}

/// An explicit resolution wins, a zero in either dimension falls back to the camera.
pub fn effective_resolution(width: u32, height: u32, camera: (u32, u32)) -> (u32, u32) {
    if width > 0 && height > 0 {
        (width, height)
    } else {
        camera
    }
}

use std::path::PathBuf;

use tracer::common::scene::{ShadingSystem, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use tracer::device::{DeviceInfo, DeviceType};
use tracer::{SceneParams, SessionParams};

use crate::engine::DeviceSelector;

pub const DEFAULT_DEVICE: &str = "CPU";
pub const DEFAULT_SHADING_SYSTEM: &str = "svm";

/// Everything needed to set up one render, as given by the user.
///
/// Nothing here has been checked yet, see [Config::validate].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Output width, zero together with a zero height means "use the scene camera".
    pub width: u32,
    pub height: u32,
    pub filepath: PathBuf,
    /// Samples per pixel, zero means the scene decides. Negative values are rejected.
    pub samples: i32,
    /// Render threads, zero means one per logical core.
    pub threads: usize,
    pub shading_system: String,
    pub device: String,
    pub tile_size: u32,
    pub use_auto_tile: bool,
    pub background: bool,
    pub quiet: bool,
    pub use_profiling: bool,
    pub output_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            filepath: PathBuf::new(),
            samples: 0,
            threads: 0,
            shading_system: DEFAULT_SHADING_SYSTEM.to_owned(),
            device: DEFAULT_DEVICE.to_owned(),
            tile_size: 0,
            use_auto_tile: false,
            background: false,
            quiet: false,
            use_profiling: false,
            output_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
    #[error("Unknown shading system: {0}")]
    UnknownShadingSystem(String),
    #[error("OSL shading system only works with CPU device")]
    UnsupportedShadingDevice { device: DeviceType },
    #[error("Invalid number of samples: {0}")]
    InvalidSampleCount(i32),
    #[error("No file path specified")]
    MissingScenePath,
}

/// A [Config] that passed validation, with the device and shading system resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub config: Config,
    pub device: DeviceInfo,
    pub shading_system: ShadingSystem,
    pub samples: u32,
}

impl Config {
    /// Checks the configuration before anything gets allocated.
    ///
    /// The checks run in a fixed order and the first failure is returned:
    /// device, shading system, shading system on device, samples, scene path.
    pub fn validate(&self, devices: &impl DeviceSelector) -> Result<ValidatedConfig, ConfigError> {
        let device = devices.resolve_device(&self.device)
            .ok_or_else(|| ConfigError::UnknownDevice(self.device.clone()))?;

        let shading_system: ShadingSystem = self.shading_system.parse()
            .map_err(|_| ConfigError::UnknownShadingSystem(self.shading_system.clone()))?;

        if shading_system == ShadingSystem::Osl && !device.is_cpu() {
            return Err(ConfigError::UnsupportedShadingDevice { device: device.device_type });
        }

        let samples = u32::try_from(self.samples)
            .map_err(|_| ConfigError::InvalidSampleCount(self.samples))?;

        if self.filepath.as_os_str().is_empty() {
            return Err(ConfigError::MissingScenePath);
        }

        Ok(ValidatedConfig { config: self.clone(), device, shading_system, samples })
    }
}

impl ValidatedConfig {
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            device: self.device.clone(),
            samples: self.samples,
            threads: self.config.threads,
            background: self.config.background,
            tile_size: self.config.tile_size,
            use_auto_tile: self.config.use_auto_tile,
            use_profiling: self.config.use_profiling,
        }
    }

    pub fn scene_params(&self) -> SceneParams {
        SceneParams { shading_system: self.shading_system }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Devices(Vec<DeviceInfo>);

    impl DeviceSelector for Devices {
        fn available_devices(&self) -> Vec<DeviceInfo> {
            self.0.clone()
        }
    }

    fn gpu() -> DeviceInfo {
        DeviceInfo {
            device_type: DeviceType::Cuda,
            description: "Test GPU".to_owned(),
            id: "CUDA_0".to_owned(),
            num_threads: 0,
            display_device: true,
        }
    }

    fn config() -> Config {
        Config { filepath: "scene.json".into(), ..Config::default() }
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!((1024, 512), (config.width, config.height));
        assert_eq!("CPU", config.device);
        assert_eq!("svm", config.shading_system);
    }

    #[test]
    fn valid_config_resolves_device() {
        let validated = Config { samples: 16, threads: 3, ..config() }
            .validate(&Devices(vec![DeviceInfo::cpu()]))
            .expect("valid");

        assert!(validated.device.is_cpu());
        let params = validated.session_params();
        assert_eq!(16, params.samples);
        assert_eq!(3, params.threads);
        assert_eq!(ShadingSystem::Svm, validated.scene_params().shading_system);
    }

    #[test]
    fn device_names_are_case_insensitive() {
        let devices = Devices(vec![DeviceInfo::cpu(), gpu()]);
        let validated = Config { device: "cuda".to_owned(), ..config() }.validate(&devices).expect("valid");
        assert_eq!(DeviceType::Cuda, validated.device.device_type);
    }

    #[test]
    fn unknown_or_unavailable_device() {
        let devices = Devices(vec![DeviceInfo::cpu()]);
        for name in ["VULKAN", "CUDA", ""] {
            let result = Config { device: name.to_owned(), ..config() }.validate(&devices);
            assert_eq!(Err(ConfigError::UnknownDevice(name.to_owned())), result.map(|_| ()));
        }
    }

    #[test]
    fn unknown_shading_system() {
        let result = Config { shading_system: "glsl".to_owned(), ..config() }.validate(&Devices(vec![DeviceInfo::cpu()]));
        assert_eq!(Err(ConfigError::UnknownShadingSystem("glsl".to_owned())), result.map(|_| ()));
    }

    #[test]
    fn osl_requires_cpu() {
        let devices = Devices(vec![DeviceInfo::cpu(), gpu()]);
        let result = Config { device: "CUDA".to_owned(), shading_system: "osl".to_owned(), ..config() }.validate(&devices);
        assert_eq!(Err(ConfigError::UnsupportedShadingDevice { device: DeviceType::Cuda }), result.map(|_| ()));

        let validated = Config { shading_system: "osl".to_owned(), ..config() }.validate(&devices).expect("osl on cpu");
        assert_eq!(ShadingSystem::Osl, validated.shading_system);
    }

    #[test]
    fn negative_samples() {
        let result = Config { samples: -1, ..config() }.validate(&Devices(vec![DeviceInfo::cpu()]));
        assert_eq!(Err(ConfigError::InvalidSampleCount(-1)), result.map(|_| ()));
    }

    #[test]
    fn missing_scene_path() {
        let result = Config::default().validate(&Devices(vec![DeviceInfo::cpu()]));
        assert_eq!(Err(ConfigError::MissingScenePath), result.map(|_| ()));
    }

    #[test]
    fn checks_run_in_order() {
        let everything_wrong = Config {
            device: "VULKAN".to_owned(),
            shading_system: "glsl".to_owned(),
            samples: -5,
            ..Config::default()
        };
        let devices = Devices(vec![DeviceInfo::cpu()]);
        assert_eq!(Err(ConfigError::UnknownDevice("VULKAN".to_owned())), everything_wrong.validate(&devices).map(|_| ()));

        let bad_samples_no_path = Config { samples: -5, ..Config::default() };
        assert_eq!(Err(ConfigError::InvalidSampleCount(-5)), bad_samples_no_path.validate(&devices).map(|_| ()));
    }

    #[test]
    fn error_messages() {
        assert_eq!("Unknown device: FOO", ConfigError::UnknownDevice("FOO".to_owned()).to_string());
        assert_eq!("Invalid number of samples: -2", ConfigError::InvalidSampleCount(-2).to_string());
        assert_eq!("No file path specified", ConfigError::MissingScenePath.to_string());
        assert_eq!(
            "OSL shading system only works with CPU device",
            ConfigError::UnsupportedShadingDevice { device: DeviceType::Metal }.to_string()
        );
    }
}

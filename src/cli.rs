//! Command line entry point: parse the options, render, exit.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches, Parser};
use itertools::Itertools;
use tracer::common::scene::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use tracer::device::{available_types, DeviceInfo};
use tracer_cli::config::{Config, DEFAULT_DEVICE, DEFAULT_SHADING_SYSTEM};
use tracer_cli::driver::{Driver, DriverState, InitError};
use tracer_cli::engine::{CpuEngine, DeviceSelector};
use tracer_cli::logging;
use tracer_cli::status::ConsoleStatus;

#[derive(Parser, Debug)]
#[command(name = "tracer-cli")]
#[command(version)]
#[command(about = "Render a scene file offline")]
#[command(override_usage = "tracer-cli [options] <scene-file>")]
struct Cli {
    /// Scene to render, .json or .obj
    #[arg(value_name = "SCENE")]
    filepath: Option<PathBuf>,

    /// Device to render on
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,

    /// Shading system to use: svm, osl
    #[arg(long = "shadingsys", default_value = DEFAULT_SHADING_SYSTEM)]
    shading_system: String,

    /// Render in background, without user interface (always the case for this tool)
    #[arg(long)]
    background: bool,

    /// In background mode, don't print progress messages
    #[arg(long)]
    quiet: bool,

    /// Number of samples to render, 0 uses the scene's setting
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    samples: i32,

    /// File path to write output image, .png or .exr
    #[arg(long)]
    output: Option<PathBuf>,

    /// CPU rendering threads, 0 uses all cores
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Image width in pixels, 0 together with a zero height uses the scene camera
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Tile size in pixels
    #[arg(long, default_value_t = 0)]
    tile_size: u32,

    /// List information about all available devices
    #[arg(long)]
    list_devices: bool,

    /// Enable profile logging
    #[arg(long)]
    profile: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set verbosity of the logger
    #[arg(long, default_value_t = 1)]
    verbose: u8,
}

impl Cli {
    fn to_config(&self, filepath: PathBuf) -> Config {
        Config {
            width: self.width,
            height: self.height,
            filepath,
            samples: self.samples,
            threads: self.threads,
            shading_system: self.shading_system.clone(),
            device: self.device.clone(),
            tile_size: self.tile_size,
            use_auto_tile: self.tile_size > 0,
            // there is no interactive window, so progress always goes to the console
            background: true,
            quiet: self.quiet,
            use_profiling: self.profile,
            output_path: self.output.clone(),
        }
    }
}

fn command() -> clap::Command {
    let devices = available_types().iter().join(", ");
    Cli::command().mut_arg("device", |arg| arg.help(format!("Devices to use: {}", devices)))
}

fn parse() -> Result<Cli, clap::Error> {
    let matches = command().try_get_matches()?;
    Cli::from_arg_matches(&matches)
}

pub fn format_devices(devices: &[DeviceInfo]) -> String {
    let mut result = String::from("Devices:\n");
    for info in devices {
        let display = if info.display_device { " (display)" } else { "" };
        let _ = writeln!(result, "    {:<10}{}{}", info.device_type.name(), info.description, display);
    }
    result
}

fn fatal(error: &InitError) -> ! {
    eprintln!("{}", error.report());
    exit(1);
}

/// Runs the tool and returns the process exit code.
pub fn run() -> i32 {
    let cli = match parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return code;
        }
    };

    logging::init_cli(cli.debug, cli.verbose, cli.profile);

    let engine = CpuEngine;
    if cli.list_devices {
        print!("{}", format_devices(&engine.available_devices()));
        return 0;
    }

    let Some(filepath) = cli.filepath.clone() else {
        let _ = command().print_help();
        return 0;
    };

    let config = cli.to_config(filepath);
    let mut driver = Driver::with_observer(engine, Arc::new(ConsoleStatus::stdout()));

    if let Err(e) = driver.initialize(&config) {
        fatal(&e);
    }
    driver.render();
    let failed = driver.state() == DriverState::Failed;
    driver.cleanup();

    if failed {
        eprintln!("Render failed");
        return 1;
    }
    0
}

#[cfg(test)]
mod test {
    use tracer::device::DeviceType;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn tile_size_enables_auto_tile() {
        let cli = Cli::try_parse_from(["tracer-cli", "--tile-size", "32", "--samples", "-3", "scene.json"]).expect("valid args");
        let config = cli.to_config("scene.json".into());
        assert!(config.use_auto_tile);
        assert!(config.background);
        assert_eq!(-3, config.samples);

        let cli = Cli::try_parse_from(["tracer-cli", "scene.json"]).expect("valid args");
        let config = cli.to_config("scene.json".into());
        assert!(!config.use_auto_tile);
        assert_eq!((1024, 512), (config.width, config.height));
        assert_eq!("CPU", config.device);
    }

    #[test]
    fn device_listing() {
        let gpu = DeviceInfo {
            device_type: DeviceType::Cuda,
            description: "Test GPU".to_owned(),
            id: "CUDA_0".to_owned(),
            num_threads: 0,
            display_device: true,
        };
        let cpu = DeviceInfo { description: "Host CPU".to_owned(), ..DeviceInfo::cpu() };

        assert_eq!(
            "Devices:\n    CPU       Host CPU\n    CUDA      Test GPU (display)\n",
            format_devices(&[cpu, gpu])
        );
    }
}

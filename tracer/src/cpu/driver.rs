use std::cmp::min;
use std::time::Instant;

use imgref::ImgVec;
use rand::prelude::SliceRandom;
use rand::rngs::SmallRng;
use rand::{thread_rng, SeedableRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::debug;

use crate::common::progress::{Block, PixelResult, Progress};
use crate::common::scene::Scene;
use crate::cpu::renderer::{CpuRenderSettings, RayCamera, RenderStructure};

pub const DEFAULT_BLOCK_SIZE: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to spawn collector thread")]
    Spawn(#[from] std::io::Error),
    #[error("render was cancelled")]
    Cancelled,
    #[error("image size {width}x{height} is empty")]
    EmptyImage { width: u32, height: u32 },
}

pub struct CpuRenderer<'p> {
    pub settings: CpuRenderSettings,
    pub block_size: u32,
    /// Worker count, zero means one per logical core.
    pub threads: usize,
    pub progress: &'p Progress,
}

pub fn split_into_blocks(width: u32, height: u32, block_size: u32) -> Vec<Block> {
    let block_size = block_size.max(1);

    let mut result = Vec::new();
    for y in (0..height).step_by(block_size as usize) {
        for x in (0..width).step_by(block_size as usize) {
            result.push(Block {
                x,
                y,
                width: min(block_size, width - x),
                height: min(block_size, height - y),
            })
        }
    }

    result
}

impl CpuRenderer<'_> {
    pub fn render(&self, scene: &Scene, width: u32, height: u32) -> Result<ImgVec<PixelResult>, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyImage { width, height });
        }

        let threads = if self.threads == 0 { num_cpus::get() } else { self.threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tracer-worker-{}", i))
            .build()?;

        let mut blocks = split_into_blocks(width, height, self.block_size);
        blocks.shuffle(&mut thread_rng());
        let block_count = blocks.len();
        debug!("rendering {}x{} in {} blocks on {} threads", width, height, block_count, threads);

        let settings = self.settings;
        let structure = RenderStructure {
            scene,
            camera: RayCamera::new(&scene.camera, settings.anti_alias, width, height),
            settings,
        };
        let progress = self.progress;
        let start = Instant::now();

        // channel to send results back to the collector
        let (sender, receiver) =
            crossbeam::channel::unbounded::<(Block, Vec<PixelResult>)>();

        let result = std::thread::scope(|s| {
            // the collector assembles the final image and reports progress
            let collector = std::thread::Builder::new()
                .name("collector".to_owned())
                .spawn_scoped(s, move || {
                    let target_buf = vec![PixelResult::default(); (width as usize) * (height as usize)];
                    let mut target = ImgVec::new(target_buf, width as usize, height as usize);

                    let mut finished = 0;
                    for (block, pixels) in receiver {
                        for dy in 0..block.height {
                            for dx in 0..block.width {
                                target[(block.x + dx, block.y + dy)] = pixels[(dy * block.width + dx) as usize];
                            }
                        }

                        finished += 1;
                        progress.update(
                            finished as f64 / block_count as f64,
                            "Rendering",
                            format!("Tile {}/{}, Sample {}", finished, block_count, settings.samples),
                        );
                    }

                    target
                })?;

            pool.install(|| {
                blocks.par_iter().panic_fuse().for_each_init(SmallRng::from_entropy, |rng, block: &Block| {
                    if progress.get_cancel() {
                        return;
                    }

                    let mut data = Vec::with_capacity(block.pixel_count() as usize);
                    for y in block.y_range() {
                        for x in block.x_range() {
                            data.push(structure.calculate_pixel(rng, x, y));
                        }
                    }

                    // the collector only stops once every sender is gone
                    let _ = sender.send((*block, data));
                });
            });
            drop(sender);

            let image = collector.join()
                .unwrap_or_else(|e| std::panic::resume_unwind(e));
            Ok::<_, RenderError>(image)
        })?;

        if progress.get_cancel() {
            return Err(RenderError::Cancelled);
        }

        debug!("rendered {} blocks in {:?}", block_count, start.elapsed());
        Ok(result)
    }
}

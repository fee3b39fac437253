use std::path::{Path, PathBuf};

use imgref::ImgRef;
use tracing::info;

use crate::common::progress::PixelResult;
use crate::common::scene::Color;

type DiscreteImage = image::ImageBuffer<image::Rgb<u8>, Vec<u8>>;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("unsupported output format for {0}, expected .png or .exr")]
    UnsupportedFormat(PathBuf),
    #[error("failed to write png {path}")]
    Png { path: PathBuf, #[source] source: image::ImageError },
    #[error("failed to write exr {path}")]
    Exr { path: PathBuf, #[source] source: exr::error::Error },
}

/// Receives finished passes from a session.
pub trait OutputDriver: Send {
    fn write_render(&mut self, pass: &str, image: ImgRef<PixelResult>) -> Result<(), OutputError>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ImageFormat {
    Png,
    Exr,
}

impl ImageFormat {
    fn from_path(path: &Path) -> Option<ImageFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(ImageFormat::Png),
            "exr" => Some(ImageFormat::Exr),
            _ => None,
        }
    }
}

/// Writes a single named pass to an image file, the format follows the extension.
#[derive(Debug, Clone)]
pub struct ImageOutputDriver {
    path: PathBuf,
    pass: String,
}

impl ImageOutputDriver {
    pub fn new(path: impl Into<PathBuf>, pass: impl Into<String>) -> Self {
        ImageOutputDriver { path: path.into(), pass: pass.into() }
    }

    /// Whether the extension of `path` names a format this driver can write.
    pub fn supports(path: &Path) -> bool {
        ImageFormat::from_path(path).is_some()
    }
}

impl OutputDriver for ImageOutputDriver {
    fn write_render(&mut self, pass: &str, image: ImgRef<PixelResult>) -> Result<(), OutputError> {
        if pass != self.pass {
            return Ok(());
        }

        let format = ImageFormat::from_path(&self.path)
            .ok_or_else(|| OutputError::UnsupportedFormat(self.path.clone()))?;

        info!("Writing image {}", self.path.display());
        match format {
            ImageFormat::Png => to_discrete_image(image).save(&self.path)
                .map_err(|source| OutputError::Png { path: self.path.clone(), source }),
            ImageFormat::Exr => exr::prelude::write_rgb_file(&self.path, image.width(), image.height(), |x, y| {
                let color = image[(x, y)].color;
                (color.red, color.green, color.blue)
            }).map_err(|source| OutputError::Exr { path: self.path.clone(), source }),
        }
    }
}

/// Convert the given image to 8-bit sRGB, values outside `[0, 1]` are clipped.
pub fn to_discrete_image(image: ImgRef<PixelResult>) -> DiscreteImage {
    let mut result = DiscreteImage::new(image.width() as u32, image.height() as u32);

    for (x, y, p) in result.enumerate_pixels_mut() {
        let linear: Color = image[(x, y)].color;
        let srgb = palette::Srgb::from_linear(linear);
        let data = srgb.into_format();
        *p = image::Rgb([data.red, data.green, data.blue]);
    }

    result
}

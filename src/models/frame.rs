use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};

/// A decoded raster frame. Cloning is cheap; pixel data is shared.
#[derive(Clone)]
pub struct Frame {
    image: Arc<DynamicImage>,
}

impl Frame {
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Decodes an image file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        Ok(Self::from_image(image))
    }

    /// Solid black frame of the given size; mostly useful with stub recognizers.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_image(DynamicImage::new_luma8(width, height))
    }

    /// Scales the frame to `width` x `height`, the way a capture device set
    /// to that size delivers it. Returns a cheap clone when the size already matches.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.width() == width && self.height() == height {
            return self.clone();
        }
        Self::from_image(self.image.resize_exact(width, height, FilterType::Triangle))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

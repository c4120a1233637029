//! 合成帧源: 固定尺寸的灰色帧, 可限制帧数

use anyhow::Result;
use image::{Rgb, RgbImage};

use super::FrameSource;

pub struct SyntheticSource {
    width: u32,
    height: u32,
    limit: Option<u64>,
    produced: u64,
    name: String,
}

impl SyntheticSource {
    /// `limit = None` 时无限产生帧
    pub fn new(width: u32, height: u32, limit: Option<u64>) -> Self {
        Self {
            width,
            height,
            limit,
            produced: 0,
            name: format!("Blank({}x{})", width, height),
        }
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if let Some(limit) = self.limit {
            if self.produced >= limit {
                return Ok(None);
            }
        }
        self.produced += 1;
        Ok(Some(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([128, 128, 128]),
        )))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

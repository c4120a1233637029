//! 图片序列输入
//!
//! 目录中的静态图片按文件名排序后逐帧读取, 相当于一段已解码的视频。

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{info, warn};

use super::FrameSource;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

enum Frames {
    Files(VecDeque<PathBuf>),
    Memory(VecDeque<RgbImage>),
}

pub struct ImageSequence {
    frames: Frames,
    name: String,
}

impl ImageSequence {
    /// 扫描目录
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("输入目录不存在: {}", dir.display());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("无法读取目录 {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("⚠️ 目录中没有图片: {}", dir.display());
        } else {
            info!("📂 图片序列: {} ({} 帧)", dir.display(), files.len());
        }

        Ok(Self {
            frames: Frames::Files(files.into()),
            name: format!("Images({})", dir.display()),
        })
    }

    /// 内存中的帧序列
    pub fn from_images(images: Vec<RgbImage>) -> Self {
        Self {
            frames: Frames::Memory(images.into()),
            name: "Images(memory)".to_string(),
        }
    }

    /// 剩余帧数
    pub fn remaining(&self) -> usize {
        match &self.frames {
            Frames::Files(files) => files.len(),
            Frames::Memory(images) => images.len(),
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match &mut self.frames {
            Frames::Memory(images) => Ok(images.pop_front()),
            Frames::Files(files) => {
                let Some(path) = files.pop_front() else {
                    return Ok(None);
                };
                let img = image::open(&path)
                    .with_context(|| format!("图片解码失败: {}", path.display()))?;
                Ok(Some(img.to_rgb8()))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_directory_sorted_by_name() {
        let dir = std::env::temp_dir().join(format!("yoloface-seq-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        RgbImage::from_pixel(4, 4, Rgb([200, 0, 0]))
            .save(dir.join("frame_000002.png"))
            .unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 200, 0]))
            .save(dir.join("frame_000001.png"))
            .unwrap();
        fs::write(dir.join("notes.txt"), "skip me").unwrap();

        let mut seq = ImageSequence::open(&dir).unwrap();
        assert_eq!(seq.remaining(), 2);
        assert_eq!(seq.next_frame().unwrap().unwrap().get_pixel(0, 0), &Rgb([0, 200, 0]));
        assert_eq!(seq.next_frame().unwrap().unwrap().get_pixel(0, 0), &Rgb([200, 0, 0]));
        assert!(seq.next_frame().unwrap().is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory() {
        assert!(ImageSequence::open("/nonexistent/frames").is_err());
    }

    #[test]
    fn test_in_memory() {
        let mut seq = ImageSequence::from_images(vec![RgbImage::new(2, 2), RgbImage::new(3, 3)]);
        assert_eq!(seq.next_frame().unwrap().unwrap().width(), 2);
        assert_eq!(seq.next_frame().unwrap().unwrap().width(), 3);
        assert!(seq.next_frame().unwrap().is_none());
    }
}

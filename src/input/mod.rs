/// 视频输入系统 (Video Input System)
///
/// 帧泵从 `FrameSource` 逐帧读取, 读到 `None` 即流结束
/// - ImageSequence: 图片目录 (按文件名排序) 或内存中的帧
/// - SyntheticSource: 固定尺寸的灰色空白帧 (测试 / 基准)
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use image::RgbImage;

pub mod image_sequence;
pub mod synthetic;

pub use image_sequence::ImageSequence;
pub use synthetic::SyntheticSource;

/// 帧源
pub trait FrameSource: Send {
    /// 读取下一帧, `Ok(None)` 表示流结束
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    fn name(&self) -> &str;
}

/// 输入源描述 (命令行解析)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// `dir:<路径>` 或直接给路径
    Directory(PathBuf),
    /// `blank:<宽>x<高>[x<帧数>]`
    Blank {
        width: u32,
        height: u32,
        frames: Option<u64>,
    },
}

impl FromStr for InputSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("输入源为空");
        }

        if let Some(path) = s.strip_prefix("dir:") {
            return Ok(InputSource::Directory(PathBuf::from(path)));
        }

        if let Some(dims) = s.strip_prefix("blank:") {
            let parts: Vec<&str> = dims.split('x').collect();
            let parse = |v: &str| -> Result<u64> {
                v.parse::<u64>()
                    .map_err(|_| anyhow!("无效的空白帧参数: {}", s))
            };
            let (width, height, frames) = match *parts.as_slice() {
                [w, h] => (parse(w)?, parse(h)?, None),
                [w, h, n] => (parse(w)?, parse(h)?, Some(parse(n)?)),
                _ => bail!("空白帧格式应为 blank:<宽>x<高>[x<帧数>], 实际: {}", s),
            };
            if width == 0 || height == 0 || width > u32::MAX as u64 || height > u32::MAX as u64 {
                bail!("无效的帧尺寸: {}x{}", width, height);
            }
            return Ok(InputSource::Blank {
                width: width as u32,
                height: height as u32,
                frames,
            });
        }

        Ok(InputSource::Directory(PathBuf::from(s)))
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Directory(path) => write!(f, "dir:{}", path.display()),
            InputSource::Blank {
                width,
                height,
                frames: Some(n),
            } => write!(f, "blank:{}x{}x{}", width, height, n),
            InputSource::Blank {
                width,
                height,
                frames: None,
            } => write!(f, "blank:{}x{}", width, height),
        }
    }
}

/// 打开输入源
pub fn open_source(source: &InputSource) -> Result<Box<dyn FrameSource>> {
    match source {
        InputSource::Directory(path) => Ok(Box::new(ImageSequence::open(path)?)),
        InputSource::Blank {
            width,
            height,
            frames,
        } => Ok(Box::new(SyntheticSource::new(*width, *height, *frames))),
    }
}

/// 人脸检测器统一接口
///
/// # 架构说明
///
/// 跟踪器不关心检测框来自哪里, 只要求每帧给出一组 `BBox`。
/// 检测器通过 `FaceDetector` trait 接入帧泵 (`detection::Detector`)。
///
/// ## 已实现
/// - **Replay**: 回放预先计算好的检测结果 (`.json` / `.jsonl`)
///   - 文件: `replay.rs`
///
/// ## 使用示例
/// ```no_run
/// use yoloface_rs::models::{load_detector, FaceDetector};
///
/// let model = load_detector("faces.jsonl", 0.25)?;
/// println!("检测器: {}", model.name());
/// # Ok::<(), anyhow::Error>(())
/// ```
use std::path::Path;

use anyhow::{bail, Result};
use image::RgbImage;
use tracing::info;

use crate::detection::BBox;

pub mod replay;

pub use replay::ReplayDetector;

/// 人脸检测器
pub trait FaceDetector: Send {
    /// 检测一帧, 返回人脸框 (顺序即跟踪器的遍历顺序)
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<BBox>>;

    /// 检测器名称 (用于日志和信息叠加层)
    fn name(&self) -> &str;
}

/// 检测器类型 (根据文件名自动识别)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// JSON数组, 每个元素是一帧的检测列表
    ReplayJson,
    /// JSON Lines, 每行一帧
    ReplayJsonLines,
}

impl DetectorKind {
    /// 从文件路径推断检测器类型
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DetectorKind::ReplayJson),
            "jsonl" | "ndjson" => Some(DetectorKind::ReplayJsonLines),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::ReplayJson => "Replay(JSON)",
            DetectorKind::ReplayJsonLines => "Replay(JSONL)",
        }
    }
}

/// 按文件类型加载检测器
pub fn load_detector<P: AsRef<Path>>(
    path: P,
    conf_threshold: f32,
) -> Result<Box<dyn FaceDetector>> {
    let path = path.as_ref();
    let Some(kind) = DetectorKind::from_path(path) else {
        bail!("无法识别的检测器类型: {}", path.display());
    };
    info!("📦 检测器类型: {} ({})", kind.name(), path.display());

    let detector = match kind {
        DetectorKind::ReplayJson => ReplayDetector::from_json_file(path, conf_threshold)?,
        DetectorKind::ReplayJsonLines => ReplayDetector::from_jsonl_file(path, conf_threshold)?,
    };
    Ok(Box::new(detector))
}

/// 检测系统 (Detection System)
///
/// 独立工作线程,负责人脸分析
/// - Detector:     帧泵 (读取 → 检测 → 跟踪 → 绘制)
/// - IouTracker:   IoU贪心跟踪
/// - Demographics: 性别/年龄估计
pub mod demographics;
pub mod detector;
pub mod history;
pub mod iou_tracker;
pub mod tracker;
pub mod types;

pub use demographics::{Annotator, HeuristicAnnotator};
pub use detector::{DetectionResult, Detector};
pub use history::TrackHistory;
pub use iou_tracker::IouTracker;
pub use tracker::{compute_iou, TrackedFace};
pub use types::{
    AgeEstimate, AgeGroup, BBox, Demographics, FacePayload, Gender, GenderEstimate, Rect, TrackMap,
};

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 命令行参数与配置文件
pub mod detection; // 检测 + 跟踪系统
pub mod input; // 视频输入系统
pub mod models; // 人脸检测器接口与实现
pub mod renderer; // 帧标注绘制
pub mod utils;

pub use crate::config::{Algorithm, AppConfig, Args};
pub use crate::detection::{
    BBox, DetectionResult, Detector, FacePayload, IouTracker, Rect, TrackMap,
};
pub use crate::input::{open_source, FrameSource, InputSource};
pub use crate::models::{load_detector, FaceDetector};
pub use crate::renderer::Renderer;

/// 本地时间字符串, 用作输出子目录名
pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    chrono::Local::now().format(&fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_string_delimiter() {
        let s = gen_time_string("-");
        assert_eq!(s.split('-').count(), 7);
        assert!(s.starts_with("20"));
    }
}

//! 配置 - 命令行参数 + JSON配置文件

use std::fs;
use std::io;
use std::path::Path;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::detection::iou_tracker::{DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_HISTORY};

/// 运行算法
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// 检测 + IoU跟踪
    Track,
    /// 仅检测, 不分配跟踪ID
    Detect,
}

impl Algorithm {
    pub fn display_name(&self) -> &'static str {
        match self {
            Algorithm::Track => "Tracking",
            Algorithm::Detect => "Detection",
        }
    }
}

/// 人脸检测与跟踪 (命令行版本)
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "人脸检测与跟踪 (命令行版本)", long_about = None)]
pub struct Args {
    /// 输入源: 图片目录 (dir:<路径>) 或空白帧 (blank:<宽>x<高>[x<帧数>])
    #[arg(short, long)]
    pub source: String,

    /// 检测结果文件 (.json / .jsonl), 每帧一组 [x1, y1, x2, y2, conf, cls]
    #[arg(short, long)]
    pub detections: String,

    /// 运行算法
    #[arg(short, long, value_enum, default_value_t = Algorithm::Track)]
    pub algorithm: Algorithm,

    /// 配置文件路径 (不存在时写入默认配置)
    #[arg(short, long, default_value = "facetrack.json")]
    pub config: String,

    /// 标签字体 (ttf/otf), 不提供则只绘制框和轨迹
    #[arg(long)]
    pub font: Option<String>,

    /// 处理的最大帧数
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// 覆盖配置中的IoU阈值
    #[arg(long)]
    pub iou: Option<f32>,

    /// 覆盖配置中的历史长度
    #[arg(long)]
    pub max_history: Option<usize>,

    /// 覆盖配置中的检测置信度阈值
    #[arg(long)]
    pub conf: Option<f32>,

    /// 保存标注后的帧
    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// 输出目录
    #[arg(short, long)]
    pub output: Option<String>,

    /// 不绘制轨迹
    #[arg(long, default_value_t = false)]
    pub no_trail: bool,
}

/// 跟踪参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub iou_threshold: f32, // 关联IoU阈值 (严格大于)
    pub max_history: usize, // 历史长度 = 最大滑行预算

    /// 预留参数, 当前的衰减规则不读取它
    pub track_lost_threshold: u32,

    pub trail_length: usize,      // 绘制的尾迹点数
    pub color_seed: Option<u64>, // 颜色随机种子 (None = 每次运行不同)
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_history: DEFAULT_MAX_HISTORY,
            track_lost_threshold: 5,
            trail_length: 10,
            color_seed: None,
        }
    }
}

/// 检测参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub conf_threshold: f32, // 检测置信度阈值
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
        }
    }
}

/// 人口属性 (性别/年龄) 参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicsConfig {
    pub gender_enabled: bool,
    pub age_enabled: bool,
}

impl Default for DemographicsConfig {
    fn default() -> Self {
        Self {
            gender_enabled: true,
            age_enabled: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub fps_update_interval: u32, // FPS统计间隔 (帧)
    pub log_interval: u64,        // 控制台输出间隔 (帧)
    pub channel_capacity: usize,  // 工作线程 → 消费线程 队列长度
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            fps_update_interval: 30,
            log_interval: 30,
            channel_capacity: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub save_frames: bool,
    pub save_interval: u64,
    pub output_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_frames: false,
            save_interval: 100,
            output_dir: "output".to_string(),
        }
    }
}

/// 应用配置
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub tracking: TrackingConfig,
    pub demographics: DemographicsConfig,
    pub performance: PerformanceConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写入默认配置; 读取或解析失败时使用默认值, 不改动原文件
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {:#}", e);
                }
                config
            }
            // 不可读 (编码/权限/目录): 不覆盖用户文件
            Err(e) => {
                warn!("⚠️  无法读取配置 {}: {}, 使用默认值", path.display(), e);
                Self::default()
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 命令行参数覆盖配置文件
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(iou) = args.iou {
            self.tracking.iou_threshold = iou;
        }
        if let Some(max_history) = args.max_history {
            self.tracking.max_history = max_history;
        }
        if let Some(conf) = args.conf {
            self.detection.conf_threshold = conf;
        }
        if args.save {
            self.output.save_frames = true;
        }
        if let Some(output) = &args.output {
            self.output.output_dir = output.clone();
        }
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前配置:");
        info!("  检测置信度: {:.2}", self.detection.conf_threshold);
        info!(
            "  IoU阈值: {:.2} | 历史长度: {}",
            self.tracking.iou_threshold, self.tracking.max_history
        );
        info!(
            "  性别识别: {} | 年龄识别: {}",
            self.demographics.gender_enabled, self.demographics.age_enabled
        );
        if self.output.save_frames {
            info!(
                "  保存帧: 每{}帧 → {}",
                self.output.save_interval, self.output.output_dir
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.tracking.iou_threshold, 0.3);
        assert_eq!(config.tracking.max_history, 30);
        assert_eq!(config.tracking.track_lost_threshold, 5);
        assert_eq!(config.tracking.trail_length, 10);
        assert_eq!(config.performance.fps_update_interval, 30);
        assert_eq!(config.output.save_interval, 100);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "tracking": { "iou_threshold": 0.5 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tracking.iou_threshold, 0.5);
        assert_eq!(config.tracking.max_history, 30);
        assert_eq!(config.detection, DetectionConfig::default());
    }

    #[test]
    fn test_load_missing_file_writes_default() {
        let dir = std::env::temp_dir().join(format!("yoloface-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("facetrack.json");
        let _ = fs::remove_file(&path);

        let config = AppConfig::load(&path);
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load(&path);
        assert_eq!(reloaded, config);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let dir = std::env::temp_dir().join(format!("yoloface-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(AppConfig::load(&path), AppConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unreadable_file_left_untouched() {
        let dir = std::env::temp_dir().join(format!("yoloface-gbk-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("facetrack.json");
        // GBK 编码的 "输出", 不是合法UTF-8
        let mut bytes = br#"{ "output": { "output_dir": ""#.to_vec();
        bytes.extend_from_slice(&[0xca, 0xe4, 0xb3, 0xf6]);
        bytes.extend_from_slice(br#"" } }"#);
        fs::write(&path, &bytes).unwrap();

        assert_eq!(AppConfig::load(&path), AppConfig::default());
        assert_eq!(fs::read(&path).unwrap(), bytes);

        // 路径是目录时同样不写入
        let as_dir = dir.join("config_dir");
        fs::create_dir_all(&as_dir).unwrap();
        assert_eq!(AppConfig::load(&as_dir), AppConfig::default());
        assert!(as_dir.is_dir());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_args_override() {
        let args = Args::parse_from([
            "facetrack",
            "--source",
            "blank:64x64x3",
            "--detections",
            "dets.jsonl",
            "--iou",
            "0.6",
            "--save",
        ]);
        let mut config = AppConfig::default();
        config.apply_args(&args);
        assert_eq!(config.tracking.iou_threshold, 0.6);
        assert!(config.output.save_frames);
        assert_eq!(args.algorithm, Algorithm::Track);
    }
}

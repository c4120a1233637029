//! 检测器 (Detector)
//! 职责: 读取帧 → 人脸检测 → IoU跟踪 → 绘制 → 发送DetectionResult消息
//!
//! 跟踪器只存在于工作线程内, 消费端只拿到已绘制的帧和本帧的跟踪结果。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use crossbeam_channel::Sender;
use image::RgbImage;
use tracing::{debug, error, info, warn};

use super::demographics::HeuristicAnnotator;
use super::iou_tracker::IouTracker;
use super::types::{BBox, TrackMap};
use crate::config::{Algorithm, AppConfig};
use crate::input::FrameSource;
use crate::models::FaceDetector;
use crate::renderer::Renderer;
use crate::utils::FpsCounter;

/// 检测结果 (工作线程 → 消费线程)
#[derive(Clone, Debug)]
pub struct DetectionResult {
    pub frame_id: u64,
    pub image: RgbImage,         // 已绘制标注的帧
    pub detections: Vec<BBox>,   // 检测器原始输出
    pub tracks: TrackMap,        // 本帧可见的目标 (仅检测模式下为空)
    pub live_count: usize,
    pub fps: f64,
}

/// 跟踪器类型
enum TrackerType {
    Iou(Box<IouTracker>),
    None,
}

pub struct Detector {
    source: Box<dyn FrameSource>,
    model: Box<dyn FaceDetector>,
    tracker: TrackerType,
    renderer: Renderer,
    algorithm: Algorithm,

    // 统计
    fps: FpsCounter,
    log_interval: u64,

    /// 处理帧数上限 (None = 不限)
    max_frames: Option<u64>,
}

impl Detector {
    pub fn new(
        source: Box<dyn FrameSource>,
        model: Box<dyn FaceDetector>,
        algorithm: Algorithm,
        renderer: Renderer,
        config: &AppConfig,
    ) -> Self {
        let tracker = match algorithm {
            Algorithm::Track => {
                info!("🎯 跟踪器: IoU (贪心匹配 + 历史衰减)");
                let mut tracker = IouTracker::from_config(&config.tracking);
                let annotator = HeuristicAnnotator::from_config(&config.demographics);
                if annotator.is_enabled() {
                    info!(
                        "👤 人口属性估计: 性别={} 年龄={}",
                        annotator.gender_enabled, annotator.age_enabled
                    );
                    tracker = tracker.with_annotator(Box::new(annotator));
                }
                TrackerType::Iou(Box::new(tracker))
            }
            Algorithm::Detect => {
                info!("🎯 跟踪器: 禁用 (仅检测)");
                TrackerType::None
            }
        };

        Self {
            source,
            model,
            tracker,
            renderer,
            algorithm,
            fps: FpsCounter::new(config.performance.fps_update_interval),
            log_interval: config.performance.log_interval.max(1),
            max_frames: None,
        }
    }

    /// 处理满 `max_frames` 帧后停止
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// 在独立线程中运行, 返回处理的帧数
    pub fn spawn(
        mut self,
        running: Arc<AtomicBool>,
        tx: Sender<DetectionResult>,
    ) -> JoinHandle<Result<u64>> {
        thread::spawn(move || self.run(&running, &tx))
    }

    /// 帧泵主循环
    ///
    /// 结束条件: `running` 被清除、达到帧数上限、输入结束、接收端断开; 检测失败时返回错误
    pub fn run(&mut self, running: &AtomicBool, tx: &Sender<DetectionResult>) -> Result<u64> {
        info!(
            "🔍 检测模块启动: 输入={} 检测器={} 算法={}",
            self.source.name(),
            self.model.name(),
            self.algorithm.display_name()
        );

        let mut processed: u64 = 0;
        while running.load(Ordering::Relaxed) {
            if self.max_frames.is_some_and(|max| processed >= max) {
                info!("⏹️ 已达到最大帧数 {}", processed);
                break;
            }

            let mut frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("📭 输入结束");
                    break;
                }
                Err(e) => {
                    error!("❌ 读取帧失败: {:#}", e);
                    return Err(e);
                }
            };

            let detections = match self.model.detect(&frame) {
                Ok(dets) => dets,
                Err(e) => {
                    error!("❌ 检测失败 (帧 {}): {:#}", processed, e);
                    return Err(e.context(format!("帧 {} 检测失败", processed)));
                }
            };

            // 先跟踪 (属性估计需要未绘制的原始帧), 再绘制
            let tracks = match &mut self.tracker {
                TrackerType::Iou(tracker) => {
                    let tracks = tracker.update(&detections, Some(&frame));
                    self.renderer.draw_tracks(&mut frame, &tracks, tracker);
                    tracks
                }
                TrackerType::None => {
                    self.renderer.draw_detections(&mut frame, &detections);
                    TrackMap::new()
                }
            };
            let live_count = match self.tracker {
                TrackerType::Iou(_) => tracks.len(),
                TrackerType::None => detections.len(),
            };

            let fps = self.fps.tick();
            self.renderer.draw_info(&mut frame, fps, live_count);

            let frame_id = processed;
            processed += 1;

            if processed % self.log_interval == 0 {
                info!(
                    "[帧 {}] FPS: {:.1} | 检测数量: {} | 算法: {}",
                    processed,
                    fps,
                    live_count,
                    self.algorithm.display_name()
                );
                if let TrackerType::Iou(tracker) = &self.tracker {
                    let dormant = tracker
                        .tracks()
                        .filter(|t| !tracks.contains_key(&t.id()))
                        .count();
                    debug!("🎯 可见 {} | 休眠 {}", tracks.len(), dormant);
                }
            }

            let result = DetectionResult {
                frame_id,
                image: frame,
                detections,
                tracks,
                live_count,
                fps,
            };
            if tx.send(result).is_err() {
                warn!("⚠️ 结果接收端已关闭, 检测模块退出");
                break;
            }
        }

        info!("✅ 检测模块停止, 共处理 {} 帧", processed);
        Ok(processed)
    }
}

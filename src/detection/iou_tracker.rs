//! IoU 贪心跟踪器
//! Greedy IoU association tracker
//!
//! 核心思想:
//! 1. 按ID升序遍历已有目标, 每个目标贪心地取IoU最大的未使用检测框
//! 2. 匹配成功: 追加历史, 本帧可见 (live)
//! 3. 匹配失败: 弹出最旧的历史框, 本帧休眠 (dormant), 不出现在返回结果中
//! 4. 剩余的检测框创建新目标, ID单调递增且永不复用
//! 5. 历史清空的目标立即删除 (dead)
//!
//! 没有卡尔曼预测, 没有匈牙利最优分配, 也没有重识别。

use std::collections::BTreeMap;

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::demographics::Annotator;
use super::history::TrackHistory;
use super::tracker::{compute_iou, random_color, TrackedFace};
use super::types::{BBox, FacePayload, TrackMap};
use crate::config::TrackingConfig;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;
pub const DEFAULT_MAX_HISTORY: usize = 30;

/// 单线程、有状态的跟踪器
///
/// `update` 必须按帧顺序调用, 同一实例不能并发或重入调用。
pub struct IouTracker {
    iou_threshold: f32,
    max_history: usize,

    /// 按ID升序保存所有存活 (可见 + 休眠) 的目标
    tracks: BTreeMap<u32, TrackedFace>,

    /// 下一个要分配的ID, 只增不减
    next_id: u32,

    rng: StdRng,
    annotator: Option<Box<dyn Annotator>>,
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_HISTORY)
    }
}

impl IouTracker {
    /// 创建跟踪器
    ///
    /// # 参数
    /// - `iou_threshold`: 关联所需的最小IoU (严格大于)
    /// - `max_history`: 每个目标的历史容量, 至少为1
    pub fn new(iou_threshold: f32, max_history: usize) -> Self {
        Self {
            iou_threshold,
            max_history: max_history.max(1),
            tracks: BTreeMap::new(),
            next_id: 0,
            rng: StdRng::from_entropy(),
            annotator: None,
        }
    }

    /// 从配置创建
    ///
    /// `track_lost_threshold` 不参与衰减规则: 丢失容忍度只由累计的历史长度决定
    pub fn from_config(config: &TrackingConfig) -> Self {
        debug!(
            "🎯 IoU跟踪器: iou={:.2} history={} (track_lost_threshold={} 未生效)",
            config.iou_threshold, config.max_history, config.track_lost_threshold
        );
        let tracker = Self::new(config.iou_threshold, config.max_history);
        match config.color_seed {
            Some(seed) => tracker.with_color_seed(seed),
            None => tracker,
        }
    }

    /// 固定颜色随机种子
    pub fn with_color_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// 挂接人口属性估计器, `update` 提供帧图像时为可见目标附加结果
    pub fn with_annotator(mut self, annotator: Box<dyn Annotator>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// 更新跟踪器 (每帧调用一次)
    ///
    /// # 参数
    /// - `detections`: 当前帧的检测框
    /// - `frame`: 可选的帧图像, 仅用于人口属性估计
    ///
    /// # 返回
    /// 本帧可见 (新匹配或新创建) 的目标 {track_id → payload}
    pub fn update(&mut self, detections: &[BBox], frame: Option<&RgbImage>) -> TrackMap {
        let mut used = vec![false; detections.len()];
        let mut live = TrackMap::new();
        let annotator = self.annotator.as_deref();

        // 1. 按ID升序匹配已有目标
        for track in self.tracks.values_mut() {
            let Some(last) = track.history.last().copied() else {
                continue;
            };

            let mut best_iou = 0.0;
            let mut best_idx = None;
            for (idx, det) in detections.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                // 严格大于: 平分时保留先找到的 (下标最小)
                let iou = compute_iou(&last, &det.rect());
                if iou > best_iou && iou > self.iou_threshold {
                    best_iou = iou;
                    best_idx = Some(idx);
                }
            }

            match best_idx {
                Some(idx) => {
                    used[idx] = true;
                    let det = &detections[idx];
                    let payload = build_payload(annotator, det, frame);
                    track.history.push(det.rect());
                    track.last_payload = payload.clone();
                    live.insert(track.id, payload);
                }
                None => {
                    track.history.decay();
                }
            }
        }

        // 2. 为未匹配的检测创建新目标
        for (idx, det) in detections.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;

            let payload = build_payload(annotator, det, frame);
            let color = random_color(&mut self.rng);
            self.tracks.insert(
                id,
                TrackedFace::new(id, payload.clone(), self.max_history, color),
            );
            live.insert(id, payload);
            debug!("🆕 新目标 #{}", id);
        }

        // 3. 清理历史已耗尽的目标 (新建目标至少有一个历史框, 不会被误删)
        self.tracks.retain(|id, track| {
            let alive = !track.history.is_empty();
            if !alive {
                debug!("💀 目标 #{} 丢失", id);
            }
            alive
        });

        live
    }

    /// 清除所有目标 (ID计数器不重置, 已发出的ID不会再次使用)
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// 当前持有的目标数 (可见 + 休眠)
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// 已分配的ID数量, 也是下一个ID
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn track(&self, id: u32) -> Option<&TrackedFace> {
        self.tracks.get(&id)
    }

    /// 按ID升序遍历
    pub fn tracks(&self) -> impl Iterator<Item = &TrackedFace> {
        self.tracks.values()
    }

    /// 目标的历史框 (用于绘制尾迹)
    pub fn history(&self, id: u32) -> Option<&TrackHistory> {
        self.tracks.get(&id).map(|t| &t.history)
    }

    /// 目标的显示颜色
    pub fn color(&self, id: u32) -> Option<Rgb<u8>> {
        self.tracks.get(&id).map(|t| t.color)
    }
}

fn build_payload(
    annotator: Option<&dyn Annotator>,
    det: &BBox,
    frame: Option<&RgbImage>,
) -> FacePayload {
    let mut payload = FacePayload::new(det.clone());
    if let (Some(annotator), Some(frame)) = (annotator, frame) {
        payload.demographics = annotator.annotate(frame, &det.rect());
    }
    payload
}

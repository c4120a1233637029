//! 多目标跟踪公共组件
//! Common components for multi-object tracking

use image::Rgb;
use rand::Rng;

use super::history::TrackHistory;
use super::types::{FacePayload, Rect};

// ========== 公共数据结构 ==========

/// 跟踪对象 (一个持续存在的身份)
///
/// 只由 `IouTracker` 持有和修改, 外部只能通过只读访问器读取
#[derive(Clone, Debug)]
pub struct TrackedFace {
    /// 唯一跟踪ID (单个跟踪器实例内单调递增, 永不复用)
    pub(crate) id: u32,

    /// 历史框 (最新的在末尾), 同时也是剩余的滑行预算
    pub(crate) history: TrackHistory,

    /// 最近一次关联到的检测结果
    pub(crate) last_payload: FacePayload,

    /// 显示颜色 (创建时确定, 生命周期内不变)
    pub(crate) color: Rgb<u8>,
}

impl TrackedFace {
    pub(crate) fn new(id: u32, payload: FacePayload, capacity: usize, color: Rgb<u8>) -> Self {
        Self {
            id,
            history: TrackHistory::new(payload.bbox.rect(), capacity),
            last_payload: payload,
            color,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn last_payload(&self) -> &FacePayload {
        &self.last_payload
    }

    pub fn color(&self) -> Rgb<u8> {
        self.color
    }
}

// ========== 工具函数 ==========

/// 计算两个边界框的IOU (Intersection over Union)
///
/// 不相交或并集为0时返回0, 交集宽高先截断到0再相乘
pub fn compute_iou(a: &Rect, b: &Rect) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter_w = (x2 - x1).max(0.0);
    let inter_h = (y2 - y1).max(0.0);
    if inter_w <= 0.0 || inter_h <= 0.0 {
        return 0.0;
    }

    let intersection = inter_w * inter_h;
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 {
        return 0.0;
    }

    intersection / union
}

/// 随机显示颜色 (每个通道 0..255)
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb<u8> {
    Rgb([rng.gen_range(0..255), rng.gen_range(0..255), rng.gen_range(0..255)])
}

//! 人脸检测系统数据结构定义
//! Data structures for the face detection / tracking system

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ========== 几何类型 ==========

/// 轴对齐矩形 (x1, y1, x2, y2), 像素坐标
///
/// 零面积的退化框是合法的, 与任何框 (包括自身) 的IoU都为0
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    #[inline]
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// 面积 (宽高先截断到0, 不会出现负面积)
    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 获取中心点
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

// ========== 检测框 ==========

/// 检测框 (Detection bounding box)
///
/// 由外部检测器每帧重新生成, 跟踪器只复制其数据, 不会保留引用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetection", into = "RawDetection")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

/// 检测器输出的原始元组格式: [x1, y1, x2, y2, confidence, class]
type RawDetection = (f32, f32, f32, f32, f32, u32);

impl From<RawDetection> for BBox {
    fn from((x1, y1, x2, y2, confidence, class_id): RawDetection) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }
}

impl From<BBox> for RawDetection {
    fn from(b: BBox) -> Self {
        (b.x1, b.y1, b.x2, b.y2, b.confidence, b.class_id)
    }
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    /// 只取几何部分
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x1, self.y1, self.x2, self.y2)
    }
}

// ========== 人口属性 (性别/年龄) ==========

/// 性别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// 显示标签
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
            Gender::Unknown => "未知",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenderEstimate {
    pub gender: Gender,
    pub confidence: f32,
}

/// 年龄段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Child,
    Teen,
    YoungAdult,
    Adult,
    Senior,
    Unknown,
}

impl AgeGroup {
    /// 参与评分的年龄段 (顺序即平分时的优先级)
    pub const SCORED: [AgeGroup; 5] = [
        AgeGroup::Child,
        AgeGroup::Teen,
        AgeGroup::YoungAdult,
        AgeGroup::Adult,
        AgeGroup::Senior,
    ];

    /// 年龄范围 (min_age, max_age)
    pub fn range(&self) -> (u32, u32) {
        match self {
            AgeGroup::Child => (0, 12),
            AgeGroup::Teen => (13, 19),
            AgeGroup::YoungAdult => (20, 35),
            AgeGroup::Adult => (36, 50),
            AgeGroup::Senior => (51, 100),
            AgeGroup::Unknown => (0, 0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgeGroup::Child => "儿童",
            AgeGroup::Teen => "青少年",
            AgeGroup::YoungAdult => "年轻成人",
            AgeGroup::Adult => "中年",
            AgeGroup::Senior => "老年",
            AgeGroup::Unknown => "Unknown",
        }
    }

    /// 显示标签, 如 `中年(36-50)`, 最高年龄段为 `老年(51+)`
    pub fn label(&self) -> String {
        let (min, max) = self.range();
        match self {
            AgeGroup::Unknown => self.name().to_string(),
            AgeGroup::Senior => format!("{}({}+)", self.name(), min),
            _ => format!("{}({}-{})", self.name(), min, max),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeEstimate {
    pub group: AgeGroup,
    pub confidence: f32,
}

/// 附加的人口属性, 各字段按需出现
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub gender: Option<GenderEstimate>,
    pub age: Option<AgeEstimate>,
}

impl Demographics {
    pub fn is_empty(&self) -> bool {
        self.gender.is_none() && self.age.is_none()
    }
}

// ========== 跟踪输出 ==========

/// 跟踪结果载荷: 最近一次关联到的检测框 + 可选的人口属性
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacePayload {
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Demographics::is_empty")]
    pub demographics: Demographics,
}

impl FacePayload {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            demographics: Demographics::default(),
        }
    }
}

/// 单帧跟踪结果 {track_id → payload}, 按ID升序
pub type TrackMap = BTreeMap<u32, FacePayload>;

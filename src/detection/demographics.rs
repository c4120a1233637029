//! 人口属性估计 (性别 / 年龄)
//!
//! 基于人脸区域灰度统计特征的启发式规则, 不使用模型, 准确率有限, 仅作演示。
//! 跟踪器只负责把结果附加到载荷上, 不解释其内容。

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use super::types::{AgeEstimate, AgeGroup, Demographics, Gender, GenderEstimate, Rect};
use crate::config::DemographicsConfig;

/// 人口属性估计器接口: 给定帧和人脸框, 返回附加属性
pub trait Annotator: Send {
    fn annotate(&self, frame: &RgbImage, rect: &Rect) -> Demographics;
}

/// 启发式估计器
#[derive(Clone, Debug)]
pub struct HeuristicAnnotator {
    pub gender_enabled: bool,
    pub age_enabled: bool,
}

impl Default for HeuristicAnnotator {
    fn default() -> Self {
        Self::from_config(&DemographicsConfig::default())
    }
}

impl HeuristicAnnotator {
    pub fn new(gender_enabled: bool, age_enabled: bool) -> Self {
        Self {
            gender_enabled,
            age_enabled,
        }
    }

    pub fn from_config(config: &DemographicsConfig) -> Self {
        Self::new(config.gender_enabled, config.age_enabled)
    }

    /// 是否有任何估计被启用
    pub fn is_enabled(&self) -> bool {
        self.gender_enabled || self.age_enabled
    }
}

impl Annotator for HeuristicAnnotator {
    fn annotate(&self, frame: &RgbImage, rect: &Rect) -> Demographics {
        let mut out = Demographics::default();
        let Some(face) = crop_face(frame, rect) else {
            return out;
        };
        let gray = imageops::grayscale(&face);

        // 太小的区域不做性别识别
        if self.gender_enabled && gray.width() > 10 && gray.height() > 10 {
            let estimate = classify_gender(&gray);
            if estimate.gender != Gender::Unknown {
                out.gender = Some(estimate);
            }
        }
        if self.age_enabled {
            out.age = Some(estimate_age(&gray));
        }
        out
    }
}

/// 提取人脸区域 (坐标先裁剪到图像范围内)
fn crop_face(frame: &RgbImage, rect: &Rect) -> Option<RgbImage> {
    let (fw, fh) = frame.dimensions();
    let x1 = rect.x1.max(0.0) as u32;
    let y1 = rect.y1.max(0.0) as u32;
    let x2 = (rect.x2.max(0.0) as u32).min(fw);
    let y2 = (rect.y2.max(0.0) as u32).min(fh);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(imageops::crop_imm(frame, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// 性别分类
///
/// 特征: 亮度、对比度、Canny边缘密度、宽高比
pub fn classify_gender(face: &GrayImage) -> GenderEstimate {
    let (w, h) = face.dimensions();
    if w == 0 || h == 0 {
        return GenderEstimate {
            gender: Gender::Female,
            confidence: 0.5,
        };
    }
    let aspect_ratio = w as f32 / h as f32;

    // 小区域放大, 保证特征提取的一致性
    let resized;
    let gray = if w < 100 || h < 100 {
        let target = (w.min(h) * 2).max(100);
        resized = imageops::resize(face, target, target, FilterType::Triangle);
        &resized
    } else {
        face
    };

    let (mean, std) = mean_std(gray);
    let edges = edge_density(gray);
    let contrast = std / (mean + 1e-5);

    let mut male = 0.0f32;
    let mut female = 0.0f32;

    // 边缘密度: 面部轮廓
    if edges > 0.12 {
        male += 0.3;
    } else {
        female += 0.2;
    }

    // 亮度
    if mean < 110.0 {
        male += 0.3;
    } else if mean > 130.0 {
        female += 0.3;
    } else {
        male += 0.1;
        female += 0.1;
    }

    // 对比度
    if contrast > 0.4 {
        male += 0.2;
    } else {
        female += 0.2;
    }

    // 宽高比: 较宽的脸型
    if aspect_ratio > 0.85 {
        male += 0.2;
    } else {
        female += 0.2;
    }

    let total = male + female;
    let (male_prob, female_prob) = if total > 0.0 {
        (male / total, female / total)
    } else {
        (0.4, 0.6)
    };

    if male_prob > female_prob {
        GenderEstimate {
            gender: Gender::Male,
            confidence: male_prob.clamp(0.5, 0.9),
        }
    } else {
        GenderEstimate {
            gender: Gender::Female,
            confidence: female_prob.clamp(0.5, 0.9),
        }
    }
}

/// 年龄段估计
///
/// 五项特征分段打分: 皱纹 (拉普拉斯)、皮肤光滑度 (与高斯模糊的差)、对比度、亮度、边缘密度
pub fn estimate_age(face: &GrayImage) -> AgeEstimate {
    let (w, h) = face.dimensions();
    if w < 10 || h < 10 {
        return AgeEstimate {
            group: AgeGroup::Unknown,
            confidence: 0.5,
        };
    }

    let wrinkle = mean_abs_laplacian(face);
    let smoothness = mean_abs_blur_residual(face);
    let (brightness, contrast) = mean_std(face);
    let edges = edge_density(face);

    // 下标与 AgeGroup::SCORED 对应: 儿童, 青少年, 年轻成人, 中年, 老年
    let mut scores = [0.0f32; 5];

    banded(&mut scores, wrinkle, &[5.0, 10.0, 15.0, 20.0], 0.3, 0.2, 0.1);
    banded(&mut scores, smoothness, &[5.0, 10.0, 15.0, 20.0], 0.25, 0.15, 0.1);

    // 对比度: 最低段只给儿童加分
    if contrast < 20.0 {
        scores[0] += 0.2;
    } else {
        banded(&mut scores, contrast, &[20.0, 30.0, 40.0, 50.0], 0.2, 0.1, 0.1);
    }

    // 亮度: 越暗年龄越大
    let brightness_band = [130.0, 110.0, 90.0, 70.0]
        .iter()
        .position(|&t| brightness > t)
        .unwrap_or(4);
    add_band(&mut scores, brightness_band, 0.15, 0.1, 0.1);

    if edges < 0.08 {
        scores[0] += 0.1;
    } else {
        banded(&mut scores, edges, &[0.08, 0.12, 0.16, 0.20], 0.1, 0.05, 0.05);
    }

    // 最高分, 平分时取靠前的年龄段
    let (best, best_score) = scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |acc, (i, s)| if s > acc.1 { (i, s) } else { acc });

    let total: f32 = scores.iter().sum();
    let confidence = if total > 0.0 {
        (best_score / total).min(1.0)
    } else {
        0.5
    };

    AgeEstimate {
        group: AgeGroup::SCORED[best],
        confidence,
    }
}

/// 按升序阈值分段: 第i段给 scores[i] 加 `primary`, 给 scores[i+1] 加 `secondary`,
/// 超过最后一个阈值时给老年加 `primary`、中年加 `tail`
fn banded(
    scores: &mut [f32; 5],
    value: f32,
    thresholds: &[f32; 4],
    primary: f32,
    secondary: f32,
    tail: f32,
) {
    let band = thresholds.iter().position(|&t| value < t).unwrap_or(4);
    add_band(scores, band, primary, secondary, tail);
}

fn add_band(scores: &mut [f32; 5], band: usize, primary: f32, secondary: f32, tail: f32) {
    if band < 4 {
        scores[band] += primary;
        scores[band + 1] += secondary;
    } else {
        scores[4] += primary;
        scores[3] += tail;
    }
}

fn mean_std(img: &GrayImage) -> (f32, f32) {
    let n = (img.width() * img.height()) as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let (sum, sum_sq) = img.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p.0[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean as f32, var.sqrt() as f32)
}

/// Canny(50, 150) 边缘像素占比
fn edge_density(img: &GrayImage) -> f32 {
    let n = img.width() * img.height();
    if n == 0 {
        return 0.0;
    }
    let edges = canny(img, 50.0, 150.0);
    let count = edges.pixels().filter(|p| p.0[0] > 0).count();
    count as f32 / n as f32
}

/// 4邻域拉普拉斯绝对值的均值 (边界复制)
fn mean_abs_laplacian(img: &GrayImage) -> f32 {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let at = |x: i64, y: i64| -> f32 {
        let x = x.clamp(0, w as i64 - 1) as u32;
        let y = y.clamp(0, h as i64 - 1) as u32;
        img.get_pixel(x, y).0[0] as f32
    };

    let mut sum = 0.0f32;
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let lap = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += lap.abs();
        }
    }
    sum / (w * h) as f32
}

/// |原图 - 5x5高斯模糊| 的均值
fn mean_abs_blur_residual(img: &GrayImage) -> f32 {
    let n = img.width() * img.height();
    if n == 0 {
        return 0.0;
    }
    // 5x5 核对应的 sigma = 0.3 * ((5 - 1) * 0.5 - 1) + 0.8
    let blurred = gaussian_blur_f32(img, 1.1);
    let sum: f32 = img
        .pixels()
        .zip(blurred.pixels())
        .map(|(a, b)| (a.0[0] as f32 - b.0[0] as f32).abs())
        .sum();
    sum / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn uniform(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    fn checkerboard(w: u32, h: u32, block: u32, a: u8, b: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (x / block + y / block) % 2 == 0 {
                Luma([a])
            } else {
                Luma([b])
            }
        })
    }

    #[test]
    fn test_gender_uniform_face() {
        // 无边缘(女+0.2), 中等亮度(各+0.1), 低对比度(女+0.2), 宽脸(男+0.2)
        let estimate = classify_gender(&uniform(40, 40, 120));
        assert_eq!(estimate.gender, Gender::Female);
        assert!((estimate.confidence - 0.625).abs() < 1e-3);
    }

    #[test]
    fn test_gender_dark_textured_face() {
        let estimate = classify_gender(&checkerboard(120, 120, 8, 20, 90));
        assert_eq!(estimate.gender, Gender::Male);
        assert!(estimate.confidence >= 0.5 && estimate.confidence <= 0.9);
    }

    #[test]
    fn test_age_uniform_face_is_child() {
        let estimate = estimate_age(&uniform(40, 40, 128));
        assert_eq!(estimate.group, AgeGroup::Child);
        assert!((estimate.confidence - 0.85 / 1.45).abs() < 1e-3);
    }

    #[test]
    fn test_age_tiny_face_unknown() {
        let estimate = estimate_age(&uniform(8, 30, 128));
        assert_eq!(estimate.group, AgeGroup::Unknown);
        assert_eq!(estimate.confidence, 0.5);
    }

    #[test]
    fn test_banded_tail() {
        let mut scores = [0.0f32; 5];
        banded(&mut scores, 25.0, &[5.0, 10.0, 15.0, 20.0], 0.3, 0.2, 0.1);
        assert_eq!(scores, [0.0, 0.0, 0.0, 0.1, 0.3]);

        let mut scores = [0.0f32; 5];
        banded(&mut scores, 7.0, &[5.0, 10.0, 15.0, 20.0], 0.3, 0.2, 0.1);
        assert_eq!(scores, [0.0, 0.3, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn test_annotate_clips_to_frame() {
        let frame = RgbImage::from_pixel(64, 64, Rgb([120, 120, 120]));
        let annotator = HeuristicAnnotator::new(true, true);

        // 完全在画面外
        let out = annotator.annotate(&frame, &Rect::new(100.0, 100.0, 150.0, 150.0));
        assert!(out.is_empty());

        // 太小: 不做性别识别, 年龄为未知
        let out = annotator.annotate(&frame, &Rect::new(0.0, 0.0, 8.0, 8.0));
        assert!(out.gender.is_none());
        assert_eq!(out.age.unwrap().group, AgeGroup::Unknown);

        // 越界部分被裁掉
        let out = annotator.annotate(&frame, &Rect::new(-20.0, -20.0, 40.0, 40.0));
        assert_eq!(out.gender.unwrap().gender, Gender::Female);
        assert!(out.age.is_some());
    }

    #[test]
    fn test_disabled_annotator() {
        let frame = RgbImage::from_pixel(64, 64, Rgb([120, 120, 120]));
        let annotator = HeuristicAnnotator::new(false, false);
        assert!(!annotator.is_enabled());
        assert!(annotator
            .annotate(&frame, &Rect::new(0.0, 0.0, 40.0, 40.0))
            .is_empty());
    }
}

//! 渲染器: 在帧上绘制跟踪框、标签、尾迹和信息叠加层
//!
//! 只读取跟踪器状态 (历史和颜色), 不修改它。
//! 没有加载字体时只绘制框和尾迹。

use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect as PixelRect;

use crate::config::Algorithm;
use crate::detection::{BBox, FacePayload, IouTracker, Rect, TrackMap};

const DETECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const INFO_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;

pub struct Renderer {
    font: Option<FontVec>,
    pub show_trail: bool,
    pub trail_length: usize,
    pub show_info: bool,
    pub algorithm: Algorithm,
    pub font_size: f32,
}

impl Renderer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            font: None,
            show_trail: true,
            trail_length: 10,
            show_info: true,
            algorithm,
            font_size: 20.0,
        }
    }

    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    /// 加载 ttf/otf 字体 (中文标签需要支持CJK的字体)
    pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontVec> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("无法读取字体 {}", path.display()))?;
        FontVec::try_from_vec(bytes).map_err(|_| anyhow!("无效的字体文件: {}", path.display()))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 绘制本帧可见的跟踪目标
    pub fn draw_tracks(&self, img: &mut RgbImage, tracks: &TrackMap, tracker: &IouTracker) {
        for (&id, payload) in tracks {
            let color = tracker.color(id).unwrap_or(DETECTION_COLOR);
            let rect = payload.bbox.rect();
            draw_box(img, &rect, color);
            self.draw_label(img, &rect, &track_label(id, payload), color);

            if self.show_trail {
                if let Some(history) = tracker.history(id) {
                    let centers: Vec<(f32, f32)> = history
                        .recent(self.trail_length)
                        .map(|r| r.center())
                        .collect();
                    for pair in centers.windows(2) {
                        draw_line_segment_mut(img, pair[0], pair[1], color);
                    }
                }
            }
        }
    }

    /// 仅检测模式: 绿色框 + "Face"
    pub fn draw_detections(&self, img: &mut RgbImage, detections: &[BBox]) {
        for det in detections {
            let rect = det.rect();
            draw_box(img, &rect, DETECTION_COLOR);
            self.draw_label(
                img,
                &rect,
                &format!("Face {:.2}", det.confidence),
                DETECTION_COLOR,
            );
        }
    }

    /// 左上角信息: FPS / 数量 / 算法
    pub fn draw_info(&self, img: &mut RgbImage, fps: f64, count: usize) {
        if !self.show_info {
            return;
        }
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(self.font_size);
        let lines = [
            format!("FPS: {:.1}", fps),
            format!("Detections: {}", count),
            format!("Algorithm: {}", self.algorithm.display_name()),
        ];
        let step = self.font_size as i32 + 5;
        for (i, line) in lines.iter().enumerate() {
            draw_text_mut(img, INFO_COLOR, 10, 10 + i as i32 * step, scale, font, line);
        }
    }

    fn draw_label(&self, img: &mut RgbImage, rect: &Rect, text: &str, color: Rgb<u8>) {
        let Some(font) = &self.font else {
            return;
        };
        let x = rect.x1.round() as i32;
        // 框上方放不下时画在框内
        let y = (rect.y1.round() as i32 - self.font_size as i32 - 2).max(0);
        draw_text_mut(img, color, x, y, PxScale::from(self.font_size), font, text);
    }
}

/// 标签: `ID:{id} {conf}` 或带性别 `ID:{id} {性别} {置信度}`, 有年龄时追加年龄段
fn track_label(id: u32, payload: &FacePayload) -> String {
    let mut label = match &payload.demographics.gender {
        Some(g) => format!("ID:{} {} {:.2}", id, g.gender.label(), g.confidence),
        None => format!("ID:{} {:.2}", id, payload.bbox.confidence),
    };
    if let Some(age) = &payload.demographics.age {
        label.push(' ');
        label.push_str(&age.group.label());
    }
    label
}

/// 2像素宽的空心框
fn draw_box(img: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    let x = rect.x1.round() as i32;
    let y = rect.y1.round() as i32;
    let w = rect.width().round() as i32;
    let h = rect.height().round() as i32;

    for t in 0..BOX_THICKNESS {
        let (tw, th) = (w - 2 * t, h - 2 * t);
        if tw <= 0 || th <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            img,
            PixelRect::at(x + t, y + t).of_size(tw as u32, th as u32),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::{AgeEstimate, AgeGroup, Demographics, Gender, GenderEstimate};

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> BBox {
        BBox::new(x1, y1, x2, y2, 0.87, 0)
    }

    #[test]
    fn test_box_drawn_in_track_color() {
        let mut tracker = IouTracker::default().with_color_seed(3);
        let tracks = tracker.update(&[det(10.0, 10.0, 50.0, 50.0)], None);
        let color = tracker.color(0).unwrap();

        let mut img = RgbImage::new(64, 64);
        let before = *img.get_pixel(30, 30);
        Renderer::new(Algorithm::Track).draw_tracks(&mut img, &tracks, &tracker);

        assert_eq!(img.get_pixel(10, 30), &color);
        assert_eq!(img.get_pixel(11, 30), &color);
        // 框内部不填充 (单帧没有尾迹)
        assert_eq!(img.get_pixel(30, 30), &before);
    }

    #[test]
    fn test_trail_follows_history() {
        let mut tracker = IouTracker::default().with_color_seed(5);
        tracker.update(&[det(0.0, 20.0, 20.0, 40.0)], None);
        let tracks = tracker.update(&[det(4.0, 20.0, 24.0, 40.0)], None);
        let color = tracker.color(0).unwrap();

        let mut img = RgbImage::new(64, 64);
        Renderer::new(Algorithm::Track).draw_tracks(&mut img, &tracks, &tracker);
        // 两个中心 (10,30) → (14,30)
        assert_eq!(img.get_pixel(12, 30), &color);

        let mut img = RgbImage::new(64, 64);
        let mut renderer = Renderer::new(Algorithm::Track);
        renderer.show_trail = false;
        renderer.draw_tracks(&mut img, &tracks, &tracker);
        assert_eq!(img.get_pixel(12, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_boxes_are_clipped() {
        let mut img = RgbImage::new(64, 64);
        let renderer = Renderer::new(Algorithm::Detect);
        renderer.draw_detections(
            &mut img,
            &[
                det(-10.0, -10.0, 20.0, 20.0),
                det(60.0, 60.0, 100.0, 100.0),
                det(30.0, 30.0, 30.5, 30.5),
            ],
        );
        assert_eq!(img.get_pixel(19, 5), &DETECTION_COLOR);
        assert_eq!(img.get_pixel(60, 63), &DETECTION_COLOR);
    }

    #[test]
    fn test_info_without_font_is_noop() {
        let mut img = RgbImage::new(32, 32);
        let renderer = Renderer::new(Algorithm::Track);
        assert!(!renderer.has_font());
        renderer.draw_info(&mut img, 30.0, 2);
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_track_label() {
        let mut payload = FacePayload::new(det(0.0, 0.0, 10.0, 10.0));
        assert_eq!(track_label(3, &payload), "ID:3 0.87");

        payload.demographics = Demographics {
            gender: Some(GenderEstimate {
                gender: Gender::Male,
                confidence: 0.75,
            }),
            age: Some(AgeEstimate {
                group: AgeGroup::Adult,
                confidence: 0.4,
            }),
        };
        assert_eq!(
            track_label(3, &payload),
            format!("ID:3 {} 0.75 {}", Gender::Male.label(), AgeGroup::Adult.label())
        );
    }

    #[test]
    fn test_missing_font() {
        assert!(Renderer::load_font("/nonexistent/font.ttf").is_err());
    }
}

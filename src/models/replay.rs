//! 检测结果回放
//!
//! 每帧一组 `[x1, y1, x2, y2, confidence, class]`, 按调用顺序逐帧返回。
//! 录制的帧用完后返回空列表, 跟踪器会让目标自然衰减。

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{debug, info};

use super::FaceDetector;
use crate::detection::BBox;

pub struct ReplayDetector {
    frames: Vec<Vec<BBox>>,
    cursor: usize,
    conf_threshold: f32,
    name: String,
}

impl ReplayDetector {
    /// 内存中的检测序列 (不过滤置信度)
    pub fn from_frames(frames: Vec<Vec<BBox>>) -> Self {
        Self {
            frames,
            cursor: 0,
            conf_threshold: 0.0,
            name: "Replay".to_string(),
        }
    }

    pub fn with_conf_threshold(mut self, conf_threshold: f32) -> Self {
        self.conf_threshold = conf_threshold;
        self
    }

    /// JSON数组: `[[[x1,y1,x2,y2,conf,cls], ...], ...]`
    pub fn from_json_reader<R: Read>(reader: R, conf_threshold: f32) -> Result<Self> {
        let frames: Vec<Vec<BBox>> =
            serde_json::from_reader(reader).context("检测结果JSON解析失败")?;
        Ok(Self::from_frames(frames).with_conf_threshold(conf_threshold))
    }

    /// JSON Lines: 每行一帧, 空行表示该帧没有检测
    pub fn from_jsonl_reader<R: BufRead>(reader: R, conf_threshold: f32) -> Result<Self> {
        let mut frames = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                frames.push(Vec::new());
                continue;
            }
            let dets: Vec<BBox> = serde_json::from_str(line)
                .with_context(|| format!("第{}行解析失败", idx + 1))?;
            frames.push(dets);
        }
        Ok(Self::from_frames(frames).with_conf_threshold(conf_threshold))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P, conf_threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("无法打开 {}", path.display()))?;
        let detector = Self::from_json_reader(BufReader::new(file), conf_threshold)
            .with_context(|| format!("加载 {} 失败", path.display()))?;
        Ok(detector.named(path))
    }

    pub fn from_jsonl_file<P: AsRef<Path>>(path: P, conf_threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("无法打开 {}", path.display()))?;
        let detector = Self::from_jsonl_reader(BufReader::new(file), conf_threshold)
            .with_context(|| format!("加载 {} 失败", path.display()))?;
        Ok(detector.named(path))
    }

    fn named(mut self, path: &Path) -> Self {
        if let Some(stem) = path.file_name().and_then(|s| s.to_str()) {
            self.name = format!("Replay({})", stem);
        }
        info!("✅ {} 加载成功: {} 帧", self.name, self.frames.len());
        self
    }

    /// 录制的总帧数
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 尚未回放的帧数
    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.cursor)
    }
}

impl FaceDetector for ReplayDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<BBox>> {
        let Some(frame) = self.frames.get(self.cursor) else {
            if self.cursor == self.frames.len() {
                debug!("📼 回放结束, 之后每帧返回空检测");
                self.cursor += 1;
            }
            return Ok(Vec::new());
        };
        self.cursor += 1;

        Ok(frame
            .iter()
            .filter(|b| b.confidence >= self.conf_threshold)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn blank() -> RgbImage {
        RgbImage::new(4, 4)
    }

    #[test]
    fn test_json_replay_in_order() {
        let json = r#"[
            [[0, 0, 50, 50, 0.9, 0], [100, 100, 150, 150, 0.8, 0]],
            [],
            [[2, 2, 52, 52, 0.95, 0]]
        ]"#;
        let mut det = ReplayDetector::from_json_reader(Cursor::new(json), 0.25).unwrap();
        assert_eq!(det.len(), 3);

        let f0 = det.detect(&blank()).unwrap();
        assert_eq!(f0.len(), 2);
        assert_eq!(f0[1].x1, 100.0);
        assert!(det.detect(&blank()).unwrap().is_empty());
        assert_eq!(det.detect(&blank()).unwrap()[0].x2, 52.0);
        assert_eq!(det.remaining(), 0);

        // 回放结束后返回空
        assert!(det.detect(&blank()).unwrap().is_empty());
        assert!(det.detect(&blank()).unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_blank_lines_are_empty_frames() {
        let jsonl = "[[0,0,50,50,0.9,0]]\n\n[[0,0,50,50,0.1,0],[5,5,40,40,0.5,0]]\n";
        let mut det = ReplayDetector::from_jsonl_reader(Cursor::new(jsonl), 0.25).unwrap();
        assert_eq!(det.len(), 3);

        assert_eq!(det.detect(&blank()).unwrap().len(), 1);
        assert!(det.detect(&blank()).unwrap().is_empty());

        // 低于阈值的被过滤
        let f2 = det.detect(&blank()).unwrap();
        assert_eq!(f2.len(), 1);
        assert!((f2[0].confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_jsonl_bad_line_reports_error() {
        let jsonl = "[[0,0,50,50,0.9,0]]\n[[0,0,50]]\n";
        let err = ReplayDetector::from_jsonl_reader(Cursor::new(jsonl), 0.25)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("第2行"));
    }

    #[test]
    fn test_missing_file() {
        assert!(ReplayDetector::from_json_file("/nonexistent/faces.json", 0.25).is_err());
    }
}

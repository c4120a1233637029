//! 跟踪历史缓冲区
//!
//! 有界FIFO, 既是轨迹 (用于绘制尾迹), 也是跟踪目标的滑行预算:
//! 每丢失一帧弹出最旧的一个框, 缓冲区清空的那一帧目标死亡。
//! 所以容忍的连续丢失帧数不是固定值, 而是开始丢失时累计的历史长度。

use std::collections::VecDeque;

use super::types::Rect;

#[derive(Clone, Debug)]
pub struct TrackHistory {
    boxes: VecDeque<Rect>,
    capacity: usize,
}

impl TrackHistory {
    /// 以首个检测框初始化
    pub fn new(first: Rect, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut boxes = VecDeque::with_capacity(capacity);
        boxes.push_back(first);
        Self { boxes, capacity }
    }

    /// 追加最新的框, 超出容量时丢弃最旧的
    pub fn push(&mut self, rect: Rect) -> Option<Rect> {
        self.boxes.push_back(rect);
        if self.boxes.len() > self.capacity {
            self.boxes.pop_front()
        } else {
            None
        }
    }

    /// 未匹配: 消耗一格滑行预算 (弹出最旧的框), 最新的框保持不变
    pub fn decay(&mut self) -> Option<Rect> {
        self.boxes.pop_front()
    }

    /// 最新的框, 用于下一帧的关联
    #[inline]
    pub fn last(&self) -> Option<&Rect> {
        self.boxes.back()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 剩余滑行预算, 由缓冲区长度推导:
    /// 接下来第 `remaining_coast()` 次连续丢失时目标被移除,
    /// 在此之前的 `remaining_coast() - 1` 帧里处于休眠状态
    #[inline]
    pub fn remaining_coast(&self) -> usize {
        self.boxes.len()
    }

    /// 从旧到新遍历
    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.boxes.iter()
    }

    /// 最近 k 个框 (从旧到新)
    pub fn recent(&self, k: usize) -> impl Iterator<Item = &Rect> {
        self.boxes.iter().skip(self.boxes.len().saturating_sub(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32) -> Rect {
        Rect::new(x, 0.0, x + 10.0, 10.0)
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut h = TrackHistory::new(r(0.0), 3);
        assert_eq!(h.push(r(1.0)), None);
        assert_eq!(h.push(r(2.0)), None);
        assert_eq!(h.push(r(3.0)), Some(r(0.0)));
        assert_eq!(h.len(), 3);
        assert_eq!(h.last(), Some(&r(3.0)));
    }

    #[test]
    fn test_decay_keeps_newest() {
        let mut h = TrackHistory::new(r(0.0), 30);
        h.push(r(1.0));
        assert_eq!(h.remaining_coast(), 2);

        assert_eq!(h.decay(), Some(r(0.0)));
        assert_eq!(h.last(), Some(&r(1.0)));
        assert_eq!(h.remaining_coast(), 1);

        assert_eq!(h.decay(), Some(r(1.0)));
        assert!(h.is_empty());
        assert_eq!(h.decay(), None);
    }

    #[test]
    fn test_recent_window() {
        let mut h = TrackHistory::new(r(0.0), 30);
        for i in 1..15 {
            h.push(r(i as f32));
        }
        let xs: Vec<f32> = h.recent(10).map(|b| b.x1).collect();
        assert_eq!(xs, (5..15).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(h.recent(100).count(), 15);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut h = TrackHistory::new(r(0.0), 0);
        assert_eq!(h.capacity(), 1);
        h.push(r(1.0));
        assert_eq!(h.len(), 1);
        assert_eq!(h.last(), Some(&r(1.0)));
    }
}

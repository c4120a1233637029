/// 工具模块
/// Utility modules
use std::time::Instant;

/// 帧率统计: 每 `update_interval` 帧刷新一次
#[derive(Debug, Clone)]
pub struct FpsCounter {
    update_interval: u32,
    count: u32,
    last: Instant,
    current_fps: f64,
}

impl FpsCounter {
    pub fn new(update_interval: u32) -> Self {
        Self {
            update_interval: update_interval.max(1),
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
        }
    }

    /// 记录一帧, 返回当前帧率
    pub fn tick(&mut self) -> f64 {
        self.count += 1;
        if self.count >= self.update_interval {
            let elapsed = self.last.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                self.current_fps = self.count as f64 / elapsed;
            }
            self.count = 0;
            self.last = Instant::now();
        }
        self.current_fps
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.current_fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fps_updates_after_interval() {
        let mut fps = FpsCounter::new(3);
        assert_eq!(fps.tick(), 0.0);
        assert_eq!(fps.tick(), 0.0);
        thread::sleep(Duration::from_millis(10));
        let value = fps.tick();
        assert!(value > 0.0);
        // 3帧至少用了10ms
        assert!(value <= 300.0);
        assert_eq!(fps.fps(), value);
    }
}

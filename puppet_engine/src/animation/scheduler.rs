//! 固定步长调度
//!
//! 每次显示刷新推进一次，按逻辑帧率计算需要执行的帧数；
//! 时钟可注入，便于在没有显示设备时测试。

use std::time::Instant;

use crate::config::MotionConfig;

/// 时间累积误差容差
const STEP_EPSILON: f64 = 1e-9;

/// 时钟（秒）
pub trait FrameClock {
    fn now(&mut self) -> f64;
}

/// 系统单调时钟
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// 手动推进的时钟
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualClock {
    time: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds;
    }
}

impl FrameClock for ManualClock {
    fn now(&mut self) -> f64 {
        self.time
    }
}

/// 固定步长调度器
#[derive(Clone, Debug)]
pub struct FixedStepScheduler {
    step: f64,
    max_substeps: u32,
    accumulator: f64,
    last_time: Option<f64>,
}

impl FixedStepScheduler {
    pub fn new(frame_rate: f64, max_substeps: u32) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            60.0
        };
        Self {
            step: 1.0 / frame_rate,
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
            last_time: None,
        }
    }

    pub fn from_config(motion: &MotionConfig) -> Self {
        Self::new(motion.frame_rate, motion.max_substeps)
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// 推进 elapsed 秒，返回应执行的帧数
    ///
    /// 超过 max_substeps 的积压时间直接丢弃。
    pub fn advance(&mut self, elapsed: f64) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        let due = ((self.accumulator + STEP_EPSILON) / self.step).floor() as u32;
        if due >= self.max_substeps {
            self.accumulator = 0.0;
            return self.max_substeps;
        }

        self.accumulator = (self.accumulator - due as f64 * self.step).max(0.0);
        due
    }

    /// 读取时钟并推进；第一次调用只记录起点
    pub fn pump(&mut self, clock: &mut dyn FrameClock) -> u32 {
        let now = clock.now();
        let elapsed = match self.last_time.replace(now) {
            Some(last) => now - last,
            None => 0.0,
        };
        self.advance(elapsed)
    }
}

impl Default for FixedStepScheduler {
    fn default() -> Self {
        Self::from_config(&MotionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tick_per_step() {
        let mut scheduler = FixedStepScheduler::new(60.0, 5);
        assert_eq!(scheduler.advance(1.0 / 60.0), 1);
        assert_eq!(scheduler.advance(1.0 / 120.0), 0);
        assert_eq!(scheduler.advance(1.0 / 120.0), 1);
    }

    #[test]
    fn test_multiple_ticks_accumulate() {
        let mut scheduler = FixedStepScheduler::new(60.0, 5);
        assert_eq!(scheduler.advance(3.0 / 60.0), 3);
        assert_eq!(scheduler.advance(0.0), 0);
    }

    #[test]
    fn test_backlog_is_capped() {
        let mut scheduler = FixedStepScheduler::new(60.0, 5);
        assert_eq!(scheduler.advance(2.0), 5);
        // 积压被丢弃
        assert_eq!(scheduler.advance(0.0), 0);
    }

    #[test]
    fn test_invalid_elapsed_is_ignored() {
        let mut scheduler = FixedStepScheduler::new(60.0, 5);
        assert_eq!(scheduler.advance(-1.0), 0);
        assert_eq!(scheduler.advance(f64::NAN), 0);
        assert_eq!(scheduler.advance(1.0 / 60.0), 1);
    }

    #[test]
    fn test_pump_with_manual_clock() {
        let mut clock = ManualClock::new();
        let mut scheduler = FixedStepScheduler::new(30.0, 4);

        assert_eq!(scheduler.pump(&mut clock), 0);
        clock.advance(1.0 / 30.0);
        assert_eq!(scheduler.pump(&mut clock), 1);
        clock.advance(2.0 / 30.0);
        assert_eq!(scheduler.pump(&mut clock), 2);
    }

    #[test]
    fn test_invalid_frame_rate_falls_back() {
        let scheduler = FixedStepScheduler::new(0.0, 0);
        assert!((scheduler.step() - 1.0 / 60.0).abs() < 1e-15);
        assert_eq!(scheduler.max_substeps, 1);
    }
}

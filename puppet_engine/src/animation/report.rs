//! 帧诊断输出

use std::fmt;

use glam::DVec3;

use crate::skeleton::{IkSolution, LinkLengths};

use super::DriveMode;

/// 单帧诊断数据
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub mode: DriveMode,
    pub link_lengths: LinkLengths,
    /// 裁剪前的目标点
    pub raw_target: Option<DVec3>,
    /// 裁剪到可达半径后的目标点
    pub clamped_target: Option<DVec3>,
    pub target_distance: Option<f64>,
    pub solution: Option<IkSolution>,
    pub body: DVec3,
    pub arm_pivot: DVec3,
    pub hand_pivot: DVec3,
    pub end_effector: DVec3,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {:?} arm={:.4} hand={:.4} arm->end={:.4}",
            self.frame,
            self.mode,
            self.link_lengths.arm,
            self.link_lengths.hand,
            self.link_lengths.arm_to_end
        )?;
        if let Some(distance) = self.target_distance {
            write!(f, " T_Distance: {distance:.4}")?;
        }
        if let Some(solution) = self.solution {
            write!(
                f,
                " angles=({:.4}, {:.4}) rot=({:.4}, {:.4})",
                solution.arm_angle,
                solution.hand_angle,
                solution.arm_rotation,
                solution.hand_rotation
            )?;
        }
        write!(
            f,
            " Arm Pivot @ ({:.3}, {:.3}) Hand Pivot @ ({:.3}, {:.3}) End Eff @ ({:.3}, {:.3})",
            self.arm_pivot.x,
            self.arm_pivot.y,
            self.hand_pivot.x,
            self.hand_pivot.y,
            self.end_effector.x,
            self.end_effector.y
        )
    }
}

/// 诊断输出接收方（显示层协作者）
pub trait DiagnosticSink {
    fn emit(&mut self, report: &FrameReport);
}

/// 写入日志的诊断输出
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, report: &FrameReport) {
        log::trace!("[Driver] {report}");
    }
}

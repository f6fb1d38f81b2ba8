//! 无显示设备的演示
//!
//! 加载 assets/<name>/<name>.json，回放一段按键序列和指针扫动，
//! 通过日志输出每帧诊断数据。运行：
//! `RUST_LOG=debug cargo run --features demo --bin demo -- puppet_01`

use std::path::Path;

use glam::DVec2;
use puppet_engine::animation::{LogSink, ManualClock};
use puppet_engine::geometry::CameraModel;
use puppet_engine::skeleton::PartId;
use puppet_engine::{
    DriveMode, FrameReport, IkCalibration, MotionConfig, PuppetConfig, PuppetRuntime, Result,
};

/// 按键序列：按下后保持的帧数
const KEY_SCRIPT: [(&str, u32); 4] = [("ArrowUp", 30), ("ArrowDown", 30), ("h", 20), ("k", 20)];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("[Demo] {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let name = std::env::args().nth(1).unwrap_or_else(|| "puppet_01".to_string());
    let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
    let config = PuppetConfig::load_named(&assets, &name)?;

    let motion = MotionConfig::default();
    let step = 1.0 / motion.frame_rate;
    let mut runtime = PuppetRuntime::new(
        &config,
        motion,
        IkCalibration::default(),
        CameraModel::default(),
    )?
    .with_sink(Box::new(LogSink));

    // 模拟资源加载完成
    for part in PartId::ALL {
        runtime.rig_mut().begin_loading(part);
    }
    for part in PartId::ALL {
        runtime.rig_mut().mark_ready(part);
    }
    runtime.rig().ensure_operable()?;

    let mut clock = ManualClock::new();
    runtime.advance(&mut clock);

    log::info!("[Demo] 手动模式按键回放");
    runtime.driver_mut().set_mode(DriveMode::Manual);
    for (key, frames) in KEY_SCRIPT {
        let outcome = runtime.key_down(key);
        log::info!("[Demo] keydown {key}: {outcome:?}");
        report(run_frames(&mut runtime, &mut clock, step, frames));
        runtime.key_up(key);
        run_frames(&mut runtime, &mut clock, step, 5);
    }

    log::info!("[Demo] 目标跟踪：指针扫动");
    runtime.driver_mut().set_mode(DriveMode::TargetTracking);
    for i in 0..=20 {
        let x = -0.8 + 1.6 * i as f64 / 20.0;
        runtime.pointer_moved(DVec2::new(x, 0.2));
        report(run_frames(&mut runtime, &mut clock, step, 3));
    }

    let reset_key = runtime.input().motion().reset_key.clone();
    runtime.key_down(&reset_key);
    report(run_frames(&mut runtime, &mut clock, step, 1));
    log::info!("[Demo] 完成，共 {} 帧", runtime.driver().frame());
    Ok(())
}

fn run_frames(
    runtime: &mut PuppetRuntime,
    clock: &mut ManualClock,
    step: f64,
    frames: u32,
) -> Option<FrameReport> {
    let mut last = None;
    for _ in 0..frames {
        clock.advance(step);
        if let Some(frame) = runtime.advance(clock) {
            last = Some(frame);
        }
    }
    last
}

fn report(frame: Option<FrameReport>) {
    match frame {
        Some(frame) => log::info!("[Demo] {frame}"),
        None => log::warn!("[Demo] 本次推进没有执行任何帧"),
    }
}

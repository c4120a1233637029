/// 人脸检测与跟踪 - 命令行版本
///
/// 工作线程: 读取帧 → 检测 → 跟踪 → 绘制
/// 主线程:   接收结果, 按间隔保存帧
///
/// 直接运行: cargo run --bin facetrack -- -s blank:640x480x300 -d faces.jsonl
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use yoloface_rs::{
    gen_time_string, load_detector, open_source, AppConfig, Args, Detector, InputSource, Renderer,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(&args.config);
    config.apply_args(&args);
    config.print_summary();

    // 输入源 + 检测器
    let source: InputSource = args.source.parse()?;
    info!("📹 输入源: {}", source);
    let frames = open_source(&source)?;
    let model = load_detector(&args.detections, config.detection.conf_threshold)?;

    // 渲染器
    let mut renderer = Renderer::new(args.algorithm);
    renderer.trail_length = config.tracking.trail_length;
    renderer.show_trail = !args.no_trail;
    if let Some(path) = &args.font {
        match Renderer::load_font(path) {
            Ok(font) => {
                info!("✅ 字体加载成功: {}", path);
                renderer = renderer.with_font(font);
            }
            Err(e) => warn!("⚠️ {:#}, 只绘制框和轨迹", e),
        }
    }

    // 输出目录: output_dir/<时间>
    let output_dir = if config.output.save_frames {
        let dir = PathBuf::from(&config.output.output_dir).join(gen_time_string("-"));
        fs::create_dir_all(&dir).with_context(|| format!("无法创建输出目录 {}", dir.display()))?;
        info!("💾 保存目录: {}", dir.display());
        Some(dir)
    } else {
        None
    };

    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = bounded(config.performance.channel_capacity.max(1));
    let detector = Detector::new(frames, model, args.algorithm, renderer, &config)
        .with_max_frames(args.max_frames);
    let handle = detector.spawn(running, tx);

    let save_interval = config.output.save_interval.max(1);
    let mut received: u64 = 0;
    let mut saved: u64 = 0;

    // 接收直到工作线程退出 (停止后继续排空队列, 避免工作线程阻塞在发送上)
    for result in rx.iter() {
        received += 1;
        debug!(
            "帧 {} 目标: {:?}",
            result.frame_id,
            result.tracks.keys().collect::<Vec<_>>()
        );

        if let Some(dir) = &output_dir {
            if received % save_interval == 0 {
                let path = dir.join(format!("frame_{:06}.jpg", received));
                match result.image.save(&path) {
                    Ok(()) => {
                        saved += 1;
                        debug!("💾 已保存 {}", path.display());
                    }
                    Err(e) => warn!("❌ 保存帧失败 {}: {}", path.display(), e),
                }
            }
        }
    }

    let processed = handle
        .join()
        .map_err(|_| anyhow!("检测线程异常退出"))??;
    info!(
        "🏁 完成: 处理 {} 帧, 接收 {} 帧, 保存 {} 帧",
        processed, received, saved
    );
    Ok(())
}

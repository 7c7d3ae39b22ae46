//! scanner_demo - end-to-end synthetic run of the waste scanner

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use recycle_scanner::ui::Ui;
use recycle_scanner::{
    CameraSession, GarbageAnalyzer, InMemoryContentRepository, ScannerConfig, ScannerMode,
    ScannerStateMachine, SessionStatus, SyntheticCamera, SyntheticCameraConfig, TorchMode,
    ZoomPreset,
};

const RENDER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Photo,
    Live,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// How long to run the synthetic camera.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Camera frames per second (overrides config).
    #[arg(long)]
    fps: Option<u32>,
    /// Scanner mode to start in.
    #[arg(long, value_enum, default_value_t = ModeArg::Photo)]
    mode: ModeArg,
    /// Seconds between capture requests in photo mode.
    #[arg(long, default_value_t = 1)]
    capture_every: u64,
    /// Make the first N camera binds fail.
    #[arg(long, default_value_t = 0)]
    fail_bind: u32,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.capture_every == 0 {
        return Err(anyhow!("capture-every must be >= 1"));
    }
    let ui = Ui::from_args(Some(&args.ui));

    let mut config = ScannerConfig::load().context("load scanner config")?;
    if let Some(fps) = args.fps {
        if fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        config.camera.fps = fps;
    }

    let repository = {
        let _stage = ui.stage("Load content");
        let repository = match &config.content.posts_path {
            Some(path) => InMemoryContentRepository::from_json_file(path)?,
            None => InMemoryContentRepository::builtin(),
        };
        repository.with_fail_every(config.content.fail_every)
    };

    let machine = ScannerStateMachine::with_thread_scheduler(config.zoom_adjust_debounce);
    machine.set_mode(match args.mode {
        ModeArg::Photo => ScannerMode::Photo,
        ModeArg::Live => ScannerMode::Live,
    });
    if machine.refresh_posts(&repository).is_err() {
        log::info!("continuing without content; will retry on the next capture");
    }

    let mut session = {
        let _stage = ui.stage("Bind camera");
        let analyzer = GarbageAnalyzer::from_config(machine.clone(), &config)?;
        let camera = SyntheticCamera::new(SyntheticCameraConfig {
            device: config.camera.device.clone(),
            fps: config.camera.fps,
            width: config.camera.width,
            height: config.camera.height,
            fail_binds: args.fail_bind,
            ..SyntheticCameraConfig::default()
        });
        let mut session = CameraSession::new(camera, machine.clone(), analyzer)
            .with_focus_auto_cancel(config.focus_auto_cancel);
        if session.start()? == SessionStatus::PreviewUnavailable {
            log::warn!("preview unavailable, retrying bind once");
            session.retry_bind()?;
        }
        session
    };

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("error setting Ctrl-C handler")?;

    let updates = machine.subscribe();
    let mut ticker = ui.ticker();
    {
        let _stage = ui.stage("Scan");
        let start = Instant::now();
        let deadline = start + Duration::from_secs(args.seconds);
        let capture_every = Duration::from_secs(args.capture_every);
        let mut next_capture = start + capture_every;
        let mut scripted_controls = false;

        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            if !scripted_controls && start.elapsed() >= Duration::from_secs(1) {
                // A user tapping the preview, then the flash and 2x buttons.
                let (cx, cy) = (config.camera.width as f32 / 2.0, config.camera.height as f32 / 2.0);
                session.focus_at(cx, cy);
                if machine.snapshot().has_flash_unit() {
                    machine.set_torch(TorchMode::On);
                }
                machine.set_zoom_preset(ZoomPreset::X2);
                scripted_controls = true;
            }

            if machine.snapshot().mode() == ScannerMode::Photo && Instant::now() >= next_capture {
                if !machine.snapshot().has_posts() && machine.refresh_posts(&repository).is_err() {
                    log::debug!("content still unavailable; capturing anyway");
                }
                machine.set_take_picture(true);
                next_capture += capture_every;
            }

            for snapshot in updates.try_iter() {
                if let Some(post) = snapshot.scanned_post() {
                    log::debug!("scan resolved to post {:?}", post.title);
                }
            }

            let snapshot = session.render();
            ticker.update(&snapshot, &session.stats());
            thread::sleep(RENDER_INTERVAL);
        }
    }
    ticker.finish();

    let final_snapshot = machine.snapshot();
    let stats = session.stats();
    session.teardown();

    println!("camera status:        {:?}", session.status());
    println!("frames received:      {}", stats.frames_received());
    println!("frames dropped:       {}", stats.frames_dropped());
    println!("frames throttled:     {}", stats.throttled());
    println!("awaiting capture:     {}", stats.awaiting_capture());
    println!("decode failures:      {}", stats.decode_failures());
    println!("classifier failures:  {}", stats.classifier_failures());
    println!("classified:           {}", stats.classified());
    println!("content requests:     {}", repository.request_count());

    match (final_snapshot.last_classification(), final_snapshot.scanned_post()) {
        (Some(_), Some(post)) => {
            println!();
            println!("{}", post.title);
            if let Some(subtitle) = &post.subtitle {
                println!("{}", subtitle);
            }
            for paragraph in &post.paragraphs {
                println!("  {}", paragraph);
            }
        }
        (Some(garbage), None) => println!("last scan: {} (content not loaded)", garbage),
        (None, _) => println!("no scan result"),
    }

    Ok(())
}

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use recycle_scanner::camera::Actuation;
use recycle_scanner::scanner::ZOOM_ADJUST_DEBOUNCE;
use recycle_scanner::{
    CameraSession, Category, ClassificationAdapter, GarbageAnalyzer, GarbageType,
    ImageNormalizer, ManualScheduler, ModelSlot, PixelFormat, ScannerConfig, ScannerMode,
    ScannerStateMachine, SessionStatus, StubClassifier, SyntheticCamera, SyntheticCameraConfig,
    TorchMode,
};

fn camera(fail_binds: u32) -> SyntheticCamera {
    SyntheticCamera::new(SyntheticCameraConfig {
        width: 16,
        height: 16,
        fps: 120,
        fail_binds,
        ..SyntheticCameraConfig::default()
    })
}

fn session(
    camera: SyntheticCamera,
) -> (
    CameraSession<SyntheticCamera>,
    ScannerStateMachine,
    Arc<ManualScheduler>,
) {
    let scheduler = Arc::new(ManualScheduler::new());
    let machine = ScannerStateMachine::new(scheduler.clone(), ZOOM_ADJUST_DEBOUNCE);
    let adapter = ClassificationAdapter::new(ModelSlot::preloaded(StubClassifier::scripted(
        vec![vec![Category::new("4", 0.9), Category::new("1", 0.05)]],
    )));
    let analyzer =
        GarbageAnalyzer::new(machine.clone(), adapter).with_normalizer(ImageNormalizer::new(16, 50));
    let session = CameraSession::new(camera, machine.clone(), analyzer);
    (session, machine, scheduler)
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn bind_reports_capabilities_to_scanner() {
    let (mut session, machine, _) = session(camera(0));
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(session.start().expect("start"), SessionStatus::Previewing);

    let snapshot = machine.snapshot();
    assert!(snapshot.has_flash_unit());
    assert_eq!(snapshot.zoom_info().min_ratio(), 1.0);
    assert_eq!(snapshot.zoom_info().max_ratio(), 4.0);
    session.teardown();
}

#[test]
fn photo_capture_flows_from_camera_to_snapshot() {
    let (mut session, machine, _) = session(camera(0));
    session.start().expect("start");
    assert!(wait_for(|| session.stats().awaiting_capture() > 0));

    machine.set_take_picture(true);
    assert!(wait_for(|| machine.snapshot().last_classification().is_some()));
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.last_classification(), Some(GarbageType::Plastic));
    assert!(!snapshot.take_picture_requested());
    session.teardown();
}

#[test]
fn live_mode_classifies_continuously() {
    let (mut session, machine, _) = session(camera(0));
    machine.set_mode(ScannerMode::Live);
    session.start().expect("start");
    assert!(wait_for(|| session.stats().classified() >= 2));
    assert!(session.stats().throttled() >= 9);
    session.teardown();
}

#[test]
fn bind_failure_degrades_to_no_preview() {
    let cam = camera(1);
    let log = cam.actuation_log();
    let (mut session, machine, _) = session(cam);

    assert_eq!(
        session.start().expect("start"),
        SessionStatus::PreviewUnavailable
    );
    // Controls keep working without a preview.
    machine.set_torch(TorchMode::On);
    session.render();
    session.focus_at(10.0, 20.0);
    assert!(machine.snapshot().focus_info().visible);
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(
        session.retry_bind().expect("retry"),
        SessionStatus::Previewing
    );
    session.teardown();
}

#[test]
fn render_pushes_desired_state_to_device() {
    let cam = camera(0);
    let log = cam.actuation_log();
    let (mut session, machine, _) = session(cam);
    session.start().expect("start");
    log.lock().unwrap().clear();

    machine.set_torch(TorchMode::On);
    machine.set_zoom_ratio(2.5);
    session.render();
    session.render();

    let recorded = log.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            Actuation::Torch(true),
            Actuation::Zoom(2.5),
            Actuation::Torch(true),
            Actuation::Zoom(2.5),
        ]
    );
    session.teardown();
}

#[test]
fn focus_tap_meters_and_shows_indicator() {
    let cam = camera(0);
    let log = cam.actuation_log();
    let (session, machine, _) = session(cam);
    let mut session = session.with_focus_auto_cancel(Duration::from_secs(3));
    session.start().expect("start");

    let snapshot = session.focus_at(120.0, 80.0);
    assert!(snapshot.focus_info().visible);
    assert_eq!((snapshot.focus_info().x, snapshot.focus_info().y), (120.0, 80.0));
    assert!(log.lock().unwrap().contains(&Actuation::Focus {
        x: 120.0,
        y: 80.0,
        auto_cancel: Duration::from_secs(3),
    }));

    assert!(!machine.clear_focus().focus_info().visible);
    session.teardown();
}

#[test]
fn teardown_stops_everything_and_is_idempotent() {
    let (mut session, machine, scheduler) = session(camera(0));
    machine.set_mode(ScannerMode::Live);
    session.start().expect("start");
    machine.set_zoom_ratio(3.0);
    assert_eq!(scheduler.pending(), 1);

    session.teardown();
    session.teardown();
    assert_eq!(session.status(), SessionStatus::Closed);
    assert!(!session.device().is_streaming());
    assert!(machine.is_closed());
    assert_eq!(scheduler.pending(), 0);

    let received = session.stats().frames_received();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(session.stats().frames_received(), received);
    assert_eq!(session.start().expect("start"), SessionStatus::Closed);
}

#[test]
fn unsupported_camera_format_is_counted_not_classified() {
    let cam = SyntheticCamera::new(SyntheticCameraConfig {
        width: 16,
        height: 16,
        fps: 120,
        format: PixelFormat::Rgba8888,
        ..SyntheticCameraConfig::default()
    });
    let (mut session, machine, _) = session(cam);
    machine.set_mode(ScannerMode::Live);
    session.start().expect("start");
    assert!(wait_for(|| session.stats().unsupported() >= 5));
    assert_eq!(session.stats().classified(), 0);
    session.teardown();
}

#[test]
fn analyzer_from_default_config_uses_stub_backend() {
    let config = ScannerConfig::default();
    let machine = ScannerStateMachine::default();
    let analyzer = GarbageAnalyzer::from_config(machine.clone(), &config).expect("analyzer");
    let mut session = CameraSession::new(camera(0), machine.clone(), analyzer);
    machine.set_take_picture(true);
    session.start().expect("start");
    assert!(wait_for(|| machine.snapshot().last_classification().is_some()));
    session.teardown();
}

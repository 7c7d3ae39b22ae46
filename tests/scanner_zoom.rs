use std::sync::Arc;
use std::time::Duration;

use recycle_scanner::scanner::{ZoomDirection, ZOOM_ADJUST_DEBOUNCE};
use recycle_scanner::{ManualScheduler, ScannerStateMachine, ZoomPreset};

fn scanner(min: f32, max: f32) -> (ScannerStateMachine, Arc<ManualScheduler>) {
    let scheduler = Arc::new(ManualScheduler::new());
    let machine = ScannerStateMachine::new(scheduler.clone(), ZOOM_ADJUST_DEBOUNCE);
    machine.apply_hardware_zoom_bounds(min, max);
    (machine, scheduler)
}

#[test]
fn ratio_always_within_bounds() {
    let (machine, _) = scanner(1.0, 4.0);
    for requested in [-3.0, 0.0, 0.5, 1.0, 2.7, 4.0, 8.0, f32::INFINITY] {
        let zoom = *machine.set_zoom_ratio(requested).zoom_info();
        assert!(zoom.current_ratio() >= zoom.min_ratio());
        assert!(zoom.current_ratio() <= zoom.max_ratio());
    }
    let before = machine.snapshot().zoom_info().current_ratio();
    let after = machine.set_zoom_ratio(f32::NAN).zoom_info().current_ratio();
    assert_eq!(before, after);
}

#[test]
fn preset_follows_ratio() {
    let (machine, _) = scanner(1.0, 4.0);
    let cases = [
        (1.0, ZoomPreset::X1),
        (1.9, ZoomPreset::X1),
        (2.0, ZoomPreset::X2),
        (2.5, ZoomPreset::X2),
        (3.2, ZoomPreset::X3),
        (4.0, ZoomPreset::X4),
    ];
    for (ratio, preset) in cases {
        assert_eq!(
            machine.set_zoom_ratio(ratio).zoom_info().current_preset(),
            preset,
            "ratio {}",
            ratio
        );
    }
}

#[test]
fn stepping_in_cycles_through_whole_ratios() {
    let (machine, _) = scanner(1.0, 4.0);
    machine.set_zoom_ratio(1.0);
    let visited: Vec<f32> = (0..4)
        .map(|_| {
            machine
                .zoom_step(ZoomDirection::In)
                .zoom_info()
                .current_ratio()
        })
        .collect();
    assert_eq!(visited, vec![2.0, 3.0, 4.0, 1.0]);
}

#[test]
fn stepping_out_wraps_to_max() {
    let (machine, _) = scanner(1.0, 4.0);
    machine.set_zoom_ratio(1.0);
    assert_eq!(
        machine
            .zoom_step(ZoomDirection::Out)
            .zoom_info()
            .current_ratio(),
        4.0
    );
    machine.set_zoom_ratio(2.5);
    assert_eq!(
        machine
            .zoom_step(ZoomDirection::Out)
            .zoom_info()
            .current_ratio(),
        2.0
    );
}

#[test]
fn preset_beyond_hardware_falls_back_to_1x() {
    let (machine, _) = scanner(1.0, 2.0);
    let zoom = *machine.set_zoom_preset(ZoomPreset::X3).zoom_info();
    assert_eq!(zoom.current_preset(), ZoomPreset::X1);
    assert_eq!(zoom.current_ratio(), 1.0);
}

#[test]
fn narrowing_bounds_reclamps_without_adjusting() {
    let (machine, scheduler) = scanner(1.0, 8.0);
    machine.set_zoom_ratio(6.0);
    scheduler.advance(ZOOM_ADJUST_DEBOUNCE);
    let zoom = *machine.apply_hardware_zoom_bounds(1.0, 4.0).zoom_info();
    assert_eq!(zoom.current_ratio(), 4.0);
    assert_eq!(zoom.current_preset(), ZoomPreset::X4);
    assert!(!zoom.is_adjusting());
}

#[test]
fn adjusting_flag_debounces_across_rapid_intents() {
    let (machine, scheduler) = scanner(1.0, 4.0);
    machine.set_zoom_ratio(1.5);
    for _ in 0..5 {
        scheduler.advance(Duration::from_millis(1000));
        machine.zoom_step(ZoomDirection::In);
        assert!(machine.snapshot().zoom_info().is_adjusting());
    }
    assert_eq!(scheduler.pending(), 1);

    scheduler.advance(Duration::from_millis(2499));
    assert!(machine.snapshot().zoom_info().is_adjusting());
    scheduler.advance(Duration::from_millis(1));
    assert!(!machine.snapshot().zoom_info().is_adjusting());
}

#[test]
fn subscribers_observe_adjusting_clear() {
    let (machine, scheduler) = scanner(1.0, 4.0);
    let updates = machine.subscribe();
    machine.set_zoom_preset(ZoomPreset::X2);
    scheduler.advance(ZOOM_ADJUST_DEBOUNCE);

    let seen: Vec<bool> = updates
        .try_iter()
        .map(|snapshot| snapshot.zoom_info().is_adjusting())
        .collect();
    assert_eq!(seen, vec![true, false]);
}

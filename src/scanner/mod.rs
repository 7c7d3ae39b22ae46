//! Scanner state machine.
//!
//! The scanner is a state holder rather than a classic FSM: a structured state
//! value mutated by total reducer functions (`ScannerState::reduce`), owned by a
//! single-writer `ScannerStateMachine` that publishes immutable
//! `ScannerSnapshot`s to subscribers.
//!
//! The only time-driven behaviour is the zoom `is_adjusting` flag, which clears
//! after a debounce window measured from the last zoom intent. It is driven by
//! a `Scheduler` so it can run on wall-clock threads or a virtual clock.

mod machine;
mod schedule;
mod snapshot;
mod state;
mod types;

pub use machine::{ScannerStateMachine, ZOOM_ADJUST_DEBOUNCE};
pub use schedule::{ManualScheduler, ScheduledTask, Scheduler, Task, ThreadScheduler};
pub use snapshot::{ScannerSnapshot, ScannerView};
pub use state::{ScannerIntent, ScannerState};
pub use types::{FocusInfo, ScannerMode, TorchMode, ZoomDirection, ZoomInfo, ZoomPreset};

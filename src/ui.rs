//! Terminal progress output for the demo binary.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use crate::camera::SessionStats;
use crate::scanner::ScannerSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    /// `--ui plain|pretty|auto`; `NO_COLOR` or a non-tty stderr keeps auto plain.
    pub fn from_args(ui_flag: Option<&str>) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        let is_tty = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = spinner("{spinner} {msg}");
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live one-line scanner status, redrawn on every `update`.
    pub fn ticker(&self) -> ScanTicker {
        let bar = self.pretty().then(|| spinner("{spinner} [{elapsed}] {msg}"));
        ScanTicker {
            bar,
            last_line: String::new(),
        }
    }
}

fn spinner(template: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style =
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

pub struct ScanTicker {
    bar: Option<ProgressBar>,
    last_line: String,
}

impl ScanTicker {
    pub fn update(&mut self, snapshot: &ScannerSnapshot, stats: &SessionStats) {
        let line = status_line(snapshot, stats);
        if line == self.last_line {
            return;
        }
        match &self.bar {
            Some(bar) => bar.set_message(line.clone()),
            None => eprintln!("    {line}"),
        }
        self.last_line = line;
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

pub(crate) fn status_line(snapshot: &ScannerSnapshot, stats: &SessionStats) -> String {
    let zoom = snapshot.zoom_info();
    let result = match (snapshot.last_classification(), snapshot.scanned_post()) {
        (Some(_), Some(post)) => post.title.clone(),
        (Some(garbage), None) => format!("{garbage} (content pending)"),
        (None, _) => "-".to_string(),
    };
    format!(
        "mode={:?} torch={:?} zoom={:.1}x{} frames={} classified={} result={}",
        snapshot.mode(),
        snapshot.torch_mode(),
        zoom.current_ratio(),
        if zoom.is_adjusting() { "*" } else { "" },
        stats.frames_received(),
        stats.classified(),
        result
    )
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

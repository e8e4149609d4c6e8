//! Progress reporting and logging setup shared by the binaries.
//!
//! In log-only mode bars are hidden and periodic `[phase] n/total` lines are
//! printed instead, which keeps output readable under `tail -f`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Install the stderr `tracing` subscriber. `RUST_LOG` overrides the
/// `info` default. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Seconds below a minute, fractional minutes above.
pub fn format_duration(d: Duration) -> String {
    match d.as_secs_f64() {
        secs if secs < 60.0 => format!("{:.1}s", secs),
        secs => format!("{:.1}m", secs / 60.0),
    }
}

/// Per-candidate progress for one association phase.
///
/// Drives a bar in interactive mode and prints a status line every
/// `log_every` candidates (and on the last one) in log-only mode.
pub struct CandidateProgress {
    bar: ProgressBar,
    phase: String,
    total: u64,
    log_every: u64,
}

impl CandidateProgress {
    pub fn new(phase: &str, total: u64, log_every: u64) -> Self {
        let bar = ProgressBar::new(total);
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} candidates ({per_sec}, ETA: {eta})")
                    .unwrap()
                    .progress_chars("=> "),
            );
        }
        bar.set_message(phase.to_string());
        Self {
            bar,
            phase: phase.to_string(),
            total,
            log_every: log_every.max(1),
        }
    }

    pub fn set_done(&self, done: u64) {
        self.bar.set_position(done);
        if let Some(line) = self.status_line(done) {
            eprintln!("{}", line);
        }
    }

    pub fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    /// `None` unless in log-only mode and on a reporting boundary.
    fn status_line(&self, done: u64) -> Option<String> {
        if !is_log_only() || self.total == 0 {
            return None;
        }
        if done % self.log_every != 0 && done != self.total {
            return None;
        }
        let pct = 100.0 * done as f64 / self.total as f64;
        Some(format!("[{}] {}/{} ({:.1}%)", self.phase, done, self.total, pct))
    }
}

/// Spinner for the catalog load; hidden in log-only mode.
pub fn loading_spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if is_log_only() {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap(),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
    }
    spinner.set_message(msg.to_string());
    spinner
}

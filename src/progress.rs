//! Progress feedback for analysis runs.
//!
//! The pipeline knows nothing about presentation: it emits discrete
//! [`ProgressEvent`]s through a caller-supplied [`ProgressSink`]. The CLI
//! runs the pipeline on a worker thread, passes a channel-backed sink, and
//! renders events with `indicatif` on the calling side. Progress is
//! suppressed in quiet mode and when stderr is not a terminal.

use crossbeam::channel::Sender;
use indicatif::{ProgressBar, ProgressStyle};

/// A stage-boundary progress notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A pipeline stage is starting. `index` is zero-based; `total` is the
    /// number of stages this run will execute (mode-dependent).
    StageStarted {
        stage: &'static str,
        index: usize,
        total: usize,
    },
    /// The stage finished and produced `rows` records.
    StageFinished { stage: &'static str, rows: usize },
    /// The whole run finished.
    Completed { rows: usize },
}

/// Receiver of progress events. Implementations must not block the
/// pipeline for long; the run is synchronous.
pub trait ProgressSink: Send {
    fn report(&self, event: ProgressEvent);
}

/// Discards all events. Useful for tests and library callers that do not
/// observe progress.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events over a crossbeam channel to an observing thread.
/// Send failures are ignored: a vanished observer must not fail the run.
impl ProgressSink for Sender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Configuration for progress display behavior.
#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
    pub verbosity: u8,
}

impl ProgressConfig {
    /// Create progress configuration from environment and CLI arguments.
    pub fn from_env(quiet: bool, verbosity: u8) -> Self {
        let env_quiet = std::env::var("AUDITMAP_QUIET").is_ok();
        Self {
            quiet_mode: quiet || env_quiet,
            verbosity,
        }
    }

    /// Progress bars are shown only on an interactive terminal outside
    /// quiet mode.
    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }
        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }
}

const TEMPLATE_STAGES: &str = "{msg} [{bar:30}] {pos}/{len} stages";

/// Renders pipeline progress events on a terminal bar.
pub struct ProgressRenderer {
    bar: ProgressBar,
}

impl ProgressRenderer {
    pub fn new(config: &ProgressConfig, total_stages: usize) -> Self {
        let bar = if config.should_show_progress() {
            let bar = ProgressBar::new(total_stages as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(TEMPLATE_STAGES)
                    .expect("invalid progress bar template")
                    .progress_chars("█▓░"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn handle(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage, index, total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(*index as u64);
                self.bar.set_message(stage.to_string());
            }
            ProgressEvent::StageFinished { .. } => {
                self.bar.inc(1);
            }
            ProgressEvent::Completed { rows } => {
                self.bar
                    .finish_with_message(format!("analysis complete, {} rows scored", rows));
            }
        }
    }
}

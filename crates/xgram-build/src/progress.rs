//! Stage progress reporting.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::driver::Stage;
use crate::error::BuildError;

/// Receives stage transitions from the pipeline.
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn stage_finished(&self, _stage: Stage) {}

    fn stage_failed(&self, _stage: Stage, _error: &BuildError) {}
}

/// Ignores every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl StageObserver for SilentObserver {}

/// One terminal spinner per stage.
#[derive(Default)]
pub struct SpinnerObserver {
    current: Mutex<Option<ProgressBar>>,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn take(&self) -> Option<ProgressBar> {
        self.current.lock().ok().and_then(|mut bar| bar.take())
    }
}

impl StageObserver for SpinnerObserver {
    fn stage_started(&self, stage: Stage) {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(stage.title());

        if let Ok(mut current) = self.current.lock() {
            *current = Some(bar);
        }
    }

    fn stage_finished(&self, stage: Stage) {
        if let Some(bar) = self.take() {
            bar.set_style(finished_style("{msg:.green}"));
            bar.finish_with_message(format!("V {}", stage.title()));
        }
    }

    fn stage_failed(&self, stage: Stage, _error: &BuildError) {
        if let Some(bar) = self.take() {
            bar.set_style(finished_style("{msg:.red}"));
            bar.abandon_with_message(format!("X {}", stage.title()));
        }
    }
}

fn finished_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

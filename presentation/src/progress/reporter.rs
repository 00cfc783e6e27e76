//! Progress reporting for pipeline runs

use atlance_application::PipelineProgressNotifier;
use atlance_domain::{CapabilityKind, Question, RunState, StageId};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Reports progress with one spinner per running stage.
///
/// Bars are hidden while a question waits for an answer so the prompt is
/// not overdrawn, and come back once the question stage is done.
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<StageId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} {elapsed:.dim}")
            .unwrap()
    }

    pub(crate) fn stage_display_name(stage: StageId) -> &'static str {
        match stage {
            StageId::Selection => "Selection",
            StageId::Landmark => "Landmarks",
            StageId::Extraction => "Extraction",
            StageId::Question => "Questions",
            StageId::Root => "Coordinator",
        }
    }

    fn bars(&self) -> std::sync::MutexGuard<'_, HashMap<StageId, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_bar(&self, stage: StageId) -> Option<ProgressBar> {
        let bar = self.bars().remove(&stage);
        if stage == StageId::Question {
            self.resume();
        }
        bar
    }

    fn resume(&self) {
        self.multi.set_draw_target(ProgressDrawTarget::stderr());
        for bar in self.bars().values() {
            bar.enable_steady_tick(Duration::from_millis(100));
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgressNotifier for ProgressReporter {
    fn on_run_start(&self, run_id: &str, stages: &[StageId]) {
        let names: Vec<_> = stages
            .iter()
            .map(|s| Self::stage_display_name(*s))
            .collect();
        let _ = self.multi.println(format!(
            "{} run {} ({})",
            "->".cyan(),
            run_id.dimmed(),
            names.join(" → ")
        ));
    }

    fn on_stage_start(&self, stage: StageId) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(Self::stage_display_name(stage));
        pb.set_message("working...");
        pb.enable_steady_tick(Duration::from_millis(100));
        self.bars().insert(stage, pb);
    }

    fn on_capability_call(&self, stage: StageId, kind: CapabilityKind, detail: &str) {
        if let Some(pb) = self.bars().get(&stage) {
            let message = match kind {
                CapabilityKind::Search => format!("searching \"{}\"", detail),
                CapabilityKind::Delegate => format!("calling {}", detail),
                CapabilityKind::Answer => "waiting for your answer".to_string(),
                CapabilityKind::Model => detail.to_string(),
            };
            pb.set_message(message);
        }
    }

    fn on_retry(&self, stage: StageId, kind: CapabilityKind, attempt: u32) {
        if let Some(pb) = self.bars().get(&stage) {
            pb.set_message(format!("{} retry {}", kind.as_str(), attempt).yellow().to_string());
        }
    }

    fn on_question(&self, _question: &Question) {
        for bar in self.bars().values() {
            bar.disable_steady_tick();
        }
        self.multi.set_draw_target(ProgressDrawTarget::hidden());
    }

    fn on_stage_complete(&self, stage: StageId, summary: &str) {
        if let Some(pb) = self.take_bar(stage) {
            pb.finish_with_message(format!("{} {}", "v".green(), summary));
        }
    }

    fn on_stage_failed(&self, stage: StageId, reason: &str, skipped: bool) {
        if let Some(pb) = self.take_bar(stage) {
            let mark = if skipped {
                "skipped".yellow()
            } else {
                "x".red()
            };
            pb.finish_with_message(format!("{} {}", mark, reason));
        }
    }

    fn on_run_complete(&self, state: &RunState) {
        for (_, pb) in self.bars().drain() {
            pb.finish_and_clear();
        }
        let label = match state {
            RunState::Completed(_) => state.name().green(),
            RunState::Aborted { .. } => state.name().yellow(),
            _ => state.name().red(),
        };
        let _ = self.multi.println(format!("{} run {}", "->".cyan(), label.bold()));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl PipelineProgressNotifier for SimpleProgress {
    fn on_stage_start(&self, stage: StageId) {
        eprintln!(
            "{} {}",
            "->".cyan(),
            ProgressReporter::stage_display_name(stage).bold()
        );
    }

    fn on_stage_complete(&self, _stage: StageId, summary: &str) {
        eprintln!("  {} {}", "v".green(), summary);
    }

    fn on_stage_failed(&self, _stage: StageId, reason: &str, skipped: bool) {
        if skipped {
            eprintln!("  {} skipped: {}", "-".yellow(), reason);
        } else {
            eprintln!("  {} {}", "x".red(), reason);
        }
    }

    fn on_retry(&self, _stage: StageId, kind: CapabilityKind, attempt: u32) {
        eprintln!("  {} {} retry {}", "!".yellow(), kind.as_str(), attempt);
    }
}

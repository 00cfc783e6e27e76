//! Console output formatter for run reports

use atlance_application::{RunFailure, RunReport};
use atlance_domain::{
    ExtractionResult, FindingSubject, LandmarkReport, RunTrace, SelectionResult, StageOutput,
    TraceStatus,
};
use colored::Colorize;
use serde_json::json;

/// Formats run reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete report: every stage result, the story and the trace
    pub fn format(report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Travel Blog Draft"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Run:".cyan().bold(), report.run_id));

        for entry in report.results.entries() {
            match entry.output.as_ref() {
                StageOutput::Selection(s) => output.push_str(&Self::selection(s)),
                StageOutput::Landmarks(r) => output.push_str(&Self::landmarks(r)),
                StageOutput::Extraction(e) => output.push_str(&Self::extraction(e)),
                StageOutput::Interview(i) if !i.exchanges.is_empty() => {
                    output.push_str(&Self::section_header("Interview"));
                    for exchange in &i.exchanges {
                        output.push_str(&format!(
                            "\n{} {}\n{} {}\n",
                            "Q:".bold(),
                            exchange.question.content(),
                            "A:".bold(),
                            exchange.answer
                        ));
                    }
                }
                _ => {}
            }
        }

        if let Some(story) = &report.narrative {
            output.push_str(&Self::section_header("Story"));
            output.push_str(&format!("\n{}\n", story));
        }

        output.push_str(&Self::trace(&report.trace));
        output.push_str(&Self::footer());
        output
    }

    /// Story only (concise output)
    pub fn format_story_only(report: &RunReport) -> String {
        match &report.narrative {
            Some(story) => format!("{}\n", story),
            None => format!("{}\n", "(no story was produced)".dimmed()),
        }
    }

    /// Format as JSON
    pub fn format_json(report: &RunReport) -> String {
        let results: Vec<_> = report
            .results
            .entries()
            .iter()
            .map(|e| json!({ "stage": e.stage, "output": e.output.as_ref() }))
            .collect();

        let value = json!({
            "run_id": report.run_id,
            "state": report.state.name(),
            "output": report.output.as_deref(),
            "narrative": report.narrative,
            "results": results,
            "trace": report.trace,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a failed or aborted run
    pub fn format_failure(failure: &RunFailure) -> String {
        let mut output = String::new();
        let title = if failure.is_cancelled() {
            "Run aborted".yellow().bold()
        } else {
            "Run failed".red().bold()
        };
        output.push_str(&format!("\n{} {}\n", title, failure.run_id.dimmed()));
        output.push_str(&format!("{}\n", failure.error));
        output.push_str(&Self::trace(&failure.trace));

        let kept = failure.checkpoint.context.len();
        if kept > 0 {
            output.push_str(&format!(
                "\n{} {} stage result(s) kept for replay\n",
                "i".cyan(),
                kept
            ));
        }
        output
    }

    fn selection(selection: &SelectionResult) -> String {
        format!(
            "{}\n{} {:?}\n{}\n",
            Self::section_header("Selection"),
            "Kept photos:".bold(),
            selection.selected_indices,
            selection.reasons
        )
    }

    fn landmarks(report: &LandmarkReport) -> String {
        let mut output = Self::section_header("Landmarks");
        output.push_str(&format!("\n{}\n", report.summary));
        for finding in &report.findings {
            let subject = match &finding.subject {
                FindingSubject::Image { index } => format!("photo {}", index),
                FindingSubject::Location { location } => location.to_string(),
            };
            let mark = if finding.verified {
                "verified".green()
            } else {
                "unverified".yellow()
            };
            let name = finding.name.as_deref().unwrap_or(&finding.text);
            output.push_str(&format!("  * {} ({}, {})\n", name, subject, mark));
        }
        output
    }

    fn extraction(result: &ExtractionResult) -> String {
        let mut output = Self::section_header("Photos");
        for image in &result.images {
            output.push_str(&format!("\n{}\n", image.path.yellow().bold()));
            if let Some(ts) = &image.timestamp {
                output.push_str(&format!("  {} {}\n", "taken:".dimmed(), ts));
            }
            if let Some(location) = &image.location {
                output.push_str(&format!("  {} {}\n", "where:".dimmed(), location));
            }
            if !image.subjects.is_empty() {
                let subjects: Vec<_> = image.subjects.iter().map(String::as_str).collect();
                output.push_str(&format!("  {} {}\n", "shows:".dimmed(), subjects.join(", ")));
            }
        }
        output
    }

    fn trace(trace: &RunTrace) -> String {
        let mut output = Self::section_header("Trace");
        for entry in trace.entries() {
            let (mark, detail) = match &entry.status {
                TraceStatus::Succeeded => ("v".green(), String::new()),
                TraceStatus::Skipped { reason } => ("-".yellow(), format!(" skipped: {}", reason)),
                TraceStatus::Failed { reason } => ("x".red(), format!(" {}", reason)),
                TraceStatus::Cancelled => ("x".yellow(), " cancelled".to_string()),
            };
            let call = entry
                .call_id
                .as_deref()
                .map(|id| format!(" [{}]", id))
                .unwrap_or_default();
            output.push_str(&format!(
                "  {} {}{} {}{}\n",
                mark,
                entry.stage,
                call.dimmed(),
                format!("{}ms", entry.elapsed_ms).dimmed(),
                detail
            ));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

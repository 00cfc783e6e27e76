//! CLI command definitions

use atlance_application::PipelineMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// What to print once the run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every stage result, the story and the trace
    #[default]
    Full,
    /// Only the final story
    Story,
    /// JSON report
    Json,
}

/// CLI arguments for atlance
#[derive(Parser, Debug)]
#[command(name = "atlance")]
#[command(author, version, about = "Turn a folder of travel photos into a blog draft")]
#[command(long_about = r#"
atlance runs a batch of travel photos through a pipeline of vision-model stages:

1. Selection:  drop near-duplicates and keep the most interesting photos
2. Landmarks:  identify landmarks and verify them with web search
3. Extraction: timestamp, location and subjects per photo, plus a first story
4. Questions:  ask you a few follow-up questions and refine the story

In delegating mode a root model decides which stages to call and when.

Configuration files are loaded from (in priority order):
1. ATLANCE_* environment variables
2. --config <path>     Explicit config file
3. ./atlance.toml      Project-level config
4. ~/.config/atlance/config.toml   Global config

Example:
  atlance ~/Pictures/lisbon
  atlance --mode delegating -m qwen2.5vl:32b IMG_0412.jpg IMG_0413.jpg
  atlance --metadata exif.json --no-questions ~/Pictures/kyoto
"#)]
pub struct Cli {
    /// Photos or directories of photos, in batch order
    #[arg(value_name = "PATH", required_unless_present = "show_config")]
    pub paths: Vec<PathBuf>,

    /// JSON file with pre-extracted metadata, keyed by file name
    #[arg(long, value_name = "PATH")]
    pub metadata: Option<PathBuf>,

    /// How stages are composed (sequential or delegating)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<PipelineMode>,

    /// Model for every stage without a per-stage override
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Maximum number of photos kept by selection (at least 1)
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_selected: Option<usize>,

    /// Skip landmark identification
    #[arg(long)]
    pub no_landmarks: bool,

    /// Skip the follow-up questions
    #[arg(long)]
    pub no_questions: bool,

    /// Decline every question instead of reading answers from the terminal
    #[arg(long)]
    pub non_interactive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Directory for daily diagnostic log files
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Directory for JSONL run transcripts
    #[arg(long, value_name = "DIR")]
    pub run_log_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_invocation() {
        let cli = Cli::try_parse_from([
            "atlance",
            "--mode",
            "delegating",
            "-m",
            "qwen2.5vl:32b",
            "--max-selected",
            "5",
            "--no-questions",
            "-vv",
            "-o",
            "json",
            "trip/",
            "extra.jpg",
        ])
        .unwrap();

        assert_eq!(cli.mode, Some(PipelineMode::Delegating));
        assert_eq!(cli.model.as_deref(), Some("qwen2.5vl:32b"));
        assert_eq!(cli.max_selected, Some(5));
        assert!(cli.no_questions && !cli.no_landmarks);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.paths.len(), 2);
    }

    #[test]
    fn test_paths_required_unless_showing_config() {
        assert!(Cli::try_parse_from(["atlance"]).is_err());
        let cli = Cli::try_parse_from(["atlance", "--show-config"]).unwrap();
        assert!(cli.paths.is_empty());
    }

    #[test]
    fn test_max_selected_must_be_positive() {
        assert!(Cli::try_parse_from(["atlance", "--max-selected", "0", "a.jpg"]).is_err());
        let cli = Cli::try_parse_from(["atlance", "--max-selected", "1", "a.jpg"]).unwrap();
        assert_eq!(cli.max_selected, Some(1));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["atlance", "--mode", "parallel", "a.jpg"]).is_err());
    }
}

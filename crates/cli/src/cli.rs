use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pulse_compute::Rank;
use pulse_core::MetricKind;

/// Content scoring and metric anomaly detection.
#[derive(Parser, Debug)]
#[command(name = "pulse", about = "Content scoring and metric anomaly detection")]
pub struct CliArgs {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score one article from its search and analytics metrics
    Score {
        /// Average search position (1 = top)
        #[arg(long)]
        position: f64,

        /// Click-through rate, percent
        #[arg(long)]
        ctr: f64,

        /// Referral transition rate, percent
        #[arg(long, default_value = "0")]
        transition_rate: f64,

        /// Engagement rate, percent
        #[arg(long, default_value = "50")]
        engagement_rate: f64,

        /// YAML file with custom weights (rank, ctr, transition, engagement)
        #[arg(long)]
        weights: Option<PathBuf>,
    },

    /// Score and rank a batch of articles read from a JSON array
    Rank {
        /// JSON file holding an array of article metrics
        #[arg(long)]
        input: PathBuf,

        /// Keep only articles at or above this rank (S, A, B, C)
        #[arg(long)]
        min_rank: Option<Rank>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        content_type: Option<String>,

        /// Maximum number of articles to print
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        weights: Option<PathBuf>,
    },

    /// Classify observations against the configured thresholds
    Evaluate {
        /// Metric name (e.g. sessions, bounceRate, lcp)
        #[arg(long, required_unless_present = "input")]
        metric: Option<MetricKind>,

        #[arg(long, required_unless_present = "input")]
        current: Option<f64>,

        #[arg(long, required_unless_present = "input")]
        expected: Option<f64>,

        /// Baseline standard deviation
        #[arg(long, required_unless_present = "input")]
        std_dev: Option<f64>,

        /// JSON file holding an array of observations; prints findings and a summary
        #[arg(long, conflicts_with_all = ["metric", "current", "expected", "std_dev"])]
        input: Option<PathBuf>,
    },

    /// Inspect and change alert thresholds
    Thresholds {
        #[command(subcommand)]
        action: ThresholdsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ThresholdsCommand {
    /// Show the effective threshold for every metric
    List,

    /// Show the effective threshold for one metric
    Get { metric: MetricKind },

    /// Change some fields of one metric's threshold
    Set {
        metric: MetricKind,

        /// Warning z-score multiplier
        #[arg(long)]
        warning: Option<f64>,

        /// Critical z-score multiplier
        #[arg(long)]
        critical: Option<f64>,

        /// Percent-change trigger
        #[arg(long)]
        percent: Option<f64>,

        #[arg(long)]
        enabled: Option<bool>,

        /// Recorded as the row's last editor
        #[arg(long, env = "PULSE_ACTOR")]
        actor: Option<String>,
    },

    /// Restore one metric, or every metric, to its compiled-in default
    Reset {
        metric: Option<MetricKind>,

        #[arg(long, env = "PULSE_ACTOR")]
        actor: Option<String>,
    },

    /// Print the compiled-in default table
    Defaults,
}

impl ThresholdsCommand {
    /// Whether the command changes stored thresholds.
    pub fn is_write(&self) -> bool {
        matches!(self, ThresholdsCommand::Set { .. } | ThresholdsCommand::Reset { .. })
    }
}

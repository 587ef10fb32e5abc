use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use pulse_compute::{
    evaluate_all, evaluate_observation, filter_ranked, rank_articles, score_article_with,
    AnomalyFinding, AnomalySummary, AnomalyVerdict, ArticleMetrics, ArticleScore, MetricObservation,
    PerformanceMetrics, RankFilter, ScoreBreakdown, ScoreWeights,
};
use pulse_core::config::{Config, StoreBackend};
use pulse_core::{AlertThreshold, MetricKind, ThresholdUpdate, DEFAULT_THRESHOLDS};
use pulse_thresholds::{
    BatchOutcome, InMemoryThresholdStore, PgThresholdStore, ThresholdService, ThresholdStore,
    YamlThresholdStore,
};

use crate::cli::{Command, ThresholdsCommand};

// ── Store wiring ──────────────────────────────────────────────

/// Build the threshold service for the configured backend.
///
/// With `degrade` set, a Postgres connection failure falls back to the
/// compiled-in defaults instead of failing the command.
async fn open_service(config: &Config, degrade: bool) -> Result<ThresholdService> {
    let store: Arc<dyn ThresholdStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryThresholdStore::new()),
        StoreBackend::Yaml => Arc::new(YamlThresholdStore::new(&config.store.yaml_path)),
        StoreBackend::Postgres => match PgThresholdStore::connect(&config.postgres).await {
            Ok(store) => Arc::new(store),
            Err(e) if degrade => {
                warn!(error = %e, "threshold store unreachable, evaluating with defaults");
                Arc::new(InMemoryThresholdStore::new())
            }
            Err(e) => return Err(e).context("failed to open threshold store"),
        },
    };
    info!(backend = store.backend_name(), "threshold store ready");
    Ok(ThresholdService::new(store))
}

fn load_weights(path: Option<&Path>) -> Result<ScoreWeights> {
    let Some(path) = path else {
        return Ok(ScoreWeights::DEFAULT);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read weights file {}", path.display()))?;
    let weights: ScoreWeights = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse weights file {}", path.display()))?;
    Ok(weights)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Dispatch ──────────────────────────────────────────────────

pub async fn run(command: Command, config: &Config, json: bool) -> Result<()> {
    match command {
        Command::Score {
            position,
            ctr,
            transition_rate,
            engagement_rate,
            weights,
        } => {
            let weights = load_weights(weights.as_deref())?;
            let metrics = PerformanceMetrics { position, ctr, transition_rate, engagement_rate };
            let breakdown = score_article_with(&metrics, &weights).context("invalid weights")?;
            if json {
                print_json(&breakdown)
            } else {
                print_breakdown(&breakdown);
                Ok(())
            }
        }
        Command::Rank {
            input,
            min_rank,
            category,
            content_type,
            limit,
            weights,
        } => {
            let weights = load_weights(weights.as_deref())?;
            let articles: Vec<ArticleMetrics> = read_json(&input)?;
            let ranked = rank_articles(&articles, &weights).context("invalid weights")?;
            let filter = RankFilter { min_rank, category, content_type, limit };
            let shown = filter_ranked(&ranked, &filter);
            if json {
                print_json(&shown)
            } else {
                print_ranking(&shown, articles.len());
                Ok(())
            }
        }
        Command::Evaluate {
            metric,
            current,
            expected,
            std_dev,
            input,
        } => {
            let observations = observations_from(metric, current, expected, std_dev, input.as_deref())?;
            let service = open_service(config, true).await?;
            let evaluation = assess(&service, observations).await;
            print_evaluation(&evaluation, json)
        }
        Command::Thresholds { action } => {
            if action.is_write() && !config.store.backend.is_persistent() {
                bail!(
                    "THRESHOLD_STORE={} keeps changes only for this process; \
                     use the yaml or postgres backend to change thresholds",
                    config.store.backend
                );
            }
            let service = open_service(config, false).await?;
            thresholds(&service, action, json).await
        }
    }
}

// ── Evaluate ──────────────────────────────────────────────────

/// Observations to evaluate. A file is always a batch, even with one entry.
enum Observations {
    One(MetricObservation),
    Batch(Vec<MetricObservation>),
}

fn observations_from(
    metric: Option<MetricKind>,
    current: Option<f64>,
    expected: Option<f64>,
    std_dev: Option<f64>,
    input: Option<&Path>,
) -> Result<Observations> {
    if let Some(path) = input {
        return Ok(Observations::Batch(read_json(path)?));
    }
    match (metric, current, expected, std_dev) {
        (Some(metric), Some(current_value), Some(expected_value), Some(std_dev)) => {
            Ok(Observations::One(MetricObservation { metric, current_value, expected_value, std_dev }))
        }
        _ => bail!("--metric, --current, --expected and --std-dev are required without --input"),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationReport {
    findings: Vec<AnomalyFinding>,
    summary: AnomalySummary,
}

enum Evaluation {
    One {
        observation: MetricObservation,
        enabled: bool,
        verdict: AnomalyVerdict,
    },
    Batch {
        observed: usize,
        report: EvaluationReport,
    },
}

async fn assess(service: &ThresholdService, observations: Observations) -> Evaluation {
    match observations {
        Observations::One(observation) => {
            let threshold = service.get(observation.metric).await;
            Evaluation::One {
                observation,
                enabled: threshold.enabled,
                verdict: evaluate_observation(&observation, &threshold),
            }
        }
        Observations::Batch(observations) => {
            let thresholds = service.get_all().await;
            let findings = evaluate_all(&observations, &thresholds);
            let summary = AnomalySummary::from_findings(&findings);
            Evaluation::Batch {
                observed: observations.len(),
                report: EvaluationReport { findings, summary },
            }
        }
    }
}

fn print_evaluation(evaluation: &Evaluation, json: bool) -> Result<()> {
    match evaluation {
        Evaluation::One { verdict, .. } if json => print_json(verdict),
        Evaluation::One { observation, enabled, verdict } => {
            let label = observation.metric.label();
            match AnomalyFinding::from_verdict(observation, *verdict) {
                Some(finding) => println!("{}", finding.describe()),
                None if !enabled => println!("{}: detection disabled", label),
                None => println!(
                    "{}: normal (deviation {:.1}%, z={:.2})",
                    label, verdict.deviation_percent, verdict.z_score
                ),
            }
            Ok(())
        }
        Evaluation::Batch { report, .. } if json => print_json(report),
        Evaluation::Batch { observed, report } => {
            for finding in &report.findings {
                println!("{}", finding.describe());
            }
            let summary = &report.summary;
            println!(
                "{} observations, {} anomalies ({} critical, {} warning): {:?}",
                observed,
                summary.total_anomalies,
                summary.critical_count,
                summary.warning_count,
                summary.health_status
            );
            Ok(())
        }
    }
}

// ── Thresholds ────────────────────────────────────────────────

async fn thresholds(service: &ThresholdService, action: ThresholdsCommand, json: bool) -> Result<()> {
    match action {
        ThresholdsCommand::List => {
            let rows = service.get_all().await;
            if json {
                return print_json(&rows);
            }
            print_threshold_header();
            for row in &rows {
                print_threshold(row);
            }
            Ok(())
        }
        ThresholdsCommand::Get { metric } => {
            let row = service.get(metric).await;
            if json {
                return print_json(&row);
            }
            print_threshold_header();
            print_threshold(&row);
            Ok(())
        }
        ThresholdsCommand::Set {
            metric,
            warning,
            critical,
            percent,
            enabled,
            actor,
        } => {
            let update = ThresholdUpdate {
                warning_multiplier: warning,
                critical_multiplier: critical,
                percent_change_threshold: percent,
                enabled,
            };
            if update.is_empty() {
                bail!("nothing to change: pass at least one of --warning, --critical, --percent, --enabled");
            }
            let row = service
                .update(metric, &update, actor.as_deref())
                .await
                .with_context(|| format!("failed to update threshold for {}", metric))?;
            if json {
                return print_json(&row);
            }
            print_threshold_header();
            print_threshold(&row);
            Ok(())
        }
        ThresholdsCommand::Reset { metric: Some(metric), actor } => {
            let row = service
                .reset(metric, actor.as_deref())
                .await
                .with_context(|| format!("failed to reset threshold for {}", metric))?;
            if json {
                return print_json(&row);
            }
            println!("{} reset to defaults", metric.label());
            Ok(())
        }
        ThresholdsCommand::Reset { metric: None, actor } => {
            let outcome = service.reset_all(actor.as_deref()).await;
            if json {
                print_json(&outcome)?;
            } else {
                print_outcome(&outcome);
            }
            if !outcome.is_complete() {
                bail!("{} of {} metrics failed to reset", outcome.failed.len(), MetricKind::ALL.len());
            }
            Ok(())
        }
        ThresholdsCommand::Defaults => {
            let rows: Vec<AlertThreshold> = DEFAULT_THRESHOLDS
                .iter()
                .map(|(metric, _)| AlertThreshold::default_for(*metric))
                .collect();
            if json {
                return print_json(&rows);
            }
            print_threshold_header();
            for row in &rows {
                print_threshold(row);
            }
            Ok(())
        }
    }
}

// ── Text output ───────────────────────────────────────────────

fn print_breakdown(b: &ScoreBreakdown) {
    println!("rank score:        {:>3}", b.rank_score);
    println!("ctr score:         {:>3}", b.ctr_score);
    println!("transition score:  {:>3}", b.transition_score);
    println!("engagement score:  {:>3}", b.engagement_score);
    println!("composite:         {:>3}  ({})", b.composite_score, b.rank);
}

fn print_ranking(scores: &[ArticleScore], input_len: usize) {
    println!("{:<4} {:>5}  {:<40} {}", "RANK", "SCORE", "SLUG", "TITLE");
    for s in scores {
        println!(
            "{:<4} {:>5}  {:<40} {}",
            s.breakdown.rank.as_str(),
            s.breakdown.composite_score,
            s.slug,
            s.title
        );
    }
    println!("{} shown of {} articles", scores.len(), input_len);
}

fn print_threshold_header() {
    println!(
        "{:<32} {:>8} {:>8} {:>8}  {:<7} {}",
        "METRIC", "WARNING", "CRITICAL", "PERCENT", "ENABLED", "UPDATED BY"
    );
}

fn print_threshold(t: &AlertThreshold) {
    let source = if t.id.is_some() { t.updated_by.as_deref().unwrap_or("-") } else { "(default)" };
    println!(
        "{:<32} {:>8} {:>8} {:>8}  {:<7} {}",
        t.metric.label(),
        t.warning_multiplier,
        t.critical_multiplier,
        t.percent_change_threshold,
        t.enabled,
        source
    );
}

fn print_outcome(outcome: &BatchOutcome) {
    for row in &outcome.applied {
        println!("reset  {}", row.metric.label());
    }
    for failure in &outcome.failed {
        let hint = if failure.retryable { " (retryable)" } else { "" };
        println!("failed {}: {}{}", failure.metric.label(), failure.error, hint);
    }
}

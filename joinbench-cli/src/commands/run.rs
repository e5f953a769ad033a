use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use joinbench_core::experiment::{Experiment, ExperimentOutcome};
use joinbench_core::http::HttpConnector;
use joinbench_core::summary::LatencySummary;

use super::{init_logging, load_config, RunArgs};

pub async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    init_logging(&config.logging);
    config.validate().context("Invalid configuration")?;

    log::info!(
        "running experiment on {} clusters with {} threads ({}s before, {}s after)",
        config.clusters.len(),
        config.experiment.threads,
        config.experiment.before_secs,
        config.experiment.after_secs
    );

    let connector = Arc::new(HttpConnector::new(config.client.clone()));
    let experiment = Experiment::new(connector, config.settings());
    let (outcome, path) = experiment
        .execute(&config.clusters, &config.output.dir)
        .await
        .context("Experiment failed")?;

    print_summary(&outcome, &path);
    Ok(())
}

fn print_summary(outcome: &ExperimentOutcome, path: &Path) {
    let report = &outcome.report;
    let (attempts, failures) = outcome.attempt_totals();

    println!("\nExperiment finished");
    println!("   Report:   {}", path.display());
    println!("   Issued:   +{:.3} s", (report.issue - report.start) as f64 / 1e6);
    println!("   Attempts: {} ({} failed)", attempts, failures);
    println!("   Samples:  {}", report.total_samples());
    match report.leader {
        Some(leader) => println!(
            "   Leader:   add took {:.3} ms, election {:.3} ms",
            (leader.add_leave - leader.add_enter) as f64 / 1000.0,
            leader.leader_elect as f64 / 1000.0
        ),
        None => println!("   Leader:   no measurement"),
    }

    println!("\nPrimary load ({} requesters)", outcome.workers.len());
    match LatencySummary::from_samples(&report.queries) {
        Some(summary) => println!("{}", summary),
        None => println!("   no samples"),
    }

    for (observed, observation) in outcome.observed.iter().zip(&report.observes) {
        println!(
            "\nCluster {} new leader {} at {} (+{:.3} s after issue)",
            observed.cluster_index,
            observed.leader_id,
            observed.endpoint,
            (observation.observe - report.issue) as f64 / 1e6
        );
        match LatencySummary::from_samples(&observation.queries) {
            Some(summary) => println!("{}", summary),
            None => println!("   no samples"),
        }
    }
}

//! CLI for lance-bench.
//!
//! This crate wires the adapters, the results store and the GitHub plumbing
//! into the `lance-bench` command used by CI workflows.

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod outputs;
pub mod publish;
pub mod report;
pub mod schedule;
pub mod settings;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lance_bench_adapters::{DutSpec, ReportFormat};
use lance_bench_github::{process_comment, CommentEvent, CommentOutcome, GitHubClient, ProcessOptions};
use lance_bench_storage::{ResultStore, StoreLocation};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::publish::PublishRequest;
use crate::report::CompareRequest;
use crate::schedule::SchedulePlan;
use crate::settings::Settings;

/// lance-bench CLI.
#[derive(Parser, Debug)]
#[command(name = "lance-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Report location and output handling shared by the publish commands.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Harness output file.
    pub path: PathBuf,

    /// Test bed name (defaults to the host name).
    #[arg(long)]
    pub testbed_name: Option<String>,

    /// Print normalized results as JSON instead of storing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Write dry-run JSON here instead of stdout.
    #[arg(long, requires = "dry_run")]
    pub output: Option<PathBuf>,
}

/// Where the DUT version comes from when it must be given explicitly.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct VersionSource {
    /// Full version, `<semver>+<short sha>`.
    #[arg(long)]
    pub dut_version: Option<String>,

    /// Commit SHA, combined with --dut-semver.
    #[arg(long, requires = "dut_semver")]
    pub dut_commit: Option<String>,
}

/// DUT description for harnesses that carry no commit metadata.
#[derive(Args, Debug, Clone)]
pub struct PinnedDutArgs {
    /// Name of the build under test.
    #[arg(long, default_value = "lance")]
    pub dut_name: String,

    #[command(flatten)]
    pub version: VersionSource,

    /// Semantic version paired with --dut-commit.
    #[arg(long)]
    pub dut_semver: Option<String>,

    /// Commit time of the build, unix seconds.
    #[arg(long)]
    pub dut_timestamp: i64,
}

impl PinnedDutArgs {
    fn into_spec(self) -> DutSpec {
        DutSpec {
            name: self.dut_name,
            version: self.version.dut_version,
            semver: self.dut_semver,
            commit: self.version.dut_commit,
            timestamp: Some(self.dut_timestamp),
        }
    }
}

/// DUT description for pytest-benchmark, whose report may embed commit info.
#[derive(Args, Debug, Clone)]
pub struct PytestDutArgs {
    #[arg(long, default_value = "pylance")]
    pub dut_name: String,

    #[arg(long, conflicts_with = "dut_commit")]
    pub dut_version: Option<String>,

    /// Commit SHA; needs --dut-semver.
    #[arg(long, requires = "dut_semver")]
    pub dut_commit: Option<String>,

    /// Semantic version. When omitted and the commit comes from the report's
    /// commit_info, the version is stored as `0.0.0+<sha>`.
    #[arg(long)]
    pub dut_semver: Option<String>,

    /// Commit time, unix seconds; defaults to the report's commit_info time.
    #[arg(long)]
    pub dut_timestamp: Option<i64>,
}

impl PytestDutArgs {
    fn into_spec(self) -> DutSpec {
        DutSpec {
            name: self.dut_name,
            version: self.dut_version,
            semver: self.dut_semver,
            commit: self.dut_commit,
            timestamp: self.dut_timestamp,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish `cargo criterion --message-format=json` output.
    PublishCriterion {
        #[command(flatten)]
        report: ReportArgs,
        #[command(flatten)]
        dut: PinnedDutArgs,
    },

    /// Publish a `pytest --benchmark-json` report.
    PublishPytest {
        #[command(flatten)]
        report: ReportArgs,
        #[command(flatten)]
        dut: PytestDutArgs,
    },

    /// Publish DBpedia recall results.
    PublishDbpedia {
        #[command(flatten)]
        report: ReportArgs,
        #[command(flatten)]
        dut: PinnedDutArgs,
    },

    /// Print whether results exist for a commit.
    Check {
        /// Commit SHA (at least 7 hex characters).
        commit_sha: String,
    },

    /// Dispatch benchmark runs for recent commits without results.
    Schedule {
        /// Repository to scan (defaults to LANCE_BENCH_REPOSITORY).
        #[arg(long)]
        repository: Option<String>,

        #[arg(long, default_value = "main")]
        branch: String,

        /// Workflow file in the workflow repository.
        #[arg(long, default_value = "run-benchmarks.yml")]
        workflow: String,

        /// Number of recent commits to inspect.
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Maximum runs to dispatch.
        #[arg(long, default_value_t = 1)]
        max_dispatch: usize,

        /// Log what would be dispatched without dispatching.
        #[arg(long)]
        dry_run: bool,
    },

    /// Handle a `@bench-bot benchmark` PR comment.
    ProcessComment {
        /// Trigger payload JSON.
        #[arg(long)]
        payload_json: String,

        /// Write the accepted run request here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Workflow to dispatch for accepted commands.
        #[arg(long)]
        workflow: Option<String>,
    },

    /// Compare a PR run against recent history.
    Compare {
        /// PR head commit SHA.
        pr_sha: String,

        #[arg(long)]
        pr_number: u64,

        /// Local store directory or JSON file with the PR results.
        #[arg(long)]
        local_results: PathBuf,

        #[arg(long, default_value_t = lance_bench_benchmarks::compare::DEFAULT_BASELINE_LIMIT)]
        baseline_limit: usize,

        #[arg(long, default_value_t = lance_bench_benchmarks::compare::DEFAULT_MIN_BASELINE)]
        min_baseline_count: usize,

        /// |z-score| above which a change is flagged.
        #[arg(long, default_value_t = lance_bench_benchmarks::compare::DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Write the markdown report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Merge per-job result stores into one.
    Merge {
        /// Directory containing one result store per subdirectory.
        source_dir: PathBuf,

        /// Destination store directory.
        #[arg(long)]
        output: PathBuf,
    },

    /// Show resolved configuration.
    Status,
}

/// Run the CLI with parsed arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;

    match cli.command {
        Commands::PublishCriterion { report, dut } => {
            publish_report(&settings, ReportFormat::Criterion, report, dut.into_spec()).await
        }
        Commands::PublishPytest { report, dut } => {
            publish_report(&settings, ReportFormat::Pytest, report, dut.into_spec()).await
        }
        Commands::PublishDbpedia { report, dut } => {
            publish_report(&settings, ReportFormat::Dbpedia, report, dut.into_spec()).await
        }
        Commands::Check { commit_sha } => {
            let store = ResultStore::connect(&settings.store()).await?;
            let found = schedule::has_results(&store, &commit_sha).await?;
            println!("{found}");
            outputs::emit(&[("has_results", found.to_string())])?;
            Ok(())
        }
        Commands::Schedule {
            repository,
            branch,
            workflow,
            limit,
            max_dispatch,
            dry_run,
        } => {
            let client = GitHubClient::new(settings.github())?;
            let store = ResultStore::connect(&settings.store()).await?;
            let plan = SchedulePlan {
                repository: repository.unwrap_or_else(|| settings.repository.clone()),
                branch,
                workflow_repository: settings.workflow_repository.clone(),
                workflow,
                workflow_ref: "main".to_string(),
                limit,
                max_dispatch,
                dry_run,
            };
            let report = schedule::schedule_missing(&client, &store, &plan).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::ProcessComment {
            payload_json,
            output,
            workflow,
        } => {
            let event = CommentEvent::from_json(&payload_json)?;
            let client = GitHubClient::new(settings.github())?;
            let options = ProcessOptions {
                workflow,
                workflow_repository: settings.workflow_repository.clone(),
                ..ProcessOptions::default()
            };

            match process_comment(&client, &event, &options).await? {
                CommentOutcome::Accepted(request) => {
                    if let Some(path) = output {
                        fs::write(&path, serde_json::to_string_pretty(&request)?)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                    }
                    outputs::emit(&request.github_outputs())?;
                    println!("Benchmarks accepted: {}", request.summary);
                }
                outcome => {
                    outputs::emit(&[("should_run", "false".to_string())])?;
                    println!("No benchmarks started: {outcome:?}");
                }
            }
            Ok(())
        }
        Commands::Compare {
            pr_sha,
            pr_number,
            local_results,
            baseline_limit,
            min_baseline_count,
            threshold,
            output,
        } => {
            let baseline = ResultStore::connect(&settings.store()).await?;
            let request = CompareRequest {
                pr_sha,
                pr_number,
                local_results,
                baseline_limit,
                min_baseline: min_baseline_count,
                threshold,
            };
            let markdown = report::compare(&baseline, &request).await?;
            match output {
                Some(path) => {
                    fs::write(&path, markdown)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "wrote comparison report");
                }
                None => println!("{markdown}"),
            }
            Ok(())
        }
        Commands::Merge { source_dir, output } => {
            let merged = report::merge(&source_dir, &output).await?;
            println!("Merged {merged} results into {}", output.display());
            Ok(())
        }
        Commands::Status => {
            println!("lance-bench {}", env!("CARGO_PKG_VERSION"));
            match StoreLocation::resolve(&settings.store()) {
                Ok(location) => println!("store: {location}"),
                Err(e) => println!("store: unresolved ({e})"),
            }
            for (key, value) in settings.describe() {
                println!("  {key}: {value}");
            }
            Ok(())
        }
    }
}

async fn publish_report(
    settings: &Settings,
    format: ReportFormat,
    report: ReportArgs,
    dut: DutSpec,
) -> anyhow::Result<()> {
    let request = PublishRequest {
        format,
        path: report.path,
        testbed_name: report.testbed_name,
        dut,
        dry_run: report.dry_run,
        output: report.output,
        summary_path: outputs::env_path(outputs::GITHUB_STEP_SUMMARY),
    };
    publish::publish(settings, request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("lance-bench").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn criterion_needs_version_or_commit() {
        let err = parse(&["publish-criterion", "out.json", "--dut-timestamp", "1"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = parse(&[
            "publish-criterion",
            "out.json",
            "--dut-commit",
            "a1b2c3d",
            "--dut-timestamp",
            "1",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = parse(&[
            "publish-criterion",
            "out.json",
            "--dut-commit",
            "a1b2c3d",
            "--dut-semver",
            "0.21.1",
            "--dut-timestamp",
            "1735689600",
        ])
        .unwrap();
        let Commands::PublishCriterion { dut, .. } = cli.command else {
            panic!("wrong command");
        };
        let spec = dut.into_spec();
        assert_eq!(spec.name, "lance");
        assert_eq!(spec.commit.as_deref(), Some("a1b2c3d"));
        assert_eq!(spec.timestamp, Some(1_735_689_600));
    }

    #[test]
    fn criterion_requires_timestamp() {
        let err = parse(&["publish-criterion", "out.json", "--dut-version", "0.21.1+a1b2c3d"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn pytest_dut_flags_are_optional() {
        let cli = parse(&["publish-pytest", "report.json", "--dry-run"]).unwrap();
        let Commands::PublishPytest { report, dut } = cli.command else {
            panic!("wrong command");
        };
        assert!(report.dry_run);
        let spec = dut.into_spec();
        assert_eq!(spec.name, "pylance");
        assert_eq!(spec.version, None);
        assert_eq!(spec.timestamp, None);
    }

    #[test]
    fn pytest_commit_needs_semver() {
        let err = parse(&["publish-pytest", "report.json", "--dut-commit", "a1b2c3d4"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = parse(&[
            "publish-pytest",
            "report.json",
            "--dut-commit",
            "a1b2c3d4",
            "--dut-semver",
            "0.22.0",
        ])
        .unwrap();
        let Commands::PublishPytest { dut, .. } = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(dut.into_spec().semver.as_deref(), Some("0.22.0"));
    }

    #[test]
    fn output_requires_dry_run() {
        assert!(parse(&[
            "publish-dbpedia",
            "log.txt",
            "--dut-version",
            "0.21.1+a1b2c3d",
            "--dut-timestamp",
            "1",
            "--output",
            "x.json",
        ])
        .is_err());
    }

    #[test]
    fn compare_defaults() {
        let cli = parse(&[
            "compare",
            "a1b2c3d4",
            "--pr-number",
            "4021",
            "--local-results",
            "pr-results",
        ])
        .unwrap();
        let Commands::Compare {
            baseline_limit,
            min_baseline_count,
            threshold,
            ..
        } = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(baseline_limit, 20);
        assert_eq!(min_baseline_count, 5);
        assert_eq!(threshold, 2.0);
    }
}

//! Validation pipeline
//!
//! A run has two phases:
//!
//! 1. **Preparation** (sequential, fail-fast): the output template is checked
//!    and every enabled group's rule catalog is loaded and compiled. Any
//!    failure here aborts the run before a single file is touched.
//! 2. **Execution** (parallel): all groups fan out at once; within a group
//!    every discovered dump file is an independent job. Jobs of all groups
//!    share one worker budget (`max_workers`). The run returns only after
//!    every scheduled job has finished.
//!
//! Cancellation stops scheduling. Jobs already running finish normally and
//! their artifacts are complete.

pub mod discovery;
pub mod materializer;
pub mod processor;

pub use discovery::discover_dump_files;
pub use processor::{process_file, FileReport, OutputTarget};

use crate::catalog::load_catalog;
use crate::compiler::{compile, CompiledQueries, Dialect};
use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use pcheck_common::config::{GroupPaths, Settings};
use pcheck_common::{DumpFile, Group};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Run-wide execution parameters
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_workers: usize,
    pub dump_extensions: Vec<String>,
    pub template: PathBuf,
    pub output_extension: String,
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_workers: settings.max_workers,
            dump_extensions: settings.dump_extensions.clone(),
            template: settings.template.clone(),
            output_extension: settings.output_extension(),
        }
    }
}

/// A group ready for execution: its directories and compiled queries
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub paths: GroupPaths,
    pub queries: Arc<CompiledQueries>,
}

impl GroupPlan {
    pub fn group(&self) -> Group {
        self.paths.group
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub source: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct GroupReport {
    pub group: Group,
    pub files_discovered: usize,
    pub completed: Vec<FileReport>,
    pub failed: Vec<FileFailure>,
    /// Files never started because the run was cancelled
    pub not_scheduled: usize,
    /// Workers that panicked
    pub panicked: usize,
}

impl GroupReport {
    fn new(group: Group, files_discovered: usize) -> Self {
        Self {
            group,
            files_discovered,
            completed: Vec::new(),
            failed: Vec::new(),
            not_scheduled: 0,
            panicked: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    pub fn files_completed(&self) -> usize {
        self.groups.iter().map(|g| g.completed.len()).sum()
    }

    pub fn files_failed(&self) -> usize {
        self.groups.iter().map(|g| g.failed.len() + g.panicked).sum()
    }

    pub fn files_not_scheduled(&self) -> usize {
        self.groups.iter().map(|g| g.not_scheduled).sum()
    }

    pub fn group(&self, group: Group) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.group == group)
    }
}

/// Prepare and execute a full run
pub async fn run(settings: &Settings, cancel: CancellationToken) -> PipelineResult<RunReport> {
    let plans = prepare(settings).await?;
    Ok(execute(plans, RunOptions::from(settings), cancel).await)
}

/// Check the template and compile the catalog of every configured group.
///
/// Fails fast on the first unavailable template or catalog.
pub async fn prepare(settings: &Settings) -> PipelineResult<Vec<GroupPlan>> {
    if !settings.template.is_file() {
        return Err(PipelineError::TemplateUnavailable(settings.template.clone()));
    }

    let mut plans = Vec::with_capacity(settings.groups.len());
    for paths in &settings.groups {
        let group = paths.group;
        let catalog = load_catalog(&settings.rule_store, group)
            .await
            .map_err(|source| PipelineError::CatalogUnavailable { group, source })?;
        if catalog.is_empty() {
            warn!(group = %group, "Rule catalog has no usable rules");
        }
        plans.push(GroupPlan {
            paths: paths.clone(),
            queries: Arc::new(compile(&catalog, Dialect::Sqlite)),
        });
    }
    Ok(plans)
}

/// Process every group concurrently and wait for all of them
pub async fn execute(
    plans: Vec<GroupPlan>,
    options: RunOptions,
    cancel: CancellationToken,
) -> RunReport {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let span = info_span!("run", run_id = %run_id);

    async move {
        info!(
            groups = plans.len(),
            max_workers = options.max_workers,
            "Starting validation run"
        );

        let workers = Arc::new(Semaphore::new(options.max_workers));
        let groups = join_all(plans.into_iter().map(|plan| {
            let span = info_span!("group", group = %plan.group());
            run_group(plan, &options, Arc::clone(&workers), cancel.clone()).instrument(span)
        }))
        .await;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled: cancel.is_cancelled(),
            groups,
        };

        if report.cancelled {
            warn!(
                not_scheduled = report.files_not_scheduled(),
                "Run cancelled; in-flight files finished"
            );
        }
        info!(
            completed = report.files_completed(),
            failed = report.files_failed(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "All vendor files processed."
        );
        report
    }
    .instrument(span)
    .await
}

async fn run_group(
    plan: GroupPlan,
    options: &RunOptions,
    workers: Arc<Semaphore>,
    cancel: CancellationToken,
) -> GroupReport {
    let group = plan.group();
    let files = discover_dump_files(&plan.paths.dump_dir, group, &options.dump_extensions);
    let mut report = GroupReport::new(group, files.len());
    info!(files = files.len(), "Processing group");

    let target = Arc::new(OutputTarget {
        template: options.template.clone(),
        output_dir: plan.paths.output_dir.clone(),
        extension: options.output_extension.clone(),
    });

    let mut jobs: JoinSet<(DumpFile, PipelineResult<FileReport>)> = JoinSet::new();
    let mut pending = files.into_iter();

    while let Some(dump) = pending.next() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&workers).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            report.not_scheduled = 1 + pending.len();
            break;
        };

        let queries = Arc::clone(&plan.queries);
        let target = Arc::clone(&target);
        let span = info_span!("file", file = %dump.file_name());
        jobs.spawn(
            async move {
                let _permit = permit;
                let result = process_file(&dump, &queries, &target).await;
                (dump, result)
            }
            .instrument(span),
        );
    }

    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok((_, Ok(file))) => report.completed.push(file),
            Ok((dump, Err(e))) => {
                error!(file = %dump.path.display(), error = %e, "File processing failed");
                report.failed.push(FileFailure {
                    source: dump.path,
                    error: e.to_string(),
                });
            }
            Err(e) => {
                error!("File worker panicked: {}", e);
                report.panicked += 1;
            }
        }
    }

    report.completed.sort_by(|a, b| a.source.cmp(&b.source));
    report.failed.sort_by(|a, b| a.source.cmp(&b.source));

    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        "Group finished"
    );
    report
}

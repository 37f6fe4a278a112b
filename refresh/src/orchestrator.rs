use std::collections::HashMap;
use std::time::Duration;

use tokio::process::Command;
use tracing::info;
use tracing::warn;

use crate::staleness::DEFAULT_MAX_AGE;
use crate::staleness::is_stale;
use crate::task::RefreshTask;

/// What happened to one task during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Target artifact was younger than the freshness window.
    SkippedFresh,
    /// Target was stale but required environment variables were absent.
    SkippedMissingEnv(Vec<String>),
    /// Dry run: the task would have been spawned.
    WouldRun,
    /// Child process ran to completion; `success` mirrors its exit status.
    Completed { success: bool },
    /// The child process could not be started at all.
    SpawnFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<TaskReport>,
}

/// Sequential batch runner over a static task list.
///
/// Tasks run strictly in list order and each refresh procedure is awaited
/// to completion before the next task is considered. No task outcome aborts
/// the batch, and no timeout is applied to a child process: a hung child
/// hangs the batch.
pub struct RefreshRunner {
    tasks: Vec<RefreshTask>,
    max_age: Duration,
    dry_run: bool,
    /// Snapshot of the process environment, taken at construction so
    /// prerequisite checks are consistent for the whole batch.
    env: HashMap<String, String>,
}

impl RefreshRunner {
    pub fn new(tasks: Vec<RefreshTask>) -> Self {
        Self {
            tasks,
            max_age: DEFAULT_MAX_AGE,
            dry_run: false,
            env: std::env::vars().collect(),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> RunSummary {
        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let outcome = self.run_task(task).await;
            reports.push(TaskReport {
                name: task.name.clone(),
                outcome,
            });
        }

        let refreshed = count(&reports, |o| {
            matches!(o, TaskOutcome::Completed { success: true })
        });
        let fresh = count(&reports, |o| matches!(o, TaskOutcome::SkippedFresh));
        let failed = count(&reports, |o| {
            matches!(
                o,
                TaskOutcome::Completed { success: false } | TaskOutcome::SpawnFailed
            )
        });
        info!(
            "refresh batch complete: {refreshed} refreshed, {fresh} fresh, {failed} failed, {} total",
            reports.len()
        );
        RunSummary { reports }
    }

    async fn run_task(&self, task: &RefreshTask) -> TaskOutcome {
        if !is_stale(&task.target_path, self.max_age) {
            info!(
                "{}: {} is fresh, skipping",
                task.name,
                task.target_path.display()
            );
            return TaskOutcome::SkippedFresh;
        }

        let missing = self.missing_env(task);
        if !missing.is_empty() {
            warn!(
                "{}: skipping, missing required env: {}",
                task.name,
                missing.join(", ")
            );
            return TaskOutcome::SkippedMissingEnv(missing);
        }

        if self.dry_run {
            info!("{}: stale, would run {:?}", task.name, task.command);
            return TaskOutcome::WouldRun;
        }

        let Some(mut command) = command_from_argv(&task.command) else {
            warn!("{}: empty refresh command", task.name);
            return TaskOutcome::SpawnFailed;
        };
        info!("{}: refreshing via {:?}", task.name, task.command);
        // Stdio is inherited; the child's output lands in the build log.
        match command.status().await {
            Ok(status) if status.success() => TaskOutcome::Completed { success: true },
            Ok(status) => {
                warn!("{}: refresh exited with {status}", task.name);
                TaskOutcome::Completed { success: false }
            }
            Err(err) => {
                warn!("{}: failed to spawn refresh: {err}", task.name);
                TaskOutcome::SpawnFailed
            }
        }
    }

    fn missing_env(&self, task: &RefreshTask) -> Vec<String> {
        task.required_env
            .iter()
            .filter(|var| {
                self.env
                    .get(var.as_str())
                    .is_none_or(|value| value.trim().is_empty())
            })
            .cloned()
            .collect()
    }
}

fn command_from_argv(argv: &[String]) -> Option<Command> {
    let (program, args) = argv.split_first()?;
    if program.is_empty() {
        return None;
    }
    let mut command = Command::new(program);
    command.args(args);
    Some(command)
}

fn count(reports: &[TaskReport], pred: impl Fn(&TaskOutcome) -> bool) -> usize {
    reports.iter().filter(|report| pred(&report.outcome)).count()
}

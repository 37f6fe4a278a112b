use std::path::Path;
use std::path::PathBuf;

/// One independently triggerable unit of refresh work.
///
/// Tasks are defined once at orchestrator construction and never mutated.
/// The command is an argv vector executed as a child process; the target
/// path's modification time is the staleness signal for the artifact the
/// command regenerates.
#[derive(Debug, Clone)]
pub struct RefreshTask {
    pub name: String,
    pub target_path: PathBuf,
    pub command: Vec<String>,
    /// Environment variables that must all be set (non-empty) for the task
    /// to run.
    pub required_env: Vec<String>,
}

impl RefreshTask {
    pub fn new(name: &str, target_path: PathBuf, command: &[&str], required_env: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            target_path,
            command: command.iter().copied().map(str::to_string).collect(),
            required_env: required_env.iter().copied().map(str::to_string).collect(),
        }
    }
}

/// The static task list the site build runs, in order.
pub fn builtin_tasks(data_dir: &Path) -> Vec<RefreshTask> {
    vec![
        RefreshTask::new(
            "github-stats",
            data_dir.join("github-stats.json"),
            &["scripts/refresh-github-stats.sh"],
            &["GITHUB_TOKEN"],
        ),
        RefreshTask::new(
            "nuget-packages",
            data_dir.join("nuget-packages.json"),
            &["scripts/refresh-nuget-packages.sh"],
            &[],
        ),
        RefreshTask::new(
            "project-repos",
            data_dir.join("project-repos.json"),
            &["scripts/refresh-project-repos.sh"],
            &["GITHUB_TOKEN"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtin_tasks_target_the_data_dir_in_order() {
        let tasks = builtin_tasks(Path::new("/site/data"));
        let names: Vec<&str> = tasks.iter().map(|task| task.name.as_str()).collect();
        assert_eq!(names, vec!["github-stats", "nuget-packages", "project-repos"]);
        assert_eq!(
            tasks[0].target_path,
            PathBuf::from("/site/data/github-stats.json")
        );
    }
}

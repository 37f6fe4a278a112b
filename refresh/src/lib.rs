//! Build-time refresh coordination for cached site metrics.
//!
//! The site build keeps external data (GitHub star/fork counts, NuGet
//! package listings, project repository lists) as local artifacts. This
//! crate decides which artifacts have gone stale, checks each task's
//! environment prerequisites, and runs the matching refresh procedure as an
//! isolated child process. Persistence of refreshed results lives in
//! `sitemetrics-store` and is used by the refresh procedures themselves,
//! never by the orchestrator.

pub mod env_file;
pub mod orchestrator;
pub mod staleness;
pub mod task;

pub use env_file::load_env_file;
pub use orchestrator::RefreshRunner;
pub use orchestrator::RunSummary;
pub use orchestrator::TaskOutcome;
pub use staleness::DEFAULT_MAX_AGE;
pub use staleness::is_stale;
pub use task::RefreshTask;
pub use task::builtin_tasks;

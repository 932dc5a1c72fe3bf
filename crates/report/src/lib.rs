//! Run report assembly for executable stories
//!
//! This crate turns collected test cases into the run report:
//! - ReportConfig: output location and toggles (`executable-stories.toml` + env)
//! - CI detection and git SHA discovery for run metadata
//! - Reporter: assembles the `Run` and writes it atomically as pretty JSON
//! - run_and_report / write_results: suite-level entry points

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ci;
pub mod config;
pub mod error;
pub mod git;
pub mod reporter;
pub mod writer;

pub use ci::{detect_ci, detect_ci_from};
pub use config::{process_env, ReportConfig, CONFIG_FILE_NAME, DISABLE_ENV};
pub use error::{ReportError, ReportResult};
pub use git::{find_git_dir, read_git_sha};
pub use reporter::{run_and_report, run_and_report_with, write_results, Reporter};
pub use writer::write_run;

//! Core types for executable stories
//!
//! This crate defines the data model shared by the story builder and the
//! reporter:
//! - Keyword: Given/When/Then/And/But, with primary-keyword classification
//! - Status: pass/fail/skip outcome of a test
//! - DocEntry: typed documentation records attached to stories and steps
//! - Step, StoryRecord, Attachment, TestCase, Run: the run report schema
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod doc;
pub mod error;
pub mod record;
pub mod schema;
pub mod types;

pub use doc::{DocEntry, DocKind, DocPhase};
pub use error::{StoryError, StoryResult};
pub use record::{
    split_title_path, Attachment, CiInfo, Run, Step, StoryRecord, TestCase, TestError,
};
pub use schema::{
    now_epoch_ms, DEFAULT_OUTPUT_PATH, ENCODING_BASE64, ENCODING_IDENTITY, OUTPUT_ENV,
    SCHEMA_VERSION, TITLE_PATH_SEPARATOR,
};
pub use types::{Keyword, Status};

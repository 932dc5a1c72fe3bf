//! Report schema constants
//!
//! These values are part of the on-disk contract read by downstream
//! formatters. Changing any of them is a schema break.

use chrono::Utc;

/// Version of the run report schema
pub const SCHEMA_VERSION: u32 = 1;

/// Default report location, relative to the project root
pub const DEFAULT_OUTPUT_PATH: &str = ".executable-stories/raw-run.json";

/// Environment variable overriding the report location
pub const OUTPUT_ENV: &str = "EXECUTABLE_STORIES_OUTPUT";

/// Separator between suite levels in a hierarchical test name
pub const TITLE_PATH_SEPARATOR: char = '/';

/// Attachment encoding for verbatim text bodies
pub const ENCODING_IDENTITY: &str = "IDENTITY";

/// Attachment encoding for base64 bodies
pub const ENCODING_BASE64: &str = "BASE64";

/// Milliseconds since Unix epoch, clamped to zero if the clock is before it
pub fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

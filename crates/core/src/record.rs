//! Run report records
//!
//! The types in this module are the serialized form of a test run. Field names
//! are camelCase on the wire, and optional fields are omitted when absent so
//! that downstream formatters can tell "not recorded" apart from "empty".

use crate::doc::DocEntry;
use crate::schema::{ENCODING_BASE64, ENCODING_IDENTITY, SCHEMA_VERSION, TITLE_PATH_SEPARATOR};
use crate::types::{Keyword, Status};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Step / Story
// ============================================================================

/// A single BDD step as stored in a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// `step-<index>`, unique within the story
    pub id: String,
    /// Effective keyword after normalization
    pub keyword: Keyword,
    /// Step text as written
    pub text: String,
    /// True only for steps created through a timed entry point
    pub wrapped: bool,
    /// Docs attached while this step was current
    pub docs: Vec<DocEntry>,
    /// Elapsed time of the wrapped body in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl Step {
    /// Create an unwrapped step with index-derived ID
    pub fn new(index: usize, keyword: Keyword, text: impl Into<String>) -> Self {
        Step {
            id: Self::id_for(index),
            keyword,
            text: text.into(),
            wrapped: false,
            docs: Vec::new(),
            duration_ms: None,
        }
    }

    /// The step ID for a 0-based index
    pub fn id_for(index: usize) -> String {
        format!("step-{}", index)
    }
}

/// Frozen story state of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    /// Scenario title
    pub scenario: String,
    /// Steps in creation order
    pub steps: Vec<Step>,
    /// Tags, deduplicated, insertion order preserved
    pub tags: Vec<String>,
    /// Ticket references, deduplicated, insertion order preserved
    pub tickets: Vec<String>,
    /// User metadata
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// Docs attached before the first step
    pub docs: Vec<DocEntry>,
    /// Process-wide creation order
    pub source_order: u64,
}

impl StoryRecord {
    /// An empty story with the given scenario and order
    pub fn new(scenario: impl Into<String>, source_order: u64) -> Self {
        StoryRecord {
            scenario: scenario.into(),
            steps: Vec::new(),
            tags: Vec::new(),
            tickets: Vec::new(),
            meta: Map::new(),
            docs: Vec::new(),
            source_order,
        }
    }
}

// ============================================================================
// Attachment
// ============================================================================

/// A file reference or inline body attached to a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Display name
    pub name: String,
    /// MIME type
    pub media_type: String,
    /// Path to the attached file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Inline body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Body encoding, `IDENTITY` or `BASE64`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Decoded size of a binary body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<usize>,
    /// Index of the step current at attach time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    /// ID of the step current at attach time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl Attachment {
    fn empty(name: String, media_type: String) -> Self {
        Attachment {
            name,
            media_type,
            path: None,
            body: None,
            encoding: None,
            byte_length: None,
            step_index: None,
            step_id: None,
        }
    }

    /// Reference a file on disk
    pub fn file(
        name: impl Into<String>,
        media_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Attachment {
            path: Some(path.into()),
            ..Self::empty(name.into(), media_type.into())
        }
    }

    /// Embed a body with an explicit encoding
    ///
    /// An empty encoding defaults to `IDENTITY`.
    pub fn inline(
        name: impl Into<String>,
        media_type: impl Into<String>,
        body: impl Into<String>,
        encoding: &str,
    ) -> Self {
        let encoding = if encoding.is_empty() {
            ENCODING_IDENTITY
        } else {
            encoding
        };
        Attachment {
            body: Some(body.into()),
            encoding: Some(encoding.to_string()),
            ..Self::empty(name.into(), media_type.into())
        }
    }

    /// Embed binary content as base64
    pub fn bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Attachment {
            body: Some(STANDARD.encode(bytes)),
            encoding: Some(ENCODING_BASE64.to_string()),
            byte_length: Some(bytes.len()),
            ..Self::empty(name.into(), media_type.into())
        }
    }

    /// Bind the attachment to a step
    pub fn with_step(mut self, index: usize, id: impl Into<String>) -> Self {
        self.step_index = Some(index);
        self.step_id = Some(id.into());
        self
    }
}

// ============================================================================
// TestCase / Run
// ============================================================================

/// Failure detail of a failed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestError {
    /// Failure message
    pub message: String,
    /// Backtrace or location, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Immutable result of one finished test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Full hierarchical test name
    pub title: String,
    /// Test name split on `/`
    pub title_path: Vec<String>,
    /// Frozen story
    pub story: StoryRecord,
    /// Outcome
    pub status: Status,
    /// Wall time from story creation to finalization
    pub duration_ms: f64,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestError>,
    /// Attempt number (0 for the first run)
    #[serde(default)]
    pub retry: u32,
    /// Configured retry count
    #[serde(default)]
    pub retries: u32,
    /// Attachments in attach order
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// CI environment descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiInfo {
    /// Provider name (`github`, `circleci`, `jenkins`, `travis`, `gitlab`, `ci`)
    pub name: String,
    /// Link to the build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Build number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
}

/// Top-level run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Report schema version
    pub schema_version: u32,
    /// Test cases in collection order
    pub test_cases: Vec<TestCase>,
    /// Absolute project root
    pub project_root: String,
    /// Suite start, epoch milliseconds
    pub started_at_ms: u64,
    /// Suite finish, epoch milliseconds
    pub finished_at_ms: u64,
    /// Version of the package under test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_version: Option<String>,
    /// Commit the run was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    /// CI environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci: Option<CiInfo>,
    /// Run-level metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Run {
    /// A run with the current schema version and no optional metadata
    pub fn new(
        test_cases: Vec<TestCase>,
        project_root: impl Into<String>,
        started_at_ms: u64,
        finished_at_ms: u64,
    ) -> Self {
        Run {
            schema_version: SCHEMA_VERSION,
            test_cases,
            project_root: project_root.into(),
            started_at_ms,
            finished_at_ms,
            package_version: None,
            git_sha: None,
            ci: None,
            meta: None,
        }
    }
}

/// Split a hierarchical test name into its title path
///
/// `"Parent/Child"` becomes `["Parent", "Child"]`. Every segment is kept,
/// including empty ones, so the path always joins back to the name.
pub fn split_title_path(name: &str) -> Vec<String> {
    name.split(TITLE_PATH_SEPARATOR).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample_case() -> TestCase {
        let mut story = StoryRecord::new("Adds two numbers", 3);
        story.tags.push("math".to_string());
        let mut step = Step::new(0, Keyword::Given, "a calculator");
        step.docs.push(DocEntry::note("fresh instance"));
        story.steps.push(step);
        let mut timed = Step::new(1, Keyword::When, "I add 2 and 3");
        timed.wrapped = true;
        timed.duration_ms = Some(0.25);
        story.steps.push(timed);

        TestCase {
            title: "Calc/Adds".to_string(),
            title_path: split_title_path("Calc/Adds"),
            story,
            status: Status::Pass,
            duration_ms: 1.5,
            error: None,
            retry: 0,
            retries: 0,
            attachments: vec![Attachment::file("log", "text/plain", "out.log").with_step(1, "step-1")],
        }
    }

    #[test]
    fn test_split_title_path() {
        assert_eq!(split_title_path("Parent/Child"), vec!["Parent", "Child"]);
        assert_eq!(split_title_path("Solo"), vec!["Solo"]);
        assert_eq!(split_title_path("a/b/c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_step_wire_format() {
        let value = serde_json::to_value(Step::new(2, Keyword::And, "more")).unwrap();
        assert_eq!(
            value,
            json!({ "id": "step-2", "keyword": "And", "text": "more", "wrapped": false, "docs": [] })
        );
    }

    #[test]
    fn test_test_case_wire_format() {
        let value = serde_json::to_value(sample_case()).unwrap();
        assert_eq!(value["titlePath"], json!(["Calc", "Adds"]));
        assert_eq!(value["story"]["sourceOrder"], 3);
        assert_eq!(value["story"]["steps"][1]["durationMs"], 0.25);
        assert!(value["story"]["steps"][0].get("durationMs").is_none());
        assert_eq!(value["status"], "pass");
        assert_eq!(value["attachments"][0]["stepId"], "step-1");
        assert_eq!(value["attachments"][0]["stepIndex"], 1);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_run_omits_absent_metadata() {
        let run = Run::new(vec![sample_case()], "/project", 10, 20);
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["schemaVersion"], 1);
        assert_eq!(value["startedAtMs"], 10);
        assert_eq!(value["finishedAtMs"], 20);
        for key in ["packageVersion", "gitSha", "ci", "meta"] {
            assert!(value.get(key).is_none(), "{} should be omitted", key);
        }

        let back: Run = serde_json::from_value(value).unwrap();
        assert_eq!(back, run);
    }

    #[test]
    fn test_attachment_bytes_base64() {
        let attachment = Attachment::bytes("blob", "application/octet-stream", b"hello");
        assert_eq!(attachment.body.as_deref(), Some("aGVsbG8="));
        assert_eq!(attachment.encoding.as_deref(), Some(ENCODING_BASE64));
        assert_eq!(attachment.byte_length, Some(5));
        assert!(attachment.path.is_none());
    }

    #[test]
    fn test_attachment_inline_defaults_to_identity() {
        let attachment = Attachment::inline("out", "text/plain", "hi", "");
        assert_eq!(attachment.encoding.as_deref(), Some(ENCODING_IDENTITY));
        assert!(attachment.byte_length.is_none());
        assert!(attachment.step_index.is_none());
    }

    #[test]
    fn test_ci_info_wire_format() {
        let ci = CiInfo {
            name: "github".to_string(),
            url: None,
            build_number: Some("42".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&ci).unwrap(),
            json!({ "name": "github", "buildNumber": "42" })
        );
    }

    proptest! {
        #[test]
        fn test_attachment_bytes_decode_to_input(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let attachment = Attachment::bytes("blob", "application/octet-stream", &bytes);
            prop_assert_eq!(attachment.byte_length, Some(bytes.len()));
            let decoded = STANDARD.decode(attachment.body.unwrap()).unwrap();
            prop_assert_eq!(decoded, bytes);
        }
    }
}

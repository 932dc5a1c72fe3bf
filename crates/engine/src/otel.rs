//! OpenTelemetry bridge
//!
//! Feature-gated: enable with `--features otel`. Without it, [`bridge`] does
//! nothing.
//!
//! A story started while a span is active on the current thread is linked to
//! it in both directions:
//! - `meta.otel` receives `{ traceId, spanId }`
//! - the story gets a `Trace ID` kv doc, plus a `View Trace` link when a URL
//!   template is configured (`{traceId}` is substituted)
//! - the span gets `story.scenario`, `story.tags` and `story.tickets`
//!
//! The template comes from [`crate::StoryOptions::trace_url_template`], else
//! from [`TRACE_URL_TEMPLATE_ENV`].

use stories_core::StoryRecord;

/// Environment variable holding the trace URL template
pub const TRACE_URL_TEMPLATE_ENV: &str = "OTEL_TRACE_URL_TEMPLATE";

/// Placeholder replaced by the trace ID in a URL template
pub const TRACE_ID_PLACEHOLDER: &str = "{traceId}";

/// Link `record` to the active span
///
/// Returns `true` when a valid span was found.
#[cfg(feature = "otel")]
pub(crate) fn bridge(record: &mut StoryRecord, template: Option<&str>) -> bool {
    use opentelemetry::trace::TraceContextExt;
    use opentelemetry::{Array, Context, KeyValue, StringValue};
    use serde_json::json;
    use stories_core::DocEntry;

    let cx = Context::current();
    let span = cx.span();
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return false;
    }

    let trace_id = span_context.trace_id().to_string();
    let span_id = span_context.span_id().to_string();

    record.meta.insert(
        "otel".to_string(),
        json!({ "traceId": trace_id, "spanId": span_id }),
    );
    record.docs.push(DocEntry::kv("Trace ID", trace_id.clone()));

    let template = template.map(str::to_string).or_else(|| {
        std::env::var(TRACE_URL_TEMPLATE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
    });
    if let Some(template) = template {
        let url = template.replace(TRACE_ID_PLACEHOLDER, &trace_id);
        record.docs.push(DocEntry::link("View Trace", url));
    }

    let strings = |items: &[String]| {
        Array::String(items.iter().cloned().map(StringValue::from).collect())
    };
    span.set_attribute(KeyValue::new("story.scenario", record.scenario.clone()));
    if !record.tags.is_empty() {
        span.set_attribute(KeyValue::new("story.tags", strings(&record.tags)));
    }
    if !record.tickets.is_empty() {
        span.set_attribute(KeyValue::new("story.tickets", strings(&record.tickets)));
    }

    tracing::debug!(
        target: "stories::story",
        scenario = %record.scenario,
        trace_id = %trace_id,
        "Story linked to active span"
    );
    true
}

/// No-op without the `otel` feature
#[cfg(not(feature = "otel"))]
pub(crate) fn bridge(_record: &mut StoryRecord, _template: Option<&str>) -> bool {
    false
}

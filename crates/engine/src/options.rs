//! Story construction options

use crate::collector::Collector;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Options applied when a story is created
///
/// Tags and tickets accumulate as ordered sets: repeats are dropped, first
/// insertion wins. Metadata keys overwrite earlier values.
#[derive(Debug, Clone, Default)]
pub struct StoryOptions {
    pub(crate) tags: Vec<String>,
    pub(crate) tickets: Vec<String>,
    pub(crate) meta: Map<String, Value>,
    pub(crate) retry: u32,
    pub(crate) retries: u32,
    pub(crate) collector: Option<Arc<Collector>>,
    pub(crate) trace_url_template: Option<String>,
}

fn union<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item = item.into();
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

impl StoryOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        union(&mut self.tags, tags);
        self
    }

    /// Add ticket references
    pub fn tickets<I, S>(mut self, tickets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        union(&mut self.tickets, tickets);
        self
    }

    /// Set one metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Merge a metadata map; its keys overwrite existing ones
    pub fn meta_map(mut self, meta: Map<String, Value>) -> Self {
        self.meta.extend(meta);
        self
    }

    /// Record retry counters: this attempt and the configured maximum
    pub fn retry(mut self, retry: u32, retries: u32) -> Self {
        self.retry = retry;
        self.retries = retries;
        self
    }

    /// Record into this collector instead of the process-wide one
    pub fn collector(mut self, collector: Arc<Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// URL template for the trace link, with a `{traceId}` placeholder
    ///
    /// Only used with the `otel` feature. Overrides `OTEL_TRACE_URL_TEMPLATE`.
    pub fn trace_url_template(mut self, template: impl Into<String>) -> Self {
        self.trace_url_template = Some(template.into());
        self
    }

    pub(crate) fn resolve_collector(&self) -> Arc<Collector> {
        self.collector.clone().unwrap_or_else(Collector::global)
    }
}

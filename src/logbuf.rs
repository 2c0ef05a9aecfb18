//! In-memory log ring buffer
//!
//! A `tracing_subscriber::Layer` copies every event into a capacity-bounded
//! buffer (oldest evicted first) so recent activity can be read over HTTP
//! at `GET /api/logs`.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Cap on the serialized `data` payload, in characters
pub const MAX_DATA_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn from_tracing(level: &tracing::Level) -> Option<Self> {
        match *level {
            tracing::Level::ERROR => Some(LogLevel::Error),
            tracing::Level::WARN => Some(LogLevel::Warn),
            tracing::Level::INFO => Some(LogLevel::Info),
            tracing::Level::DEBUG => Some(LogLevel::Debug),
            tracing::Level::TRACE => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Filters for reading the buffer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    /// Minimum level
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub struct LogBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Matching entries in chronological order, limited to the most recent `limit`
    pub fn query(&self, query: &LogQuery) -> Vec<LogEntry> {
        let min_level = query.level.as_deref().and_then(LogLevel::parse);
        let limit = query.limit.unwrap_or(100);

        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|e| min_level.map(|min| e.level >= min).unwrap_or(true))
            .filter(|e| {
                query
                    .category
                    .as_deref()
                    .map(|c| e.category == c)
                    .unwrap_or(true)
            })
            .take(limit)
            .cloned()
            .collect();
        matched.reverse();
        matched
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything, returning how many entries were removed
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let removed = entries.len();
        entries.clear();
        removed
    }

}

/// Layer feeding a shared `LogBuffer`
pub struct LogBufferLayer {
    buffer: Arc<LogBuffer>,
}

impl LogBufferLayer {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    category: Option<String>,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "category" => self.category = Some(value.to_string()),
            name => {
                self.fields.insert(name.to_string(), value.to_string());
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "category" => self.category = Some(format!("{:?}", value)),
            name => {
                self.fields.insert(name.to_string(), format!("{:?}", value));
            }
        }
    }
}

/// `spawngate::tools::dispatcher` → `tools`; foreign targets keep their crate name
pub fn category_for_target(target: &str) -> String {
    let mut parts = target.split("::");
    match (parts.next(), parts.next()) {
        (Some("spawngate"), Some(module)) => module.to_string(),
        (Some(root), _) => root.to_string(),
        _ => target.to_string(),
    }
}

fn truncate_data(text: String) -> String {
    match text.char_indices().nth(MAX_DATA_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text,
    }
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let Some(level) = LogLevel::from_tracing(metadata.level()) else {
            return;
        };

        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let data = if collector.fields.is_empty() {
            None
        } else {
            serde_json::to_string(&collector.fields).ok().map(truncate_data)
        };

        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            category: collector
                .category
                .unwrap_or_else(|| category_for_target(metadata.target())),
            message: collector.message.unwrap_or_default(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn entry(level: LogLevel, category: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: String::new(),
            level,
            category: category.to_string(),
            message: message.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(entry(LogLevel::Info, "test", &i.to_string()));
        }
        let messages: Vec<String> = buffer
            .query(&LogQuery::default())
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_query_filters() {
        let buffer = LogBuffer::new(10);
        buffer.push(entry(LogLevel::Debug, "agent", "d"));
        buffer.push(entry(LogLevel::Warn, "agent", "w"));
        buffer.push(entry(LogLevel::Error, "tools", "e"));

        let warn_up = buffer.query(&LogQuery {
            level: Some("warn".into()),
            ..Default::default()
        });
        assert_eq!(warn_up.len(), 2);

        let agent = buffer.query(&LogQuery {
            category: Some("agent".into()),
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(agent.len(), 1);
        assert_eq!(agent[0].message, "w");

        assert_eq!(buffer.clear(), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_category_for_target() {
        assert_eq!(category_for_target("spawngate::tools::dispatcher"), "tools");
        assert_eq!(category_for_target("spawngate"), "spawngate");
        assert_eq!(category_for_target("hyper::proto"), "hyper");
    }

    #[test]
    fn test_layer_captures_events() {
        let buffer = Arc::new(LogBuffer::new(10));
        let subscriber = tracing_subscriber::registry().with(LogBufferLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(tool = "read_file", payload = %"x".repeat(600), "Tool finished");
            tracing::trace!("ignored");
        });

        let entries = buffer.query(&LogQuery::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Tool finished");
        assert_eq!(entries[0].level, LogLevel::Info);
        let data = entries[0].data.as_deref().unwrap();
        assert!(data.ends_with("..."));
        assert!(data.chars().count() <= MAX_DATA_CHARS + 3);
    }
}

//! Bounded in-memory record of every provider attempt.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{channel::Channel, retry::ErrorClass};

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub id: Uuid,
    pub channel: Channel,
    pub provider: String,
    /// Destination with all but its edges masked.
    pub destination: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    pub elapsed_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Shared ring of the most recent [`DispatchRecord`]s.
///
/// Clones share the same storage. A capacity of zero keeps nothing.
#[derive(Clone, Debug)]
pub struct DispatchLog {
    capacity: usize,
    records: Arc<Mutex<VecDeque<DispatchRecord>>>,
}

impl Default for DispatchLog {
    fn default() -> Self { Self::new(1000) }
}

impl DispatchLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))) }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    pub fn record(&self, record: DispatchRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push_back(record);
            while records.len() > self.capacity {
                drop(records.pop_front());
            }
        }
    }

    /// Up to `limit` records, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<DispatchRecord> {
        self.records
            .lock()
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize { self.records.lock().map(|records| records.len()).unwrap_or(0) }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Mask a destination for logs: keep the first two and last two characters of
/// a phone number, and the first character plus the domain of an email address.
#[must_use]
pub fn mask_destination(destination: &str) -> String {
    if let Some((local, domain)) = destination.split_once('@') {
        let first = local.chars().next().map(String::from).unwrap_or_default();
        return format!("{first}***@{domain}");
    }

    let chars: Vec<char> = destination.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(provider: &str) -> DispatchRecord {
        DispatchRecord {
            id: Uuid::new_v4(),
            channel: Channel::Sms,
            provider: provider.to_string(),
            destination: mask_destination("+905551112233"),
            success: true,
            message_id: Some("id".to_string()),
            error: None,
            error_class: None,
            elapsed_ms: 1,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_prunes_oldest_records() {
        let log = DispatchLog::new(2);
        log.record(record("a"));
        log.record(record("b"));
        log.record(record("c"));

        let providers: Vec<_> = log.recent(10).into_iter().map(|r| r.provider).collect();
        assert_eq!(providers, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = DispatchLog::new(0);
        log.record(record("a"));

        assert!(log.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let log = DispatchLog::new(5);
        log.clone().record(record("a"));

        assert_eq!(log.len(), 1);
        assert_eq!(log.recent(0).len(), 0);
    }

    #[test]
    fn test_mask_destination() {
        assert_eq!(mask_destination("+905551112233"), "+9*********33");
        assert_eq!(mask_destination("ahmet@example.com"), "a***@example.com");
        assert_eq!(mask_destination("123"), "***");
    }
}

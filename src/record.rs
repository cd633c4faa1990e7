//! Change-record types.
//!
//! A [`ChangeRecord`] is the structured payload describing one detected
//! value change. Records are serializable so containers can fold them into
//! their own transition pipelines or persist them for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::StateValue;

/// The change described by a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChangePayload {
    /// A watched derived value moved between two consecutive transitions.
    ValueChanged {
        /// Handler name, or the watched path when no name was given.
        label: String,
        /// Originating dotted path, for path registrations.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        /// Diagnostic representation of the selector.
        selector: String,
        /// Memoized value before the transition; `None` when absent.
        previous: Option<StateValue>,
        /// Derived value after the transition; `None` when absent.
        current: Option<StateValue>,
    },
}

/// One detected value change, with identity and timing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Unique id of this record.
    pub record_id: Uuid,
    /// When the change was detected.
    pub timestamp: DateTime<Utc>,
    /// The change itself.
    pub payload: ChangePayload,
}

impl ChangeRecord {
    /// Builds a `value-changed` record.
    #[must_use]
    pub fn value_changed(
        label: impl Into<String>,
        path: Option<String>,
        selector: impl Into<String>,
        previous: Option<StateValue>,
        current: Option<StateValue>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload: ChangePayload::ValueChanged {
                label: label.into(),
                path,
                selector: selector.into(),
                previous,
                current,
            },
        }
    }

    /// The record's label.
    #[must_use]
    pub fn label(&self) -> &str {
        match &self.payload {
            ChangePayload::ValueChanged { label, .. } => label,
        }
    }

    /// The memoized value before the transition.
    #[must_use]
    pub fn previous(&self) -> Option<&StateValue> {
        match &self.payload {
            ChangePayload::ValueChanged { previous, .. } => previous.as_ref(),
        }
    }

    /// The derived value after the transition.
    #[must_use]
    pub fn current(&self) -> Option<&StateValue> {
        match &self.payload {
            ChangePayload::ValueChanged { current, .. } => current.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessors() {
        let record = ChangeRecord::value_changed(
            "a.b",
            Some("a.b".to_string()),
            "a.b",
            Some(StateValue::Int(1)),
            Some(StateValue::Int(2)),
        );
        assert_eq!(record.label(), "a.b");
        assert_eq!(record.previous(), Some(&StateValue::Int(1)));
        assert_eq!(record.current(), Some(&StateValue::Int(2)));
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = ChangeRecord::value_changed(
            "count",
            None,
            "count",
            None,
            Some(StateValue::Int(1)),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["payload"]["kind"], "value-changed");
        assert_eq!(json["payload"]["label"], "count");
        // Absent previous and a path of None are both omitted-or-null, while
        // a present value keeps its tagged encoding.
        assert_eq!(json["payload"]["previous"], serde_json::Value::Null);
        assert_eq!(json["payload"]["current"]["type"], "int");
    }

    #[test]
    fn test_record_roundtrip() {
        let record = ChangeRecord::value_changed(
            "items",
            Some("items".to_string()),
            "items",
            Some(StateValue::List(vec![])),
            None,
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: ChangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.record_id, record.record_id);
        assert_eq!(back.payload, record.payload);
    }
}

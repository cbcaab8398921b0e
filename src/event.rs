//! Model events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use crate::descriptor::FieldDescriptor;
use crate::value::Value;

/// Identifies one instance created from a model schema.
///
/// Instances of the same schema share listeners and the revision counter;
/// the id lets a listener tell their events apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinds of events raised by a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A field was written
    Value,
    /// A batch of writes was committed
    Commit,
    /// Current value of a field, replayed by a snapshot
    SnapshotValue,
    /// End of a snapshot
    SnapshotCommit,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Value,
        EventKind::Commit,
        EventKind::SnapshotValue,
        EventKind::SnapshotCommit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Value => "value",
            EventKind::Commit => "commit",
            EventKind::SnapshotValue => "snapshotValue",
            EventKind::SnapshotCommit => "snapshotCommit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered to model listeners
#[derive(Debug, Clone)]
pub enum ModelEvent {
    Value {
        instance: InstanceId,
        field: Rc<FieldDescriptor>,
        value: Value,
    },
    Commit {
        instance: InstanceId,
        revision: u64,
    },
    SnapshotValue {
        instance: InstanceId,
        field: Rc<FieldDescriptor>,
        value: Value,
    },
    SnapshotCommit {
        instance: InstanceId,
        revision: u64,
    },
}

impl ModelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ModelEvent::Value { .. } => EventKind::Value,
            ModelEvent::Commit { .. } => EventKind::Commit,
            ModelEvent::SnapshotValue { .. } => EventKind::SnapshotValue,
            ModelEvent::SnapshotCommit { .. } => EventKind::SnapshotCommit,
        }
    }

    pub fn instance(&self) -> InstanceId {
        match self {
            ModelEvent::Value { instance, .. }
            | ModelEvent::Commit { instance, .. }
            | ModelEvent::SnapshotValue { instance, .. }
            | ModelEvent::SnapshotCommit { instance, .. } => *instance,
        }
    }

    /// Field descriptor, for value events
    pub fn field(&self) -> Option<&Rc<FieldDescriptor>> {
        match self {
            ModelEvent::Value { field, .. } | ModelEvent::SnapshotValue { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Written or replayed value, for value events
    pub fn value(&self) -> Option<&Value> {
        match self {
            ModelEvent::Value { value, .. } | ModelEvent::SnapshotValue { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Revision, for commit events
    pub fn revision(&self) -> Option<u64> {
        match self {
            ModelEvent::Commit { revision, .. } | ModelEvent::SnapshotCommit { revision, .. } => {
                Some(*revision)
            }
            _ => None,
        }
    }

    /// Flatten into a serializable record.
    ///
    /// JSON has no non-finite numbers: serde_json writes a `NaN` or infinite
    /// `Value::Float` as `null`, which reads back as a record without a value.
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            event: self.kind(),
            instance: self.instance(),
            index: self.field().map(|f| f.index()),
            path: self.field().map(|f| f.path()),
            value: self.value().cloned(),
            revision: self.revision(),
        }
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelEvent::Value { instance, field, value }
            | ModelEvent::SnapshotValue { instance, field, value } => {
                write!(f, "{} {} {}={}", instance, self.kind(), field.path(), value)
            }
            ModelEvent::Commit { instance, revision }
            | ModelEvent::SnapshotCommit { instance, revision } => {
                write!(f, "{} {} rev={}", instance, self.kind(), revision)
            }
        }
    }
}

/// Serializable form of a [`ModelEvent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: EventKind,
    pub instance: InstanceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RelationshipDescriptor;

    #[test]
    fn test_value_record() {
        let parent = Rc::new(RelationshipDescriptor::new("player1", None));
        let field = Rc::new(FieldDescriptor::new(0, "score", Some(parent), "i64"));
        let event = ModelEvent::Value {
            instance: InstanceId(0),
            field,
            value: Value::Int(5),
        };

        let json = serde_json::to_string(&event.to_record()).unwrap();
        assert_eq!(
            json,
            r#"{"event":"value","instance":0,"index":0,"path":"player1.score","value":5}"#
        );
        assert_eq!(event.to_string(), "#0 value player1.score=5");
    }

    #[test]
    fn test_non_finite_value_is_lost_in_json() {
        let field = Rc::new(FieldDescriptor::new(0, "ratio", None, "f64"));
        let event = ModelEvent::Value {
            instance: InstanceId(0),
            field,
            value: Value::Float(f64::NAN),
        };
        let record = event.to_record();
        assert_eq!(record.value, Some(Value::Float(f64::NAN)));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"event":"value","instance":0,"index":0,"path":"ratio","value":null}"#
        );
        let parsed: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn test_commit_record() {
        let event = ModelEvent::SnapshotCommit {
            instance: InstanceId(2),
            revision: 4,
        };
        let record = event.to_record();
        assert_eq!(record.event, EventKind::SnapshotCommit);
        assert_eq!(record.revision, Some(4));
        assert!(record.path.is_none());

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"event":"snapshotCommit","instance":2,"revision":4}"#);
    }
}

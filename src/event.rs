use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Error, Result};

pub type SubjectId = i64;

/// Event kinds pushed by njsPC, keyed by their wire name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Body,
    Pump,
    Circuit,
    LightGroup,
    Chlorinator,
    Filter,
    Temps,
    Controller,
    Availability,
    Other(String),
}

impl EventKind {
    pub fn as_njspc_str(&self) -> &str {
        match self {
            EventKind::Body => "body",
            EventKind::Pump => "pump",
            EventKind::Circuit => "circuit",
            EventKind::LightGroup => "lightGroup",
            EventKind::Chlorinator => "chlorinator",
            EventKind::Filter => "filter",
            EventKind::Temps => "temps",
            EventKind::Controller => "controller",
            EventKind::Availability => "availability",
            EventKind::Other(s) => s,
        }
    }

    pub fn from_njspc_str(s: &str) -> Self {
        match s {
            "body" => EventKind::Body,
            "pump" => EventKind::Pump,
            "circuit" => EventKind::Circuit,
            "lightGroup" => EventKind::LightGroup,
            "chlorinator" => EventKind::Chlorinator,
            "filter" => EventKind::Filter,
            "temps" => EventKind::Temps,
            "controller" => EventKind::Controller,
            "availability" => EventKind::Availability,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// One state delta: `{event, id, ...fields}`.
///
/// `fields` holds everything except `event` and `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub id: Option<SubjectId>,
    pub fields: Map<String, Value>,
}

impl Event {
    pub fn new(kind: EventKind, id: Option<SubjectId>, fields: Map<String, Value>) -> Self {
        Self { kind, id, fields }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::Protocol("event is not a JSON object".to_string()));
        };
        let kind = match fields.remove("event") {
            Some(Value::String(s)) => EventKind::from_njspc_str(&s),
            _ => return Err(Error::Protocol("event has no \"event\" tag".to_string())),
        };
        let id = fields.remove("id").and_then(|v| v.as_i64());
        Ok(Self { kind, id, fields })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The payload as a subject record: fields plus `id`, without the tag.
    pub fn record_value(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(id) = self.id {
            map.insert("id".to_string(), Value::from(id));
        }
        Value::Object(map)
    }

    pub fn record<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.record_value())
    }

    pub fn to_value(&self) -> Value {
        let mut value = self.record_value();
        if let Value::Object(ref mut map) = value {
            map.insert(
                "event".to_string(),
                Value::String(self.kind.as_njspc_str().to_string()),
            );
        }
        value
    }
}

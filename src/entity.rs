//! Entity adapter plumbing: the event subscription contract, the display
//! contract, and the [`Entity`] enum composing every concrete adapter.

use serde_json::{Map, Value};

use crate::binary_sensor::{FilterOnSensor, FreezeProtectionSensor, PumpOnSensor};
use crate::climate::BodyHeater;
use crate::event::{Event, EventKind, SubjectId};
use crate::light::CircuitLight;
use crate::sensor::{PowerSensor, RpmSensor, SaltSensor, StatusSensor, TempSensor};

/// Receives every event the hub dispatches.
pub trait Subscriber {
    /// Apply `event` if it belongs to this adapter. Returns `true` when a
    /// display refresh is requested; refreshing with unchanged values is
    /// harmless.
    fn handle_event(&mut self, event: &Event) -> bool;
}

/// The fixed property surface exposed to the hosting platform.
pub trait Renderable {
    fn name(&self) -> String;

    fn unique_id(&self) -> &str;

    fn available(&self) -> bool {
        true
    }

    fn display_properties(&self) -> Map<String, Value>;
}

/// Which events an adapter owns: `kind` plus, for per-subject adapters, the
/// subject id. A `None` subject matches on kind alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub kind: EventKind,
    pub subject: Option<SubjectId>,
}

impl Binding {
    pub fn subject(kind: EventKind, id: SubjectId) -> Self {
        Self {
            kind,
            subject: Some(id),
        }
    }

    pub fn broadcast(kind: EventKind) -> Self {
        Self {
            kind,
            subject: None,
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        if event.kind != self.kind {
            return false;
        }
        match self.subject {
            Some(id) => event.id == Some(id),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Availability,
    Subject,
    Ignore,
}

/// State every adapter shares: identity, binding and availability.
#[derive(Debug, Clone)]
pub(crate) struct EntityCore {
    pub unique_id: String,
    pub binding: Binding,
    pub available: bool,
}

impl EntityCore {
    pub fn new(unique_id: String, binding: Binding) -> Self {
        Self {
            unique_id,
            binding,
            available: true,
        }
    }

    /// Availability events are consumed here regardless of subject id; an
    /// availability event without a boolean `available` field is ignored.
    pub fn route(&mut self, event: &Event) -> Route {
        if event.kind == EventKind::Availability {
            return match event.field("available").and_then(|v| v.as_bool()) {
                Some(available) => {
                    self.available = available;
                    Route::Availability
                }
                None => Route::Ignore,
            };
        }
        if self.binding.matches(event) {
            Route::Subject
        } else {
            Route::Ignore
        }
    }

    pub fn base_properties(&self, state: Value) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("state".to_string(), state);
        props.insert("available".to_string(), Value::Bool(self.available));
        props
    }
}

pub trait EntityAdapter: Subscriber + Renderable + Send {}

impl<T: Subscriber + Renderable + Send> EntityAdapter for T {}

#[derive(Debug, Clone)]
pub enum Entity {
    Climate(BodyHeater),
    Light(CircuitLight),
    Temperature(TempSensor),
    Rpm(RpmSensor),
    Power(PowerSensor),
    Salt(SaltSensor),
    Status(StatusSensor),
    FreezeProtection(FreezeProtectionSensor),
    PumpOn(PumpOnSensor),
    FilterOn(FilterOnSensor),
}

impl Entity {
    pub fn platform(&self) -> &'static str {
        match self {
            Entity::Climate(_) => "climate",
            Entity::Light(_) => "light",
            Entity::Temperature(_)
            | Entity::Rpm(_)
            | Entity::Power(_)
            | Entity::Salt(_)
            | Entity::Status(_) => "sensor",
            Entity::FreezeProtection(_) | Entity::PumpOn(_) | Entity::FilterOn(_) => {
                "binary_sensor"
            }
        }
    }

    pub fn as_climate(&self) -> Option<&BodyHeater> {
        match self {
            Entity::Climate(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&CircuitLight> {
        match self {
            Entity::Light(l) => Some(l),
            _ => None,
        }
    }

    fn adapter(&self) -> &dyn EntityAdapter {
        match self {
            Entity::Climate(e) => e,
            Entity::Light(e) => e,
            Entity::Temperature(e) => e,
            Entity::Rpm(e) => e,
            Entity::Power(e) => e,
            Entity::Salt(e) => e,
            Entity::Status(e) => e,
            Entity::FreezeProtection(e) => e,
            Entity::PumpOn(e) => e,
            Entity::FilterOn(e) => e,
        }
    }

    fn adapter_mut(&mut self) -> &mut dyn EntityAdapter {
        match self {
            Entity::Climate(e) => e,
            Entity::Light(e) => e,
            Entity::Temperature(e) => e,
            Entity::Rpm(e) => e,
            Entity::Power(e) => e,
            Entity::Salt(e) => e,
            Entity::Status(e) => e,
            Entity::FreezeProtection(e) => e,
            Entity::PumpOn(e) => e,
            Entity::FilterOn(e) => e,
        }
    }
}

impl Subscriber for Entity {
    fn handle_event(&mut self, event: &Event) -> bool {
        self.adapter_mut().handle_event(event)
    }
}

impl Renderable for Entity {
    fn name(&self) -> String {
        self.adapter().name()
    }

    fn unique_id(&self) -> &str {
        self.adapter().unique_id()
    }

    fn available(&self) -> bool {
        self.adapter().available()
    }

    fn display_properties(&self) -> Map<String, Value> {
        let mut props = self.adapter().display_properties();
        props.insert(
            "platform".to_string(),
            Value::String(self.platform().to_string()),
        );
        props
    }
}

//! On/off sensors: freeze protection, pump running, filter running.

use serde_json::{json, Map, Value};

use crate::api::PoolApi;
use crate::entity::{Binding, Entity, EntityCore, Renderable, Route, Subscriber};
use crate::event::{Event, EventKind, SubjectId};
use crate::snapshot::{Filter, Pump, Snapshot};
use crate::Result;

fn on_off(on: bool) -> Value {
    json!(if on { "on" } else { "off" })
}

/// Controller freeze protection, merged from `controller` events.
#[derive(Debug, Clone)]
pub struct FreezeProtectionSensor {
    core: EntityCore,
    freeze: bool,
}

impl FreezeProtectionSensor {
    pub fn new(unique_id: String, freeze: bool) -> Self {
        Self {
            core: EntityCore::new(unique_id, Binding::broadcast(EventKind::Controller)),
            freeze,
        }
    }

    pub fn is_on(&self) -> bool {
        self.freeze
    }
}

impl Subscriber for FreezeProtectionSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => {
                if let Some(freeze) = event.field("freeze").and_then(|v| v.as_bool()) {
                    self.freeze = freeze;
                }
                true
            }
        }
    }
}

impl Renderable for FreezeProtectionSensor {
    fn name(&self) -> String {
        "Freeze Protection".to_string()
    }

    fn unique_id(&self) -> &str {
        &self.core.unique_id
    }

    fn available(&self) -> bool {
        self.core.available
    }

    fn display_properties(&self) -> Map<String, Value> {
        let mut props = self.core.base_properties(on_off(self.freeze));
        props.insert("device_class".into(), json!("cold"));
        props.insert("icon".into(), json!("mdi:snowflake"));
        props
    }
}

/// Pump running: any of `rpm`, `watts` or `relay` above zero. Each field is
/// merged independently.
#[derive(Debug, Clone)]
pub struct PumpOnSensor {
    core: EntityCore,
    name: String,
    rpm: Option<f64>,
    watts: Option<f64>,
    relay: Option<i64>,
}

impl PumpOnSensor {
    pub fn new(unique_id: String, pump: &Pump) -> Self {
        Self {
            core: EntityCore::new(unique_id, Binding::subject(EventKind::Pump, pump.id)),
            name: format!("{} Running", pump.name),
            rpm: pump.rpm,
            watts: pump.watts,
            relay: pump.relay,
        }
    }

    pub fn is_on(&self) -> bool {
        self.rpm.is_some_and(|v| v > 0.0)
            || self.watts.is_some_and(|v| v > 0.0)
            || self.relay.is_some_and(|v| v > 0)
    }
}

impl Subscriber for PumpOnSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => {
                if let Some(rpm) = event.field("rpm").and_then(|v| v.as_f64()) {
                    self.rpm = Some(rpm);
                }
                if let Some(watts) = event.field("watts").and_then(|v| v.as_f64()) {
                    self.watts = Some(watts);
                }
                if let Some(relay) = event.field("relay").and_then(|v| v.as_i64()) {
                    self.relay = Some(relay);
                }
                true
            }
        }
    }
}

impl Renderable for PumpOnSensor {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn unique_id(&self) -> &str {
        &self.core.unique_id
    }

    fn available(&self) -> bool {
        self.core.available
    }

    fn display_properties(&self) -> Map<String, Value> {
        let mut props = self.core.base_properties(on_off(self.is_on()));
        props.insert("device_class".into(), json!("running"));
        props
    }
}

#[derive(Debug, Clone)]
pub struct FilterOnSensor {
    core: EntityCore,
    id: SubjectId,
    name: String,
    is_on: Option<bool>,
}

impl FilterOnSensor {
    pub fn new(unique_id: String, filter: &Filter) -> Self {
        Self {
            core: EntityCore::new(unique_id, Binding::subject(EventKind::Filter, filter.id)),
            id: filter.id,
            name: format!("{} Running", filter.name),
            is_on: filter.is_on,
        }
    }

    pub fn id(&self) -> SubjectId {
        self.id
    }

    pub fn is_on(&self) -> bool {
        self.is_on.unwrap_or(false)
    }
}

impl Subscriber for FilterOnSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => {
                if let Some(on) = event.field("isOn").and_then(|v| v.as_bool()) {
                    self.is_on = Some(on);
                }
                true
            }
        }
    }
}

impl Renderable for FilterOnSensor {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn unique_id(&self) -> &str {
        &self.core.unique_id
    }

    fn available(&self) -> bool {
        self.core.available
    }

    fn display_properties(&self) -> Map<String, Value> {
        let mut props = self.core.base_properties(on_off(self.is_on()));
        props.insert("device_class".into(), json!("running"));
        props
    }
}

pub async fn entities<A: PoolApi>(api: &A, snapshot: &Snapshot) -> Result<Vec<Entity>> {
    let mut out = vec![Entity::FreezeProtection(FreezeProtectionSensor::new(
        api.unique_id("freeze_protection"),
        snapshot.freeze(),
    ))];
    for pump in snapshot.pumps() {
        out.push(Entity::PumpOn(PumpOnSensor::new(
            api.unique_id(&format!("pump_{}_on", pump.id)),
            &pump,
        )));
    }
    for filter in snapshot.filters() {
        out.push(Entity::FilterOn(FilterOnSensor::new(
            api.unique_id(&format!("filter_{}_on", filter.id)),
            &filter,
        )));
    }
    Ok(out)
}

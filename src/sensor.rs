//! Read-only numeric and status sensors.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::api::PoolApi;
use crate::entity::{Binding, Entity, EntityCore, Renderable, Route, Subscriber};
use crate::event::{Event, EventKind};
use crate::snapshot::{Chlorinator, Pump, Snapshot, StatusRecord};
use crate::types::{SensorDeviceClass, StateClass, TemperatureUnit, ValDesc};
use crate::Result;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One numeric key of the controller `temps` block (air, solar, water
/// sensors). Matches `temps` events by kind; a `temps` event lacking the key
/// keeps the previous reading.
#[derive(Debug, Clone)]
pub struct TempSensor {
    core: EntityCore,
    key: String,
    units: TemperatureUnit,
    value: Option<f64>,
}

impl TempSensor {
    pub fn new(unique_id: String, key: &str, value: Option<f64>, units: TemperatureUnit) -> Self {
        Self {
            core: EntityCore::new(unique_id, Binding::broadcast(EventKind::Temps)),
            key: key.to_string(),
            units,
            value: value.map(round1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn native_value(&self) -> Option<f64> {
        self.value
    }

    pub fn unit_of_measurement(&self) -> TemperatureUnit {
        self.units
    }

    pub fn device_class(&self) -> SensorDeviceClass {
        SensorDeviceClass::Temperature
    }

    pub fn state_class(&self) -> StateClass {
        StateClass::Measurement
    }
}

impl Subscriber for TempSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => {
                if let Some(v) = event.field(&self.key).and_then(|v| v.as_f64()) {
                    self.value = Some(round1(v));
                }
                true
            }
        }
    }
}

impl Renderable for TempSensor {
    fn name(&self) -> String {
        format!("njspc_{}", self.key)
    }

    fn unique_id(&self) -> &str {
        &self.core.unique_id
    }

    fn available(&self) -> bool {
        self.core.available
    }

    fn display_properties(&self) -> Map<String, Value> {
        let mut props = self.core.base_properties(json!(self.value));
        props.insert("unit_of_measurement".into(), json!(self.units.symbol()));
        props.insert("device_class".into(), json!(self.device_class().as_str()));
        props.insert("state_class".into(), json!(self.state_class().as_str()));
        props
    }
}

/// Which pump field a [`PumpMetricSensor`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMetric {
    Rpm,
    Watts,
}

impl PumpMetric {
    fn field(&self) -> &'static str {
        match self {
            PumpMetric::Rpm => "rpm",
            PumpMetric::Watts => "watts",
        }
    }
}

/// A single pump reading, merged from the matching field of `pump` events.
#[derive(Debug, Clone)]
pub struct PumpMetricSensor {
    core: EntityCore,
    metric: PumpMetric,
    pump: Pump,
    value: Option<f64>,
}

pub type RpmSensor = PumpMetricSensor;
pub type PowerSensor = PumpMetricSensor;

impl PumpMetricSensor {
    pub fn rpm(unique_id: String, pump: Pump) -> RpmSensor {
        Self::new(unique_id, pump, PumpMetric::Rpm)
    }

    pub fn power(unique_id: String, pump: Pump) -> PowerSensor {
        Self::new(unique_id, pump, PumpMetric::Watts)
    }

    fn new(unique_id: String, pump: Pump, metric: PumpMetric) -> Self {
        let value = match metric {
            PumpMetric::Rpm => pump.rpm,
            PumpMetric::Watts => pump.watts,
        };
        Self {
            core: EntityCore::new(unique_id, Binding::subject(EventKind::Pump, pump.id)),
            metric,
            pump,
            value,
        }
    }

    pub fn metric(&self) -> PumpMetric {
        self.metric
    }

    pub fn native_value(&self) -> Option<f64> {
        self.value
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        match self.metric {
            PumpMetric::Rpm => "RPM",
            PumpMetric::Watts => "W",
        }
    }

    pub fn device_class(&self) -> Option<SensorDeviceClass> {
        match self.metric {
            PumpMetric::Rpm => None,
            PumpMetric::Watts => Some(SensorDeviceClass::Power),
        }
    }

    pub fn state_class(&self) -> StateClass {
        StateClass::Measurement
    }

    pub fn extra_state_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        if self.metric == PumpMetric::Rpm {
            attrs.insert("min_speed".into(), json!(self.pump.min_speed));
            attrs.insert("max_speed".into(), json!(self.pump.max_speed));
        }
        attrs
    }
}

impl Subscriber for PumpMetricSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => {
                if let Some(v) = event.field(self.metric.field()).and_then(|v| v.as_f64()) {
                    self.value = Some(v);
                }
                true
            }
        }
    }
}

impl Renderable for PumpMetricSensor {
    fn name(&self) -> String {
        match self.metric {
            PumpMetric::Rpm => format!("{} RPM", self.pump.name),
            PumpMetric::Watts => format!("{} Watts", self.pump.name),
        }
    }

    fn unique_id(&self) -> &str {
        &self.core.unique_id
    }

    fn available(&self) -> bool {
        self.core.available
    }

    fn display_properties(&self) -> Map<String, Value> {
        let mut props = self.core.base_properties(json!(self.value));
        props.insert("unit_of_measurement".into(), json!(self.unit_of_measurement()));
        props.insert("state_class".into(), json!(self.state_class().as_str()));
        if let Some(class) = self.device_class() {
            props.insert("device_class".into(), json!(class.as_str()));
        }
        if self.metric == PumpMetric::Rpm {
            props.insert("icon".into(), json!("mdi:speedometer"));
        }
        props.insert("attributes".into(), Value::Object(self.extra_state_attributes()));
        props
    }
}

/// Chlorinator salt level. A matching event replaces the record wholesale.
#[derive(Debug, Clone)]
pub struct SaltSensor {
    core: EntityCore,
    name: String,
    chlorinator: Chlorinator,
}

impl SaltSensor {
    pub fn new(unique_id: String, chlorinator: Chlorinator) -> Self {
        Self {
            core: EntityCore::new(
                unique_id,
                Binding::subject(EventKind::Chlorinator, chlorinator.id),
            ),
            name: format!("{} Salt Level", chlorinator.name),
            chlorinator,
        }
    }

    pub fn native_value(&self) -> Option<f64> {
        self.chlorinator.salt_level
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        "PPM"
    }

    pub fn state_class(&self) -> StateClass {
        StateClass::Measurement
    }

    pub fn extra_state_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("salt_target".into(), json!(self.chlorinator.salt_target));
        attrs.insert("salt_required".into(), json!(self.chlorinator.salt_required));
        attrs
    }
}

impl Subscriber for SaltSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => match event.record::<Chlorinator>() {
                Ok(chlorinator) => {
                    self.chlorinator = chlorinator;
                    true
                }
                Err(e) => {
                    warn!(chlorinator = self.chlorinator.id, error = %e, "unreadable chlorinator event");
                    false
                }
            },
        }
    }
}

impl Renderable for SaltSensor {
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
        let mut props = self.core.base_properties(json!(self.native_value()));
        props.insert("unit_of_measurement".into(), json!(self.unit_of_measurement()));
        props.insert("state_class".into(), json!(self.state_class().as_str()));
        props.insert("icon".into(), json!("mdi:shaker-outline"));
        props.insert("attributes".into(), Value::Object(self.extra_state_attributes()));
        props
    }
}

/// Status text of a pump or chlorinator. A matching event replaces the
/// record wholesale.
#[derive(Debug, Clone)]
pub struct StatusSensor {
    core: EntityCore,
    name: String,
    record: StatusRecord,
}

impl StatusSensor {
    pub fn new(unique_id: String, kind: EventKind, record: StatusRecord) -> Self {
        Self {
            core: EntityCore::new(unique_id, Binding::subject(kind, record.id)),
            name: format!("{} Status", record.name),
            record,
        }
    }

    /// `status.desc`, `None` when the record carries no status.
    pub fn native_value(&self) -> Option<&str> {
        self.record.status.as_ref().and_then(|s| s.desc.as_deref())
    }

    pub fn icon(&self) -> &'static str {
        if self.native_value() == Some("Ok") {
            "mdi:check-circle"
        } else {
            "mdi:alert-circle"
        }
    }
}

impl Subscriber for StatusSensor {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => match event.record::<StatusRecord>() {
                Ok(record) => {
                    self.record = record;
                    true
                }
                Err(e) => {
                    warn!(id = self.record.id, error = %e, "unreadable status event");
                    false
                }
            },
        }
    }
}

impl Renderable for StatusSensor {
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
        let mut props = self.core.base_properties(json!(self.native_value()));
        props.insert("icon".into(), json!(self.icon()));
        props
    }
}

fn status_record(id: i64, name: &str, status: Option<ValDesc>) -> StatusRecord {
    StatusRecord {
        id,
        name: name.to_string(),
        status,
    }
}

/// Temperature sensors for every numeric `temps` key; RPM, power and status
/// per pump; salt level and status per chlorinator.
pub async fn entities<A: PoolApi>(api: &A, snapshot: &Snapshot) -> Result<Vec<Entity>> {
    let units = snapshot.units();
    let mut out = Vec::new();
    for (key, value) in snapshot.temps() {
        out.push(Entity::Temperature(TempSensor::new(
            api.unique_id(&format!("temp_{key}")),
            &key,
            Some(value),
            units,
        )));
    }
    for pump in snapshot.pumps() {
        out.push(Entity::Rpm(PumpMetricSensor::rpm(
            api.unique_id(&format!("pump_{}_rpm", pump.id)),
            pump.clone(),
        )));
        out.push(Entity::Power(PumpMetricSensor::power(
            api.unique_id(&format!("pump_{}_watts", pump.id)),
            pump.clone(),
        )));
        out.push(Entity::Status(StatusSensor::new(
            api.unique_id(&format!("status_{}", pump.id)),
            EventKind::Pump,
            status_record(pump.id, &pump.name, pump.status),
        )));
    }
    for chlorinator in snapshot.chlorinators() {
        out.push(Entity::Status(StatusSensor::new(
            api.unique_id(&format!("status_{}", chlorinator.id)),
            EventKind::Chlorinator,
            status_record(chlorinator.id, &chlorinator.name, chlorinator.status.clone()),
        )));
        out.push(Entity::Salt(SaltSensor::new(
            api.unique_id(&format!("saltlevel_{}", chlorinator.id)),
            chlorinator,
        )));
    }
    Ok(out)
}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::diff::deep_merge;
use crate::event::{Event, EventKind, SubjectId};
use crate::types::{TemperatureUnit, ValDesc};

/// Optional field that degrades to `None` when the value has the wrong
/// shape, so one odd field cannot drop the whole record.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub id: SubjectId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub set_point: Option<f64>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub body_type: Option<ValDesc>,
    #[serde(default, deserialize_with = "lenient")]
    pub heat_mode: Option<ValDesc>,
    #[serde(default, deserialize_with = "lenient")]
    pub heat_status: Option<ValDesc>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_on: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pump {
    pub id: SubjectId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub rpm: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub watts: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub relay: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub min_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<ValDesc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitType {
    pub val: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub is_light: bool,
}

/// A circuit or a light group; both share the same state shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub id: SubjectId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub is_on: Option<bool>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub circuit_type: Option<CircuitType>,
    #[serde(default, deserialize_with = "lenient")]
    pub lighting_theme: Option<ValDesc>,
}

impl Circuit {
    pub fn is_light(&self) -> bool {
        self.circuit_type.as_ref().is_some_and(|t| t.is_light)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chlorinator {
    pub id: SubjectId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub salt_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub salt_target: Option<f64>,
    /// Pounds of salt to add.
    #[serde(default, deserialize_with = "lenient")]
    pub salt_required: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<ValDesc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id: SubjectId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub is_on: Option<bool>,
}

/// Any equipment record carrying a `status` enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: SubjectId,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<ValDesc>,
}

/// In-memory mirror of the controller state returned by `/state/all`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    raw: Value,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            raw: Value::Object(Map::new()),
        }
    }
}

impl Snapshot {
    pub fn new(raw: Value) -> Self {
        if raw.is_object() {
            Self { raw }
        } else {
            warn!("state snapshot is not an object, starting empty");
            Self::default()
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn model(&self) -> Option<&str> {
        self.raw.get("model").and_then(|v| v.as_str())
    }

    pub fn units(&self) -> TemperatureUnit {
        let units = self.raw.pointer("/temps/units");
        if let Some(val) = units.and_then(|u| u.get("val")).and_then(|v| v.as_i64()) {
            return TemperatureUnit::from_njspc_val(val);
        }
        units
            .and_then(|u| u.get("name"))
            .and_then(|v| v.as_str())
            .and_then(TemperatureUnit::from_njspc_name)
            .unwrap_or_default()
    }

    /// Numeric readings directly under `temps` (air, solar, water sensors).
    pub fn temps(&self) -> Vec<(String, f64)> {
        match self.raw.get("temps") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| match v {
                    Value::Number(n) => n.as_f64().map(|f| (k.clone(), f)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn temperature(&self, key: &str) -> Option<f64> {
        self.raw.pointer("/temps")?.get(key)?.as_f64()
    }

    pub fn freeze(&self) -> bool {
        self.raw.get("freeze").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn bodies(&self) -> Vec<Body> {
        self.records("/temps/bodies")
    }

    pub fn pumps(&self) -> Vec<Pump> {
        self.records("/pumps")
    }

    pub fn circuits(&self) -> Vec<Circuit> {
        self.records("/circuits")
    }

    pub fn light_groups(&self) -> Vec<Circuit> {
        self.records("/lightGroups")
    }

    pub fn chlorinators(&self) -> Vec<Chlorinator> {
        self.records("/chlorinators")
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.records("/filters")
    }

    fn records<T: DeserializeOwned>(&self, pointer: &str) -> Vec<T> {
        let Some(Value::Array(items)) = self.raw.pointer(pointer) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(pointer, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect()
    }

    /// Merge an event's fields into the matching subject record. Returns
    /// whether anything in the snapshot was touched.
    pub fn apply(&mut self, event: &Event) -> bool {
        let pointer = match event.kind {
            EventKind::Body => "/temps/bodies",
            EventKind::Pump => "/pumps",
            EventKind::Circuit => "/circuits",
            EventKind::LightGroup => "/lightGroups",
            EventKind::Chlorinator => "/chlorinators",
            EventKind::Filter => "/filters",
            EventKind::Temps => return self.merge_at("temps", event),
            EventKind::Controller => {
                deep_merge(&mut self.raw, &Value::Object(event.fields.clone()));
                return true;
            }
            EventKind::Availability | EventKind::Other(_) => return false,
        };

        let Some(id) = event.id else {
            trace!(kind = event.kind.as_njspc_str(), "event without id, snapshot untouched");
            return false;
        };
        let Some(Value::Array(items)) = self.raw.pointer_mut(pointer) else {
            return false;
        };
        match items
            .iter_mut()
            .find(|item| item.get("id").and_then(|v| v.as_i64()) == Some(id))
        {
            Some(record) => {
                deep_merge(record, &Value::Object(event.fields.clone()));
                true
            }
            None => {
                trace!(kind = event.kind.as_njspc_str(), id, "no subject record for event");
                false
            }
        }
    }

    fn merge_at(&mut self, key: &str, event: &Event) -> bool {
        let Value::Object(root) = &mut self.raw else {
            return false;
        };
        let entry = root
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        deep_merge(entry, &Value::Object(event.fields.clone()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot::new(json!({
            "model": "IntelliCenter",
            "freeze": false,
            "temps": {
                "units": {"val": 0, "name": "F", "desc": "Fahrenheit"},
                "air": 71.36,
                "waterSensor1": 80,
                "bodies": [
                    {"id": 1, "name": "Pool", "temp": 80, "setPoint": 82,
                     "type": {"val": 0, "name": "pool", "desc": "Pool"}},
                    {"id": 2, "name": "Spa", "temp": 98, "setPoint": 101,
                     "type": {"val": 1, "name": "spa", "desc": "Spa"}}
                ]
            },
            "pumps": [{"id": 7, "name": "Filter Pump", "rpm": 2000, "watts": 450}],
            "circuits": [
                {"id": 1, "name": "Spa", "isOn": false, "type": {"val": 1, "isLight": false}},
                {"id": 5, "name": "Pool Light", "isOn": true,
                 "type": {"val": 16, "isLight": true}, "lightingTheme": {"val": 0, "desc": "Off"}}
            ],
            "lightGroups": [],
            "chlorinators": [{"id": 1, "name": "Chlor", "saltLevel": 3200}],
            "filters": [{"id": 1, "name": "Filter", "isOn": true}]
        }))
    }

    #[test]
    fn typed_accessors_project_records() {
        let snap = sample();
        assert_eq!(snap.model(), Some("IntelliCenter"));
        assert_eq!(snap.units(), TemperatureUnit::Fahrenheit);
        assert_eq!(snap.bodies().len(), 2);
        assert_eq!(snap.bodies()[1].body_type.as_ref().unwrap().val, 1);
        assert_eq!(snap.pumps()[0].rpm, Some(2000.0));
        assert!(!snap.circuits()[0].is_light());
        assert!(snap.circuits()[1].is_light());
        assert_eq!(snap.chlorinators()[0].salt_level, Some(3200.0));
        assert_eq!(snap.filters()[0].is_on, Some(true));
        assert!(snap.light_groups().is_empty());
    }

    #[test]
    fn temps_lists_only_numeric_keys() {
        let keys: Vec<String> = sample().temps().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["air".to_string(), "waterSensor1".to_string()]);
    }

    #[test]
    fn units_fall_back_to_name_then_default() {
        let snap = Snapshot::new(json!({"temps": {"units": {"name": "C"}}}));
        assert_eq!(snap.units(), TemperatureUnit::Celsius);
        let snap = Snapshot::new(json!({}));
        assert_eq!(snap.units(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn apply_merges_into_matching_record() {
        let mut snap = sample();
        let event = Event::from_value(json!({"event": "pump", "id": 7, "rpm": 2200})).unwrap();
        assert!(snap.apply(&event));
        let pump = &snap.pumps()[0];
        assert_eq!(pump.rpm, Some(2200.0));
        assert_eq!(pump.watts, Some(450.0));
    }

    #[test]
    fn apply_body_event_targets_temps_bodies() {
        let mut snap = sample();
        let event = Event::from_value(json!({"event": "body", "id": 2, "temp": 100})).unwrap();
        assert!(snap.apply(&event));
        assert_eq!(snap.bodies()[1].temp, Some(100.0));
        assert_eq!(snap.bodies()[0].temp, Some(80.0));
    }

    #[test]
    fn apply_unknown_subject_is_noop() {
        let mut snap = sample();
        let before = snap.clone();
        let event = Event::from_value(json!({"event": "pump", "id": 99, "rpm": 1})).unwrap();
        assert!(!snap.apply(&event));
        assert_eq!(snap, before);
    }

    #[test]
    fn apply_temps_and_controller_events() {
        let mut snap = sample();
        let temps = Event::from_value(json!({"event": "temps", "air": 65.2})).unwrap();
        assert!(snap.apply(&temps));
        assert_eq!(snap.temperature("air"), Some(65.2));
        assert_eq!(snap.bodies().len(), 2);

        let controller = Event::from_value(json!({"event": "controller", "freeze": true})).unwrap();
        assert!(snap.apply(&controller));
        assert!(snap.freeze());
    }

    #[test]
    fn availability_does_not_touch_snapshot() {
        let mut snap = sample();
        let event = Event::from_value(json!({"event": "availability", "available": false})).unwrap();
        assert!(!snap.apply(&event));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let snap = Snapshot::new(json!({"pumps": [{"name": "no id"}, {"id": 2, "name": "ok"}]}));
        let pumps = snap.pumps();
        assert_eq!(pumps.len(), 1);
        assert_eq!(pumps[0].id, 2);
    }

    #[test]
    fn chlorinator_keeps_numeric_salt_required() {
        let snap = Snapshot::new(json!({"chlorinators": [{
            "id": 1, "name": "Chlor", "saltLevel": 3200, "saltTarget": 3400,
            "saltRequired": 12.5, "currentOutput": 50, "superChlor": false,
            "status": {"val": 0, "name": "ok", "desc": "Ok"}
        }]}));
        let chlorinators = snap.chlorinators();
        assert_eq!(chlorinators.len(), 1);
        assert_eq!(chlorinators[0].salt_required, Some(12.5));
        assert_eq!(chlorinators[0].status.as_ref().and_then(|s| s.desc.as_deref()), Some("Ok"));
    }

    #[test]
    fn odd_field_value_defaults_instead_of_dropping_record() {
        let snap = Snapshot::new(json!({
            "temps": {"bodies": [{"id": 1, "name": "Pool", "temp": "n/a", "setPoint": 84,
                                  "heatStatus": 3}]},
            "pumps": [{"id": 7, "name": null, "rpm": 2000, "watts": {"bad": true}, "status": "Ok"}],
            "chlorinators": [{"id": 1, "name": "Chlor", "saltLevel": 3200, "saltRequired": "lots"}]
        }));

        let body = &snap.bodies()[0];
        assert_eq!(body.temp, None);
        assert_eq!(body.set_point, Some(84.0));
        assert_eq!(body.heat_status, None);

        let pump = &snap.pumps()[0];
        assert_eq!(pump.name, "");
        assert_eq!(pump.rpm, Some(2000.0));
        assert_eq!(pump.watts, None);
        assert_eq!(pump.status, None);

        let chlor = &snap.chlorinators()[0];
        assert_eq!(chlor.salt_level, Some(3200.0));
        assert_eq!(chlor.salt_required, None);
    }
}

//! Body heaters exposed as climate entities.

use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::api::PoolApi;
use crate::entity::{Binding, Entity, EntityCore, Renderable, Route, Subscriber};
use crate::event::{Event, EventKind};
use crate::protocol::{heat_mode_data, set_point_data, API_BODY_HEATMODE, API_BODY_SETPOINT};
use crate::snapshot::{Body, Snapshot};
use crate::types::{CodeTable, Features, HvacAction, HvacMode, TemperatureUnit};
use crate::Result;

/// Body `type.val` of a pool; any other value is a spa.
const BODY_TYPE_POOL: i64 = 0;

/// njsPC heat-status code to HVAC action. Unknown codes report `Off`.
pub fn hvac_action_for(code: i64) -> HvacAction {
    match code {
        1 | 2 | 4 | 6 => HvacAction::Heating,
        3 | 8 => HvacAction::Cooling,
        _ => HvacAction::Off,
    }
}

/// Setpoint bounds for a body type and unit. A missing type uses the pool
/// range.
pub fn setpoint_range(body_type: Option<i64>, units: TemperatureUnit) -> (f64, f64) {
    let spa = body_type.is_some_and(|t| t != BODY_TYPE_POOL);
    match (spa, units) {
        (false, TemperatureUnit::Fahrenheit) => (70.0, 95.0),
        (false, TemperatureUnit::Celsius) => (21.0, 35.0),
        (true, TemperatureUnit::Fahrenheit) => (90.0, 104.0),
        (true, TemperatureUnit::Celsius) => (32.0, 40.0),
    }
}

/// Heater for one body. A matching `body` event replaces the cached record
/// wholesale.
#[derive(Debug, Clone)]
pub struct BodyHeater {
    core: EntityCore,
    name: String,
    body: Body,
    heat_modes: CodeTable,
    units: TemperatureUnit,
}

impl BodyHeater {
    pub fn new(unique_id: String, body: Body, heat_modes: CodeTable, units: TemperatureUnit) -> Self {
        Self {
            core: EntityCore::new(unique_id, Binding::subject(EventKind::Body, body.id)),
            name: format!("{} Heater", body.name),
            body,
            heat_modes,
            units,
        }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.units
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.body.set_point
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.body.temp
    }

    pub fn min_temp(&self) -> f64 {
        setpoint_range(self.body_type(), self.units).0
    }

    pub fn max_temp(&self) -> f64 {
        setpoint_range(self.body_type(), self.units).1
    }

    pub fn hvac_modes(&self) -> Vec<HvacMode> {
        vec![HvacMode::Auto]
    }

    pub fn hvac_mode(&self) -> HvacMode {
        HvacMode::Auto
    }

    pub fn hvac_action(&self) -> HvacAction {
        self.body
            .heat_status
            .as_ref()
            .map(|s| hvac_action_for(s.val))
            .unwrap_or_default()
    }

    /// Label of the active heat mode, `"Off"` when unknown or absent.
    pub fn preset_mode(&self) -> String {
        self.body
            .heat_mode
            .as_ref()
            .and_then(|m| self.heat_modes.label(m.val))
            .unwrap_or("Off")
            .to_string()
    }

    pub fn preset_modes(&self) -> Vec<String> {
        self.heat_modes.labels()
    }

    pub fn supported_features(&self) -> Features {
        Features::TARGET_TEMPERATURE | Features::PRESET_MODE
    }

    pub async fn set_temperature<A: PoolApi>(&self, api: &A, temperature: f64) -> Result<()> {
        api.command(API_BODY_SETPOINT, set_point_data(self.body.id, temperature))
            .await
    }

    /// Heat modes are driven through presets; HVAC mode changes are ignored.
    pub async fn set_hvac_mode<A: PoolApi>(&self, _api: &A, mode: HvacMode) -> Result<()> {
        debug!(body = self.body.id, mode = mode.as_str(), "ignoring hvac mode change");
        Ok(())
    }

    /// Unknown labels are logged and dropped without a command.
    pub async fn set_preset_mode<A: PoolApi>(&self, api: &A, preset: &str) -> Result<()> {
        let Some(mode) = self.heat_modes.code_for(preset) else {
            error!(body = self.body.id, preset, "invalid heat mode preset");
            return Ok(());
        };
        api.command(API_BODY_HEATMODE, heat_mode_data(self.body.id, mode))
            .await
    }

    fn body_type(&self) -> Option<i64> {
        self.body.body_type.as_ref().map(|t| t.val)
    }
}

impl Subscriber for BodyHeater {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => match event.record::<Body>() {
                Ok(body) => {
                    self.body = body;
                    true
                }
                Err(e) => {
                    warn!(body = self.body.id, error = %e, "unreadable body event");
                    false
                }
            },
        }
    }
}

impl Renderable for BodyHeater {
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
        let mut props = self.core.base_properties(json!(self.hvac_mode().as_str()));
        props.insert("temperature_unit".into(), json!(self.units.symbol()));
        props.insert("current_temperature".into(), json!(self.current_temperature()));
        props.insert("target_temperature".into(), json!(self.target_temperature()));
        props.insert("min_temp".into(), json!(self.min_temp()));
        props.insert("max_temp".into(), json!(self.max_temp()));
        props.insert(
            "hvac_modes".into(),
            json!(self.hvac_modes().iter().map(|m| m.as_str()).collect::<Vec<_>>()),
        );
        props.insert("hvac_action".into(), json!(self.hvac_action().as_str()));
        props.insert("preset_mode".into(), json!(self.preset_mode()));
        props.insert("preset_modes".into(), json!(self.preset_modes()));
        props.insert("supported_features".into(), json!(self.supported_features().bits()));
        props
    }
}

/// One heater per body, each with its heat-mode table.
pub async fn entities<A: PoolApi>(api: &A, snapshot: &Snapshot) -> Result<Vec<Entity>> {
    let units = snapshot.units();
    let mut out = Vec::new();
    for body in snapshot.bodies() {
        let heat_modes = CodeTable::from(api.heat_modes(body.id).await?);
        let unique_id = api.unique_id(&format!("heater_{}", body.id));
        out.push(Entity::Climate(BodyHeater::new(unique_id, body, heat_modes, units)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LogCapture, RecordingApi};
    use crate::types::ValDesc;
    use serde_json::json;

    fn heater(body: Value, units: TemperatureUnit) -> BodyHeater {
        let body: Body = serde_json::from_value(body).unwrap();
        let modes = CodeTable::from_pairs([(1, "Off"), (3, "Heater"), (5, "Solar Only")]);
        BodyHeater::new("njspc_heater_1".into(), body, modes, units)
    }

    fn event(raw: Value) -> Event {
        Event::from_value(raw).unwrap()
    }

    #[test]
    fn heat_status_table() {
        for (code, action) in [
            (0, HvacAction::Off),
            (1, HvacAction::Heating),
            (2, HvacAction::Heating),
            (3, HvacAction::Cooling),
            (4, HvacAction::Heating),
            (6, HvacAction::Heating),
            (8, HvacAction::Cooling),
            (128, HvacAction::Off),
        ] {
            assert_eq!(hvac_action_for(code), action, "code {code}");
        }
        for code in [5, 7, 9, 64, -1, 1000] {
            assert_eq!(hvac_action_for(code), HvacAction::Off, "code {code}");
        }
    }

    #[test]
    fn setpoint_ranges() {
        assert_eq!(setpoint_range(Some(0), TemperatureUnit::Fahrenheit), (70.0, 95.0));
        assert_eq!(setpoint_range(Some(0), TemperatureUnit::Celsius), (21.0, 35.0));
        assert_eq!(setpoint_range(Some(1), TemperatureUnit::Fahrenheit), (90.0, 104.0));
        assert_eq!(setpoint_range(Some(1), TemperatureUnit::Celsius), (32.0, 40.0));
        assert_eq!(setpoint_range(None, TemperatureUnit::Fahrenheit), (70.0, 95.0));
        assert_eq!(setpoint_range(None, TemperatureUnit::Celsius), (21.0, 35.0));
    }

    #[test]
    fn spa_without_type_uses_pool_range() {
        let h = heater(json!({"id": 2, "name": "Spa"}), TemperatureUnit::Fahrenheit);
        assert_eq!(h.min_temp(), 70.0);
        assert_eq!(h.max_temp(), 95.0);
    }

    #[test]
    fn spa_range_in_celsius() {
        let h = heater(
            json!({"id": 2, "name": "Spa", "type": {"val": 1}}),
            TemperatureUnit::Celsius,
        );
        assert_eq!((h.min_temp(), h.max_temp()), (32.0, 40.0));
    }

    #[test]
    fn preset_mode_defaults_to_off() {
        let h = heater(json!({"id": 1, "name": "Pool"}), TemperatureUnit::Fahrenheit);
        assert_eq!(h.preset_mode(), "Off");
        let h = heater(
            json!({"id": 1, "name": "Pool", "heatMode": {"val": 42}}),
            TemperatureUnit::Fahrenheit,
        );
        assert_eq!(h.preset_mode(), "Off");
        let h = heater(
            json!({"id": 1, "name": "Pool", "heatMode": {"val": 5}}),
            TemperatureUnit::Fahrenheit,
        );
        assert_eq!(h.preset_mode(), "Solar Only");
    }

    #[test]
    fn fixed_surface() {
        let h = heater(json!({"id": 1, "name": "Pool"}), TemperatureUnit::Fahrenheit);
        assert_eq!(h.name(), "Pool Heater");
        assert_eq!(h.hvac_modes(), vec![HvacMode::Auto]);
        assert_eq!(h.hvac_mode(), HvacMode::Auto);
        assert_eq!(h.hvac_action(), HvacAction::Off);
        assert_eq!(h.supported_features().bits(), 17);
        assert_eq!(h.preset_modes(), vec!["Off", "Heater", "Solar Only"]);
    }

    #[test]
    fn matching_event_replaces_record_wholesale() {
        let mut h = heater(
            json!({"id": 1, "name": "Pool", "temp": 80, "setPoint": 84,
                   "heatStatus": {"val": 1}}),
            TemperatureUnit::Fahrenheit,
        );
        assert!(h.handle_event(&event(json!({"event": "body", "id": 1, "temp": 81}))));
        assert_eq!(h.current_temperature(), Some(81.0));
        assert_eq!(h.target_temperature(), None);
        assert_eq!(h.hvac_action(), HvacAction::Off);
        assert_eq!(h.name(), "Pool Heater");
    }

    #[test]
    fn other_subject_is_ignored() {
        let mut h = heater(json!({"id": 1, "name": "Pool", "temp": 80}), TemperatureUnit::Fahrenheit);
        assert!(!h.handle_event(&event(json!({"event": "body", "id": 2, "temp": 99}))));
        assert!(!h.handle_event(&event(json!({"event": "pump", "id": 1, "temp": 99}))));
        assert_eq!(h.current_temperature(), Some(80.0));
    }

    #[test]
    fn malformed_body_event_keeps_state() {
        let mut h = heater(json!({"id": 1, "name": "Pool", "temp": 80}), TemperatureUnit::Fahrenheit);
        assert!(!h.handle_event(&event(json!({"event": "body", "id": 1, "temp": "warm"}))));
        assert_eq!(h.current_temperature(), Some(80.0));
    }

    #[tokio::test]
    async fn set_temperature_sends_setpoint() {
        let api = RecordingApi::default();
        let h = heater(json!({"id": 1, "name": "Pool"}), TemperatureUnit::Fahrenheit);
        h.set_temperature(&api, 86.0).await.unwrap();
        assert_eq!(
            api.commands(),
            vec![(API_BODY_SETPOINT.to_string(), json!({"id": 1, "heatSetpoint": 86.0}))]
        );
    }

    #[tokio::test]
    async fn unknown_preset_logs_error() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let api = RecordingApi::default();
        let h = heater(json!({"id": 1, "name": "Pool"}), TemperatureUnit::Fahrenheit);
        h.set_preset_mode(&api, "Unknown").await.unwrap();
        assert!(api.commands().is_empty());
        let out = logs.contents();
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("invalid heat mode preset"), "{out}");
    }

    #[tokio::test]
    async fn preset_reverse_lookup() {
        let api = RecordingApi::default();
        let h = heater(json!({"id": 1, "name": "Pool"}), TemperatureUnit::Fahrenheit);
        h.set_preset_mode(&api, "Heater").await.unwrap();
        h.set_preset_mode(&api, "Bogus").await.unwrap();
        h.set_hvac_mode(&api, HvacMode::Heat).await.unwrap();
        assert_eq!(
            api.commands(),
            vec![(API_BODY_HEATMODE.to_string(), json!({"id": 1, "mode": 3}))]
        );
    }

    #[tokio::test]
    async fn setup_builds_one_heater_per_body() {
        let api = RecordingApi::default().with_heat_modes(vec![
            ValDesc { val: 1, name: None, desc: Some("Off".into()) },
            ValDesc { val: 3, name: None, desc: Some("Heater".into()) },
        ]);
        let snapshot = Snapshot::new(json!({
            "temps": {"units": {"val": 4}, "bodies": [
                {"id": 1, "name": "Pool", "type": {"val": 0}},
                {"id": 2, "name": "Spa", "type": {"val": 1}}
            ]}
        }));
        let built = entities(&api, &snapshot).await.unwrap();
        assert_eq!(built.len(), 2);
        let spa = built[1].as_climate().unwrap();
        assert_eq!(spa.unique_id(), "test_heater_2");
        assert_eq!(spa.temperature_unit(), TemperatureUnit::Celsius);
        assert_eq!(spa.max_temp(), 40.0);
        assert_eq!(spa.preset_modes(), vec!["Off", "Heater"]);
    }
}

//! Light circuits and light groups.

use serde_json::{json, Map, Value};
use tracing::error;

use crate::api::PoolApi;
use crate::entity::{Binding, Entity, EntityCore, Renderable, Route, Subscriber};
use crate::event::{Event, EventKind, SubjectId};
use crate::protocol::{
    set_state_data, set_theme_data, API_CIRCUIT_SETSTATE, API_CIRCUIT_SETTHEME,
    API_LIGHTGROUP_SETSTATE,
};
use crate::snapshot::{Circuit, Snapshot};
use crate::types::{CodeTable, ColorMode, EquipmentClass, Features};
use crate::Result;

/// On/off light with optional themes. Matching events merge `isOn` and
/// `lightingTheme` field by field; absent fields keep their cached value.
#[derive(Debug, Clone)]
pub struct CircuitLight {
    core: EntityCore,
    id: SubjectId,
    name: String,
    class: EquipmentClass,
    is_on: Option<bool>,
    lighting_theme: Option<i64>,
    themes: CodeTable,
}

impl CircuitLight {
    pub fn new(
        controller_id: &str,
        class: EquipmentClass,
        circuit: &Circuit,
        themes: CodeTable,
    ) -> Self {
        let kind = match class {
            EquipmentClass::Light => EventKind::Circuit,
            EquipmentClass::LightGroup => EventKind::LightGroup,
        };
        Self {
            core: EntityCore::new(
                format!("{controller_id}_{class}_{}", circuit.id),
                Binding::subject(kind, circuit.id),
            ),
            id: circuit.id,
            name: circuit.name.clone(),
            class,
            is_on: circuit.is_on,
            lighting_theme: circuit.lighting_theme.as_ref().map(|t| t.val),
            themes,
        }
    }

    pub fn id(&self) -> SubjectId {
        self.id
    }

    pub fn equipment_class(&self) -> EquipmentClass {
        self.class
    }

    pub fn is_on(&self) -> bool {
        self.is_on.unwrap_or(false)
    }

    /// Active theme label; `None` if the cached code is not a known theme.
    pub fn effect(&self) -> Option<&str> {
        self.lighting_theme.and_then(|code| self.themes.label(code))
    }

    pub fn effect_list(&self) -> Option<Vec<String>> {
        if self.themes.is_empty() {
            None
        } else {
            Some(self.themes.labels())
        }
    }

    pub fn supported_features(&self) -> Features {
        if self.themes.is_empty() {
            Features::empty()
        } else {
            Features::EFFECT
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        ColorMode::OnOff
    }

    pub fn supported_color_modes(&self) -> Vec<ColorMode> {
        vec![ColorMode::OnOff]
    }

    /// With an effect (and a theme table) only the theme command is sent;
    /// otherwise the light is switched on. An unknown effect sends nothing.
    pub async fn turn_on<A: PoolApi>(&self, api: &A, effect: Option<&str>) -> Result<()> {
        if let Some(effect) = effect
            && !self.themes.is_empty()
        {
            let Some(theme) = self.themes.code_for(effect) else {
                error!(light = self.id, effect, "invalid theme for light");
                return Ok(());
            };
            return api
                .command(API_CIRCUIT_SETTHEME, set_theme_data(self.id, theme))
                .await;
        }
        api.command(self.state_url(), set_state_data(self.id, true))
            .await
    }

    pub async fn turn_off<A: PoolApi>(&self, api: &A) -> Result<()> {
        api.command(self.state_url(), set_state_data(self.id, false))
            .await
    }

    fn state_url(&self) -> &'static str {
        match self.class {
            EquipmentClass::Light => API_CIRCUIT_SETSTATE,
            EquipmentClass::LightGroup => API_LIGHTGROUP_SETSTATE,
        }
    }
}

impl Subscriber for CircuitLight {
    fn handle_event(&mut self, event: &Event) -> bool {
        match self.core.route(event) {
            Route::Availability => true,
            Route::Ignore => false,
            Route::Subject => {
                if let Some(on) = event.field("isOn").and_then(|v| v.as_bool()) {
                    self.is_on = Some(on);
                }
                if let Some(theme) = event
                    .field("lightingTheme")
                    .and_then(|t| t.get("val"))
                    .and_then(|v| v.as_i64())
                {
                    self.lighting_theme = Some(theme);
                }
                true
            }
        }
    }
}

impl Renderable for CircuitLight {
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
        let state = if self.is_on() { "on" } else { "off" };
        let mut props = self.core.base_properties(json!(state));
        props.insert("effect".into(), json!(self.effect()));
        props.insert("effect_list".into(), json!(self.effect_list()));
        props.insert("color_mode".into(), json!(self.color_mode().as_str()));
        props.insert(
            "supported_color_modes".into(),
            json!(self.supported_color_modes().iter().map(|m| m.as_str()).collect::<Vec<_>>()),
        );
        props.insert("supported_features".into(), json!(self.supported_features().bits()));
        props
    }
}

/// A light per circuit flagged `type.isLight`, plus one per light group.
pub async fn entities<A: PoolApi>(api: &A, snapshot: &Snapshot) -> Result<Vec<Entity>> {
    let controller_id = api.controller_id();
    let mut out = Vec::new();
    for circuit in snapshot.circuits().iter().filter(|c| c.is_light()) {
        let themes = CodeTable::from(api.light_themes(circuit.id).await?);
        out.push(Entity::Light(CircuitLight::new(
            &controller_id,
            EquipmentClass::Light,
            circuit,
            themes,
        )));
    }
    for group in snapshot.light_groups() {
        let themes = CodeTable::from(api.light_themes(group.id).await?);
        out.push(Entity::Light(CircuitLight::new(
            &controller_id,
            EquipmentClass::LightGroup,
            &group,
            themes,
        )));
    }
    Ok(out)
}

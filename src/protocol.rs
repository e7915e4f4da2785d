use serde_json::{json, Value};

use crate::event::SubjectId;
use crate::types::ValDesc;

pub const DEFAULT_CONTROLLER_ID: &str = "njspc";

pub const API_STATE_ALL: &str = "state/all";
pub const API_BODY_SETPOINT: &str = "state/body/setPoint";
pub const API_BODY_HEATMODE: &str = "state/body/heatMode";
pub const API_CIRCUIT_SETSTATE: &str = "state/circuit/setState";
pub const API_CIRCUIT_SETTHEME: &str = "state/circuit/setTheme";
pub const API_LIGHTGROUP_SETSTATE: &str = "state/lightGroup/setState";

pub fn heat_modes_path(body_id: SubjectId) -> String {
    format!("config/body/{body_id}/heatModes")
}

pub fn light_themes_path(circuit_id: SubjectId) -> String {
    format!("config/circuit/{circuit_id}/lightThemes")
}

pub fn set_point_data(id: SubjectId, set_point: f64) -> Value {
    json!({ "id": id, "heatSetpoint": set_point })
}

pub fn heat_mode_data(id: SubjectId, mode: i64) -> Value {
    json!({ "id": id, "mode": mode })
}

pub fn set_state_data(id: SubjectId, state: bool) -> Value {
    json!({ "id": id, "state": state })
}

pub fn set_theme_data(id: SubjectId, theme: i64) -> Value {
    json!({ "id": id, "theme": theme })
}

/// Lower-cased controller model with non-alphanumerics folded to `_`.
pub fn controller_id_from_model(model: &str) -> String {
    let id: String = model
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if id.is_empty() {
        DEFAULT_CONTROLLER_ID.to_string()
    } else {
        id
    }
}

/// Parse an enumeration response (`[{val, desc, ...}]`). Entries that do
/// not carry a numeric `val` are skipped.
pub fn parse_val_desc_list(body: &str) -> Vec<ValDesc> {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return vec![],
    };
    let Value::Array(items) = parsed else {
        return vec![];
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

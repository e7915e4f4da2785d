use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// `{val, name, desc}` triple njsPC uses for every enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValDesc {
    pub val: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// Code to label table (heat modes, light themes).
///
/// Labels come from the `desc` field of the server's enumeration; entries
/// without a `desc` are dropped. Iteration is in ascending code order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable(BTreeMap<i64, String>);

impl CodeTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    pub fn label(&self, code: i64) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    /// Reverse lookup. First code (ascending) carrying `label` wins.
    pub fn code_for(&self, label: &str) -> Option<i64> {
        self.0.iter().find(|(_, v)| *v == label).map(|(k, _)| *k)
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<ValDesc>> for CodeTable {
    fn from(entries: Vec<ValDesc>) -> Self {
        Self(
            entries
                .into_iter()
                .filter_map(|e| e.desc.map(|d| (e.val, d)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    /// njsPC `temps.units.val`: 0 is Fahrenheit, anything else Celsius.
    pub fn from_njspc_val(val: i64) -> Self {
        if val == 0 {
            TemperatureUnit::Fahrenheit
        } else {
            TemperatureUnit::Celsius
        }
    }

    pub fn from_njspc_name(name: &str) -> Option<Self> {
        match name {
            "F" => Some(TemperatureUnit::Fahrenheit),
            "C" => Some(TemperatureUnit::Celsius),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "\u{00b0}F",
            TemperatureUnit::Celsius => "\u{00b0}C",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HvacAction {
    #[default]
    Off,
    Heating,
    Cooling,
}

impl HvacAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacAction::Off => "off",
            HvacAction::Heating => "heating",
            HvacAction::Cooling => "cooling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    OnOff,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::OnOff => "onoff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDeviceClass {
    Temperature,
    Power,
}

impl SensorDeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorDeviceClass::Temperature => "temperature",
            SensorDeviceClass::Power => "power",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Measurement,
}

impl StateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateClass::Measurement => "measurement",
        }
    }
}

/// Equipment class used in light unique ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentClass {
    Light,
    LightGroup,
}

impl EquipmentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentClass::Light => "light",
            EquipmentClass::LightGroup => "light_group",
        }
    }
}

impl fmt::Display for EquipmentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Feature bitmask as the hosting platform encodes it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        const TARGET_TEMPERATURE = 1;
        const EFFECT = 1 << 2;
        const PRESET_MODE = 1 << 4;
    }
}

//! Decoded state of the appliance panel

use serde::Serializer;
use serde_derive::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumIter, IntoStaticStr)]
pub enum Fan {
    #[serde(rename = "FAN_NONE")]
    #[strum(serialize = "FAN_NONE")]
    None,
    #[serde(rename = "FAN_AUTO")]
    #[strum(serialize = "FAN_AUTO")]
    Auto,
    #[serde(rename = "FAN_HIGH")]
    #[strum(serialize = "FAN_HIGH")]
    High,
    #[serde(rename = "FAN_MED")]
    #[strum(serialize = "FAN_MED")]
    Med,
    #[serde(rename = "FAN_LOW")]
    #[strum(serialize = "FAN_LOW")]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumIter, IntoStaticStr)]
pub enum Mode {
    #[serde(rename = "MODE_NONE")]
    #[strum(serialize = "MODE_NONE")]
    None,
    #[serde(rename = "MODE_COOL")]
    #[strum(serialize = "MODE_COOL")]
    Cool,
    #[serde(rename = "MODE_FAN")]
    #[strum(serialize = "MODE_FAN")]
    Fan,
    #[serde(rename = "MODE_ECO")]
    #[strum(serialize = "MODE_ECO")]
    Eco,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumIter, IntoStaticStr)]
pub enum Delay {
    #[serde(rename = "DELAY_NONE")]
    #[strum(serialize = "DELAY_NONE")]
    None,
    #[serde(rename = "DELAY_ON")]
    #[strum(serialize = "DELAY_ON")]
    On,
    #[serde(rename = "DELAY_OFF")]
    #[strum(serialize = "DELAY_OFF")]
    Off,
}

// Variants are declared in catalog group order, after `None`
macro_rules! impl_group_index {
    ($t:ty) => {
        impl $t {
            /// Map a decoded group index (0 for none, then 1-based) to a state
            pub fn from_index(index: usize) -> Option<Self> {
                Self::iter().nth(index)
            }

            pub fn name(self) -> &'static str {
                self.into()
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::None
            }
        }
    };
}

impl_group_index!(Fan);
impl_group_index!(Mode);
impl_group_index!(Delay);

/// Booleans go over the wire as `"True"` / `"False"`
fn serialize_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "True" } else { "False" })
}

/// Panel state decoded from one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelState {
    pub fan: Fan,
    pub mode: Mode,
    pub delay: Delay,
    /// Most significant digit of the display, -1 if unreadable
    #[serde(rename = "msdigit")]
    pub ms_digit: i8,
    /// Least significant digit of the display, -1 if unreadable
    #[serde(rename = "lsdigit")]
    pub ls_digit: i8,
    #[serde(rename = "filterbad", serialize_with = "serialize_flag")]
    pub filter_bad: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            fan: Fan::None,
            mode: Mode::None,
            delay: Delay::None,
            ms_digit: -1,
            ls_digit: -1,
            filter_bad: false,
        }
    }
}

impl PanelState {
    /// Two-digit number shown on the display, if both digits are readable
    pub fn temperature(&self) -> Option<u8> {
        if (0..=9).contains(&self.ms_digit) && (0..=9).contains(&self.ls_digit) {
            Some((self.ms_digit * 10 + self.ls_digit) as u8)
        } else {
            None
        }
    }

    /// Textual record sent to the control loop
    pub fn to_record(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for PanelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fan={} mode={} delay={} digits={},{} filterbad={}",
            self.fan.name(),
            self.mode.name(),
            self.delay.name(),
            self.ms_digit,
            self.ls_digit,
            self.filter_bad
        )
    }
}

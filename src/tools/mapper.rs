//! Tool call → device command mapping.
//!
//! [`resolve`] is pure: it validates the caller's arguments against the
//! tool's declared shape and looks the result up in the fixed endpoint table.
//! Nothing here talks to the device, so a rejected call never reaches it.
//!
//! | Tool                | Argument                 | Device path                       |
//! |---------------------|--------------------------|-----------------------------------|
//! | `freeze_lock`       | `on` / `off`             | `/mode/S2Z` / `/mode/0`           |
//! | `warning_buzzer`    | `on` / `off`             | `/S1/1` / `/S1/0`                 |
//! | `pet_training`      | `normal`/`fast`/`freeze` | `/mode/S2` / `/mode/S2F` / `/mode/S2Z` |
//! | `sleep_deprivation` | `on` / `off`             | `/mode/S4` / `/mode/0`            |
//! | `random_mode`       | `on` / `off`             | `/mode/RN` / `/mode/0`            |
//! | `timer`             | `on` / `off`             | `/mode/TM` / `/mode/0`            |
//! | `timer`             | `t1_up` / `t1_down`      | `/T1/+` / `/T1/-`                 |
//! | `timer`             | `t2_up` / `t2_down`      | `/T2/+` / `/T2/-`                 |
//! | `beep`              |                          | `/B1/1`                           |
//! | `shock`             | `power`                  | `/Z1/1?power=N`                   |
//! | `power_control`     | `increase` / `decrease`  | `/PW/+` / `/PW/-`                 |
//! | `send_raw_command`  | `command`                | verbatim                          |

use serde_json::{Map, Value};
use thiserror::Error;

use super::ToolName;
use crate::device::DeviceCommand;
use crate::safety::PowerLevel;

/// Lowest accepted power level.
pub const POWER_MIN: i64 = 1;
/// Highest accepted power level.
pub const POWER_MAX: i64 = 100;
/// Level used by `shock` when the caller omits `power`.
pub const DEFAULT_SHOCK_POWER: u8 = 50;

const MODE_OFF: &str = "/mode/0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingMode {
    Normal,
    Fast,
    Freeze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    On,
    Off,
    T1Up,
    T1Down,
    T2Up,
    T2Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Increase,
    Decrease,
}

// Option tables are shared with the catalog so the advertised enums and the
// accepted values are the same list.
pub const TOGGLE_OPTIONS: &[(&str, Toggle)] = &[("on", Toggle::On), ("off", Toggle::Off)];

pub const TRAINING_MODE_OPTIONS: &[(&str, TrainingMode)] = &[
    ("normal", TrainingMode::Normal),
    ("fast", TrainingMode::Fast),
    ("freeze", TrainingMode::Freeze),
];

pub const TIMER_OPTIONS: &[(&str, TimerAction)] = &[
    ("on", TimerAction::On),
    ("off", TimerAction::Off),
    ("t1_up", TimerAction::T1Up),
    ("t1_down", TimerAction::T1Down),
    ("t2_up", TimerAction::T2Up),
    ("t2_down", TimerAction::T2Down),
];

pub const POWER_ACTION_OPTIONS: &[(&str, PowerAction)] = &[
    ("increase", PowerAction::Increase),
    ("decrease", PowerAction::Decrease),
];

/// Names of an option table, in declaration order.
pub fn option_names<T>(options: &[(&'static str, T)]) -> Vec<&'static str> {
    options.iter().map(|(name, _)| *name).collect()
}

/// Why a tool call was rejected before reaching the device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool arguments must be a JSON object")]
    ArgumentsNotObject,
    #[error("Missing required argument '{argument}'")]
    MissingArgument { argument: &'static str },
    #[error("Argument '{argument}' must be {expected}")]
    WrongType {
        argument: &'static str,
        expected: &'static str,
    },
    #[error("Argument '{argument}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        argument: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("Argument '{argument}' must be one of [{allowed}], got '{value}'")]
    InvalidChoice {
        argument: &'static str,
        value: String,
        allowed: String,
    },
    #[error("Invalid raw command path: {0}")]
    InvalidPath(&'static str),
}

/// Validate `arguments` for `tool` and build the device command it maps to.
///
/// `arguments` may be absent or `null` (treated as an empty object). Power
/// levels are range-checked first and then capped at `ceiling`.
pub fn resolve(
    tool: ToolName,
    arguments: Option<&Value>,
    ceiling: Option<u8>,
) -> Result<DeviceCommand, ValidationError> {
    let args = Args::from_value(arguments)?;

    let command = match tool {
        ToolName::FreezeLock => toggle(&args, "/mode/S2Z", MODE_OFF)?,
        ToolName::WarningBuzzer => toggle(&args, "/S1/1", "/S1/0")?,
        ToolName::SleepDeprivation => toggle(&args, "/mode/S4", MODE_OFF)?,
        ToolName::RandomMode => toggle(&args, "/mode/RN", MODE_OFF)?,
        ToolName::PetTraining => {
            let action = args.required_choice("action", TOGGLE_OPTIONS)?;
            let mode = args
                .choice("mode", TRAINING_MODE_OPTIONS)?
                .unwrap_or(TrainingMode::Normal);
            let path = match (action, mode) {
                (Toggle::Off, _) => MODE_OFF,
                (Toggle::On, TrainingMode::Normal) => "/mode/S2",
                (Toggle::On, TrainingMode::Fast) => "/mode/S2F",
                (Toggle::On, TrainingMode::Freeze) => "/mode/S2Z",
            };
            DeviceCommand::get(path)
        }
        ToolName::Timer => {
            let path = match args.required_choice("action", TIMER_OPTIONS)? {
                TimerAction::On => "/mode/TM",
                TimerAction::Off => MODE_OFF,
                TimerAction::T1Up => "/T1/+",
                TimerAction::T1Down => "/T1/-",
                TimerAction::T2Up => "/T2/+",
                TimerAction::T2Down => "/T2/-",
            };
            DeviceCommand::get(path)
        }
        ToolName::Beep => DeviceCommand::get("/B1/1"),
        ToolName::Shock => {
            let requested = args.power("power")?.unwrap_or(DEFAULT_SHOCK_POWER);
            DeviceCommand::get("/Z1/1").with_power(PowerLevel::new(requested, ceiling))
        }
        ToolName::PowerControl => match args.required_choice("action", POWER_ACTION_OPTIONS)? {
            PowerAction::Increase => DeviceCommand::get("/PW/+"),
            PowerAction::Decrease => DeviceCommand::get("/PW/-"),
        },
        ToolName::SendRawCommand => {
            let raw = args
                .string("command")?
                .ok_or(ValidationError::MissingArgument {
                    argument: "command",
                })?;
            validate_raw_path(raw)?;
            DeviceCommand::get(raw)
        }
    };

    Ok(command)
}

fn toggle(args: &Args<'_>, on: &str, off: &str) -> Result<DeviceCommand, ValidationError> {
    let path = match args.required_choice("action", TOGGLE_OPTIONS)? {
        Toggle::On => on,
        Toggle::Off => off,
    };
    Ok(DeviceCommand::get(path))
}

/// Check the shape of a `send_raw_command` path.
///
/// Accepts only absolute paths with an optional query string. Rejects `..`
/// segments, whitespace, control characters and fragments.
pub fn validate_raw_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::InvalidPath("path is empty"));
    }
    if !path.starts_with('/') {
        return Err(ValidationError::InvalidPath("path must start with '/'"));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidPath(
            "path must not contain whitespace or control characters",
        ));
    }
    if path.contains('#') {
        return Err(ValidationError::InvalidPath("path must not contain a fragment"));
    }
    let path_part = path.split('?').next().unwrap_or(path);
    if path_part.split('/').any(|segment| segment == "..") {
        return Err(ValidationError::InvalidPath("path must not contain '..' segments"));
    }
    Ok(())
}

/// Read-only view over a tool call's `arguments` object.
struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn from_value(value: Option<&'a Value>) -> Result<Self, ValidationError> {
        match value {
            None | Some(Value::Null) => Ok(Self { map: None }),
            Some(Value::Object(map)) => Ok(Self { map: Some(map) }),
            Some(_) => Err(ValidationError::ArgumentsNotObject),
        }
    }

    /// Only a missing key is absent. An explicit `null` is a wrong-typed value.
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(name))
    }

    fn string(&self, name: &'static str) -> Result<Option<&'a str>, ValidationError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ValidationError::WrongType {
                argument: name,
                expected: "a string",
            }),
        }
    }

    fn choice<T: Copy>(
        &self,
        name: &'static str,
        options: &[(&'static str, T)],
    ) -> Result<Option<T>, ValidationError> {
        let Some(value) = self.string(name)? else {
            return Ok(None);
        };
        options
            .iter()
            .find(|(option, _)| *option == value)
            .map(|(_, parsed)| Some(*parsed))
            .ok_or_else(|| ValidationError::InvalidChoice {
                argument: name,
                value: value.to_string(),
                allowed: option_names(options).join(", "),
            })
    }

    fn required_choice<T: Copy>(
        &self,
        name: &'static str,
        options: &[(&'static str, T)],
    ) -> Result<T, ValidationError> {
        self.choice(name, options)?
            .ok_or(ValidationError::MissingArgument { argument: name })
    }

    /// An integer power level in `POWER_MIN..=POWER_MAX`.
    fn power(&self, name: &'static str) -> Result<Option<u8>, ValidationError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let number = value.as_i64().ok_or(ValidationError::WrongType {
            argument: name,
            expected: "an integer",
        })?;
        if !(POWER_MIN..=POWER_MAX).contains(&number) {
            return Err(ValidationError::OutOfRange {
                argument: name,
                value: number,
                min: POWER_MIN,
                max: POWER_MAX,
            });
        }
        u8::try_from(number)
            .map(Some)
            .map_err(|_| ValidationError::OutOfRange {
                argument: name,
                value: number,
                min: POWER_MIN,
                max: POWER_MAX,
            })
    }
}

//! Tool metadata returned by `tools/list`.
//!
//! The catalog is built once at startup from the static definitions below and
//! the configured description overrides, then shared read-only.

use serde::Serialize;
use serde_json::{json, Value};

use super::mapper::{
    option_names, DEFAULT_SHOCK_POWER, POWER_ACTION_OPTIONS, POWER_MAX, POWER_MIN,
    TIMER_OPTIONS, TOGGLE_OPTIONS, TRAINING_MODE_OPTIONS,
};
use super::ToolName;
use crate::config::Config;

/// One entry of the `tools/list` result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The full, ordered tool list.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl ToolCatalog {
    pub fn new(config: &Config) -> Self {
        let context = config.tools.context_description.as_deref();
        let tools = ToolName::ALL
            .into_iter()
            .map(|tool| {
                let base = config
                    .description_override(tool)
                    .unwrap_or_else(|| default_description(tool));
                let description = match context {
                    Some(ctx) => format!("[{ctx}] {base}"),
                    None => base.to_string(),
                };
                ToolDefinition {
                    name: tool.as_str(),
                    description,
                    input_schema: input_schema(tool),
                }
            })
            .collect();
        Self { tools }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    #[cfg(test)]
    fn get(&self, tool: ToolName) -> Option<&ToolDefinition> {
        self.tools.iter().find(|def| def.name == tool.as_str())
    }

    /// The `tools/list` result object.
    pub fn to_list_result(&self) -> Value {
        json!({ "tools": self.tools })
    }
}

/// Built-in description for `tool`.
pub fn default_description(tool: ToolName) -> &'static str {
    match tool {
        ToolName::FreezeLock => "FREEZE LOCK (BETA) - Activate Pet Training in freeze mode (mode 3/S2Z). When enabled, subject must stay completely still - any movement triggers a correction without warning.",
        ToolName::WarningBuzzer => "Warning Buzzer - Enable or disable the warning buzzer on the device.",
        ToolName::PetTraining => "Pet Training Mode - Enable or disable pet training mode with speed setting (normal, fast, or freeze).",
        ToolName::SleepDeprivation => "Sleep Deprivation Mode - Enable or disable sleep deprivation mode.",
        ToolName::RandomMode => "Random Mode - Enable or disable random activation mode.",
        ToolName::Timer => "Timer Mode - Enable or disable timer mode, or adjust timer 1 and timer 2.",
        ToolName::Beep => "Beep - Send a beep signal to the device (equivalent to short button press).",
        ToolName::Shock => "Shock - Send a shock signal with specified power level (equivalent to long button press).",
        ToolName::PowerControl => "Power Control - Adjust the device power level.",
        ToolName::SendRawCommand => "Send a raw HTTP command to the device. For advanced users.",
    }
}

fn action_schema(description: &str, options: Vec<&'static str>) -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": {
                "type": "string",
                "description": description,
                "enum": options
            }
        },
        "required": ["action"]
    })
}

fn input_schema(tool: ToolName) -> Value {
    let toggle = option_names(TOGGLE_OPTIONS);
    match tool {
        ToolName::FreezeLock => {
            action_schema("Action: 'on' to lock/freeze, 'off' to unlock", toggle)
        }
        ToolName::WarningBuzzer => {
            action_schema("Action: 'on' to enable buzzer, 'off' to disable", toggle)
        }
        ToolName::SleepDeprivation => {
            action_schema("Action: 'on' to enable, 'off' to disable", toggle)
        }
        ToolName::RandomMode => {
            action_schema("Action: 'on' to enable random mode, 'off' to disable", toggle)
        }
        ToolName::PetTraining => json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Action: 'on' to enable, 'off' to disable",
                    "enum": toggle
                },
                "mode": {
                    "type": "string",
                    "description": "Training mode: 'normal' (S2), 'fast' (S2F), or 'freeze' (S2Z - stay still, no warning). Only used when action is 'on'.",
                    "enum": option_names(TRAINING_MODE_OPTIONS),
                    "default": "normal"
                }
            },
            "required": ["action"]
        }),
        ToolName::Timer => action_schema(
            "Action: 'on' to enable timer mode, 'off' to disable, 't1_up'/'t1_down' to adjust timer 1, 't2_up'/'t2_down' to adjust timer 2",
            option_names(TIMER_OPTIONS),
        ),
        ToolName::Beep => json!({
            "type": "object",
            "properties": {}
        }),
        ToolName::Shock => json!({
            "type": "object",
            "properties": {
                "power": {
                    "type": "integer",
                    "description": "Power level from 1 to 100 percent. Capped by the server's safety limit when one is configured.",
                    "minimum": POWER_MIN,
                    "maximum": POWER_MAX,
                    "default": DEFAULT_SHOCK_POWER
                }
            }
        }),
        ToolName::PowerControl => json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Action: 'increase' to raise power one step, 'decrease' to lower it one step",
                    "enum": option_names(POWER_ACTION_OPTIONS)
                }
            },
            "required": ["action"]
        }),
        ToolName::SendRawCommand => json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Raw command path starting with '/' (e.g., '/REL/1', '/mode/S2', '/TX?param=value'). '..' segments are rejected."
                }
            },
            "required": ["command"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(descriptions: &[(&str, &str)], context: Option<&str>) -> Config {
        let mut config = Config::default();
        for (name, desc) in descriptions {
            config
                .tools
                .descriptions
                .insert((*name).to_string(), (*desc).to_string());
        }
        config.tools.context_description = context.map(String::from);
        config
    }

    #[test]
    fn lists_all_ten_tools_in_order() {
        let catalog = ToolCatalog::new(&Config::default());
        let names: Vec<&str> = catalog.tools().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "freeze_lock",
                "warning_buzzer",
                "pet_training",
                "sleep_deprivation",
                "random_mode",
                "timer",
                "beep",
                "shock",
                "power_control",
                "send_raw_command",
            ]
        );
    }

    #[test]
    fn every_description_is_non_empty() {
        let catalog = ToolCatalog::new(&config_with(&[("beep", "")], None));
        for def in catalog.tools() {
            assert!(!def.description.trim().is_empty(), "{} has no description", def.name);
        }
    }

    #[test]
    fn overrides_replace_defaults() {
        let catalog = ToolCatalog::new(&config_with(&[("shock", "Custom")], None));
        assert_eq!(catalog.get(ToolName::Shock).unwrap().description, "Custom");
        assert_eq!(
            catalog.get(ToolName::Beep).unwrap().description,
            default_description(ToolName::Beep)
        );
    }

    #[test]
    fn context_prefixes_every_description() {
        let catalog = ToolCatalog::new(&config_with(&[("beep", "Noise")], Some("Lab")));
        assert_eq!(catalog.get(ToolName::Beep).unwrap().description, "[Lab] Noise");
        assert!(catalog
            .tools()
            .iter()
            .all(|def| def.description.starts_with("[Lab] ")));
    }

    #[test]
    fn schemas_advertise_accepted_values() {
        let catalog = ToolCatalog::new(&Config::default());
        let timer = &catalog.get(ToolName::Timer).unwrap().input_schema;
        assert_eq!(
            timer["properties"]["action"]["enum"],
            json!(["on", "off", "t1_up", "t1_down", "t2_up", "t2_down"])
        );
        let shock = &catalog.get(ToolName::Shock).unwrap().input_schema;
        assert_eq!(shock["properties"]["power"]["minimum"], json!(1));
        assert_eq!(shock["properties"]["power"]["maximum"], json!(100));
        let power = &catalog.get(ToolName::PowerControl).unwrap().input_schema;
        assert_eq!(power["properties"]["action"]["enum"], json!(["increase", "decrease"]));
        assert!(power["properties"].get("level").is_none());
    }

    #[test]
    fn list_result_serializes_input_schema_key() {
        let result = ToolCatalog::new(&Config::default()).to_list_result();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 10);
        assert!(tools[0].get("inputSchema").is_some());
        assert_eq!(tools[0]["name"], "freeze_lock");
    }
}

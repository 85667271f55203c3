//! The fixed tool set exposed over MCP.
//!
//! There are exactly ten tools. [`ToolName`] is the closed set of their
//! identifiers; anything a client sends that doesn't parse into it is an
//! unknown tool.
//!
//! - [`mapper`] turns a tool call into a [`DeviceCommand`](crate::device::DeviceCommand)
//! - [`catalog`] builds the `tools/list` metadata

pub mod catalog;
pub mod mapper;

use std::fmt;

pub use catalog::{ToolCatalog, ToolDefinition};
pub use mapper::{resolve, ValidationError};

/// Identifier of one of the ten supported tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    FreezeLock,
    WarningBuzzer,
    PetTraining,
    SleepDeprivation,
    RandomMode,
    Timer,
    Beep,
    Shock,
    PowerControl,
    SendRawCommand,
}

impl ToolName {
    /// Every tool, in the order `tools/list` reports them.
    pub const ALL: [ToolName; 10] = [
        ToolName::FreezeLock,
        ToolName::WarningBuzzer,
        ToolName::PetTraining,
        ToolName::SleepDeprivation,
        ToolName::RandomMode,
        ToolName::Timer,
        ToolName::Beep,
        ToolName::Shock,
        ToolName::PowerControl,
        ToolName::SendRawCommand,
    ];

    /// Wire name used in `tools/list` and `tools/call`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreezeLock => "freeze_lock",
            Self::WarningBuzzer => "warning_buzzer",
            Self::PetTraining => "pet_training",
            Self::SleepDeprivation => "sleep_deprivation",
            Self::RandomMode => "random_mode",
            Self::Timer => "timer",
            Self::Beep => "beep",
            Self::Shock => "shock",
            Self::PowerControl => "power_control",
            Self::SendRawCommand => "send_raw_command",
        }
    }

    /// Look up a tool by its wire name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    /// Environment variable that overrides this tool's description,
    /// e.g. `TOOL_DESC_SHOCK`.
    pub fn description_env_var(self) -> String {
        format!("TOOL_DESC_{}", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::from_name(tool.as_str()), Some(tool));
        }
    }

    #[test]
    fn unknown_and_miscased_names_are_rejected() {
        assert_eq!(ToolName::from_name("zap"), None);
        assert_eq!(ToolName::from_name("Beep"), None);
        assert_eq!(ToolName::from_name(""), None);
    }

    #[test]
    fn env_var_names() {
        assert_eq!(ToolName::Shock.description_env_var(), "TOOL_DESC_SHOCK");
        assert_eq!(
            ToolName::SendRawCommand.description_env_var(),
            "TOOL_DESC_SEND_RAW_COMMAND"
        );
    }
}

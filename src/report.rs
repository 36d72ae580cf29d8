use crate::status::{AggregateResult, Severity};
use std::fmt;

pub const HEALTHY_LINE: &str = "OK: Switch is healthy";

pub const UNKNOWN_EXIT_CODE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOutput {
    pub line: String,
    pub exit_code: u8,
}

pub fn render(result: &AggregateResult) -> PluginOutput {
    match result.severity {
        Severity::Ok => PluginOutput {
            line: HEALTHY_LINE.to_string(),
            exit_code: 0,
        },
        severity => PluginOutput {
            line: format!("{}: {}", severity.label(), result.messages.join(", ")),
            exit_code: severity.exit_code() as u8,
        },
    }
}

pub fn render_fatal(err: &impl fmt::Display) -> PluginOutput {
    PluginOutput {
        line: format!("UNKNOWN: {err}"),
        exit_code: UNKNOWN_EXIT_CODE,
    }
}

use crate::config::Thresholds;
use crate::status::Finding;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MgmtStatus {
    Active,
    Standby,
    Unknown,
}

impl MgmtStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MgmtStatus::Active,
            2 => MgmtStatus::Standby,
            _ => MgmtStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOperStatus {
    Ok,
    Unsupported,
    VersionMismatch,
    ConfigMismatch,
    Down,
    NotPresent,
}

impl UnitOperStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => UnitOperStatus::Ok,
            2 => UnitOperStatus::Unsupported,
            3 => UnitOperStatus::VersionMismatch,
            4 => UnitOperStatus::ConfigMismatch,
            5 => UnitOperStatus::Down,
            6 => UnitOperStatus::NotPresent,
            other => {
                debug!(code = other, "unknown stack-unit status, treating as ok");
                UnitOperStatus::Ok
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Ok,
    Down,
    Absent,
}

impl ComponentStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => ComponentStatus::Down,
            3 => ComponentStatus::Absent,
            _ => ComponentStatus::Ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerSupply {
    pub id: u32,
    pub oper_status: ComponentStatus,
    // Only read by the plain chassis check.
    pub usage_percent: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanTray {
    pub id: u32,
    pub oper_status: ComponentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackUnit {
    pub index: u32,
    pub mgmt_status: MgmtStatus,
    pub oper_status: UnitOperStatus,
    pub uptime_seconds: u64,
    pub psus: Vec<PowerSupply>,
    pub fans: Vec<FanTray>,
    pub cpu_percent: Option<i64>,
    pub mem_percent: Option<i64>,
}

// TimeTicks are hundredths of a second.
pub fn parse_timeticks(raw: &str) -> Option<u64> {
    let text = raw.trim().trim_matches('"');
    let ticks = match (text.find('('), text.find(')')) {
        (Some(open), Some(close)) if open < close => text[open + 1..close].trim(),
        _ => text,
    };
    ticks.parse::<u64>().ok().map(|t| t / 100)
}

pub fn evaluate_unit(unit: &StackUnit, policy: &Thresholds) -> Vec<Finding> {
    let mut findings = Vec::new();
    let index = unit.index;

    match unit.oper_status {
        UnitOperStatus::Ok => {}
        UnitOperStatus::Unsupported => {
            findings.push(Finding::critical(format!(
                "Stack-unit {index} is unsupported"
            )));
        }
        // Reported as critical even though the mismatch is usually benign.
        UnitOperStatus::VersionMismatch => {
            findings.push(Finding::critical(format!(
                "Stack-unit {index} has software image version mismatch"
            )));
        }
        UnitOperStatus::ConfigMismatch => {
            findings.push(Finding::warning(format!(
                "Stack-unit {index} has configuration mismatch"
            )));
        }
        UnitOperStatus::Down => {
            findings.push(Finding::critical(format!("Stack-unit {index} is DOWN")));
        }
        UnitOperStatus::NotPresent => {
            findings.push(Finding::critical(format!(
                "Stack-unit {index} is NOT PRESENT"
            )));
        }
    }

    if unit.uptime_seconds < policy.uptime_crit_secs {
        findings.push(Finding::critical(format!(
            "Stack-unit {index} uptime less than {} seconds!",
            policy.uptime_crit_secs
        )));
    } else if unit.uptime_seconds < policy.uptime_warn_secs {
        findings.push(Finding::warning(format!(
            "Stack-unit {index} uptime less than {} seconds!",
            policy.uptime_warn_secs
        )));
    }

    for psu in &unit.psus {
        match psu.oper_status {
            ComponentStatus::Down => findings.push(Finding::critical(format!(
                "Stack-unit {index} PSU {} down!",
                psu.id
            ))),
            ComponentStatus::Absent => findings.push(Finding::warning(format!(
                "Stack-unit {index} PSU {} absent",
                psu.id
            ))),
            ComponentStatus::Ok => {}
        }
        if let Some(usage) = psu.usage_percent {
            let message = format!("Stack-unit {index} PSU {} high PSU usage ({usage}%)", psu.id);
            findings.extend(over_threshold(
                usage,
                policy.psu_usage_warn_percent,
                policy.psu_usage_crit_percent,
                message,
            ));
        }
    }

    for fan in &unit.fans {
        match fan.oper_status {
            ComponentStatus::Down => findings.push(Finding::critical(format!(
                "Stack-unit {index} Fan {} down!",
                fan.id
            ))),
            ComponentStatus::Absent => findings.push(Finding::warning(format!(
                "Stack-unit {index} Fan {} absent",
                fan.id
            ))),
            ComponentStatus::Ok => {}
        }
    }

    if let Some(cpu) = unit.cpu_percent {
        findings.extend(over_threshold(
            cpu,
            policy.cpu_warn_percent,
            policy.cpu_crit_percent,
            format!("Stack-unit {index} high CPU usage ({cpu}%)"),
        ));
    }

    if let Some(mem) = unit.mem_percent {
        findings.extend(over_threshold(
            mem,
            policy.mem_warn_percent,
            policy.mem_crit_percent,
            format!("Stack-unit {index} high memory usage ({mem}%)"),
        ));
    }

    findings
}

// Strictly greater than: a value equal to the threshold does not trigger.
fn over_threshold(value: i64, warn: i64, crit: i64, message: String) -> Option<Finding> {
    if value > crit {
        Some(Finding::critical(message))
    } else if value > warn {
        Some(Finding::warning(message))
    } else {
        None
    }
}

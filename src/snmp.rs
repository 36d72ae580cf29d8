use crate::config::SnmpConfig;
use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

const NO_SUCH_OBJECT_MARKERS: [&str; 2] = ["No Such Object available", "NOSUCHOBJECT"];
const NO_SUCH_INSTANCE_MARKERS: [&str; 2] = ["No Such Instance currently exists", "NOSUCHINSTANCE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarResult {
    Value(String),
    NoSuchObject,
    NoSuchInstance,
}

impl ScalarResult {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if NO_SUCH_OBJECT_MARKERS.iter().any(|m| text.contains(m)) {
            return ScalarResult::NoSuchObject;
        }
        if NO_SUCH_INSTANCE_MARKERS.iter().any(|m| text.contains(m)) {
            return ScalarResult::NoSuchInstance;
        }
        ScalarResult::Value(unquote(text).to_string())
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ScalarResult::Value(v) => Some(v.as_str()),
            ScalarResult::NoSuchObject | ScalarResult::NoSuchInstance => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value().is_none()
    }
}

pub type Row = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: BTreeMap<u32, Row>,
}

impl Table {
    pub fn insert(&mut self, index: u32, label: impl Into<String>, value: impl Into<String>) {
        self.rows
            .entry(index)
            .or_default()
            .insert(label.into(), value.into());
    }

    pub fn rows(&self) -> impl Iterator<Item = (u32, &Row)> {
        self.rows.iter().map(|(index, row)| (*index, row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} did not finish within {deadline} for {oid}")]
    Timeout {
        program: String,
        oid: String,
        deadline: humantime::Duration,
    },
    #[error("{program} failed for {oid} ({status}): {stderr}")]
    Failed {
        program: String,
        oid: String,
        status: String,
        stderr: String,
    },
    #[error("{oid} does not exist on the agent")]
    Missing { oid: String },
    #[error("{oid} returned non-integer value '{value}'")]
    NotAnInteger { oid: String, value: String },
}

#[allow(async_fn_in_trait)]
pub trait SnmpSession {
    async fn get(&self, oid: &str) -> Result<ScalarResult, SnmpError>;

    async fn walk(&self, oids: &[&str]) -> Result<Table, SnmpError>;

    async fn get_int(&self, oid: &str) -> Result<i64, SnmpError> {
        match self.get(oid).await? {
            ScalarResult::Value(value) => {
                parse_int(&value).ok_or_else(|| SnmpError::NotAnInteger {
                    oid: oid.to_string(),
                    value,
                })
            }
            ScalarResult::NoSuchObject | ScalarResult::NoSuchInstance => {
                Err(SnmpError::Missing {
                    oid: oid.to_string(),
                })
            }
        }
    }
}

pub fn column_label(oid: &str) -> &str {
    oid.rsplit("::").next().unwrap_or(oid)
}

// Accepts 42, "42" and enum renderings such as up(1).
pub fn parse_int(value: &str) -> Option<i64> {
    let text = unquote(value.trim());
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    let open = text.rfind('(')?;
    let close = text[open..].find(')')? + open;
    text[open + 1..close].trim().parse().ok()
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

pub struct NetSnmpSession {
    host: String,
    community: String,
    cfg: SnmpConfig,
}

impl NetSnmpSession {
    pub fn new(host: impl Into<String>, community: impl Into<String>, cfg: SnmpConfig) -> Self {
        Self {
            host: host.into(),
            community: community.into(),
            cfg,
        }
    }

    fn agent(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("udp6:[{}]:{}", self.host, self.cfg.port)
        } else {
            format!("{}:{}", self.host, self.cfg.port)
        }
    }

    fn base_args(&self, output_flags: &str) -> Vec<String> {
        vec![
            "-v".to_string(),
            self.cfg.version.clone(),
            "-c".to_string(),
            self.community.clone(),
            "-t".to_string(),
            self.cfg.timeout_secs.to_string(),
            "-r".to_string(),
            self.cfg.retries.to_string(),
            format!("-O{output_flags}"),
            self.agent(),
        ]
    }

    async fn run(&self, program: &str, args: Vec<String>, oid: &str) -> Result<String, SnmpError> {
        debug!(program, host = %self.host, oid, "running snmp query");

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .arg(oid)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let deadline = self.cfg.command_deadline();
        let output = match timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(SnmpError::Spawn {
                    program: program.to_string(),
                    source,
                })
            }
            Err(_elapsed) => {
                return Err(SnmpError::Timeout {
                    program: program.to_string(),
                    oid: oid.to_string(),
                    deadline: deadline.into(),
                })
            }
        };

        if !output.status.success() {
            return Err(SnmpError::Failed {
                program: program.to_string(),
                oid: oid.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SnmpSession for NetSnmpSession {
    async fn get(&self, oid: &str) -> Result<ScalarResult, SnmpError> {
        // e: numeric enums, q: quick print, v: value only, t: raw timeticks
        let args = self.base_args("eqvt");
        let stdout = self.run(&self.cfg.snmpget_path, args, oid).await?;
        let first = stdout.lines().next().unwrap_or_default();
        Ok(ScalarResult::parse(first))
    }

    async fn walk(&self, oids: &[&str]) -> Result<Table, SnmpError> {
        let mut table = Table::default();
        for oid in oids {
            let args = self.base_args("eqst");
            let stdout = self.run(&self.cfg.snmpwalk_path, args, oid).await?;
            parse_walk_output(&stdout, &mut table);
        }
        Ok(table)
    }
}

// Lines without a numeric index (exceptions on the column itself) are skipped.
pub fn parse_walk_output(stdout: &str, table: &mut Table) {
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, value) = match line.split_once(char::is_whitespace) {
            Some((name, value)) => (name, value.trim()),
            None => (line, ""),
        };
        let name = column_label(name);
        let Some((label, index)) = name.split_once('.') else {
            debug!(line, "skipping walk line without index");
            continue;
        };
        let Ok(index) = index.parse::<u32>() else {
            debug!(line, "skipping walk line with non-numeric index");
            continue;
        };
        table.insert(index, label, unquote(value));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sentinels_are_recognised() {
        assert_eq!(
            ScalarResult::parse("No Such Object available on this agent at this OID"),
            ScalarResult::NoSuchObject
        );
        assert_eq!(
            ScalarResult::parse("No Such Instance currently exists at this OID"),
            ScalarResult::NoSuchInstance
        );
        assert_eq!(ScalarResult::parse("NOSUCHOBJECT"), ScalarResult::NoSuchObject);
        assert!(ScalarResult::parse("NOSUCHINSTANCE").is_missing());
    }

    #[test]
    fn scalar_values_are_unquoted() {
        assert_eq!(
            ScalarResult::parse("\"S4810\"\n"),
            ScalarResult::Value("S4810".to_string())
        );
        assert_eq!(ScalarResult::parse("2").value(), Some("2"));
    }

    #[test]
    fn parse_int_accepts_enum_rendering() {
        assert_eq!(parse_int("7"), Some(7));
        assert_eq!(parse_int("\"12\""), Some(12));
        assert_eq!(parse_int("down(2)"), Some(2));
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn column_label_strips_mib_module() {
        assert_eq!(
            column_label("DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitStatus"),
            "dellNetStackUnitStatus"
        );
        assert_eq!(column_label("chStackUnitUpTime"), "chStackUnitUpTime");
    }

    #[test]
    fn walk_output_is_grouped_by_index() {
        let mut table = Table::default();
        parse_walk_output(
            "dellNetStackUnitStatus.2 5\ndellNetStackUnitStatus.1 1\n",
            &mut table,
        );
        parse_walk_output(
            "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitUpTime.1 360000\n\
             dellNetStackUnitUpTime.2 10000\n",
            &mut table,
        );

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 1);
        assert_eq!(rows[0].1["dellNetStackUnitStatus"], "1");
        assert_eq!(rows[0].1["dellNetStackUnitUpTime"], "360000");
        assert_eq!(rows[1].0, 2);
        assert_eq!(rows[1].1["dellNetStackUnitStatus"], "5");
    }

    #[test]
    fn walk_output_skips_lines_without_index() {
        let mut table = Table::default();
        parse_walk_output(
            "chStackUnitStatus No Such Object available on this agent at this OID\n\n",
            &mut table,
        );
        assert!(table.is_empty());
    }

    fn session_with(program: &str) -> NetSnmpSession {
        let cfg = SnmpConfig {
            snmpget_path: program.to_string(),
            snmpwalk_path: program.to_string(),
            ..SnmpConfig::default()
        };
        NetSnmpSession::new("192.0.2.10", "public", cfg)
    }

    #[test]
    fn agent_address_wraps_ipv6() {
        assert_eq!(session_with("snmpget").agent(), "192.0.2.10:161");
        let v6 = NetSnmpSession::new("2001:db8::1", "public", SnmpConfig::default());
        assert_eq!(v6.agent(), "udp6:[2001:db8::1]:161");
    }

    #[tokio::test]
    async fn missing_tool_is_a_spawn_error() {
        let session = session_with("/nonexistent/snmpget");
        let err = session.get("SNMPv2-MIB::sysDescr.0").await.unwrap_err();
        assert!(matches!(err, SnmpError::Spawn { .. }));
    }

    #[tokio::test]
    async fn failing_tool_is_a_transport_error() {
        let session = session_with("false");
        let err = session.walk(&["SNMPv2-MIB::system"]).await.unwrap_err();
        assert!(matches!(err, SnmpError::Failed { .. }));
    }

    #[tokio::test]
    async fn get_int_rejects_sentinels_and_text() {
        let fake = testing::FakeSession::new()
            .with_result(".1.2.3", ScalarResult::NoSuchInstance)
            .with_value(".1.2.4", "S4810")
            .with_value(".1.2.5", "3");

        assert!(matches!(
            fake.get_int(".1.2.3").await,
            Err(SnmpError::Missing { .. })
        ));
        assert!(matches!(
            fake.get_int(".1.2.4").await,
            Err(SnmpError::NotAnInteger { .. })
        ));
        assert_eq!(fake.get_int(".1.2.5").await.unwrap(), 3);
    }
}

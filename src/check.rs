use crate::config::Thresholds;
use crate::schema::{select_schema, MgmtStatusSource, Schema, DEVICE_TYPE_STACK, OID_DEVICE_TYPE};
use crate::snmp::{column_label, parse_int, Row, SnmpError, SnmpSession};
use crate::status::{AggregateResult, Finding};
use crate::unit::{
    evaluate_unit, parse_timeticks, ComponentStatus, FanTray, MgmtStatus, PowerSupply, StackUnit,
    UnitOperStatus,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Snmp(#[from] SnmpError),
    #[error("stack-unit {unit} has no {field} value")]
    MissingField { unit: u32, field: &'static str },
    #[error("{what} has unexpected value '{value}'")]
    UnexpectedValue { what: String, value: String },
}

// Only stacked switches are evaluated; other device types report healthy.
pub async fn check_chassis<S: SnmpSession>(
    session: &S,
    policy: &Thresholds,
) -> Result<AggregateResult, CheckError> {
    let probe = session.get(OID_DEVICE_TYPE).await?;
    let device_type = probe
        .value()
        .and_then(parse_int)
        .ok_or_else(|| CheckError::UnexpectedValue {
            what: OID_DEVICE_TYPE.to_string(),
            value: format!("{probe:?}"),
        })?;

    if device_type != DEVICE_TYPE_STACK {
        info!(device_type, "device is not a stack, skipping unit checks");
        return Ok(AggregateResult::new());
    }

    check_units(session, &Schema::chassis(), policy).await
}

pub async fn check_mxl_chassis<S: SnmpSession>(
    session: &S,
    policy: &Thresholds,
) -> Result<AggregateResult, CheckError> {
    let probe = session.get(OID_DEVICE_TYPE).await?;
    let variant = select_schema(&probe);
    info!(?variant, "selected chassis schema");

    check_units(session, &Schema::for_variant(variant), policy).await
}

async fn check_units<S: SnmpSession>(
    session: &S,
    schema: &Schema,
    policy: &Thresholds,
) -> Result<AggregateResult, CheckError> {
    let units = collect_units(session, schema).await?;
    let mgmt_units = count_mgmt_units(&units);
    let evaluated: Vec<(StackUnit, Vec<Finding>)> = units
        .into_iter()
        .map(|unit| {
            let findings = evaluate_unit(&unit, policy);
            (unit, findings)
        })
        .collect();

    Ok(aggregate(&evaluated, mgmt_units))
}

pub fn count_mgmt_units(units: &[StackUnit]) -> usize {
    units
        .iter()
        .filter(|unit| unit.mgmt_status == MgmtStatus::Active)
        .count()
}

pub fn aggregate(
    per_unit: &[(StackUnit, Vec<Finding>)],
    mgmt_unit_count: usize,
) -> AggregateResult {
    let mut ordered: Vec<&(StackUnit, Vec<Finding>)> = per_unit.iter().collect();
    ordered.sort_by_key(|(unit, _)| unit.index);

    let result = ordered
        .into_iter()
        .flat_map(|(_, findings)| findings.iter().cloned())
        .collect::<AggregateResult>();

    match mgmt_unit_count {
        0 => result.fold(Finding::critical("No active management unit!")),
        1 => result,
        _ => result.fold(Finding::critical("More than one active management unit!")),
    }
}

pub async fn collect_units<S: SnmpSession>(
    session: &S,
    schema: &Schema,
) -> Result<Vec<StackUnit>, CheckError> {
    let expected = session.get(schema.num_stack_units).await?;
    let table = session.walk(&schema.unit_columns()).await?;

    if let Some(expected) = expected.value().and_then(parse_int) {
        if usize::try_from(expected).ok() != Some(table.len()) {
            warn!(
                expected,
                found = table.len(),
                "stack unit count differs from walked units"
            );
        }
    }

    let mut units = Vec::with_capacity(table.len());
    for (index, row) in table.rows() {
        units.push(collect_unit(session, schema, index, row).await?);
    }
    Ok(units)
}

async fn collect_unit<S: SnmpSession>(
    session: &S,
    schema: &Schema,
    index: u32,
    row: &Row,
) -> Result<StackUnit, CheckError> {
    let mgmt_status = match schema.mgmt_status {
        MgmtStatusSource::Column(column) => row
            .get(column_label(column))
            .and_then(|v| parse_int(v))
            .map(MgmtStatus::from_code)
            .unwrap_or(MgmtStatus::Unknown),
        MgmtStatusSource::PerUnit(base) => session
            .get(&format!("{base}.{index}"))
            .await?
            .value()
            .and_then(parse_int)
            .map(MgmtStatus::from_code)
            .unwrap_or(MgmtStatus::Unknown),
    };

    let status_label = schema.status_label();
    let status_raw = row.get(status_label).ok_or(CheckError::MissingField {
        unit: index,
        field: status_label,
    })?;
    let oper_status = parse_int(status_raw)
        .map(UnitOperStatus::from_code)
        .ok_or_else(|| CheckError::UnexpectedValue {
            what: format!("stack-unit {index} {status_label}"),
            value: status_raw.clone(),
        })?;

    let uptime_label = schema.uptime_label();
    let uptime_raw = row.get(uptime_label).ok_or(CheckError::MissingField {
        unit: index,
        field: uptime_label,
    })?;
    let uptime_seconds =
        parse_timeticks(uptime_raw).ok_or_else(|| CheckError::UnexpectedValue {
            what: format!("stack-unit {index} {uptime_label}"),
            value: uptime_raw.clone(),
        })?;

    let num_psus = component_count(session.get_int(&schema.num_psus_oid(index)).await?);
    let mut psus = Vec::new();
    for id in 1..=num_psus {
        let oper_status =
            ComponentStatus::from_code(session.get_int(&schema.psu_oper_oid(index, id)).await?);
        let usage_percent = match schema.psu_usage_oid(index, id) {
            Some(oid) => Some(session.get_int(&oid).await?),
            None => None,
        };
        psus.push(PowerSupply {
            id,
            oper_status,
            usage_percent,
        });
    }

    let num_fans = component_count(session.get_int(&schema.num_fans_oid(index)).await?);
    let mut fans = Vec::new();
    for id in 1..=num_fans {
        let oper_status =
            ComponentStatus::from_code(session.get_int(&schema.fan_oper_oid(index, id)).await?);
        fans.push(FanTray { id, oper_status });
    }

    let cpu_percent = match schema.cpu_usage_oid(index) {
        Some(oid) => Some(session.get_int(&oid).await?),
        None => None,
    };
    let mem_percent = match schema.mem_usage_oid(index) {
        Some(oid) => Some(session.get_int(&oid).await?),
        None => None,
    };

    debug!(
        unit = index,
        ?mgmt_status,
        ?oper_status,
        uptime = %humantime::format_duration(Duration::from_secs(uptime_seconds)),
        psus = num_psus,
        fans = num_fans,
        "collected stack unit"
    );

    Ok(StackUnit {
        index,
        mgmt_status,
        oper_status,
        uptime_seconds,
        psus,
        fans,
        cpu_percent,
        mem_percent,
    })
}

fn component_count(raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::testing::FakeSession;
    use crate::snmp::ScalarResult;
    use crate::status::Severity;

    const MODERN: &str = "DELL-NETWORKING-CHASSIS-MIB::";
    const LEGACY: &str = "F10-M-SERIES-CHASSIS-MIB::";

    fn healthy_modern_unit(fake: FakeSession, unit: u32, mgmt: i64) -> FakeSession {
        fake.with_column(&format!("{MODERN}dellNetStackUnitNumber"), unit, unit)
            .with_column(&format!("{MODERN}dellNetStackUnitStatus"), unit, 1)
            .with_column(&format!("{MODERN}dellNetStackUnitUpTime"), unit, 360_000)
            .with_column(&format!("{MODERN}dellNetStackUnitMgmtStatus"), unit, mgmt)
            .with_value(format!("{MODERN}dellNetStackUnitMgmtStatus.{unit}"), mgmt)
            .with_value(format!("{MODERN}dellNetStackUnitNumPowerSupplies.{unit}"), 1)
            .with_value(format!(".1.3.6.1.4.1.6027.3.26.1.4.6.1.4.2.{unit}.1"), 1)
            .with_value(format!(".1.3.6.1.4.1.6027.3.26.1.4.6.1.10.2.{unit}.1"), 10)
            .with_value(format!("{MODERN}dellNetStackUnitNumFanTrays.{unit}"), 1)
            .with_value(format!(".1.3.6.1.4.1.6027.3.26.1.4.7.1.4.2.{unit}.1"), 1)
            .with_value(format!(".1.3.6.1.4.1.6027.3.26.1.4.4.1.4.2.{unit}.1"), 50)
            .with_value(format!(".1.3.6.1.4.1.6027.3.26.1.4.4.1.6.2.{unit}.1"), 50)
    }

    fn stack_switch(units: u32) -> FakeSession {
        FakeSession::new()
            .with_value(OID_DEVICE_TYPE, DEVICE_TYPE_STACK)
            .with_value(format!("{MODERN}dellNetNumStackUnits.0"), units)
    }

    fn legacy_unit(fake: FakeSession, unit: u32, mgmt: i64) -> FakeSession {
        fake.with_column(&format!("{LEGACY}chStackUnitNumber"), unit, unit)
            .with_column(&format!("{LEGACY}chStackUnitStatus"), unit, 1)
            .with_column(&format!("{LEGACY}chStackUnitUpTime"), unit, 360_000)
            .with_value(format!("{LEGACY}chStackUnitMgmtStatus.{unit}"), mgmt)
            .with_value(format!("{LEGACY}chStackUnitNumPowerSupplies.{unit}"), 1)
            .with_value(format!("{LEGACY}chSysPowerSupplyOperStatus.{unit}.1"), 1)
            .with_value(format!("{LEGACY}chStackUnitNumFanTrays.{unit}"), 1)
            .with_value(format!("{LEGACY}chSysFanTrayOperStatus.{unit}.1"), 1)
    }

    fn unit_with(index: u32, mgmt: MgmtStatus) -> StackUnit {
        StackUnit {
            index,
            mgmt_status: mgmt,
            oper_status: UnitOperStatus::Ok,
            uptime_seconds: 3600,
            psus: vec![],
            fans: vec![],
            cpu_percent: None,
            mem_percent: None,
        }
    }

    #[test]
    fn management_unit_tally() {
        let none = aggregate(&[], 0);
        assert_eq!(none.severity, Severity::Critical);
        assert_eq!(none.messages, vec!["No active management unit!"]);

        let one = aggregate(&[], 1);
        assert_eq!(one, AggregateResult::new());

        let two = aggregate(&[], 2);
        assert_eq!(two.severity, Severity::Critical);
        assert_eq!(two.messages, vec!["More than one active management unit!"]);
    }

    #[test]
    fn aggregate_orders_by_unit_index_then_appends_global_check() {
        let per_unit = vec![
            (
                unit_with(2, MgmtStatus::Standby),
                vec![Finding::warning("unit two")],
            ),
            (
                unit_with(1, MgmtStatus::Standby),
                vec![Finding::critical("unit one a"), Finding::warning("unit one b")],
            ),
        ];
        let result = aggregate(&per_unit, 0);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(
            result.messages,
            vec![
                "unit one a",
                "unit one b",
                "unit two",
                "No active management unit!"
            ]
        );
    }

    #[test]
    fn mgmt_count_only_counts_active_units() {
        let units = vec![
            unit_with(1, MgmtStatus::Active),
            unit_with(2, MgmtStatus::Standby),
            unit_with(3, MgmtStatus::Unknown),
        ];
        assert_eq!(count_mgmt_units(&units), 1);
    }

    #[tokio::test]
    async fn healthy_single_unit_is_ok() {
        let fake = healthy_modern_unit(stack_switch(1), 1, 1);
        let result = check_chassis(&fake, &Thresholds::default()).await.unwrap();
        assert_eq!(result, AggregateResult::new());
    }

    #[tokio::test]
    async fn second_unit_down_is_critical() {
        let fake = healthy_modern_unit(stack_switch(2), 1, 1);
        let fake = healthy_modern_unit(fake, 2, 2)
            .with_column(&format!("{MODERN}dellNetStackUnitStatus"), 2, 5)
            .with_column(&format!("{MODERN}dellNetStackUnitUpTime"), 2, 10_000);

        let result = check_chassis(&fake, &Thresholds::default()).await.unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(
            result.messages,
            vec![
                "Stack-unit 2 is DOWN",
                "Stack-unit 2 uptime less than 600 seconds!"
            ]
        );
    }

    #[tokio::test]
    async fn chassis_reads_psu_usage() {
        let fake = healthy_modern_unit(stack_switch(1), 1, 1)
            .with_value(".1.3.6.1.4.1.6027.3.26.1.4.6.1.10.2.1.1", 80);
        let result = check_chassis(&fake, &Thresholds::default()).await.unwrap();
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.messages, vec!["Stack-unit 1 PSU 1 high PSU usage (80%)"]);
    }

    #[tokio::test]
    async fn chassis_skips_non_stack_devices() {
        let fake = FakeSession::new().with_value(OID_DEVICE_TYPE, 1);
        let result = check_chassis(&fake, &Thresholds::default()).await.unwrap();
        assert!(result.is_ok());
        assert!(!fake.was_queried("dellNetNumStackUnits"));
    }

    #[tokio::test]
    async fn chassis_rejects_missing_device_type() {
        let fake = FakeSession::new().with_result(OID_DEVICE_TYPE, ScalarResult::NoSuchObject);
        let err = check_chassis(&fake, &Thresholds::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::UnexpectedValue { .. }));
    }

    #[tokio::test]
    async fn unreachable_agent_is_fatal() {
        let fake = FakeSession::new();
        let err = check_mxl_chassis(&fake, &Thresholds::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Snmp(_)));
    }

    #[tokio::test]
    async fn failure_mid_run_aborts_without_result() {
        let fake = healthy_modern_unit(stack_switch(1), 1, 1);
        // No fan tray count for unit 2.
        let fake = fake
            .with_column(&format!("{MODERN}dellNetStackUnitNumber"), 2, 2)
            .with_column(&format!("{MODERN}dellNetStackUnitStatus"), 2, 1)
            .with_column(&format!("{MODERN}dellNetStackUnitUpTime"), 2, 360_000)
            .with_column(&format!("{MODERN}dellNetStackUnitMgmtStatus"), 2, 2)
            .with_value(format!("{MODERN}dellNetStackUnitNumPowerSupplies.2"), 0);

        let err = check_chassis(&fake, &Thresholds::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Snmp(SnmpError::Failed { .. })));
    }

    #[tokio::test]
    async fn mxl_modern_uses_per_unit_mgmt_status_and_cpu() {
        let fake = healthy_modern_unit(FakeSession::new(), 1, 1)
            .with_value(OID_DEVICE_TYPE, 4)
            .with_value(format!("{MODERN}dellNetNumStackUnits.0"), 1)
            .with_value(".1.3.6.1.4.1.6027.3.26.1.4.4.1.4.2.1.1", 97);

        let result = check_mxl_chassis(&fake, &Thresholds::default())
            .await
            .unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.messages, vec!["Stack-unit 1 high CPU usage (97%)"]);
        assert!(fake.was_queried("dellNetStackUnitMgmtStatus.1"));
        // PSU usage is not part of the MXL check.
        assert!(!fake.was_queried(".1.3.6.1.4.1.6027.3.26.1.4.6.1.10.2"));
    }

    #[tokio::test]
    async fn mxl_legacy_skips_cpu_and_memory() {
        let fake = FakeSession::new()
            .with_result(OID_DEVICE_TYPE, ScalarResult::NoSuchObject)
            .with_value(format!("{LEGACY}chNumStackUnits.0"), 2);
        let fake = legacy_unit(legacy_unit(fake, 1, 1), 2, 2);

        let result = check_mxl_chassis(&fake, &Thresholds::default())
            .await
            .unwrap();
        assert_eq!(result, AggregateResult::new());
        assert!(!fake.was_queried(".1.3.6.1.4.1.6027.3.26.1.4.4.1"));
        assert!(!fake.was_queried("dellNetStackUnit"));
    }

    #[tokio::test]
    async fn mxl_legacy_reports_two_management_units() {
        let fake = FakeSession::new()
            .with_result(OID_DEVICE_TYPE, ScalarResult::NoSuchInstance)
            .with_value(format!("{LEGACY}chNumStackUnits.0"), 2);
        let fake = legacy_unit(legacy_unit(fake, 1, 1), 2, 1)
            .with_value(format!("{LEGACY}chSysFanTrayOperStatus.2.1"), 3);

        let result = check_mxl_chassis(&fake, &Thresholds::default())
            .await
            .unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(
            result.messages,
            vec![
                "Stack-unit 2 Fan 1 absent",
                "More than one active management unit!"
            ]
        );
    }

    #[tokio::test]
    async fn huge_psu_count_fails_on_first_query() {
        let fake = stack_switch(1)
            .with_column(&format!("{MODERN}dellNetStackUnitNumber"), 1, 1)
            .with_column(&format!("{MODERN}dellNetStackUnitStatus"), 1, 1)
            .with_column(&format!("{MODERN}dellNetStackUnitUpTime"), 1, 360_000)
            .with_column(&format!("{MODERN}dellNetStackUnitMgmtStatus"), 1, 1)
            .with_value(
                format!("{MODERN}dellNetStackUnitNumPowerSupplies.1"),
                u32::MAX,
            );

        let err = check_chassis(&fake, &Thresholds::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Snmp(SnmpError::Failed { .. })));
        assert!(fake.was_queried(".1.3.6.1.4.1.6027.3.26.1.4.6.1.4.2.1.1"));
    }

    #[tokio::test]
    async fn missing_status_column_is_fatal() {
        let fake = stack_switch(1)
            .with_column(&format!("{MODERN}dellNetStackUnitUpTime"), 1, 360_000)
            .with_column(&format!("{MODERN}dellNetStackUnitMgmtStatus"), 1, 1);
        let err = check_chassis(&fake, &Thresholds::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckError::MissingField {
                unit: 1,
                field: "dellNetStackUnitStatus"
            }
        ));
    }
}

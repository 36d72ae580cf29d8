use crate::snmp::{column_label, ScalarResult};

pub const OID_DEVICE_TYPE: &str = "DELL-NETWORKING-CHASSIS-MIB::dellNetDeviceType.0";

pub const DEVICE_TYPE_STACK: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    // DELL-NETWORKING-CHASSIS-MIB
    Modern,
    // F10-M-SERIES-CHASSIS-MIB, no CPU or memory objects
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MgmtStatusSource {
    Column(&'static str),
    PerUnit(&'static str),
}

// `*_base` fields get the unit index (and PSU/fan id) appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub variant: SchemaVariant,
    pub num_stack_units: &'static str,
    pub unit_number_column: &'static str,
    pub unit_status_column: &'static str,
    pub unit_uptime_column: &'static str,
    pub mgmt_status: MgmtStatusSource,
    pub num_psus_base: &'static str,
    pub num_fans_base: &'static str,
    pub psu_oper_base: &'static str,
    pub psu_usage_base: Option<&'static str>,
    pub fan_oper_base: &'static str,
    pub cpu_usage_base: Option<&'static str>,
    pub mem_usage_base: Option<&'static str>,
}

impl Schema {
    pub fn chassis() -> Self {
        Self {
            mgmt_status: MgmtStatusSource::Column(
                "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitMgmtStatus",
            ),
            psu_usage_base: Some(".1.3.6.1.4.1.6027.3.26.1.4.6.1.10.2"),
            ..Self::modern()
        }
    }

    pub fn modern() -> Self {
        Self {
            variant: SchemaVariant::Modern,
            num_stack_units: "DELL-NETWORKING-CHASSIS-MIB::dellNetNumStackUnits.0",
            unit_number_column: "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitNumber",
            unit_status_column: "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitStatus",
            unit_uptime_column: "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitUpTime",
            mgmt_status: MgmtStatusSource::PerUnit(
                "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitMgmtStatus",
            ),
            num_psus_base: "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitNumPowerSupplies",
            num_fans_base: "DELL-NETWORKING-CHASSIS-MIB::dellNetStackUnitNumFanTrays",
            // dellNetPowerSupplyOperStatus
            psu_oper_base: ".1.3.6.1.4.1.6027.3.26.1.4.6.1.4.2",
            psu_usage_base: None,
            // dellNetFanTrayOperStatus
            fan_oper_base: ".1.3.6.1.4.1.6027.3.26.1.4.7.1.4.2",
            // dellNetCpuUtil1Min
            cpu_usage_base: Some(".1.3.6.1.4.1.6027.3.26.1.4.4.1.4.2"),
            // dellNetCpuUtilMemUsage
            mem_usage_base: Some(".1.3.6.1.4.1.6027.3.26.1.4.4.1.6.2"),
        }
    }

    pub fn legacy() -> Self {
        Self {
            variant: SchemaVariant::Legacy,
            num_stack_units: "F10-M-SERIES-CHASSIS-MIB::chNumStackUnits.0",
            unit_number_column: "F10-M-SERIES-CHASSIS-MIB::chStackUnitNumber",
            unit_status_column: "F10-M-SERIES-CHASSIS-MIB::chStackUnitStatus",
            unit_uptime_column: "F10-M-SERIES-CHASSIS-MIB::chStackUnitUpTime",
            mgmt_status: MgmtStatusSource::PerUnit(
                "F10-M-SERIES-CHASSIS-MIB::chStackUnitMgmtStatus",
            ),
            num_psus_base: "F10-M-SERIES-CHASSIS-MIB::chStackUnitNumPowerSupplies",
            num_fans_base: "F10-M-SERIES-CHASSIS-MIB::chStackUnitNumFanTrays",
            psu_oper_base: "F10-M-SERIES-CHASSIS-MIB::chSysPowerSupplyOperStatus",
            psu_usage_base: None,
            fan_oper_base: "F10-M-SERIES-CHASSIS-MIB::chSysFanTrayOperStatus",
            cpu_usage_base: None,
            mem_usage_base: None,
        }
    }

    pub fn for_variant(variant: SchemaVariant) -> Self {
        match variant {
            SchemaVariant::Modern => Self::modern(),
            SchemaVariant::Legacy => Self::legacy(),
        }
    }

    pub fn unit_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![
            self.unit_number_column,
            self.unit_status_column,
            self.unit_uptime_column,
        ];
        if let MgmtStatusSource::Column(column) = self.mgmt_status {
            columns.push(column);
        }
        columns
    }

    pub fn status_label(&self) -> &'static str {
        column_label(self.unit_status_column)
    }

    pub fn uptime_label(&self) -> &'static str {
        column_label(self.unit_uptime_column)
    }

    pub fn num_psus_oid(&self, unit: u32) -> String {
        format!("{}.{unit}", self.num_psus_base)
    }

    pub fn num_fans_oid(&self, unit: u32) -> String {
        format!("{}.{unit}", self.num_fans_base)
    }

    pub fn psu_oper_oid(&self, unit: u32, psu: u32) -> String {
        format!("{}.{unit}.{psu}", self.psu_oper_base)
    }

    pub fn psu_usage_oid(&self, unit: u32, psu: u32) -> Option<String> {
        self.psu_usage_base.map(|base| format!("{base}.{unit}.{psu}"))
    }

    pub fn fan_oper_oid(&self, unit: u32, fan: u32) -> String {
        format!("{}.{unit}.{fan}", self.fan_oper_base)
    }

    pub fn cpu_usage_oid(&self, unit: u32) -> Option<String> {
        self.cpu_usage_base.map(|base| format!("{base}.{unit}.1"))
    }

    pub fn mem_usage_oid(&self, unit: u32) -> Option<String> {
        self.mem_usage_base.map(|base| format!("{base}.{unit}.1"))
    }
}

// Legacy firmware does not know dellNetDeviceType.
pub fn select_schema(device_type_probe: &ScalarResult) -> SchemaVariant {
    if device_type_probe.is_missing() {
        SchemaVariant::Legacy
    } else {
        SchemaVariant::Modern
    }
}

pub mod check;
pub mod cli;
pub mod config;
pub mod report;
pub mod schema;
pub mod snmp;
pub mod status;
pub mod unit;

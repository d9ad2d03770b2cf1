//! Concrete adapter implementations for the ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod risk_zones;

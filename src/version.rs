// Build-time version from Cargo.toml

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Version of the aggregation logic, stamped on every stored report.
/// Bump when the meaning of any report field changes.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

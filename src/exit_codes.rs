//! Exit code standardization for fleetcmp
//!
//! ## Exit Code Convention
//!
//! - `0` = Success
//! - `1` = User error (invalid constraint, offline mode without a usable cache)
//! - `2` = System error (download failure, malformed pricing document, I/O)
//! - `3` = Configuration error (config parse error, invalid config value)

use crate::error::FleetError;

/// Standard exit codes for fleetcmp
pub mod codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// User error (invalid input, validation failure)
    pub const USER_ERROR: i32 = 1;
    /// System error (network error, malformed document)
    pub const SYSTEM_ERROR: i32 = 2;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map a FleetError to an appropriate exit code
pub fn exit_code_for_error(error: &FleetError) -> i32 {
    use FleetError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        Validation { .. } => codes::USER_ERROR,
        CacheUnusable { .. } => codes::USER_ERROR,

        Transport { .. } => codes::SYSTEM_ERROR,
        Retryable { .. } => codes::SYSTEM_ERROR,
        Decode { .. } => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Exit code for an error that reached `main`.
///
/// Errors that did not originate in the library (argument parsing, context-only
/// anyhow errors) count as system errors.
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<FleetError>())
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}

//! Version information.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` sent upstream when none is configured: `cambio/{version}`.
pub fn default_user_agent() -> String {
    format!("cambio/{PKG_VERSION}")
}

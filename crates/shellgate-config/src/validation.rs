//! Configuration validation.
//!
//! Collects every problem into a single `ConfigError::ValidationError` so a
//! user fixing their file sees all of them at once. Whether the shell and
//! working directory actually exist is checked later, when the terminal
//! manager initializes.

use crate::schema::ShellgateConfig;
use shellgate_common::ConfigError;

/// Highest base port that still leaves room for the extra-tab range.
pub const MAX_BASE_PORT: u16 = u16::MAX - 5;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ShellgateConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if config.terminal.shell.trim().is_empty() {
        errors.push("terminal.shell must not be empty".into());
    }
    if config.terminal.working_directory.as_os_str().is_empty() {
        errors.push("terminal.working_directory must not be empty".into());
    }
    // 0 asks the OS for an ephemeral port.
    validate_range(
        &mut errors,
        "terminal.port",
        u64::from(config.terminal.port),
        0,
        u64::from(MAX_BASE_PORT),
    );
    for key in config.terminal.env.keys() {
        if key.is_empty() || key.contains('=') {
            errors.push(format!("terminal.env key {key:?} is not a valid variable name"));
        }
    }

    if config.server.bind_address.trim().is_empty() {
        errors.push("server.bind_address must not be empty".into());
    }
    if !config.server.path.starts_with('/') {
        errors.push(format!(
            "server.path = {:?} must start with '/'",
            config.server.path
        ));
    }
    validate_range(
        &mut errors,
        "server.shutdown_grace_ms",
        config.server.shutdown_grace_ms,
        100,
        60_000,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

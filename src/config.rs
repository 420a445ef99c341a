use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::optimizer::SolveOptions;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub solver: SolverConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            solver: SolverConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("BIN_SOLVER_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse BIN_SOLVER_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("BIN_SOLVER_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ BIN_SOLVER_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse BIN_SOLVER_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the solve pipeline.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    options: SolveOptions,
}

impl SolverConfig {
    const TIME_LIMIT_VAR: &'static str = "BIN_SOLVER_TIME_LIMIT_MS";
    const IMBALANCE_RATIO_VAR: &'static str = "BIN_SOLVER_IMBALANCE_WARNING_RATIO";

    fn from_env() -> Self {
        let time_limit_ms = load_u64_with_warning(
            Self::TIME_LIMIT_VAR,
            SolveOptions::DEFAULT_TIME_LIMIT_MS,
            |value| value > 0,
            "must be greater than 0",
            "Warning: A short time limit may leave harder instances unsolved",
        );

        let imbalance_warning_ratio = load_f64_with_warning(
            Self::IMBALANCE_RATIO_VAR,
            SolveOptions::DEFAULT_IMBALANCE_WARNING_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Warning: Adjusted imbalance threshold changes when balance warnings fire",
        );

        let options = SolveOptions::builder()
            .time_limit_ms(time_limit_ms)
            .imbalance_warning_ratio(imbalance_warning_ratio)
            .build();

        Self { options }
    }

    /// Returns the configured SolveOptions.
    pub fn solve_options(&self) -> SolveOptions {
        self.options
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

fn load_u64_with_warning(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> u64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    if value != default {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_f64_accepts_valid_values() {
        // No env var set: the default wins.
        let value = load_f64_with_warning(
            "BIN_SOLVER_TEST_UNSET_F64",
            0.15,
            |v| (0.0..=1.0).contains(&v),
            "must be between 0 and 1",
            "unused",
        );
        assert!((value - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_load_u64_accepts_valid_values() {
        let value = load_u64_with_warning(
            "BIN_SOLVER_TEST_UNSET_U64",
            10_000,
            |v| v > 0,
            "must be greater than 0",
            "unused",
        );
        assert_eq!(value, 10_000);
    }

    #[test]
    fn test_solve_options_defaults() {
        let options = SolveOptions::default();
        assert_eq!(options.time_limit_ms, SolveOptions::DEFAULT_TIME_LIMIT_MS);
        assert!(
            (options.imbalance_warning_ratio - SolveOptions::DEFAULT_IMBALANCE_WARNING_RATIO)
                .abs()
                < 1e-12
        );
    }
}

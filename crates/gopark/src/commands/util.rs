//! Shared helpers for command handlers.

use gopark_config::Config;

use crate::error::CliError;

/// Gate from `--gate`, falling back to `default_gate` in config.
pub fn resolve_gate(flag: Option<&str>, config: &Config) -> Result<String, CliError> {
    flag.or(config.default_gate.as_deref())
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_owned)
        .ok_or(CliError::NoGate)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Two-decimal money amount.
pub fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_default_gate() {
        let config = Config {
            default_gate: Some("gate_1".into()),
            ..Config::default()
        };
        assert_eq!(resolve_gate(Some("gate_2"), &config).unwrap(), "gate_2");
        assert_eq!(resolve_gate(None, &config).unwrap(), "gate_1");
    }

    #[test]
    fn missing_gate_is_a_usage_error() {
        let err = resolve_gate(Some("  "), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoGate));
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(money(6.0), "6.00");
        assert_eq!(money(2.346), "2.35");
    }
}

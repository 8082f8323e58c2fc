//! Minimal TOML reader for intercom configuration
//!
//! Handles only the subset the device configuration uses:
//!
//! - A single `[intercom]` section
//! - `key = value` pairs with decimal or `0x` hex integers
//! - Comments (`# ...`), full-line or trailing
//!
//! Anything else is rejected rather than ignored.

use super::types::{ConfigError, ConfigValues, EngineConfig};

/// Parse and validate a configuration document
pub fn parse_config(input: &str) -> Result<EngineConfig, ConfigError> {
    parse_values(input)?.validate()
}

/// Parse a configuration document without validating it
pub fn parse_values(input: &str) -> Result<ConfigValues, ConfigError> {
    let mut values = ConfigValues::default();
    let mut in_section = false;

    for line in input.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if !line.ends_with(']') || line[1..line.len() - 1].trim() != "intercom" {
                return Err(ConfigError::InvalidSection);
            }
            in_section = true;
            continue;
        }

        if !in_section {
            return Err(ConfigError::InvalidSection);
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::InvalidValue)?;
        let value = parse_int(value)?;

        match key {
            "intercom_id" => values.intercom_id = Some(value),
            "concierge_id" => values.concierge_id = value,
            "call_alert_duration_ms" => values.call_alert_duration_ms = value,
            "unlock_timeout_ms" => values.unlock_timeout_ms = value,
            "command_delay_ms" => values.command_delay_ms = value,
            "bus_release_delay_ms" => values.bus_release_delay_ms = value,
            "inter_byte_timeout_ms" => values.inter_byte_timeout_ms = value,
            _ => return Err(ConfigError::UnknownKey),
        }
    }

    Ok(values)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a decimal or `0x` prefixed hex integer
fn parse_int(value: &str) -> Result<u32, ConfigError> {
    let parsed = if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse()
    };
    parsed.map_err(|_| ConfigError::InvalidValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Flat 12, second floor
[intercom]
intercom_id = 0x12
concierge_id = 0   # no concierge
call_alert_duration_ms = 3000
command_delay_ms = 600
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.identity().intercom_id(), 0x12);
        assert_eq!(config.identity().concierge_id(), None);
        assert_eq!(config.call_alert_duration_ms(), 3000);
        assert_eq!(config.command_delay_ms(), 600);
        // untouched keys keep their defaults
        assert_eq!(config.unlock_timeout_ms(), 1000);
        assert_eq!(config.bus_release_delay_ms(), 4000);
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("0x2A"), Ok(42));
        assert_eq!(parse_int("0X2a"), Ok(42));
        assert_eq!(parse_int("-1"), Err(ConfigError::InvalidValue));
        assert_eq!(parse_int("\"12\""), Err(ConfigError::InvalidValue));
    }

    #[test]
    fn test_unknown_key() {
        let input = "[intercom]\nintercom_id = 1\nvolume = 3\n";
        assert_eq!(parse_values(input), Err(ConfigError::UnknownKey));
    }

    #[test]
    fn test_key_outside_section() {
        assert_eq!(parse_values("intercom_id = 1"), Err(ConfigError::InvalidSection));
        assert_eq!(
            parse_values("[door]\nintercom_id = 1"),
            Err(ConfigError::InvalidSection)
        );
    }

    #[test]
    fn test_delay_below_floor_rejected() {
        let input = "[intercom]\nintercom_id = 1\ncommand_delay_ms = 100\n";
        assert_eq!(parse_config(input), Err(ConfigError::CommandDelayBelowFloor));
    }

    #[test]
    fn test_missing_intercom_id() {
        assert_eq!(parse_config("[intercom]\n"), Err(ConfigError::MissingIntercomId));
    }

    #[test]
    fn test_malformed_line() {
        assert_eq!(
            parse_values("[intercom]\nintercom_id\n"),
            Err(ConfigError::InvalidValue)
        );
    }
}

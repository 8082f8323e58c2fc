//! Configuration type definitions

use unobus_protocol::{DeviceIdentity, DEFAULT_INTER_BYTE_TIMEOUT_MS, NO_ADDRESS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Protocol floor on the gap between two transmissions
///
/// Part of the shared-bus arbitration contract; never configurable lower.
pub const MIN_COMMAND_DELAY_MS: u32 = 500;

pub const DEFAULT_COMMAND_DELAY_MS: u32 = 500;
pub const DEFAULT_CALL_ALERT_DURATION_MS: u32 = 2000;
pub const DEFAULT_UNLOCK_TIMEOUT_MS: u32 = 1000;
pub const DEFAULT_BUS_RELEASE_DELAY_MS: u32 = 4000;

/// Highest bus address
pub const MAX_ADDRESS: u32 = 0xFF;

/// Configuration errors
///
/// All of these are fatal: the engine refuses to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `intercom_id` was not given
    MissingIntercomId,
    /// An address is outside 0x00–0xFF
    AddressOutOfRange,
    /// `command_delay_ms` is below [`MIN_COMMAND_DELAY_MS`]
    CommandDelayBelowFloor,
    /// A duration that must be positive is zero
    ZeroDuration,
    /// A value could not be parsed
    InvalidValue,
    /// Key not recognized
    UnknownKey,
    /// Invalid or unknown section header
    InvalidSection,
}

/// Raw configuration values, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ConfigValues {
    /// Address of this intercom unit (required)
    pub intercom_id: Option<u32>,
    /// Address of the concierge unit, 0 disables concierge forwarding
    pub concierge_id: u32,
    /// How long the calling alert stays on after the last call frame
    pub call_alert_duration_ms: u32,
    /// Length of the door strike pulse
    pub unlock_timeout_ms: u32,
    /// Minimum gap between transmitted commands
    pub command_delay_ms: u32,
    /// Wait after an unlock before releasing the bus
    pub bus_release_delay_ms: u32,
    /// Line silence that closes a frame
    pub inter_byte_timeout_ms: u32,
}

impl Default for ConfigValues {
    fn default() -> Self {
        Self {
            intercom_id: None,
            concierge_id: NO_ADDRESS as u32,
            call_alert_duration_ms: DEFAULT_CALL_ALERT_DURATION_MS,
            unlock_timeout_ms: DEFAULT_UNLOCK_TIMEOUT_MS,
            command_delay_ms: DEFAULT_COMMAND_DELAY_MS,
            bus_release_delay_ms: DEFAULT_BUS_RELEASE_DELAY_MS,
            inter_byte_timeout_ms: DEFAULT_INTER_BYTE_TIMEOUT_MS,
        }
    }
}

impl ConfigValues {
    /// Check every value and build the engine configuration
    ///
    /// Values below the command delay floor are an error, never clamped.
    pub fn validate(self) -> Result<EngineConfig, ConfigError> {
        let intercom_id = self.intercom_id.ok_or(ConfigError::MissingIntercomId)?;
        let intercom_id = to_address(intercom_id)?;
        let concierge_id = to_address(self.concierge_id)?;

        if self.command_delay_ms < MIN_COMMAND_DELAY_MS {
            return Err(ConfigError::CommandDelayBelowFloor);
        }
        if self.call_alert_duration_ms == 0
            || self.unlock_timeout_ms == 0
            || self.inter_byte_timeout_ms == 0
        {
            return Err(ConfigError::ZeroDuration);
        }

        Ok(EngineConfig {
            identity: DeviceIdentity::new(intercom_id, concierge_id),
            call_alert_duration_ms: self.call_alert_duration_ms,
            unlock_timeout_ms: self.unlock_timeout_ms,
            command_delay_ms: self.command_delay_ms,
            bus_release_delay_ms: self.bus_release_delay_ms,
            inter_byte_timeout_ms: self.inter_byte_timeout_ms,
        })
    }
}

fn to_address(value: u32) -> Result<u8, ConfigError> {
    if value > MAX_ADDRESS {
        return Err(ConfigError::AddressOutOfRange);
    }
    Ok(value as u8)
}

/// Validated engine configuration
///
/// Immutable once built; only [`ConfigValues::validate`] creates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    identity: DeviceIdentity,
    call_alert_duration_ms: u32,
    unlock_timeout_ms: u32,
    command_delay_ms: u32,
    bus_release_delay_ms: u32,
    inter_byte_timeout_ms: u32,
}

impl EngineConfig {
    /// Default settings for the given intercom address
    pub fn new(intercom_id: u8) -> Self {
        Self {
            identity: DeviceIdentity::new(intercom_id, NO_ADDRESS),
            call_alert_duration_ms: DEFAULT_CALL_ALERT_DURATION_MS,
            unlock_timeout_ms: DEFAULT_UNLOCK_TIMEOUT_MS,
            command_delay_ms: DEFAULT_COMMAND_DELAY_MS,
            bus_release_delay_ms: DEFAULT_BUS_RELEASE_DELAY_MS,
            inter_byte_timeout_ms: DEFAULT_INTER_BYTE_TIMEOUT_MS,
        }
    }

    /// Start a builder from the defaults for the given intercom address
    pub fn builder(intercom_id: u8) -> ConfigBuilder {
        ConfigBuilder {
            values: ConfigValues {
                intercom_id: Some(intercom_id as u32),
                ..Default::default()
            },
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn call_alert_duration_ms(&self) -> u32 {
        self.call_alert_duration_ms
    }

    pub fn unlock_timeout_ms(&self) -> u32 {
        self.unlock_timeout_ms
    }

    pub fn command_delay_ms(&self) -> u32 {
        self.command_delay_ms
    }

    pub fn bus_release_delay_ms(&self) -> u32 {
        self.bus_release_delay_ms
    }

    pub fn inter_byte_timeout_ms(&self) -> u32 {
        self.inter_byte_timeout_ms
    }
}

/// Chained construction of an [`EngineConfig`]
///
/// `build` runs the same validation as parsed configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    values: ConfigValues,
}

impl ConfigBuilder {
    pub fn concierge_id(mut self, id: u8) -> Self {
        self.values.concierge_id = id as u32;
        self
    }

    pub fn call_alert_duration_ms(mut self, ms: u32) -> Self {
        self.values.call_alert_duration_ms = ms;
        self
    }

    pub fn unlock_timeout_ms(mut self, ms: u32) -> Self {
        self.values.unlock_timeout_ms = ms;
        self
    }

    pub fn command_delay_ms(mut self, ms: u32) -> Self {
        self.values.command_delay_ms = ms;
        self
    }

    pub fn bus_release_delay_ms(mut self, ms: u32) -> Self {
        self.values.bus_release_delay_ms = ms;
        self
    }

    pub fn inter_byte_timeout_ms(mut self, ms: u32) -> Self {
        self.values.inter_byte_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        self.values.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(intercom_id: u32) -> ConfigValues {
        ConfigValues {
            intercom_id: Some(intercom_id),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = values(0x10).validate().unwrap();
        assert_eq!(config, EngineConfig::new(0x10));
        assert_eq!(config.identity().concierge_id(), None);
        assert_eq!(config.call_alert_duration_ms(), 2000);
        assert_eq!(config.unlock_timeout_ms(), 1000);
        assert_eq!(config.command_delay_ms(), 500);
    }

    #[test]
    fn test_missing_intercom_id() {
        assert_eq!(
            ConfigValues::default().validate(),
            Err(ConfigError::MissingIntercomId)
        );
    }

    #[test]
    fn test_address_out_of_range() {
        assert_eq!(values(0x100).validate(), Err(ConfigError::AddressOutOfRange));
        assert!(values(0x00).validate().is_ok());

        let mut v = values(0x10);
        v.concierge_id = 0x1FF;
        assert_eq!(v.validate(), Err(ConfigError::AddressOutOfRange));
    }

    #[test]
    fn test_command_delay_floor_not_clamped() {
        let mut v = values(0x10);
        v.command_delay_ms = 499;
        assert_eq!(v.validate(), Err(ConfigError::CommandDelayBelowFloor));

        v.command_delay_ms = 750;
        assert_eq!(v.validate().unwrap().command_delay_ms(), 750);
    }

    #[test]
    fn test_zero_durations() {
        let mut v = values(0x10);
        v.unlock_timeout_ms = 0;
        assert_eq!(v.validate(), Err(ConfigError::ZeroDuration));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder(0x10)
            .concierge_id(0x20)
            .unlock_timeout_ms(1500)
            .build()
            .unwrap();
        assert_eq!(config.identity().command_target(), 0x20);
        assert_eq!(config.unlock_timeout_ms(), 1500);

        let result = EngineConfig::builder(0x10).command_delay_ms(250).build();
        assert_eq!(result, Err(ConfigError::CommandDelayBelowFloor));
    }

    #[test]
    fn test_concierge_enabled() {
        let mut v = values(0x10);
        v.concierge_id = 0x20;
        let config = v.validate().unwrap();
        assert_eq!(config.identity().concierge_id(), Some(0x20));
    }
}

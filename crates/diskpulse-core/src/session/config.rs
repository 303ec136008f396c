/// Session tuning knobs.
use crate::analysis::BreakdownConfig;
use crate::error::ConfigError;
use crate::scanner::SESSION_CHANNEL_CAPACITY;

/// Maximum number of channel messages handled per [`super::Session::process_messages`] call.
///
/// Keeps a large backlog (a whole subtree resolving at once) from stalling the
/// caller's frame for a perceptible duration.
pub const DEFAULT_MESSAGES_PER_PUMP: usize = 300;

/// Maximum number of unmatched size updates remembered while a listing is
/// outstanding.
pub const DEFAULT_MAX_PARKED_UPDATES: usize = 65_536;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub breakdown: BreakdownConfig,
    pub messages_per_pump: usize,
    pub channel_capacity: usize,
    pub max_parked_updates: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            breakdown: BreakdownConfig::default(),
            messages_per_pump: DEFAULT_MESSAGES_PER_PUMP,
            channel_capacity: SESSION_CHANNEL_CAPACITY,
            max_parked_updates: DEFAULT_MAX_PARKED_UPDATES,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.breakdown.validate()?;
        if self.messages_per_pump == 0 {
            return Err(ConfigError::ZeroMessageBudget);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let cfg = SessionConfig {
            messages_per_pump: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMessageBudget));
    }
}

//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges. Every violation is
//! reported, not just the first one.

use thiserror::Error;

use crate::config::schema::IntercomConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("listener.port must be non-zero")]
    ZeroPort,

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("audio.quiet_tail_secs must be a finite, non-negative number")]
    InvalidQuietTail,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &IntercomConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    let positive: [(&'static str, u64); 13] = [
        ("listener.max_clients", config.listener.max_clients as u64),
        ("listener.backlog", config.listener.backlog as u64),
        ("keepalive.idle_secs", config.keepalive.idle_secs),
        ("keepalive.interval_secs", config.keepalive.interval_secs),
        ("keepalive.probe_count", config.keepalive.probe_count as u64),
        ("timeouts.accept_ms", config.timeouts.accept_ms),
        ("timeouts.read_ms", config.timeouts.read_ms),
        ("audio.chunk_size", config.audio.chunk_size as u64),
        ("reply.attempts", config.reply.attempts as u64),
        ("reply.read_timeout_ms", config.reply.read_timeout_ms),
        ("reply.send_timeout_ms", config.reply.send_timeout_ms),
        ("recognizer.timeout_secs", config.recognizer.timeout_secs),
        ("speech.timeout_secs", config.speech.timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }

    if config.audio.sample_rate == 0 {
        errors.push(ValidationError::NotPositive { field: "audio.sample_rate" });
    }
    if config.audio.gain_factor <= 0 {
        errors.push(ValidationError::NotPositive { field: "audio.gain_factor" });
    }

    let tail = config.audio.quiet_tail_secs;
    if !tail.is_finite() || tail < 0.0 {
        errors.push(ValidationError::InvalidQuietTail);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_unset(command: Option<&str>) -> bool {
    command.map_or(true, |c| c.trim().is_empty())
}

/// Settings that pass validation but leave the server unable to do its job.
/// Logged at startup.
pub fn config_warnings(config: &IntercomConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if is_unset(config.recognizer.command.as_deref()) {
        warnings.push("recognizer.command is not set, every session will close as soon as it opens");
    }
    if is_unset(config.speech.command.as_deref()) {
        warnings.push("speech.command is not set, only responses found in speech.offline_dir are spoken");
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&IntercomConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_violation() {
        let mut config = IntercomConfig::default();
        config.listener.port = 0;
        config.audio.chunk_size = 0;
        config.reply.attempts = 0;
        config.audio.quiet_tail_secs = f32::NAN;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::NotPositive { field: "audio.chunk_size" }));
        assert!(errors.contains(&ValidationError::NotPositive { field: "reply.attempts" }));
        assert!(errors.contains(&ValidationError::InvalidQuietTail));
    }

    #[test]
    fn empty_host_rejected() {
        let mut config = IntercomConfig::default();
        config.listener.host = "  ".into();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::EmptyHost]));
    }

    #[test]
    fn missing_commands_are_warned_about() {
        let mut config = IntercomConfig::default();
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("recognizer.command"));

        config.recognizer.command = Some("vosk-intent".into());
        config.speech.command = Some(" ".into());
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("speech.command"));

        config.speech.command = Some("espeak-mp3".into());
        assert!(config_warnings(&config).is_empty());
    }

    #[test]
    fn zero_collaborator_timeouts_rejected() {
        let mut config = IntercomConfig::default();
        config.recognizer.timeout_secs = 0;
        config.reply.send_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::NotPositive { field: "recognizer.timeout_secs" }));
        assert!(errors.contains(&ValidationError::NotPositive { field: "reply.send_timeout_ms" }));
    }
}

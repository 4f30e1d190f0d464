//! Master switch: one boolean parameter that can halt every mutating action.

use membra_core::constants::MASTER_SWITCH_PARAM;
use membra_core::error::MembraError;
use membra_core::host::ConfigStore;
use tracing::warn;

/// Parse a switch value. Accepts `true|1|on` and `false|0|off`, any case.
pub fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Current switch position, `None` when unset, unreadable or unparseable.
pub fn master_switch<C: ConfigStore + ?Sized>(config: &C) -> Option<bool> {
    match config.read_parameter(MASTER_SWITCH_PARAM) {
        Ok(Some(raw)) => {
            let parsed = parse_switch(&raw);
            if parsed.is_none() {
                warn!(value = %raw, "master switch value not recognised; treating as enabled");
            }
            parsed
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "master switch unreadable; treating as enabled");
            None
        }
    }
}

/// Fails with `SystemDisabled` only when the switch is explicitly off.
pub fn ensure_enabled<C: ConfigStore + ?Sized>(config: &C) -> Result<(), MembraError> {
    match master_switch(config) {
        Some(false) => Err(MembraError::SystemDisabled),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membra_core::account::StakeBand;

    struct Params(Result<Option<String>, ()>);

    impl ConfigStore for Params {
        fn read_parameter(&self, _name: &str) -> Result<Option<String>, MembraError> {
            self.0
                .clone()
                .map_err(|_| MembraError::Storage("params tree unavailable".into()))
        }

        fn stake_bands(&self) -> Result<Vec<StakeBand>, MembraError> {
            Ok(Vec::new())
        }
    }

    fn set(v: &str) -> Params {
        Params(Ok(Some(v.to_string())))
    }

    #[test]
    fn switch_values() {
        for on in ["true", "1", "on", "ON", " True "] {
            assert_eq!(parse_switch(on), Some(true), "{on:?}");
        }
        for off in ["false", "0", "off", "OFF", "False"] {
            assert_eq!(parse_switch(off), Some(false), "{off:?}");
        }
        assert_eq!(parse_switch("maybe"), None);
        assert_eq!(parse_switch(""), None);
    }

    #[test]
    fn only_explicit_off_disables() {
        assert!(matches!(ensure_enabled(&set("off")), Err(MembraError::SystemDisabled)));
        assert!(ensure_enabled(&set("on")).is_ok());
    }

    #[test]
    fn missing_or_broken_switch_fails_open() {
        assert!(ensure_enabled(&Params(Ok(None))).is_ok());
        assert!(ensure_enabled(&Params(Err(()))).is_ok());
        assert!(ensure_enabled(&set("disabled-ish")).is_ok());
        assert_eq!(master_switch(&Params(Err(()))), None);
    }
}

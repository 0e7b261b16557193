use crate::core::config::options::SimulationCode;
use crate::error::{CompileError, DeckError};
use std::fmt::Display;

/// Two-way table between an option enum and the integer a code expects for it.
pub(crate) struct NativeMap<T: 'static> {
    /// Name of the configuration option, used in error messages.
    pub option: &'static str,
    /// Name of the deck key.
    pub key: &'static str,
    pub entries: &'static [(T, i64)],
}

impl<T: Copy + PartialEq + Display> NativeMap<T> {
    pub fn encode(&self, code: SimulationCode, value: T) -> Result<i64, CompileError> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, native)| *native)
            .ok_or_else(|| CompileError::UnsupportedOption {
                code,
                option: self.option,
                value: value.to_string(),
            })
    }

    pub fn decode(&self, native: i64) -> Result<T, DeckError> {
        self.entries
            .iter()
            .find(|(_, n)| *n == native)
            .map(|(value, _)| *value)
            .ok_or(DeckError::UnknownValue {
                key: self.key,
                value: native,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::options::Mode;

    const MODES: NativeMap<Mode> = NativeMap {
        option: "mode",
        key: "idrel",
        entries: &[(Mode::Dynamic, 0), (Mode::Static, 1)],
    };

    #[test]
    fn encodes_and_decodes_known_values() {
        assert_eq!(MODES.encode(SimulationCode::SdTrimSp, Mode::Static).unwrap(), 1);
        assert_eq!(MODES.decode(0).unwrap(), Mode::Dynamic);
    }

    #[test]
    fn unknown_values_fail_both_ways() {
        assert!(matches!(
            MODES.encode(SimulationCode::SdTrimSp, Mode::StaticNoRecoil),
            Err(CompileError::UnsupportedOption { option: "mode", .. })
        ));
        assert!(matches!(
            MODES.decode(7),
            Err(DeckError::UnknownValue { key: "idrel", value: 7 })
        ));
    }
}

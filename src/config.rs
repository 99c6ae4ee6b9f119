//! Knobs for a patch pass. The embedding tool deserializes these from whatever format it uses.

use serde::{Deserialize, Serialize};

/// What to do when a literal is loaded more than once in the searched region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralOccurrence {
    /// Use the earliest load.
    #[default]
    First,
    /// Fail with `DuplicateLiteral` unless there is exactly one load.
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub literal_occurrence: LiteralOccurrence,
    /// Also check the raw number of every inserted register against its instruction format.
    /// Registers outside the method frame are rejected either way.
    pub validate_registers: bool,
    /// Upper bound on fingerprint window start positions per method.
    pub scan_limit: Option<usize>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            literal_occurrence: LiteralOccurrence::First,
            validate_registers: true,
            scan_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error, MapDeserializer, StrDeserializer};
    use serde::de::IntoDeserializer;

    #[test]
    fn occurrence_names_are_lowercase() {
        let d: StrDeserializer<Error> = "unique".into_deserializer();
        assert_eq!(LiteralOccurrence::deserialize(d).unwrap(), LiteralOccurrence::Unique);
        let d: StrDeserializer<Error> = "Unique".into_deserializer();
        assert!(LiteralOccurrence::deserialize(d).is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let d: MapDeserializer<_, Error> =
            MapDeserializer::new(vec![("validate_registers", false)].into_iter());
        let config = PatchConfig::deserialize(d).unwrap();
        assert!(!config.validate_registers);
        assert_eq!(config.literal_occurrence, LiteralOccurrence::First);
        assert_eq!(config.scan_limit, None);
    }
}

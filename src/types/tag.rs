// ABOUTME: Generation tags: deployment timestamps stamped into machine metadata.
// ABOUTME: Distinguishes the current generation from leftovers of failed runs.

use std::collections::BTreeMap;
use std::fmt;

/// Metadata key carrying a machine's generation tag.
pub const GENERATION_TAG_KEY: &str = "bluegreen-deployment-tag";

/// A machine's generation, parsed from its metadata.
///
/// The tag value is the epoch-seconds timestamp of the deployment that
/// created the machine. Machines created outside a blue-green deployment
/// carry no tag; those normalize to `UNTAGGED` so tag comparison stays a
/// plain integer ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationTag(i64);

impl GenerationTag {
    pub const UNTAGGED: GenerationTag = GenerationTag(-1);

    /// Read a machine's tag from its config metadata. Absent or empty
    /// values normalize to `UNTAGGED`; anything else must parse as an
    /// integer.
    pub fn from_metadata(
        metadata: &BTreeMap<String, String>,
    ) -> Result<GenerationTag, InvalidGenerationTag> {
        match metadata.get(GENERATION_TAG_KEY) {
            None => Ok(GenerationTag::UNTAGGED),
            Some(raw) if raw.is_empty() => Ok(GenerationTag::UNTAGGED),
            Some(raw) => raw
                .parse::<i64>()
                .map(GenerationTag)
                .map_err(|_| InvalidGenerationTag(raw.clone())),
        }
    }

    /// Write this tag back into config metadata.
    pub fn store(&self, metadata: &mut BTreeMap<String, String>) {
        metadata.insert(GENERATION_TAG_KEY.to_string(), self.0.to_string());
    }
}

impl fmt::Display for GenerationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GenerationTag {
    fn from(value: i64) -> Self {
        GenerationTag(value)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("machine carries a malformed generation tag: {0:?}")]
pub struct InvalidGenerationTag(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_tags_normalize_to_untagged() {
        let mut metadata = BTreeMap::new();
        assert_eq!(
            GenerationTag::from_metadata(&metadata).unwrap(),
            GenerationTag::UNTAGGED
        );

        metadata.insert(GENERATION_TAG_KEY.to_string(), String::new());
        assert_eq!(
            GenerationTag::from_metadata(&metadata).unwrap(),
            GenerationTag::UNTAGGED
        );
    }

    #[test]
    fn tags_order_as_integers() {
        let older = GenerationTag::from(100);
        let newer = GenerationTag::from(200);
        assert!(older < newer);
        assert!(GenerationTag::UNTAGGED < older);
    }

    #[test]
    fn malformed_tags_are_rejected() {
        let mut metadata = BTreeMap::new();
        metadata.insert(GENERATION_TAG_KEY.to_string(), "yesterday".to_string());
        assert!(GenerationTag::from_metadata(&metadata).is_err());
    }

    #[test]
    fn store_round_trips() {
        let mut metadata = BTreeMap::new();
        GenerationTag::from(1719870000).store(&mut metadata);
        assert_eq!(
            GenerationTag::from_metadata(&metadata).unwrap(),
            GenerationTag::from(1719870000)
        );
    }
}

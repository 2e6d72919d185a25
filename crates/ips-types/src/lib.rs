//! Validated primitive types shared across the IPS conformance crates.
//!
//! These newtypes guarantee their invariants at construction time, so the engine can take a
//! `&ResourceId` or `&CanonicalUrl` without re-checking the content.

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeError {
    /// The input text was empty or contained only whitespace
    #[error("value cannot be empty")]
    Empty,

    /// The input exceeded the maximum FHIR id length
    #[error("resource id exceeds {max} characters")]
    TooLong { max: usize },

    /// The input contained a character outside the FHIR id alphabet
    #[error("resource id contains invalid character {0:?} (allowed: A-Z a-z 0-9 '-' '.')")]
    InvalidCharacter(char),

    /// The input was not an absolute URL or URN
    #[error("'{0}' is not an absolute URL or URN")]
    NotAbsolute(String),
}

/// A FHIR logical resource id.
///
/// FHIR restricts ids to 1–64 characters drawn from `[A-Za-z0-9\-\.]`. Leading and trailing
/// whitespace is trimmed before validation, since ids usually arrive as user-entered inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    /// Maximum length of a FHIR id.
    pub const MAX_LEN: usize = 64;

    /// Creates a new `ResourceId` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::Empty`] for blank input, [`TypeError::TooLong`] past 64 characters,
    /// and [`TypeError::InvalidCharacter`] for anything outside the FHIR id alphabet.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(TypeError::TooLong { max: Self::MAX_LEN });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
        {
            return Err(TypeError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ResourceId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An absolute canonical URL (or URN) identifying a profile or operation definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Creates a new `CanonicalUrl` from the given input.
    ///
    /// The input is trimmed. It must start with `http://`, `https://` or `urn:`.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        let absolute = ["http://", "https://", "urn:"]
            .iter()
            .any(|scheme| trimmed.starts_with(scheme));
        if !absolute {
            return Err(TypeError::NotAbsolute(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::new(&s).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for CanonicalUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for CanonicalUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CanonicalUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_trims_and_accepts_fhir_alphabet() {
        let id = ResourceId::new("  eumfh-39-07.a ").expect("valid id");
        assert_eq!(id.as_str(), "eumfh-39-07.a");
    }

    #[test]
    fn resource_id_rejects_blank() {
        assert_eq!(ResourceId::new("   "), Err(TypeError::Empty));
    }

    #[test]
    fn resource_id_rejects_slash() {
        assert_eq!(
            ResourceId::new("Patient/abc"),
            Err(TypeError::InvalidCharacter('/'))
        );
    }

    #[test]
    fn resource_id_rejects_overlong_input() {
        let long = "a".repeat(65);
        assert_eq!(
            ResourceId::new(long),
            Err(TypeError::TooLong { max: 64 })
        );
        assert!(ResourceId::new("a".repeat(64)).is_ok());
    }

    #[test]
    fn canonical_url_requires_absolute_scheme() {
        assert!(
            CanonicalUrl::new("http://hl7.org/fhir/uv/ips/StructureDefinition/Bundle-uv-ips")
                .is_ok()
        );
        assert!(CanonicalUrl::new("urn:oid:2.16.840.1").is_ok());
        assert!(matches!(
            CanonicalUrl::new("StructureDefinition/Bundle-uv-ips"),
            Err(TypeError::NotAbsolute(_))
        ));
    }

    #[test]
    fn deserialize_enforces_invariants() {
        let ok: ResourceId = serde_json::from_str("\"abc\"").expect("valid");
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<ResourceId>("\"\"").is_err());
    }
}

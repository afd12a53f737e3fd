use crate::constants::UNSET_UID;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique content identifier: 32 lowercase hexadecimal characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Generate a fresh random uid
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a uid, returning `None` when the value does not have uid shape
    pub fn parse(value: &str) -> Option<Self> {
        Self::is_valid(value).then(|| Self(value.to_string()))
    }

    /// Whether the value is a well-formed uid. The unset sentinel never is.
    pub fn is_valid(value: &str) -> bool {
        value != UNSET_UID
            && value.len() == 32
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(format!("Invalid uid: {value}"))
        }
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

/// Temporary id given to objects before the id server renames them
pub fn temporary_id(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uids_are_valid() {
        let uid = Uid::generate();
        assert!(Uid::is_valid(uid.as_str()));
        assert_ne!(uid, Uid::generate());
    }

    #[test]
    fn test_uid_validation() {
        assert!(Uid::is_valid("0123456789abcdef0123456789abcdef"));
        assert!(!Uid::is_valid("0"));
        assert!(!Uid::is_valid("Ca"));
        assert!(!Uid::is_valid("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!Uid::is_valid("0123456789abcdef0123456789abcdeg"));
        assert!(Uid::parse("calcium").is_none());
    }

    #[test]
    fn test_uid_serde_rejects_malformed() {
        let uid: Uid = serde_json::from_str("\"0123456789abcdef0123456789abcdef\"").unwrap();
        assert_eq!(uid.as_str(), "0123456789abcdef0123456789abcdef");
        assert!(serde_json::from_str::<Uid>("\"nope\"").is_err());
    }

    #[test]
    fn test_temporary_id_prefix() {
        let id = temporary_id("tmp");
        assert!(id.starts_with("tmp"));
        assert_eq!(id.len(), 35);
    }
}

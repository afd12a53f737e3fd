use crate::models::ids::Uid;
use serde::{Deserialize, Serialize};

/// Client contact that may receive sample notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub uid: Uid,
    pub fullname: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

impl Contact {
    pub fn new(fullname: impl Into<String>, email_address: Option<&str>) -> Self {
        Self {
            uid: Uid::generate(),
            fullname: fullname.into(),
            email_address: email_address.map(str::to_string),
        }
    }

    /// The email address, if one is set and not blank
    pub fn email(&self) -> Option<&str> {
        self.email_address
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_email_is_absent() {
        assert_eq!(Contact::new("Ann", Some("  ")).email(), None);
        assert_eq!(Contact::new("Ann", None).email(), None);
        assert_eq!(
            Contact::new("Ann", Some("ann@example.com")).email(),
            Some("ann@example.com")
        );
        assert_eq!(
            Contact::new("Ann", Some(" ann@example.com\n")).email(),
            Some("ann@example.com")
        );
    }
}

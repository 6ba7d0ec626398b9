use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Agent,
}

impl Role {
    /// Lenient parse for sender tags coming off the wire.
    /// Anything unrecognised is attributed to the support side.
    pub fn from_wire(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("user") => Role::User,
            Some("system") => Role::System,
            _ => Role::Agent,
        }
    }

    pub fn default_display_name(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "You",
            Role::Agent => "Support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Agent => "agent",
        };
        f.write_str(tag)
    }
}

/// Name and email a customer gives before a chat can be requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: &str, email: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(ValidationError::MissingIdentity);
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags_map_to_roles() {
        assert_eq!(Role::from_wire(Some("user")), Role::User);
        assert_eq!(Role::from_wire(Some(" Agent ")), Role::Agent);
        assert_eq!(Role::from_wire(Some("system")), Role::System);
        assert_eq!(Role::from_wire(Some("bot")), Role::Agent);
        assert_eq!(Role::from_wire(None), Role::Agent);
    }

    #[test]
    fn identity_requires_both_fields() {
        assert_eq!(
            Identity::new("", "a@b.com"),
            Err(ValidationError::MissingIdentity)
        );
        assert_eq!(Identity::new("A", "  "), Err(ValidationError::MissingIdentity));

        let identity = Identity::new(" Ann ", "a@b.com").unwrap();
        assert_eq!(identity.name, "Ann");
        assert_eq!(identity.to_string(), "Ann <a@b.com>");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        assert_eq!(Role::User.default_display_name(), "You");
        assert_eq!(Role::Agent.default_display_name(), "Support");
    }
}

use serde::{Deserialize, Serialize};

/// Credentials as written to saved settings
///
/// `encpass` is the obfuscated password. It is keyed by the owning file's
/// uuid, which is stored alongside this record, never inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encpass: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_as_none() {
        let stored: StoredCredentials = toml::from_str("user = \"alice\"").unwrap();
        assert_eq!(stored.user.as_deref(), Some("alice"));
        assert!(stored.encpass.is_none());
    }

    #[test]
    fn empty_record_serializes_to_nothing() {
        let stored = StoredCredentials::default();
        assert_eq!(toml::to_string(&stored).unwrap(), "");
    }
}

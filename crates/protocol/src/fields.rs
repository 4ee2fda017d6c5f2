//! Open-dialog field descriptors
//!
//! The UI renders these to collect a connection. Titles, descriptions and
//! placeholders are localization keys, not display text.

use serde::{Deserialize, Serialize};

/// Input kind for an open-dialog field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "password")]
    Password,
}

/// One field of the open dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenField {
    pub id: &'static str,
    pub title: &'static str,
    pub desc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
}

/// Static description of the storage provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub name: &'static str,
    pub icon: &'static str,
    pub enabled: bool,
    /// Position among storage providers in the open view
    pub uipos: u32,
}

pub const WEBDAV_STORAGE: StorageInfo = StorageInfo {
    name: "webdav",
    icon: "server",
    enabled: true,
    uipos: 10,
};

/// WebDAV always asks for a URL before opening
pub const fn needs_open_config() -> bool {
    true
}

/// Fields shown when opening a file from WebDAV
pub fn open_config() -> Vec<OpenField> {
    vec![
        OpenField {
            id: "path",
            title: "openUrl",
            desc: "openUrlDesc",
            placeholder: None,
            kind: FieldKind::Text,
            required: true,
        },
        OpenField {
            id: "user",
            title: "openUser",
            desc: "openUserDesc",
            placeholder: Some("openUserPlaceholder"),
            kind: FieldKind::Text,
            required: false,
        },
        OpenField {
            id: "password",
            title: "openPass",
            desc: "openPassDesc",
            placeholder: Some("openPassPlaceholder"),
            kind: FieldKind::Password,
            required: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_path_is_required() {
        let fields = open_config();
        let ids: Vec<_> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, ["path", "user", "password"]);

        let required: Vec<_> = fields.iter().filter(|f| f.required).map(|f| f.id).collect();
        assert_eq!(required, ["path"]);
    }

    #[test]
    fn password_field_is_masked() {
        let fields = open_config();
        let password = fields.iter().find(|f| f.id == "password").unwrap();
        assert_eq!(password.kind, FieldKind::Password);
    }

    #[test]
    fn serializes_kind_as_type() {
        let json = serde_json::to_value(&open_config()[0]).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["required"], true);
        assert!(json.get("placeholder").is_none());
    }
}

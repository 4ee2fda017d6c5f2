use serde::{Deserialize, Serialize};

/// Version token of a remote object
///
/// Carries the store's `Last-Modified` value verbatim. Revisions are only ever
/// compared for equality; two tokens are never ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_exact_string_match() {
        let a = Revision::from("Tue, 14 Nov 2023 22:13:20 GMT");
        let b = Revision::new(String::from("Tue, 14 Nov 2023 22:13:20 GMT"));
        let c = Revision::from("Tue, 14 Nov 2023 22:13:21 GMT");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn serializes_as_bare_string() {
        let rev = Revision::from("R1");
        assert_eq!(serde_json::to_string(&rev).unwrap(), "\"R1\"");
        let back: Revision = serde_json::from_str("\"R1\"").unwrap();
        assert_eq!(back, rev);
    }
}

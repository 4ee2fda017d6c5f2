/// HTTP verbs used against the WebDAV store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,    // GET
    Head,   // HEAD
    Put,    // PUT
    Move,   // MOVE
    Delete, // DELETE
}

impl Method {
    /// Wire name of the verb
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Move => "MOVE",
            Self::Delete => "DELETE",
        }
    }

    /// Read verbs bypass intermediate caches
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

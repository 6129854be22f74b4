//! Sender and recipient addresses (RFC 5322 §3.4 rendering).

/// An address assembled from a display name and an email address.
///
/// # Examples
/// - `("Juan García", "juan@ejemplo.com")` → `"Juan García <juan@ejemplo.com>"`
/// - `("", "user@example.com")` → `"user@example.com"`
/// - `("Last, First", "a@b.com")` → `"\"Last, First\" <a@b.com>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (may be empty for unresolved entries).
    pub address: String,
}

impl EmailAddress {
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into().trim().to_string(),
            address: address.into().trim().to_string(),
        }
    }

    /// Format for a header: `Name <address>`, just `address`, or just `Name`.
    pub fn display(&self) -> String {
        match (self.display_name.is_empty(), self.address.is_empty()) {
            (true, _) => self.address.clone(),
            (false, true) => quote_display_name(&self.display_name),
            (false, false) => format!(
                "{} <{}>",
                quote_display_name(&self.display_name),
                self.address
            ),
        }
    }
}

/// Quote a display name when it contains RFC 5322 specials.
fn quote_display_name(name: &str) -> String {
    const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];
    if name.contains(SPECIALS) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        name.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

//! SKU normalisation shared by every component that touches a SKU string.

/// Normalises a raw SKU to the canonical form used as a storage key:
/// upper-cased, 1..50 bytes, charset `[A-Za-z0-9-]`. Returns `None` if the
/// input doesn't fit those constraints after normalisation.
pub fn normalize(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.len() > 50 {
        return None;
    }
    if !raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return None;
    }
    Some(raw.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_upper_case() {
        assert_eq!(normalize("sku-123").as_deref(), Some("SKU-123"));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn rejects_too_long() {
        let raw = "a".repeat(51);
        assert_eq!(normalize(&raw), None);
    }

    #[test]
    fn rejects_invalid_charset() {
        assert_eq!(normalize("sku_123"), None);
        assert_eq!(normalize("sku 123"), None);
        assert_eq!(normalize("sku/123"), None);
    }

    #[test]
    fn accepts_max_length() {
        let raw = "a".repeat(50);
        assert!(normalize(&raw).is_some());
    }
}

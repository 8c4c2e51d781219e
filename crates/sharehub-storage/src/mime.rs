//! MIME type resolution for uploads and blob links.

/// Fallback for unknown content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a MIME type from a file name's extension.
pub fn guess_from_name(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// The client's content type when it says anything useful, else a guess
/// from the file name.
pub fn resolve_content_type(declared: Option<&str>, name: &str) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && ct != OCTET_STREAM => ct.to_string(),
        _ => guess_from_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_detection() {
        assert_eq!(guess_from_name("file.pdf"), "application/pdf");
        assert_eq!(guess_from_name("img.PNG"), "image/png");
        assert_eq!(guess_from_name("noext"), OCTET_STREAM);
        assert_eq!(guess_from_name("archive.unknownext"), OCTET_STREAM);
    }

    #[test]
    fn test_declared_type_wins_unless_generic() {
        assert_eq!(resolve_content_type(Some("text/csv"), "a.bin"), "text/csv");
        assert_eq!(resolve_content_type(Some(OCTET_STREAM), "a.jpg"), "image/jpeg");
        assert_eq!(resolve_content_type(Some(" "), "a.json"), "application/json");
        assert_eq!(resolve_content_type(None, "a.txt"), "text/plain");
    }
}

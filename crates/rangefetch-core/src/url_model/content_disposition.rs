//! `Content-Disposition` filename extraction.

const DIRECTIVE: &str = "filename=\"";

/// Returns the value of the first `filename="..."` directive.
///
/// The directive name is matched case-sensitively and only the quoted form is
/// accepted; `filename*=` and bare tokens yield `None`. The value runs up to
/// the next double quote.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let start = header_value.find(DIRECTIVE)? + DIRECTIVE.len();
    let rest = &header_value[start..];
    let end = rest.find('"')?;
    let name = &rest[..end];
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Derive the display domain for a story URL: the lowercased hostname
/// with a single leading `www.` stripped. Unparseable or empty input
/// yields an empty string — the field is always present in responses.
pub fn domain_of(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let host = match url::Url::parse(raw) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return String::new(),
        },
        Err(_) => return String::new(),
    };

    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

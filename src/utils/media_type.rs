//! Content-type handling for uploads.

/// Extension for a bare media type, from a closed table.
///
/// Anything outside the table is `None`; callers that already checked an
/// allow-list should treat a miss as an internal fault.
pub fn extension_for(media_type: &str) -> Option<&'static str> {
    match media_type {
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "video/mp4" => Some(".mp4"),
        _ => None,
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Reduces a `Content-Type` header value to its lowercase `type/subtype`.
///
/// Parameters are dropped, but each one must still look like `name=value`.
pub fn parse_media_type(header: &str) -> Option<String> {
    let mut parts = header.split(';');
    let essence = parts.next()?.trim();
    let (kind, subtype) = essence.split_once('/')?;
    if !is_token(kind) || !is_token(subtype) {
        return None;
    }

    for param in parts {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let (name, value) = param.split_once('=')?;
        if !is_token(name.trim()) || value.trim().is_empty() {
            return None;
        }
    }

    Some(essence.to_ascii_lowercase())
}

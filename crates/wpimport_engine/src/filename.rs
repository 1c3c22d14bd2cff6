use sha2::{Digest, Sha256};

const FALLBACK_NAME: &str = "image";
const MAX_NAME_LEN: usize = 100;

/// Attachment name for an image URL: the last path segment, spaces turned
/// into underscores and path-hostile characters replaced.
pub fn attachment_name(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    let segment = path.rsplit('/').next().unwrap_or_default();
    sanitize_name(&segment.replace(' ', "_"))
}

/// `{stem}_{short_hash(bytes)}{.ext}`, used when `name` is already taken.
pub fn deduplicated_name(name: &str, bytes: &[u8]) -> String {
    let hash = short_hash(bytes);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{hash}.{ext}"),
        _ => format!("{name}_{hash}"),
    }
}

fn sanitize_name(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', '.'][..]);
    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let mut name = cleaned.to_string();
    if name.len() > MAX_NAME_LEN {
        // Keep the extension so the web server still serves the right type.
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{ext}"))
            .filter(|ext| ext.len() < 16)
            .unwrap_or_default();
        let mut end = MAX_NAME_LEN - ext.len();
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name = format!("{}{ext}", &name[..end]);
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn short_hash(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

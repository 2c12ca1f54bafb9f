// Identifier sanitizers. Every user-controlled string that becomes a
// manifest name, label value, or environment variable name passes through
// one of these; both are total and idempotent.

/// Environment-variable name: characters outside `[0-9A-Za-z_]` become `_`,
/// leading/trailing `_`/`-` are trimmed, the rest is uppercased.
pub fn env_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .trim_matches(|c| c == '_' || c == '-')
        .to_ascii_uppercase()
}

/// Service/resource name: lowercased, characters outside `[0-9a-z-]` (plus
/// any `extra` allowed characters) become `-`, leading/trailing `_`/`-` are
/// trimmed. Versioned names pass `extra = ['.']` to keep dotted versions.
pub fn resource_name(raw: &str, extra: &[char]) -> String {
    raw.to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || extra.contains(&c) {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches(|c| c == '_' || c == '-')
        .to_string()
}

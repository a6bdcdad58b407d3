/// Canonicalize an extracted string: NBSP to space, full-width colon to `:`,
/// whitespace runs collapsed to one space, trimmed.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        let ch = match ch {
            '\u{00A0}' | '\u{202F}' => ' ',
            '\u{FF1A}' => ':',
            other => other,
        };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

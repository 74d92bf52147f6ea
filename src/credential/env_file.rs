//! Line-level handling of `KEY=VALUE` env files.
//!
//! Only the line holding the requested key is ever touched; every other line
//! (comments, blanks, other keys, their line endings) is kept byte for byte.

/// Find the value of `key`. Later assignments win, as with `dotenvy`.
pub fn read_value(content: &str, key: &str) -> Option<String> {
    content
        .lines()
        .filter_map(split_assignment)
        .filter(|(k, _)| *k == key)
        .map(|(_, v)| parse_value(v).to_string())
        .last()
}

/// Return `content` with the assignment for `key` replaced by `key=value`.
///
/// The first assignment is rewritten in place, duplicates are dropped, and the
/// key is appended at the end when it is absent.
pub fn upsert_value(content: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(content.len() + key.len() + value.len() + 2);
    let mut written = false;

    for line in content.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        match split_assignment(body) {
            Some((k, _)) if k == key => {
                if !written {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                    out.push_str(if ending.is_empty() { "\n" } else { ending });
                    written = true;
                }
            }
            _ => out.push_str(line),
        }
    }

    if !written {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// `[export ]KEY=VALUE` -> (KEY, VALUE); comments and blanks -> None
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (k, v) = trimmed.split_once('=')?;
    Some((k.trim(), v.trim()))
}

/// Quoted values keep everything between the quotes; unquoted values end
/// at a whitespace-preceded `#`, as `dotenvy` reads them.
fn parse_value(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return &rest[..end];
            }
        }
    }
    match value.find(" #").or_else(|| value.find("\t#")) {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

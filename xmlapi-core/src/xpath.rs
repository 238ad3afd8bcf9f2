//! Helpers for building the xpath strings the management API addresses
//! configuration nodes with.

pub fn quote(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{value}\"")
    } else {
        format!("'{value}'")
    }
}

pub fn entry(name: &str) -> String {
    format!("entry[@name={}]", quote(name))
}

pub fn entry_with_uuid(uuid: &str) -> String {
    format!("entry[@uuid={}]", quote(uuid))
}

pub fn member(value: &str) -> String {
    format!("member[text()={}]", quote(value))
}

pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment.as_ref());
    }
    out
}

/// Splits `.../entry[@name='x']` into the container xpath and the entry name.
pub fn split_entry(xpath: &str) -> Option<(&str, &str)> {
    let (container, last) = xpath.rsplit_once("/entry[@name=")?;
    let quoted = last.strip_suffix(']')?;
    let name = quoted
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| quoted.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
    Some((container, name))
}

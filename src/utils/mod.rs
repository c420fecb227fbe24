use std::collections::{BTreeSet, HashSet};

/// Parses a comma-separated port list, keeping first-seen order and dropping duplicates.
pub fn parse_port_list_csv(value: &str) -> Result<Vec<u16>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("port list is empty".to_string());
    }
    let mut out: Vec<u16> = Vec::new();
    let mut seen: HashSet<u16> = HashSet::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let port: u16 = item
            .parse()
            .map_err(|_| format!("invalid port '{item}'"))?;
        if port == 0 {
            return Err("port 0 is not a valid target port".to_string());
        }
        if seen.insert(port) {
            out.push(port);
        }
    }
    if out.is_empty() {
        return Err("port list is empty".to_string());
    }
    Ok(out)
}

pub fn parse_port_set_csv(value: &str) -> Result<BTreeSet<u16>, String> {
    parse_port_list_csv(value).map(|ports| ports.into_iter().collect())
}

/// Parses a comma-separated extension list into suffixes ready to append to a word.
///
/// Items are normalized to carry exactly one leading dot (`php` and `.php` both become
/// `.php`). The bare word (empty extension) is always probed first.
pub fn parse_extensions_csv(value: &str) -> Result<Vec<String>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("extensions list is empty".to_string());
    }
    let mut out: Vec<String> = vec![String::new()];
    let mut seen: HashSet<String> = HashSet::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let cleaned = item.trim_start_matches('.');
        if cleaned.is_empty() {
            continue;
        }
        if cleaned.contains('/') || cleaned.chars().any(char::is_whitespace) {
            return Err(format!("invalid extension '{item}'"));
        }
        let key = cleaned.to_ascii_lowercase();
        if seen.insert(key) {
            out.push(format!(".{cleaned}"));
        }
    }
    Ok(out)
}

pub fn format_duration_secs(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

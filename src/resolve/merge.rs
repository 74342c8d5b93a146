use crate::store::StringMap;

/// Layers `overlay` on top of `base`. Later layers win on collision and
/// entries with empty values are dropped from the result.
pub fn merge_layers(base: &StringMap, overlay: &StringMap) -> StringMap {
    let mut merged = StringMap::new();
    for (name, value) in base.iter().chain(overlay.iter()) {
        if value.is_empty() {
            continue;
        }
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Header variant of [`merge_layers`]: a later layer also replaces names that
/// differ only in case, since the transport treats them as one header.
pub fn merge_headers(base: &StringMap, overlay: &StringMap) -> StringMap {
    let mut merged = StringMap::new();
    for (name, value) in base.iter().chain(overlay.iter()) {
        if value.is_empty() {
            continue;
        }
        set_header(&mut merged, name, value);
    }
    merged
}

pub fn set_header(headers: &mut StringMap, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

//! Document path helpers
//!
//! Paths are `/`-separated strings alternating collection and document id,
//! e.g. `warehouses/W1/zones/Z1`. Every function here is pure and total.

/// Path separator used by the document store
pub const SEPARATOR: char = '/';

/// Collapse repeated separators and strip leading/trailing ones
pub fn normalise_path(path: &str) -> String {
    path.split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join any number of path fragments into one normalised path
pub fn join_paths<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .map(|part| part.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/");
    normalise_path(&joined)
}

/// Last segment of a path (the document id)
pub fn get_id(path: &str) -> String {
    let normalised = normalise_path(path);
    match normalised.rsplit_once(SEPARATOR) {
        Some((_, id)) => id.to_string(),
        None => normalised,
    }
}

/// Everything but the last segment of a path
pub fn get_path(path: &str) -> String {
    let normalised = normalise_path(path);
    match normalised.rsplit_once(SEPARATOR) {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

/// Split a document path into `(collection, id)` pairs
///
/// Returns `None` when the path has an odd number of segments (i.e. it names
/// a collection rather than a document).
pub fn segments(path: &str) -> Option<Vec<(String, String)>> {
    let normalised = normalise_path(path);
    if normalised.is_empty() {
        return Some(Vec::new());
    }
    let parts: Vec<&str> = normalised.split(SEPARATOR).collect();
    if parts.len() % 2 != 0 {
        return None;
    }
    Some(
        parts
            .chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect(),
    )
}

//! Path helpers for entries inside a package

/// A zip entry path split into directory and file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPath<'a> {
    /// Everything before the last `/` (empty for top-level entries)
    pub dirname: &'a str,
    /// The final component
    pub basename: &'a str,
}

/// Split an entry path at its last `/`
pub fn split_path(path: &str) -> SplitPath<'_> {
    match path.rfind('/') {
        Some(idx) => SplitPath {
            dirname: &path[..idx],
            basename: &path[idx + 1..],
        },
        None => SplitPath {
            dirname: "",
            basename: path,
        },
    }
}

/// Join path components; an absolute component discards what came before
pub fn join_path(parts: &[&str]) -> String {
    let mut relevant: Vec<&str> = Vec::new();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if part.starts_with('/') {
            relevant.clear();
        }
        relevant.push(part);
    }
    relevant.join("/")
}

/// Resolve a relationship target against the directory of its source part
pub fn uri_to_zip_entry_name(base: &str, uri: &str) -> String {
    match uri.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base.is_empty() => uri.to_string(),
        None => format!("{}/{}", base, uri),
    }
}

/// Replace (or add) the `#fragment` of a URI
pub fn replace_fragment(uri: &str, fragment: &str) -> String {
    let base = uri.split_once('#').map_or(uri, |(base, _)| base);
    format!("{}#{}", base, fragment)
}

/// Path of the relationships part belonging to `part`
pub fn rels_path_for(part: &str) -> String {
    let split = split_path(part);
    join_path(&[split.dirname, "_rels", &format!("{}.rels", split.basename)])
}

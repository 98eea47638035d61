//! The parts of a `go.mod` file the loader needs.

/// The module path declared by a `go.mod` file.
///
/// Accepts `module example.com/m`, the quoted forms, a trailing line
/// comment, and the block-less form only; `None` when no `module`
/// directive is present.
pub fn module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = strip_comment(line).trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with([' ', '\t', '"', '`']) {
            return None;
        }
        let path = rest.trim();
        let path = path
            .strip_prefix('"')
            .and_then(|p| p.strip_suffix('"'))
            .or_else(|| path.strip_prefix('`').and_then(|p| p.strip_suffix('`')))
            .unwrap_or(path);
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    }
}

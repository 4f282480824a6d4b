//! Materialized-path helpers for the category tree.
//!
//! Categories form a self-referencing tree at most [`MAX_DEPTH`] levels deep.
//! Each row stores a `path` of slugs (`software/antivirus/home`) and a
//! human-readable `path_name` (`Software > Antivirus > Home`), maintained at
//! write time so subtree and breadcrumb lookups are plain prefix queries.

/// Maximum tree depth, root categories are level 1.
pub const MAX_DEPTH: i32 = 3;

/// Derives a URL-safe slug from a display name.
///
/// Lowercases, maps whitespace/punctuation runs to single dashes, and trims
/// leading/trailing dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Child path under an optional parent: `parent/slug` or just `slug` at root.
pub fn join_path(parent_path: Option<&str>, slug: &str) -> String {
    match parent_path {
        Some(p) if !p.is_empty() => format!("{}/{}", p, slug),
        _ => slug.to_string(),
    }
}

/// Breadcrumb display string: `Parent > Child`.
pub fn join_path_name(parent_path_name: Option<&str>, name: &str) -> String {
    match parent_path_name {
        Some(p) if !p.is_empty() => format!("{} > {}", p, name),
        _ => name.to_string(),
    }
}

/// True when `candidate` lives in the subtree rooted at `path` (inclusive).
pub fn in_subtree(path: &str, candidate: &str) -> bool {
    candidate == path || candidate.starts_with(&format!("{}/", path))
}

/// Rewrites a descendant path after its ancestor moved from `old_prefix` to
/// `new_prefix`. Paths outside the subtree come back unchanged.
pub fn rebase_path(old_prefix: &str, new_prefix: &str, path: &str) -> String {
    if path == old_prefix {
        new_prefix.to_string()
    } else if let Some(rest) = path.strip_prefix(&format!("{}/", old_prefix)) {
        format!("{}/{}", new_prefix, rest)
    } else {
        path.to_string()
    }
}

/// Same as [`rebase_path`] but for the display breadcrumb, which uses the
/// `" > "` separator instead of `/`.
pub fn rebase_path_name(old_prefix: &str, new_prefix: &str, path_name: &str) -> String {
    if path_name == old_prefix {
        new_prefix.to_string()
    } else if let Some(rest) = path_name.strip_prefix(&format!("{} > ", old_prefix)) {
        format!("{} > {}", new_prefix, rest)
    } else {
        path_name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_names() {
        assert_eq!(slugify("Antivirus & Security"), "antivirus-security");
        assert_eq!(slugify("  Office Suites  "), "office-suites");
        assert_eq!(slugify("Windows 11 Pro"), "windows-11-pro");
    }

    #[test]
    fn child_path_is_parent_slash_slug() {
        assert_eq!(join_path(None, "software"), "software");
        assert_eq!(join_path(Some("software"), "antivirus"), "software/antivirus");
        assert_eq!(
            join_path(Some("software/antivirus"), "home"),
            "software/antivirus/home"
        );
    }

    #[test]
    fn path_name_uses_breadcrumb_separator() {
        assert_eq!(join_path_name(None, "Software"), "Software");
        assert_eq!(
            join_path_name(Some("Software > Antivirus"), "Home"),
            "Software > Antivirus > Home"
        );
    }

    #[test]
    fn subtree_matching_is_prefix_per_segment() {
        assert!(in_subtree("software", "software"));
        assert!(in_subtree("software", "software/antivirus"));
        assert!(!in_subtree("software", "software-tools"));
    }

    #[test]
    fn rebase_rewrites_descendants_only() {
        assert_eq!(rebase_path("software", "apps", "software"), "apps");
        assert_eq!(
            rebase_path("software", "apps", "software/antivirus/home"),
            "apps/antivirus/home"
        );
        assert_eq!(rebase_path("software", "apps", "games"), "games");
    }

    #[test]
    fn rebase_path_name_uses_breadcrumb_separator() {
        assert_eq!(rebase_path_name("Software", "Apps", "Software"), "Apps");
        assert_eq!(
            rebase_path_name("Software", "Apps", "Software > Antivirus > Home"),
            "Apps > Antivirus > Home"
        );
        assert_eq!(rebase_path_name("Software", "Apps", "Games"), "Games");
    }
}

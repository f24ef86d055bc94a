//! URL slugs for listings, unique per seller.

const MAX_SLUG_LEN: usize = 80;

/// Lower-case ASCII slug of `title`; runs of other characters become one
/// `-`. Falls back to `repo` when nothing usable remains.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "repo".to_string()
    } else {
        slug.to_string()
    }
}

/// First of `base`, `base-2`, `base-3`, ... not present in `taken`.
pub fn unique_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Fast JSON -- Parser!! "), "fast-json-parser");
        assert_eq!(slugify("Ünïcode only ✓"), "n-code-only");
        assert_eq!(slugify("!!!"), "repo");
        assert!(slugify(&"a".repeat(200)).len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn unique_slug_appends_counter() {
        let taken = vec!["tool".to_string(), "tool-2".to_string()];
        assert_eq!(unique_slug("tool", &taken), "tool-3");
        assert_eq!(unique_slug("other", &taken), "other");
        assert_eq!(unique_slug("tool", &[]), "tool");
    }
}

//! Pure, side-effect-free address classification: syntax validation,
//! normalization, and membership in free/disposable/role lists.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static SYNTAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("address syntax regex is a fixed valid pattern")
});

/// Trim and lowercase an address. Idempotent: `normalize(normalize(a)) == normalize(a)`.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

pub fn is_valid_syntax(s: &str) -> bool {
    SYNTAX_RE.is_match(s)
}

/// Split a normalized address into `(local, domain)`. Callers are expected
/// to have already validated syntax, so this is infallible for any string
/// that passed `is_valid_syntax`.
pub fn split(address: &str) -> Option<(&str, &str)> {
    address.split_once('@')
}

/// Strip a trailing `+tag` from a local part, e.g. `jane+bounce` -> `jane`.
pub fn strip_tag(local: &str) -> &str {
    match local.find('+') {
        Some(idx) => &local[..idx],
        None => local,
    }
}

#[derive(Default)]
pub struct Classifier {
    free_domains: HashSet<String>,
    disposable_domains: HashSet<String>,
    role_prefixes: HashSet<String>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the three newline-delimited data files. A missing file is a
    /// warning, not a fatal startup error: none of the three lists are
    /// required for the probe pipeline to function.
    pub fn load(free_path: &Path, disposable_path: &Path, role_path: &Path) -> Self {
        Self {
            free_domains: load_set(free_path),
            disposable_domains: load_set(disposable_path),
            role_prefixes: load_set(role_path),
        }
    }

    pub fn is_free(&self, domain: &str) -> bool {
        self.free_domains.contains(domain)
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        self.disposable_domains.contains(domain)
    }

    pub fn is_role(&self, local: &str) -> bool {
        self.role_prefixes.contains(strip_tag(local))
    }
}

fn load_set(path: &Path) -> HashSet<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.to_lowercase())
            .collect(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "classifier data file not found, loading empty set");
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        for s in ["  Foo@Bar.COM  ", "already@lower.com", "Mixed@Case.Net"] {
            let once = normalize(s);
            let twice = normalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn syntax_accepts_plausible_addresses() {
        assert!(is_valid_syntax("alice@example.com"));
        assert!(is_valid_syntax("a.b+tag@sub.example.co"));
    }

    #[test]
    fn syntax_rejects_obvious_garbage() {
        assert!(!is_valid_syntax("not-an-email"));
        assert!(!is_valid_syntax("@example.com"));
        assert!(!is_valid_syntax("alice@"));
        assert!(!is_valid_syntax("alice@example"));
    }

    #[test]
    fn strip_tag_removes_plus_suffix() {
        assert_eq!(strip_tag("jane+bounce"), "jane");
        assert_eq!(strip_tag("jane"), "jane");
    }

    #[test]
    fn membership_checks_see_loaded_entries() {
        let dir = std::env::temp_dir().join(format!("addr-classify-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let free_path = dir.join("free.txt");
        let disposable_path = dir.join("disposable.txt");
        let role_path = dir.join("role.txt");
        std::fs::write(&free_path, "gmail.com\nYahoo.com\n").unwrap();
        std::fs::write(&disposable_path, "mailinator.com\n").unwrap();
        std::fs::write(&role_path, "admin\nsupport\n").unwrap();

        let c = Classifier::load(&free_path, &disposable_path, &role_path);
        assert!(c.is_free("gmail.com"));
        assert!(c.is_free("yahoo.com"));
        assert!(!c.is_free("example.com"));
        assert!(c.is_disposable("mailinator.com"));
        assert!(!c.is_disposable("gmail.com"));
        assert!(c.is_role("admin"));
        assert!(c.is_role("admin+escalations"));
        assert!(!c.is_role("jane"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_data_file_loads_empty_not_fatal() {
        let c = Classifier::load(
            Path::new("/nonexistent/free.txt"),
            Path::new("/nonexistent/disposable.txt"),
            Path::new("/nonexistent/role.txt"),
        );
        assert!(!c.is_free("gmail.com"));
        assert!(!c.is_role("admin"));
    }
}

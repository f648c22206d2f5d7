use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct QueueIdResult {
    pub detected: bool,
    pub pattern: Option<&'static str>,
    pub value: Option<String>,
}

static POSTFIX_HEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9A-F]{10,14}").unwrap());
static GENERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]{14,}").unwrap());
static PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]{8,}/[A-Za-z0-9]{8,}").unwrap());
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

/// Patterns are tried in this order; the first that matches wins, mirroring
/// a first-match-wins classifier rather than a union/best-match one.
fn ordered_patterns() -> [(&'static str, &'static LazyLock<Regex>); 4] {
    [
        ("postfix_hex", &POSTFIX_HEX),
        ("generic_id", &GENERIC_ID),
        ("path_id", &PATH_ID),
        ("uuid", &UUID),
    ]
}

pub fn detect(message: &str) -> QueueIdResult {
    let message = message.trim();
    if message.is_empty() {
        return QueueIdResult::default();
    }
    for (name, regex) in ordered_patterns() {
        if let Some(m) = regex.find(message) {
            return QueueIdResult {
                detected: true,
                pattern: Some(name),
                value: Some(m.as_str().to_string()),
            };
        }
    }
    QueueIdResult::default()
}

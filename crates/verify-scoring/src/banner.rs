/// MTA family identified from an SMTP greeting banner, with the capability
/// flags the timing analyzer and queue-id detector rely on.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MtaInfo {
    pub family: &'static str,
    pub supports_timing: bool,
    pub supports_queue_id: bool,
    pub timing_variance: f64,
    pub banner: Option<String>,
}

struct MtaPattern {
    family: &'static str,
    keywords: &'static [&'static str],
    supports_timing: bool,
    supports_queue_id: bool,
    timing_variance: f64,
}

/// Checked in order; first keyword match wins.
const PATTERNS: &[MtaPattern] = &[
    MtaPattern {
        family: "postfix",
        keywords: &["postfix"],
        supports_timing: true,
        supports_queue_id: true,
        timing_variance: 0.3,
    },
    MtaPattern {
        family: "exchange",
        keywords: &["exchange", "microsoft"],
        supports_timing: false,
        supports_queue_id: true,
        timing_variance: 0.1,
    },
    MtaPattern {
        family: "mimecast",
        keywords: &["mimecast"],
        supports_timing: false,
        supports_queue_id: false,
        timing_variance: 0.0,
    },
    MtaPattern {
        family: "sendgrid",
        keywords: &["sendgrid"],
        supports_timing: false,
        supports_queue_id: true,
        timing_variance: 0.0,
    },
    MtaPattern {
        family: "google",
        keywords: &["google", "aspmx"],
        supports_timing: true,
        supports_queue_id: false,
        timing_variance: 0.2,
    },
];

pub fn parse(banner: &str) -> MtaInfo {
    if banner.is_empty() {
        return unknown();
    }
    let banner_lower = banner.to_lowercase();
    for pattern in PATTERNS {
        if pattern.keywords.iter().any(|kw| banner_lower.contains(kw)) {
            return MtaInfo {
                family: pattern.family,
                supports_timing: pattern.supports_timing,
                supports_queue_id: pattern.supports_queue_id,
                timing_variance: pattern.timing_variance,
                banner: Some(banner.to_string()),
            };
        }
    }
    unknown()
}

fn unknown() -> MtaInfo {
    MtaInfo {
        family: "unknown",
        supports_timing: true,
        supports_queue_id: true,
        timing_variance: 0.4,
        banner: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_postfix() {
        let info = parse("220 mail.example.com ESMTP Postfix");
        assert_eq!(info.family, "postfix");
        assert!(info.supports_timing);
    }

    #[test]
    fn matches_first_of_multiple_keywords() {
        let info = parse("220 example-Exchange server ready");
        assert_eq!(info.family, "exchange");
    }

    #[test]
    fn empty_banner_is_unknown() {
        let info = parse("");
        assert_eq!(info.family, "unknown");
        assert_eq!(info.banner, None);
    }

    #[test]
    fn unrecognized_banner_is_unknown_but_keeps_text() {
        let info = parse("220 totally-custom-mta ready");
        assert_eq!(info.family, "unknown");
        assert_eq!(info.banner.as_deref(), Some("220 totally-custom-mta ready"));
    }
}

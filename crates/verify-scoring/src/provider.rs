/// Static, exact-lowercase-domain confidence caps. Free-tier webmail
/// providers are catch-all-heavy and harder to verify accurately than
/// corporate domains, so they get a lower ceiling regardless of how strong
/// the probe signals look.
const CAPS: &[(&str, u32)] = &[
    ("gmail.com", 70),
    ("googlemail.com", 70),
    ("yahoo.com", 65),
    ("aol.com", 65),
    ("outlook.com", 75),
    ("hotmail.com", 75),
    ("live.com", 75),
    ("microsoft.com", 85),
    ("apple.com", 85),
];

const DEFAULT_CAP: u32 = 85;

pub fn cap_for(domain: &str) -> u32 {
    let domain = domain.to_lowercase();
    CAPS.iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, cap)| *cap)
        .unwrap_or(DEFAULT_CAP)
}

pub fn apply_cap(confidence: u32, domain: &str) -> u32 {
    confidence.min(cap_for(domain))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_provider_caps_apply() {
        assert_eq!(cap_for("gmail.com"), 70);
        assert_eq!(cap_for("GMAIL.COM"), 70);
    }

    #[test]
    fn unknown_domain_uses_default_cap() {
        assert_eq!(cap_for("some-corp.example"), DEFAULT_CAP);
    }

    #[test]
    fn apply_cap_is_idempotent() {
        let once = apply_cap(95, "gmail.com");
        let twice = apply_cap(once, "gmail.com");
        assert_eq!(once, twice);
    }
}

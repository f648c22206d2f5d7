use crate::provider;

/// The reduced view of probe signals the scorer actually needs. The probe
/// engine builds this from the richer session data it collects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringInput {
    pub fake_rejected: Option<bool>,
    pub queue_id_detected: bool,
    pub timing_ratio: f64,
    pub spf_strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Valid,
    Risky,
}

/// §4.7: short-circuit on `fake_rejected`, else additive weights, then
/// provider cap and reputation cap in that order, clamped to [0,100].
/// `reputation_cap` is computed by the caller (it requires an async
/// key/value store round-trip that this crate does not perform).
pub fn score(input: &ScoringInput, domain: &str, reputation_cap: u32) -> u32 {
    let raw = if input.fake_rejected == Some(true) {
        95
    } else {
        let mut score: i32 = 50;
        if input.queue_id_detected {
            score += 20;
        }
        if input.timing_ratio > 1.4 {
            score += 15;
        } else if input.timing_ratio < 0.8 {
            score -= 10;
        }
        if input.spf_strict {
            score += 5;
        }
        score
    };

    let capped = provider::apply_cap(raw.clamp(0, 100) as u32, domain).min(reputation_cap);
    capped.clamp(0, 100)
}

pub fn status_for(confidence: u32) -> Status {
    if confidence >= 80 {
        Status::Valid
    } else {
        Status::Risky
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_rejected_short_circuits_to_95_before_caps() {
        let input = ScoringInput {
            fake_rejected: Some(true),
            queue_id_detected: false,
            timing_ratio: 1.0,
            spf_strict: false,
        };
        assert_eq!(score(&input, "unknown-corp.example", 100), 85.min(100));
        assert_eq!(score(&input, "unknown-corp.example", 100), 85);
    }

    #[test]
    fn gmail_with_strong_timing_caps_at_provider_limit() {
        let input = ScoringInput {
            fake_rejected: Some(false),
            queue_id_detected: true,
            timing_ratio: 1.8,
            spf_strict: true,
        };
        // 50 + 20 + 15 + 5 = 90, capped to gmail's 70
        assert_eq!(score(&input, "gmail.com", 100), 70);
        assert_eq!(status_for(70), Status::Risky);
    }

    #[test]
    fn confidence_exactly_80_is_valid() {
        assert_eq!(status_for(80), Status::Valid);
        assert_eq!(status_for(79), Status::Risky);
    }

    #[test]
    fn score_always_in_bounds() {
        let inputs = [
            ScoringInput {
                fake_rejected: Some(false),
                queue_id_detected: false,
                timing_ratio: 0.1,
                spf_strict: false,
            },
            ScoringInput {
                fake_rejected: Some(true),
                queue_id_detected: true,
                timing_ratio: 3.0,
                spf_strict: true,
            },
        ];
        for input in inputs {
            let s = score(&input, "example.test", 100);
            assert!(s <= 100);
        }
    }

    #[test]
    fn reputation_cap_applies_after_provider_cap() {
        let input = ScoringInput {
            fake_rejected: Some(true),
            queue_id_detected: false,
            timing_ratio: 1.0,
            spf_strict: false,
        };
        assert_eq!(score(&input, "unknown-corp.example", 50), 50);
    }
}

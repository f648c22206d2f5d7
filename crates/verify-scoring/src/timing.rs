use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStatus {
    Valid,
    CatchAll,
    Ambiguous,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingResult {
    pub status: TimingStatus,
    pub ratio: f64,
    pub confidence: f64,
    pub variance: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn stdev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// `ratio = real_ms / mean(positive fake_ms)`. No positive fake samples ⇒
/// ratio=1.0, status=insufficient_data — this is the one place the ratio is
/// defined even though no comparison could be made.
pub fn compute_ratio(real_ms: f64, fake_ms: &[f64]) -> f64 {
    let positive: Vec<f64> = fake_ms.iter().copied().filter(|&t| t > 0.0).collect();
    if positive.is_empty() {
        return 1.0;
    }
    let fake_avg = mean(&positive);
    if fake_avg == 0.0 {
        return 1.0;
    }
    real_ms / fake_avg
}

/// ratio > 1.4 (strict) ⇒ valid; ratio < 0.8 (strict) ⇒ catch_all; else
/// ambiguous. Exactly 1.4 or exactly 0.8 both fall into the ambiguous band.
pub fn analyze(real_ms: f64, fake_ms: &[f64]) -> TimingResult {
    if fake_ms.is_empty() {
        return TimingResult {
            status: TimingStatus::InsufficientData,
            ratio: 1.0,
            confidence: 0.0,
            variance: 0.0,
        };
    }

    let ratio = compute_ratio(real_ms, fake_ms);
    let variance = if fake_ms.len() > 1 {
        let m = mean(fake_ms);
        if m > 0.0 {
            stdev(fake_ms) / m
        } else {
            0.0
        }
    } else {
        0.0
    };

    if ratio > 1.4 {
        TimingResult {
            status: TimingStatus::Valid,
            ratio,
            confidence: (60.0 + (ratio - 1.4) * 50.0).min(90.0),
            variance,
        }
    } else if ratio < 0.8 {
        TimingResult {
            status: TimingStatus::CatchAll,
            ratio,
            confidence: (50.0 + (0.8 - ratio) * 50.0).min(80.0),
            variance,
        }
    } else {
        TimingResult {
            status: TimingStatus::Ambiguous,
            ratio,
            confidence: 40.0,
            variance,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_fake_samples_is_insufficient_data() {
        let r = analyze(100.0, &[]);
        assert_eq!(r.status, TimingStatus::InsufficientData);
        assert_eq!(r.ratio, 1.0);
    }

    #[test]
    fn ratio_exactly_1_4_is_not_valid() {
        let r = analyze(140.0, &[100.0]);
        assert_eq!(r.ratio, 1.4);
        assert_eq!(r.status, TimingStatus::Ambiguous);
    }

    #[test]
    fn ratio_exactly_0_8_is_not_catch_all() {
        let r = analyze(80.0, &[100.0]);
        assert_eq!(r.ratio, 0.8);
        assert_eq!(r.status, TimingStatus::Ambiguous);
    }

    #[test]
    fn ratio_above_threshold_is_valid() {
        let r = analyze(180.0, &[100.0]);
        assert_eq!(r.status, TimingStatus::Valid);
        assert!(r.confidence <= 90.0);
    }

    #[test]
    fn ratio_below_threshold_is_catch_all() {
        let r = analyze(50.0, &[100.0]);
        assert_eq!(r.status, TimingStatus::CatchAll);
        assert!(r.confidence <= 80.0);
    }

    #[test]
    fn all_zero_fake_times_fall_back_to_ratio_one() {
        let r = analyze(100.0, &[0.0, 0.0]);
        assert_eq!(r.ratio, 1.0);
    }
}

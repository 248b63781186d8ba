use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// Similarity of two continuous values inside a tolerance window
///
/// Returns 1.0 for identical values, falling linearly to 0.0 at a distance of
/// `tolerance`. Never negative.
pub fn continuous_similarity(candidate: f64, reference: f64, tolerance: f64) -> f64 {
    if !(tolerance > 0.0) {
        return if candidate == reference { 1.0 } else { 0.0 };
    }
    (1.0 - (candidate - reference).abs() / tolerance).clamp(0.0, 1.0)
}

/// Jaccard index of two sets, undefined when either side is empty
pub fn jaccard(candidate: &BTreeSet<String>, reference: &BTreeSet<String>) -> Option<f64> {
    if candidate.is_empty() || reference.is_empty() {
        return None;
    }
    let intersection = candidate.intersection(reference).count();
    let union = candidate.union(reference).count();
    Some(intersection as f64 / union as f64)
}

/// Rating rescaled linearly from `0..=scale` to `0..=1`
pub fn rating_quality(rating: f64, scale: f64) -> f64 {
    if !(scale > 0.0) {
        return 0.0;
    }
    (rating / scale).clamp(0.0, 1.0)
}

/// Recency score of a timestamp relative to `now`
///
/// 1.0 inside the timeframe, linear decay to 0.0 at twice the timeframe.
/// Timestamps in the future count as brand new.
pub fn recency(created_at: DateTime<Utc>, now: DateTime<Utc>, timeframe_days: u32) -> f64 {
    let age_days = (now - created_at).num_seconds() as f64 / 86_400.0;
    let timeframe = f64::from(timeframe_days);

    if age_days <= timeframe {
        return 1.0;
    }
    if timeframe <= 0.0 {
        return 0.0;
    }
    (1.0 - (age_days - timeframe) / timeframe).max(0.0)
}

/// Arithmetic mean, undefined for an empty input
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_continuous_similarity_window() {
        assert_eq!(continuous_similarity(30.0, 30.0, 5.0), 1.0);
        assert!((continuous_similarity(32.0, 30.0, 5.0) - 0.6).abs() < 1e-9);
        assert_eq!(continuous_similarity(35.0, 30.0, 5.0), 0.0);
        assert_eq!(continuous_similarity(50.0, 30.0, 5.0), 0.0);
    }

    #[test]
    fn test_continuous_similarity_is_symmetric() {
        assert_eq!(
            continuous_similarity(170.0, 172.0, 10.0),
            continuous_similarity(172.0, 170.0, 10.0)
        );
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&set(&["a", "b", "c"]), &set(&["a", "b", "c"])), Some(1.0));
        let partial = jaccard(&set(&["a", "b"]), &set(&["a", "b", "c"])).unwrap();
        assert!((partial - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard(&set(&["x"]), &set(&["a"])), Some(0.0));
    }

    #[test]
    fn test_jaccard_undefined_for_empty_sets() {
        assert_eq!(jaccard(&BTreeSet::new(), &set(&["a"])), None);
        assert_eq!(jaccard(&set(&["a"]), &BTreeSet::new()), None);
    }

    #[test]
    fn test_rating_quality_clamps() {
        assert_eq!(rating_quality(80.0, 100.0), 0.8);
        assert_eq!(rating_quality(150.0, 100.0), 1.0);
        assert_eq!(rating_quality(-3.0, 100.0), 0.0);
        assert_eq!(rating_quality(3.0, 5.0), 0.6);
    }

    #[test]
    fn test_recency_decay() {
        let now = Utc::now();
        assert_eq!(recency(now - Duration::days(10), now, 30), 1.0);
        assert_eq!(recency(now - Duration::days(30), now, 30), 1.0);
        assert!((recency(now - Duration::days(45), now, 30) - 0.5).abs() < 1e-9);
        assert_eq!(recency(now - Duration::days(60), now, 30), 0.0);
        assert_eq!(recency(now - Duration::days(400), now, 30), 0.0);
    }

    #[test]
    fn test_recency_future_is_new() {
        let now = Utc::now();
        assert_eq!(recency(now + Duration::days(3), now, 30), 1.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![]), None);
        assert_eq!(mean(vec![1.0, 0.5]), Some(0.75));
    }
}

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::models::{Category, ScoredCandidate};

/// Ranking order: composite descending, then id ascending
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.composite()
        .total_cmp(&a.composite())
        .then_with(|| a.id().cmp(b.id()))
}

/// Candidates that may be scored at all
///
/// Excluded items are removed before scoring so they never take a slot in a
/// top-N list. Repeated ids are collapsed to their first occurrence.
pub fn eligible<'a, T, I, F>(items: &'a [T], id: I, excluded: F) -> Vec<&'a T>
where
    I: Fn(&T) -> &str,
    F: Fn(&T) -> bool,
{
    let mut seen = HashSet::new();
    let eligible: Vec<&T> = items
        .iter()
        .filter(|item| !excluded(*item))
        .filter(|item| seen.insert(id(*item)))
        .collect();

    tracing::debug!(
        total = items.len(),
        eligible = eligible.len(),
        "Exclusions applied"
    );

    eligible
}

/// Membership rule and ordering key of one category
///
/// The key returns `None` for candidates outside the category.
pub struct CategoryRule<'a> {
    category: Category,
    key: Box<dyn Fn(&ScoredCandidate) -> Option<f64> + Send + Sync + 'a>,
}

impl<'a> CategoryRule<'a> {
    pub fn new<K>(category: Category, key: K) -> Self
    where
        K: Fn(&ScoredCandidate) -> Option<f64> + Send + Sync + 'a,
    {
        Self {
            category,
            key: Box::new(key),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn key(&self, candidate: &ScoredCandidate) -> Option<f64> {
        (self.key)(candidate)
    }
}

/// Global and per-category picks of one run
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub top: Vec<ScoredCandidate>,
    pub by_category: BTreeMap<Category, Vec<ScoredCandidate>>,
}

/// Thresholded candidates in ranking order
#[derive(Debug, Clone)]
pub struct RankedPool {
    entries: Vec<ScoredCandidate>,
    min_similarity_score: f64,
}

impl RankedPool {
    /// Drops candidates below the threshold and sorts the rest
    pub fn new(candidates: Vec<ScoredCandidate>, min_similarity_score: f64) -> Self {
        let scored = candidates.len();
        let mut entries: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|c| c.composite() >= min_similarity_score)
            .collect();
        entries.sort_by(compare);

        tracing::debug!(
            scored,
            kept = entries.len(),
            min_similarity_score,
            "Candidates ranked"
        );

        Self {
            entries,
            min_similarity_score,
        }
    }

    pub fn entries(&self) -> &[ScoredCandidate] {
        &self.entries
    }

    pub fn min_similarity_score(&self) -> f64 {
        self.min_similarity_score
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self, n: usize) -> Vec<ScoredCandidate> {
        self.entries.iter().take(n).cloned().collect()
    }

    /// Top `n` of each side of a split, in ranking order
    pub fn partition_top<P>(&self, n: usize, predicate: P) -> (Vec<ScoredCandidate>, Vec<ScoredCandidate>)
    where
        P: Fn(&ScoredCandidate) -> bool,
    {
        let (matching, rest): (Vec<&ScoredCandidate>, Vec<&ScoredCandidate>) =
            self.entries.iter().partition(|c| predicate(*c));

        (
            matching.into_iter().take(n).cloned().collect(),
            rest.into_iter().take(n).cloned().collect(),
        )
    }

    /// Top `k` members of one category
    ///
    /// Ordered by the category key, then by the ranking order.
    pub fn select_category(&self, rule: &CategoryRule<'_>, k: usize) -> Vec<ScoredCandidate> {
        let mut members: Vec<(f64, &ScoredCandidate)> = self
            .entries
            .iter()
            .filter_map(|c| rule.key(c).filter(|key| key.is_finite()).map(|key| (key, c)))
            .collect();

        members.sort_by(|(ka, a), (kb, b)| kb.total_cmp(ka).then_with(|| compare(a, b)));

        members
            .into_iter()
            .take(k)
            .map(|(_, c)| c.clone().with_category(rule.category()))
            .collect()
    }

    /// Global top `n` plus top `k` of every category
    pub fn select(&self, n: usize, k: usize, rules: &[CategoryRule<'_>]) -> Selection {
        let by_category = rules
            .iter()
            .map(|rule| (rule.category(), self.select_category(rule, k)))
            .collect();

        Selection {
            top: self.top(n),
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CriterionKind;

    fn candidate(id: &str, composite: f64) -> ScoredCandidate {
        let mut scores = std::collections::BTreeMap::new();
        scores.insert(CriterionKind::CupSize, composite);
        ScoredCandidate::new(id.to_string(), id.to_uppercase(), scores, composite)
    }

    fn ids(candidates: &[ScoredCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_threshold_drops_before_selection() {
        let pool = RankedPool::new(
            vec![candidate("a", 0.9), candidate("b", 0.4), candidate("c", 0.6)],
            0.5,
        );
        assert_eq!(ids(pool.entries()), vec!["a", "c"]);
        assert_eq!(ids(&pool.top(5)), vec!["a", "c"]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let pool = RankedPool::new(
            vec![candidate("z", 0.8), candidate("m", 0.8), candidate("a", 0.8)],
            0.0,
        );
        assert_eq!(ids(pool.entries()), vec!["a", "m", "z"]);
    }

    #[test]
    fn test_candidate_at_threshold_is_kept() {
        let pool = RankedPool::new(vec![candidate("a", 0.75)], 0.75);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_eligible_excludes_and_collapses_duplicates() {
        let items = vec![("p1", 1), ("p2", 2), ("p1", 3), ("fav", 4)];
        let kept = eligible(&items, |(id, _)| *id, |(id, _)| *id == "fav");
        assert_eq!(kept, vec![&("p1", 1), &("p2", 2)]);
    }

    #[test]
    fn test_category_orders_by_key_then_rank() {
        let pool = RankedPool::new(
            vec![candidate("a", 0.9), candidate("b", 0.8), candidate("c", 0.7)],
            0.0,
        );
        let rule = CategoryRule::new(Category::Novelty, |c: &ScoredCandidate| match c.id() {
            "a" => None,
            "b" => Some(0.5),
            _ => Some(0.5),
        });

        let picked = pool.select_category(&rule, 5);
        assert_eq!(ids(&picked), vec!["b", "c"]);
        assert!(picked.iter().all(|c| c.category() == Some(Category::Novelty)));
    }

    #[test]
    fn test_category_respects_limit() {
        let pool = RankedPool::new(
            vec![candidate("a", 0.9), candidate("b", 0.8), candidate("c", 0.7)],
            0.0,
        );
        let rule = CategoryRule::new(Category::ZeroCounter, |c: &ScoredCandidate| {
            Some(c.composite())
        });
        assert_eq!(ids(&pool.select_category(&rule, 2)), vec!["a", "b"]);
    }

    #[test]
    fn test_partition_top() {
        let pool = RankedPool::new(
            vec![
                candidate("a", 0.9),
                candidate("b", 0.8),
                candidate("c", 0.7),
                candidate("d", 0.6),
            ],
            0.0,
        );
        let (with, without) = pool.partition_top(1, |c| c.id() == "b" || c.id() == "d");
        assert_eq!(ids(&with), vec!["b"]);
        assert_eq!(ids(&without), vec!["a"]);
    }
}

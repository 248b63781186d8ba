use std::collections::BTreeMap;

use crate::{
    error::{AppError, AppResult},
    models::{CriterionKind, ScoredCandidate},
};

/// Combines criterion scores into one composite score
///
/// The composite is the weighted mean over the criteria a candidate has a
/// score for, so a missing attribute shifts weight to the remaining criteria
/// instead of counting as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAggregator {
    weights: BTreeMap<CriterionKind, f64>,
}

impl WeightedAggregator {
    /// Validates the weight table of the enabled criteria
    pub fn new(weights: BTreeMap<CriterionKind, f64>) -> AppResult<Self> {
        for (kind, weight) in &weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AppError::Configuration(format!(
                    "Weight of {} must be a non-negative number, got {}",
                    kind, weight
                )));
            }
        }

        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(AppError::Configuration(format!(
                "Enabled criteria must have a positive total weight, got {} across {} criteria",
                total,
                weights.len()
            )));
        }

        Ok(Self { weights })
    }

    pub fn weights(&self) -> &BTreeMap<CriterionKind, f64> {
        &self.weights
    }

    pub fn weight(&self, kind: CriterionKind) -> Option<f64> {
        self.weights.get(&kind).copied()
    }

    /// Same table with one weight replaced
    pub fn with_weight(&self, kind: CriterionKind, weight: f64) -> AppResult<Self> {
        let mut weights = self.weights.clone();
        weights.insert(kind, weight);
        Self::new(weights)
    }

    /// Renormalized weighted mean over the defined scores
    ///
    /// `None` when no enabled criterion with positive weight has a score.
    pub fn composite(&self, scores: &BTreeMap<CriterionKind, f64>) -> Option<f64> {
        let (weighted, total) = scores
            .iter()
            .filter_map(|(kind, score)| self.weight(*kind).map(|w| (w, *score)))
            .fold((0.0, 0.0), |(weighted, total), (w, s)| {
                (weighted + w * s, total + w)
            });

        (total > 0.0).then(|| weighted / total)
    }

    /// Builds a scored candidate, or `None` when it cannot be ranked
    pub fn aggregate(
        &self,
        id: &str,
        name: &str,
        scores: BTreeMap<CriterionKind, f64>,
    ) -> Option<ScoredCandidate> {
        let scores: BTreeMap<CriterionKind, f64> = scores
            .into_iter()
            .filter(|(kind, _)| self.weights.contains_key(kind))
            .collect();

        match self.composite(&scores) {
            Some(composite) => Some(ScoredCandidate::new(
                id.to_string(),
                name.to_string(),
                scores,
                composite,
            )),
            None => {
                tracing::debug!(candidate = %id, "No defined criterion, candidate not ranked");
                None
            }
        }
    }

    /// Recomputes a candidate's composite under this weight table
    pub fn reweighted(&self, candidate: &ScoredCandidate) -> Option<ScoredCandidate> {
        self.aggregate(candidate.id(), candidate.name(), candidate.scores().clone())
    }
}

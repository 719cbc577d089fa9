//! Ranking metrics
//!
//! ROC-AUC is computed from ranks (the Mann-Whitney U statistic) with tied
//! scores sharing their average rank, which equals the area under the
//! trapezoidal ROC curve. AUC needs the full ranking of a category, so
//! callers buffer every score before computing it.

use toxeval_core::is_label_available;

/// Why a metric could not be computed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("targets ({targets}) and scores ({scores}) differ in length")]
    LengthMismatch { targets: usize, scores: usize },

    #[error("no labeled items")]
    Empty,

    #[error("only one class present in targets; ROC AUC is not defined in that case")]
    SingleClass,

    #[error("target {0} is not a binary label")]
    NonBinaryTarget(f32),

    #[error("scores contain a non-finite value")]
    NonFiniteScore,
}

/// Area under the ROC curve of `scores` against binary `targets`
pub fn roc_auc(targets: &[f32], scores: &[f32]) -> Result<f64, MetricError> {
    if targets.len() != scores.len() {
        return Err(MetricError::LengthMismatch {
            targets: targets.len(),
            scores: scores.len(),
        });
    }
    if targets.is_empty() {
        return Err(MetricError::Empty);
    }
    if let Some(bad) = targets.iter().find(|t| **t != 0.0 && **t != 1.0) {
        return Err(MetricError::NonBinaryTarget(*bad));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(MetricError::NonFiniteScore);
    }

    let n_pos = targets.iter().filter(|t| **t == 1.0).count();
    let n_neg = targets.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(MetricError::SingleClass);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Sum of (1-based) ranks held by positives; ties get their average rank
    let mut positive_rank_sum = 0.0f64;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }

        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        let positives = order[start..=end]
            .iter()
            .filter(|&&idx| targets[idx] == 1.0)
            .count();
        positive_rank_sum += avg_rank * positives as f64;

        start = end + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    let u = positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg))
}

/// One category's targets and scores, restricted to items with a usable label
pub fn masked_column(targets: &[Vec<f32>], scores: &[Vec<f32>], category: usize) -> (Vec<f32>, Vec<f32>) {
    targets
        .iter()
        .zip(scores)
        .filter_map(|(t, s)| {
            let target = *t.get(category)?;
            let score = *s.get(category)?;
            is_label_available(target).then_some((target, score))
        })
        .unzip()
}

/// Per-category ROC-AUC; undefined categories are recorded as `NaN`
pub fn per_category_auc(targets: &[Vec<f32>], scores: &[Vec<f32>], num_categories: usize) -> Vec<f64> {
    (0..num_categories)
        .map(|category| {
            let (t, s) = masked_column(targets, scores, category);
            match roc_auc(&t, &s) {
                Ok(auc) => auc,
                Err(e) => {
                    tracing::warn!(category, labeled = t.len(), "AUC undefined, recording NaN: {}", e);
                    f64::NAN
                }
            }
        })
        .collect()
}

/// Mean of the non-`NaN` values; `NaN` when there are none
pub fn nan_mean(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.is_empty() {
        f64::NAN
    } else {
        defined.iter().sum::<f64>() / defined.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use toxeval_core::LABEL_UNAVAILABLE;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_known_auc() {
        let auc = roc_auc(&[0.0, 0.0, 1.0, 1.0], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!(approx(auc, 0.75));
    }

    #[test]
    fn test_perfect_and_inverted() {
        assert!(approx(roc_auc(&[0.0, 1.0], &[0.2, 0.9]).unwrap(), 1.0));
        assert!(approx(roc_auc(&[0.0, 1.0], &[0.9, 0.2]).unwrap(), 0.0));
    }

    #[test]
    fn test_ties_count_half() {
        let auc = roc_auc(&[0.0, 1.0, 0.0, 1.0], &[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert!(approx(auc, 0.5));

        // one tied pair out of four
        let auc = roc_auc(&[0.0, 0.0, 1.0, 1.0], &[0.1, 0.6, 0.6, 0.9]).unwrap();
        assert!(approx(auc, 0.875));
    }

    #[test]
    fn test_single_class_is_error() {
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.3, 0.7]), Err(MetricError::SingleClass));
        assert_eq!(roc_auc(&[], &[]), Err(MetricError::Empty));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(roc_auc(&[0.0, 0.5], &[0.1, 0.2]), Err(MetricError::NonBinaryTarget(0.5)));
        assert_eq!(roc_auc(&[0.0, 1.0], &[0.1, f32::NAN]), Err(MetricError::NonFiniteScore));
        assert!(matches!(roc_auc(&[0.0], &[0.1, 0.2]), Err(MetricError::LengthMismatch { .. })));
    }

    #[test]
    fn test_masking_excludes_sentinel() {
        let targets = vec![vec![1.0], vec![LABEL_UNAVAILABLE], vec![0.0], vec![1.0]];
        let scores = vec![vec![0.9], vec![0.5], vec![0.1], vec![0.8]];

        let (t, s) = masked_column(&targets, &scores, 0);
        assert_eq!(t, vec![1.0, 0.0, 1.0]);
        assert_eq!(s, vec![0.9, 0.1, 0.8]);

        let aucs = per_category_auc(&targets, &scores, 1);
        assert!(approx(aucs[0], roc_auc(&[1.0, 0.0, 1.0], &[0.9, 0.1, 0.8]).unwrap()));
        assert!(approx(aucs[0], 1.0));
    }

    #[test]
    fn test_undefined_category_is_nan() {
        let targets = vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![0.0, LABEL_UNAVAILABLE]];
        let scores = vec![vec![0.2, 0.4], vec![0.7, 0.9], vec![0.1, 0.3]];

        let aucs = per_category_auc(&targets, &scores, 2);
        assert!(approx(aucs[0], 1.0));
        assert!(aucs[1].is_nan());
        assert!(approx(nan_mean(&aucs), 1.0));
    }

    #[test]
    fn test_nan_mean() {
        assert!(approx(nan_mean(&[0.5, f64::NAN, 1.0]), 0.75));
        assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
        assert!(nan_mean(&[]).is_nan());
    }

    fn labeled_scores() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        prop::collection::vec((prop::bool::ANY, 0.0f32..1.0), 2..64).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(label, score)| (if label { 1.0f32 } else { 0.0 }, score))
                .unzip::<f32, f32, Vec<f32>, Vec<f32>>()
        })
    }

    proptest! {
        #[test]
        fn prop_auc_in_unit_interval((targets, scores) in labeled_scores()) {
            if let Ok(auc) = roc_auc(&targets, &scores) {
                prop_assert!((0.0..=1.0).contains(&auc));
            }
        }

        #[test]
        fn prop_monotone_transform_invariant((targets, scores) in labeled_scores()) {
            let scaled: Vec<f32> = scores.iter().map(|s| s * 4.0).collect();
            match (roc_auc(&targets, &scores), roc_auc(&targets, &scaled)) {
                (Ok(a), Ok(b)) => prop_assert!((a - b).abs() < 1e-9),
                (a, b) => prop_assert_eq!(a.is_err(), b.is_err()),
            }
        }

        #[test]
        fn prop_flipped_labels_complement((targets, scores) in labeled_scores()) {
            let flipped: Vec<f32> = targets.iter().map(|t| 1.0 - t).collect();
            if let (Ok(a), Ok(b)) = (roc_auc(&targets, &scores), roc_auc(&flipped, &scores)) {
                prop_assert!((a + b - 1.0).abs() < 1e-9);
            }
        }
    }
}

//! Cosine-similarity dedup against a scout's recent findings (spec.md §4.F).
//! No cross-scout or cross-user comparison: a finding is only ever checked
//! against the window of its own scout's history.

use scout_common::{Embedding, RecentFinding};
use uuid::Uuid;

/// Best match found against the recent-findings window, if any cleared
/// the similarity threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupMatch {
    pub execution_id: Uuid,
    pub summary_text: String,
    pub similarity: f64,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// Compares `new` against every finding in `recent`, returning the highest
/// scoring match at or above `threshold`. `recent` is assumed already
/// bounded to the scout's most recent window (spec.md §4.C
/// `listRecentCompletedWithEmbedding`); this function does no truncation
/// of its own.
pub fn find_best_match(
    new: &Embedding,
    recent: &[RecentFinding],
    threshold: f64,
) -> Option<DedupMatch> {
    recent
        .iter()
        .map(|finding| {
            let similarity = cosine_similarity(new.as_slice(), finding.embedding.as_slice());
            DedupMatch {
                execution_id: finding.execution_id,
                summary_text: finding.summary_text.clone(),
                similarity,
            }
        })
        .filter(|m| m.similarity >= threshold)
        .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn embedding(values: Vec<f32>) -> Embedding {
        let mut v = values;
        v.resize(scout_common::EMBEDDING_DIM, 0.0);
        Embedding::new(v).unwrap()
    }

    fn finding(execution_id: Uuid, values: Vec<f32>) -> RecentFinding {
        RecentFinding {
            scout_id: Uuid::new_v4(),
            execution_id,
            summary_text: "a prior finding".to_string(),
            embedding: embedding(values),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn identical_vectors_are_a_perfect_match() {
        let mut values = vec![0.0; scout_common::EMBEDDING_DIM];
        values[0] = 1.0;
        let new = embedding(values.clone());
        let id = Uuid::new_v4();
        let recent = vec![finding(id, values)];

        let m = find_best_match(&new, &recent, 0.85).unwrap();
        assert_eq!(m.execution_id, id);
        assert!((m.similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_fall_below_threshold() {
        let mut a_values = vec![0.0; scout_common::EMBEDDING_DIM];
        a_values[0] = 1.0;
        let mut b_values = vec![0.0; scout_common::EMBEDDING_DIM];
        b_values[1] = 1.0;

        let new = embedding(a_values);
        let recent = vec![finding(Uuid::new_v4(), b_values)];

        assert!(find_best_match(&new, &recent, 0.85).is_none());
    }

    #[test]
    fn zero_vector_never_matches_and_never_nans() {
        let new = embedding(vec![0.0; scout_common::EMBEDDING_DIM]);
        let recent = vec![finding(Uuid::new_v4(), vec![0.0; scout_common::EMBEDDING_DIM])];

        assert!(find_best_match(&new, &recent, 0.0).is_none());
    }

    #[test]
    fn picks_highest_scoring_match_among_several() {
        let mut target = vec![0.0; scout_common::EMBEDDING_DIM];
        target[0] = 1.0;
        target[1] = 0.1;
        let new = embedding(target.clone());

        let mut weaker = vec![0.0; scout_common::EMBEDDING_DIM];
        weaker[0] = 1.0;
        weaker[1] = 0.9;
        let weak_id = Uuid::new_v4();
        let strong_id = Uuid::new_v4();

        let recent = vec![finding(weak_id, weaker), finding(strong_id, target)];

        let m = find_best_match(&new, &recent, 0.5).unwrap();
        assert_eq!(m.execution_id, strong_id);
    }

    #[test]
    fn empty_recent_findings_never_match() {
        let new = embedding(vec![1.0; scout_common::EMBEDDING_DIM]);
        assert!(find_best_match(&new, &[], 0.0).is_none());
    }
}

//! Blends each hit's lexical and vector scores into a single final score,
//! with a small bonus for a direct title match, then sorts by that score.

use spotlight_core::{RankerConfig, SearchHit};
use std::cmp::Ordering;

const EXACT_TITLE_MATCH_BONUS: f32 = 0.05;
const TITLE_PREFIX_MATCH_BONUS: f32 = 0.03;
const TITLE_CONTAINS_MATCH_BONUS: f32 = 0.02;

pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    /// Computes `final_score` for every hit that doesn't already carry one
    /// (an engine that produces its own final score, e.g. a remote search
    /// service, is never overwritten), adds a title-match bonus, and
    /// returns the hits sorted from highest to lowest. Ties keep their
    /// incoming relative order (a stable sort), so callers that pre-sort
    /// by recency for equal scores aren't surprised by a reshuffle.
    pub fn rank(&self, query: &str, mut hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let normalized_query = query.trim().to_lowercase();

        for hit in &mut hits {
            if hit.final_score == 0.0 {
                hit.final_score =
                    self.config.lexical_weight * hit.lexical_score + self.config.vector_weight * hit.vector_score;
            }

            let bonus = title_match_bonus(&normalized_query, &hit.document.title);
            if bonus > 0.0 {
                hit.final_score += bonus;
                hit.why_matched = format!("{}+title-match", hit.why_matched);
            }
        }

        hits.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(Ordering::Equal));
        hits
    }
}

/// `+0.05` for an exact match, `+0.03` for a prefix match, else
/// `+0.02 * |q| / |t|` when `t` merely contains `q`. Zero when `q` is
/// empty or absent from `t` altogether.
fn title_match_bonus(normalized_query: &str, title: &str) -> f32 {
    if normalized_query.is_empty() {
        return 0.0;
    }
    let normalized_title = title.trim().to_lowercase();

    if normalized_title == normalized_query {
        EXACT_TITLE_MATCH_BONUS
    } else if normalized_title.starts_with(normalized_query) {
        TITLE_PREFIX_MATCH_BONUS
    } else if normalized_title.contains(normalized_query) {
        TITLE_CONTAINS_MATCH_BONUS * (normalized_query.len() as f32 / normalized_title.len() as f32)
    } else {
        0.0
    }
}

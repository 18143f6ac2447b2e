use crate::index::RowIndex;
use crate::text::{normalize_title, token_set_score, tokens};
use ahash::AHashSet;

/// Standard acceptance threshold for a fuzzy title match.
pub const MATCH_THRESHOLD: u32 = 90;
/// World-route titles are messier; accept lower-confidence matches there.
pub const WORLD_MATCH_THRESHOLD: u32 = 80;

/// Mismatched year tokens cap the score here no matter how well the rest of
/// the title overlaps: a different year is a different release.
const YEAR_MISMATCH_CAP: u32 = 88;
/// Containment only counts when the shorter side has this much substance.
const CONTAINMENT_MIN_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHit {
    /// The indexed key that won.
    pub key: String,
    pub score: u32,
    /// 0-based source row in the sheet.
    pub row: usize,
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}

/// Adjust a base token-set score using what actually differs between the
/// candidate and the indexed key, treating year tokens separately.
pub fn boost_score(base: u32, candidate_norm: &str, key_norm: &str) -> u32 {
    if base >= 100 {
        return base;
    }
    let a = tokens(candidate_norm);
    let b = tokens(key_norm);
    let shared = a.intersection(&b).count();
    let missing: Vec<&str> = a.difference(&b).copied().filter(|t| !is_year_token(t)).collect();
    let extra: Vec<&str> = b.difference(&a).copied().filter(|t| !is_year_token(t)).collect();

    let years_a: AHashSet<&str> = a.iter().copied().filter(|t| is_year_token(t)).collect();
    let years_b: AHashSet<&str> = b.iter().copied().filter(|t| is_year_token(t)).collect();
    if !years_a.is_empty() && !years_b.is_empty() && years_a.is_disjoint(&years_b) {
        return base.min(YEAR_MISMATCH_CAP);
    }

    if missing.is_empty() && extra.is_empty() {
        return 100;
    }
    if missing.is_empty() && (1..=2).contains(&extra.len()) && shared >= 3 {
        return base.max(95);
    }
    if missing.is_empty() && !extra.is_empty() && shared >= 2 {
        return base.max(92);
    }
    base
}

fn containment_boost(score: u32, candidate_norm: &str, key_norm: &str) -> u32 {
    let shorter = candidate_norm.len().min(key_norm.len());
    if shorter >= CONTAINMENT_MIN_LEN
        && (candidate_norm.contains(key_norm) || key_norm.contains(candidate_norm))
    {
        score.max(92)
    } else {
        score
    }
}

/// Best (candidate, indexed key) pair across the whole candidate set, if it
/// clears `min_score`. Ties keep the earliest indexed key.
pub fn best_match(
    candidates: &[String],
    index: &RowIndex,
    min_score: u32,
    allow_containment: bool,
) -> Option<MatchHit> {
    let normalized: Vec<String> = candidates.iter().map(|c| normalize_title(c)).collect();
    let mut best: Option<(String, u32)> = None;

    for key in index.keys() {
        let mut best_for_key = 0;
        for candidate in &normalized {
            let base = token_set_score(candidate, key);
            let mut score = boost_score(base, candidate, key);
            if allow_containment {
                score = containment_boost(score, candidate, key);
            }
            if score > best_for_key {
                best_for_key = score;
            }
        }
        if best
            .as_ref()
            .is_none_or(|(_, best_score)| best_for_key > *best_score)
        {
            best = Some((key.to_string(), best_for_key));
        }
    }

    let (key, score) = best?;
    if score < min_score {
        return None;
    }
    let row = index.row_for(&key)?;
    Some(MatchHit { key, score, row })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_token_sets_force_a_perfect_score() {
        let key = "the great escape 1963";
        assert_eq!(boost_score(100, key, key), 100);
        assert_eq!(boost_score(72, "the great escape", "the great escape"), 100);
    }

    #[test]
    fn small_extras_with_enough_shared_tokens_boost_high() {
        // One extra non-year token, three shared.
        let score = boost_score(
            token_set_score("the dark knight rises", "the dark knight rises imax"),
            "the dark knight rises",
            "the dark knight rises imax",
        );
        assert!(score >= 95, "got {score}");

        // Extras but only two shared tokens.
        let score = boost_score(
            token_set_score("dark knight", "dark knight extended cut"),
            "dark knight",
            "dark knight extended cut",
        );
        assert!((92..95).contains(&score), "got {score}");
    }

    #[test]
    fn mismatched_years_cap_an_otherwise_identical_title() {
        let score = boost_score(
            token_set_score("the great escape 1963", "the great escape 1999"),
            "the great escape 1963",
            "the great escape 1999",
        );
        assert!(score <= 88, "got {score}");
    }

    #[test]
    fn matching_years_do_not_trip_the_cap() {
        // Years agree and the key only adds "the": boosted, not capped.
        let score = boost_score(
            token_set_score("great escape 1963", "the great escape 1963"),
            "great escape 1963",
            "the great escape 1963",
        );
        assert!(score >= 95, "got {score}");
    }

    #[test]
    fn missing_content_is_never_boosted() {
        // Candidate has a token the key lacks: not a superset situation.
        let base = token_set_score("blue planet oceans", "blue planet");
        assert_eq!(boost_score(base, "blue planet oceans", "blue planet"), base);
    }

    #[test]
    fn containment_requires_length_and_opt_in() {
        assert_eq!(containment_boost(50, "arabian nights live", "arabian nights"), 92);
        // Too short to trust containment.
        assert_eq!(containment_boost(50, "aaa", "aaa bbb"), 50);
        // Boost never lowers a score.
        assert_eq!(containment_boost(97, "arabian nights live", "arabian nights"), 97);
    }
}

//! Evidence aggregation: merge, dedupe, order and bound retrieved items.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::models::{EvidenceItem, EvidenceSet};
use super::VerifierConfig;

/// Build the bounded evidence set for one verification.
///
/// Fallback items are used only when `primary` is empty. Duplicate ids keep
/// their first occurrence. Scored items come first by descending
/// similarity, then unscored items newest first; the sort is stable so ties
/// keep retrieval order. Scores must be higher-is-closer; the index
/// converts distances under its distance measure before they get here.
/// Pure and idempotent.
pub fn aggregate(
    primary: &[EvidenceItem],
    fallback: &[EvidenceItem],
    config: &VerifierConfig,
) -> EvidenceSet {
    let source = if primary.is_empty() { fallback } else { primary };

    let mut seen = HashSet::new();
    let mut items: Vec<EvidenceItem> = source
        .iter()
        .filter(|item| seen.insert(item.id.as_str()))
        .cloned()
        .collect();

    items.sort_by(compare);
    items.truncate(config.max_evidence);
    for item in &mut items {
        truncate_chars(&mut item.snippet, config.snippet_chars);
    }

    EvidenceSet::from_aggregated(items)
}

fn compare(a: &EvidenceItem, b: &EvidenceItem) -> Ordering {
    match (a.similarity_score, b.similarity_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        // Newest first, undated last
        (None, None) => match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((end, _)) = text.char_indices().nth(max_chars) {
        text.truncate(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn scored(id: &str, score: f64) -> EvidenceItem {
        EvidenceItem {
            snippet: format!("snippet {id}"),
            ..EvidenceItem::bare(id, Some(score))
        }
    }

    fn dated(id: &str, day: Option<u32>) -> EvidenceItem {
        EvidenceItem {
            snippet: format!("snippet {id}"),
            published_at: day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()),
            ..EvidenceItem::bare(id, None)
        }
    }

    fn ids(set: &EvidenceSet) -> Vec<&str> {
        set.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn primary_wins_over_fallback() {
        let set = aggregate(&[scored("p", 0.9)], &[dated("f", Some(1))], &VerifierConfig::default());
        assert_eq!(ids(&set), vec!["p"]);
    }

    #[test]
    fn fallback_used_when_primary_empty() {
        let set = aggregate(
            &[],
            &[dated("old", Some(1)), dated("undated", None), dated("new", Some(9))],
            &VerifierConfig::default(),
        );
        assert_eq!(ids(&set), vec!["new", "old", "undated"]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let mut dup = scored("a", 0.1);
        dup.snippet = "second copy".to_string();

        let set = aggregate(&[scored("a", 0.5), scored("b", 0.7), dup], &[], &VerifierConfig::default());

        assert_eq!(ids(&set), vec!["b", "a"]);
        assert_eq!(set.items()[1].snippet, "snippet a");
    }

    #[test]
    fn scored_items_sort_before_unscored() {
        let set = aggregate(
            &[dated("d", Some(5)), scored("low", 0.2), scored("high", 0.8)],
            &[],
            &VerifierConfig::default(),
        );
        assert_eq!(ids(&set), vec!["high", "low", "d"]);
    }

    #[test]
    fn bounded_count_and_snippet_length() {
        let config = VerifierConfig {
            max_evidence: 3,
            snippet_chars: 5,
            ..Default::default()
        };
        let mut long = scored("long", 0.99);
        long.snippet = "ñandú ñandú".to_string();
        let mut primary: Vec<EvidenceItem> = (0..8).map(|n| scored(&format!("n{n}"), 0.1)).collect();
        primary.push(long);

        let set = aggregate(&primary, &[], &config);

        assert_eq!(set.len(), 3);
        assert_eq!(set.items()[0].snippet, "ñandú");
        assert!(set.iter().all(|i| i.snippet.chars().count() <= 5));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let primary = vec![scored("a", 0.3), scored("b", 0.3), scored("a", 0.9), dated("c", Some(2))];
        let fallback = vec![dated("f", Some(4))];
        let config = VerifierConfig::default();

        let first = aggregate(&primary, &fallback, &config);
        let second = aggregate(&primary, &fallback, &config);
        assert_eq!(first, second);

        // Re-aggregating the output changes nothing either
        let again = aggregate(first.items(), &[], &config);
        assert_eq!(again, first);
    }

    #[test]
    fn no_duplicate_ids_ever() {
        let primary: Vec<EvidenceItem> = ["x", "y", "x", "z", "y"].iter().map(|id| scored(id, 0.5)).collect();
        let set = aggregate(&primary, &[], &VerifierConfig::default());

        let unique: HashSet<&str> = ids(&set).into_iter().collect();
        assert_eq!(unique.len(), set.len());
    }
}

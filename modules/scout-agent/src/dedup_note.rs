use scout_dedup::DedupMatch;

/// Appends a human-readable duplicate note to the response text when a
/// match cleared the similarity threshold (Open Question resolution,
/// SPEC_FULL.md §9): the `duplicate` column is authoritative for routing,
/// this note just tells a reader why no email went out.
pub fn annotate_if_duplicate(response: String, best_match: Option<&DedupMatch>) -> String {
    match best_match {
        Some(m) => format!(
            "{response}\n\n_Note: this closely matches an earlier finding (similarity {:.2}): \"{}\"._",
            m.similarity, m.summary_text
        ),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn no_match_leaves_response_untouched() {
        let response = "original text".to_string();
        assert_eq!(annotate_if_duplicate(response.clone(), None), response);
    }

    #[test]
    fn match_appends_a_note_with_similarity_and_prior_summary() {
        let m = DedupMatch {
            execution_id: Uuid::new_v4(),
            summary_text: "prior summary".to_string(),
            similarity: 0.91,
        };
        let annotated = annotate_if_duplicate("original text".to_string(), Some(&m));
        assert!(annotated.contains("original text"));
        assert!(annotated.contains("0.91"));
        assert!(annotated.contains("prior summary"));
    }
}

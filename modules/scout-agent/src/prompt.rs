use chrono::{DateTime, Utc};
use scout_common::{RecentFinding, Scout};

/// Builds the system prompt from scout fields and recent-findings context
/// (spec.md §4.E). Up to 5 recent findings are described with a relative
/// "found today/yesterday/N days ago" phrasing so the model can recognize
/// and downgrade near-duplicates before the run even leaves the gate.
pub fn build_system_prompt(scout: &Scout, recent: &[RecentFinding], now: DateTime<Utc>) -> String {
    let mut prompt = format!(
        "You are a research scout. Your goal: {goal}\n\n\
         Title: {title}\n\
         Configured search queries (use these first): {queries}\n\n\
         Instructions:\n\
         1. Start with the configured queries above before trying variations.\n\
         2. Scrape 2-3 of the most promising results to verify what you find.\n\
         3. Do not repeat a search you have already run this session.\n\
         4. Aim to finish within about 7 steps.\n\
         5. Respond only as a JSON object with exactly these fields: \
         taskCompleted (bool), taskStatus (one of \"completed\", \"partial\", \
         \"not_found\", \"insufficient_data\"), response (markdown, no em-dashes).\n",
        goal = scout.goal,
        title = scout.title,
        queries = scout.queries.join(", "),
    );

    if !recent.is_empty() {
        prompt.push_str(
            "\nRecent findings from earlier runs of this scout. If your current findings \
             substantially duplicate one of these, set taskStatus to \"not_found\" instead of \
             \"completed\":\n",
        );
        for finding in recent.iter().take(5) {
            prompt.push_str(&format!(
                "- found {ago}: \"{summary}\"\n",
                ago = relative_day(finding.completed_at, now),
                summary = finding.summary_text,
            ));
        }
    }

    prompt
}

fn relative_day(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now.date_naive() - at.date_naive()).num_days();
    match days {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        n if n > 1 => format!("{n} days ago"),
        _ => "today".to_string(),
    }
}

/// Injected every third loop (spec.md §4.E step 1) to keep the model aware
/// of its remaining budget.
pub fn budget_reminder(loop_count: u32, max_loops: u32, search_queries_used: u32) -> String {
    format!(
        "Reminder: you are on step {loop_count} of a {max_loops}-step budget \
         ({queries_used} search queries used so far). Wrap up soon if you have enough to answer.",
        queries_used = search_queries_used,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_common::{Frequency, Location, ScrapeOptions};
    use uuid::Uuid;

    fn scout() -> Scout {
        Scout {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "AI News".to_string(),
            goal: "track announcements".to_string(),
            description: String::new(),
            queries: vec!["AI news".to_string(), "artificial intelligence news".to_string()],
            location: Location::any(),
            frequency: Frequency::Daily,
            scrape_options: ScrapeOptions::default(),
            is_active: true,
            last_run_at: None,
            consecutive_failures: 0,
        }
    }

    #[test]
    fn includes_configured_queries_and_goal() {
        let prompt = build_system_prompt(&scout(), &[], Utc::now());
        assert!(prompt.contains("track announcements"));
        assert!(prompt.contains("AI news, artificial intelligence news"));
    }

    #[test]
    fn empty_recent_findings_omits_duplicate_guidance() {
        let prompt = build_system_prompt(&scout(), &[], Utc::now());
        assert!(!prompt.contains("Recent findings"));
    }

    #[test]
    fn relative_day_labels_today_and_yesterday() {
        let now = Utc::now();
        assert_eq!(relative_day(now, now), "today");
        assert_eq!(relative_day(now - chrono::Duration::days(1), now), "yesterday");
        assert_eq!(relative_day(now - chrono::Duration::days(3), now), "3 days ago");
    }
}

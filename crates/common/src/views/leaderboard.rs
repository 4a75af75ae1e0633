//! Top contributors

use crate::config::LeaderboardConfig;
use crate::models::{normalize, Record};
use crate::DEFAULT_LEADERBOARD_SIZE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Who is ranked and how many are shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardPolicy {
    pub size: usize,
    /// Normalized emails never ranked
    pub excluded: HashSet<String>,
}

impl Default for LeaderboardPolicy {
    fn default() -> Self {
        Self {
            size: DEFAULT_LEADERBOARD_SIZE,
            excluded: HashSet::new(),
        }
    }
}

impl LeaderboardPolicy {
    pub fn from_config(config: &LeaderboardConfig) -> Self {
        Self {
            size: config.size,
            excluded: config.excluded_emails.iter().map(|e| normalize(e)).collect(),
        }
    }

    pub fn exclude(mut self, email: &str) -> Self {
        self.excluded.insert(normalize(email));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    /// 1-based
    pub rank: usize,
    pub email: String,
    pub submissions: usize,
    /// Timestamp of the user's most recent Enabled submission
    pub latest: String,
}

#[derive(Default)]
struct Tally {
    count: usize,
    latest: Option<DateTime<Utc>>,
    /// Raw timestamp of `latest`, or the first raw value while nothing parsed
    latest_raw: String,
}

impl Tally {
    fn add(&mut self, record: &Record) {
        self.count += 1;
        match record.created_at() {
            Some(at) if self.latest.map_or(true, |latest| at > latest) => {
                self.latest = Some(at);
                self.latest_raw = record.timestamp.trim().to_string();
            }
            Some(_) => {}
            None if self.latest.is_none() && self.latest_raw.is_empty() => {
                self.latest_raw = record.timestamp.trim().to_string();
            }
            None => {}
        }
    }
}

/// Rank submitters of Enabled records.
///
/// Emails merge case-insensitively. Order is count descending, then the
/// earlier most-recent submission first, then email. Timestamps that do not
/// parse never count as the most recent; users with none that parse come
/// after the others on equal counts.
pub fn leaderboard(records: &[Record], policy: &LeaderboardPolicy) -> Vec<RankedUser> {
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for record in records.iter().filter(|r| r.is_enabled()) {
        let email = record.normalized_email();
        if email.is_empty() || policy.excluded.contains(&email) {
            continue;
        }
        tallies.entry(email).or_default().add(record);
    }

    let mut ranked: Vec<(String, Tally)> = tallies.into_iter().collect();
    ranked.sort_by(|(a_email, a), (b_email, b)| {
        b.count
            .cmp(&a.count)
            .then_with(|| match (a.latest, b.latest) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a_email.cmp(b_email))
    });
    ranked.truncate(policy.size);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (email, tally))| RankedUser {
            rank: i + 1,
            email,
            submissions: tally.count,
            latest: tally.latest_raw,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn record(email: &str, status: Status, timestamp: &str) -> Record {
        Record {
            email: email.into(),
            status,
            timestamp: timestamp.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_case_insensitive_merge_and_disabled_excluded() {
        let records = vec![
            record("a@x.com", Status::Enabled, "2024-01-01T00:00:00Z"),
            record("A@X.com", Status::Enabled, "2024-01-02T00:00:00Z"),
            record("b@x.com", Status::Disabled, "2024-01-03T00:00:00Z"),
        ];
        let board = leaderboard(&records, &LeaderboardPolicy::default());
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].email, "a@x.com");
        assert_eq!(board[0].submissions, 2);
        assert_eq!(board[0].latest, "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_tie_break_earlier_latest_first() {
        let records = vec![
            record("late@x.com", Status::Enabled, "2024-05-01T00:00:00Z"),
            record("early@x.com", Status::Enabled, "2024-02-01T00:00:00Z"),
            record("top@x.com", Status::Enabled, "2024-06-01T00:00:00Z"),
            record("top@x.com", Status::Enabled, "2024-06-02T00:00:00Z"),
        ];
        let board = leaderboard(&records, &LeaderboardPolicy::default());
        let emails: Vec<&str> = board.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["top@x.com", "early@x.com", "late@x.com"]);
        assert_eq!(board.iter().map(|u| u.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_exclusion_and_truncation() {
        let records: Vec<Record> = (0..15)
            .map(|i| record(&format!("u{:02}@x.com", i), Status::Enabled, "2024-01-01T00:00:00Z"))
            .chain(std::iter::once(record("Admin@X.com", Status::Enabled, "2024-01-01T00:00:00Z")))
            .collect();
        let policy = LeaderboardPolicy::default().exclude(" admin@x.com");
        let board = leaderboard(&records, &policy);
        assert_eq!(board.len(), DEFAULT_LEADERBOARD_SIZE);
        assert!(board.iter().all(|u| u.email != "admin@x.com"));
        assert_eq!(board[0].email, "u00@x.com");
    }

    #[test]
    fn test_malformed_timestamp_never_becomes_latest() {
        let records = vec![
            record("a@x.com", Status::Enabled, "2024-03-01T00:00:00Z"),
            record("a@x.com", Status::Enabled, "not a date"),
            record("a@x.com", Status::Enabled, ""),
            record("b@x.com", Status::Enabled, "2024-04-01T00:00:00Z"),
            record("b@x.com", Status::Enabled, "2024-01-01T00:00:00Z"),
            record("b@x.com", Status::Enabled, "garbage"),
            record("c@x.com", Status::Enabled, "garbage"),
            record("c@x.com", Status::Enabled, "later garbage"),
            record("c@x.com", Status::Enabled, "2023-01-01T00:00:00Z"),
        ];
        let board = leaderboard(&records, &LeaderboardPolicy::default());
        let emails: Vec<&str> = board.iter().map(|u| u.email.as_str()).collect();
        // equal counts: earliest latest first
        assert_eq!(emails, vec!["c@x.com", "a@x.com", "b@x.com"]);
        assert_eq!(board[0].latest, "2023-01-01T00:00:00Z");
        assert_eq!(board[1].latest, "2024-03-01T00:00:00Z");
        assert_eq!(board[2].latest, "2024-04-01T00:00:00Z");
    }

    #[test]
    fn test_raw_latest_kept_when_nothing_parses() {
        let records = vec![
            record("a@x.com", Status::Enabled, "garbage"),
            record("b@x.com", Status::Enabled, "2024-01-01T00:00:00Z"),
        ];
        let board = leaderboard(&records, &LeaderboardPolicy::default());
        assert_eq!(board[0].email, "b@x.com");
        assert_eq!(board[1].email, "a@x.com");
        assert_eq!(board[1].latest, "garbage");
    }
}

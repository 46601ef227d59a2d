//! The sliding time window: only entries published after `now - max_age`
//! make it into a digest.

use chrono::{DateTime, TimeDelta, Utc};

use crate::app::{DigestError, Result};
use crate::domain::UserFeed;

/// `Thu, 19 Sep 2024 10:32:31 +1200`
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_str(value, PUB_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DigestError::InvalidTimestamp(value.to_string()))
}

pub fn cutoff(now: DateTime<Utc>, max_age_minutes: u64) -> DateTime<Utc> {
    let age = i64::try_from(max_age_minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Strictly newer than the cutoff.
pub fn is_new(published: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
    published > cutoff
}

/// Drop old entries, then users left with nothing.
pub fn retain_new(feeds: Vec<UserFeed>, cutoff: DateTime<Utc>) -> Vec<UserFeed> {
    feeds
        .into_iter()
        .filter_map(|mut feed| {
            feed.entries.retain(|entry| is_new(entry.published(), cutoff));
            (!feed.is_empty()).then_some(feed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListLog, LogEntry, MovieLog};

    fn at(ts: &str) -> DateTime<Utc> {
        parse_timestamp(ts).unwrap()
    }

    fn feed(name: &str, published: &[DateTime<Utc>]) -> UserFeed {
        let mut feed = UserFeed::new(format!("https://letterboxd.com/{name}/"), name.into());
        feed.entries = published
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                if i % 2 == 0 {
                    LogEntry::Movie(MovieLog::new(format!("m{i}"), "Film".into(), p))
                } else {
                    LogEntry::List(ListLog::new(format!("l{i}"), "List".into(), p))
                }
            })
            .collect();
        feed
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let parsed = at("Thu, 19 Sep 2024 10:32:31 +1200");
        assert_eq!(parsed.to_rfc3339(), "2024-09-18T22:32:31+00:00");
    }

    #[test]
    fn test_parse_timestamp_rfc2822_fallback() {
        let parsed = at("Thu, 19 Sep 2024 10:32:31 GMT");
        assert_eq!(parsed.to_rfc3339(), "2024-09-19T10:32:31+00:00");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(DigestError::InvalidTimestamp(_))
        ));
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_boundary_is_strict() {
        let now = at("Thu, 19 Sep 2024 12:00:00 +0000");
        let cutoff = cutoff(now, 60);
        let second = TimeDelta::seconds(1);

        assert!(is_new(cutoff + second, cutoff));
        assert!(!is_new(cutoff, cutoff));
        assert!(!is_new(cutoff - second, cutoff));
    }

    #[test]
    fn test_cutoff_compares_instants_across_offsets() {
        let now = at("Thu, 19 Sep 2024 12:00:00 +0000");
        let cutoff = cutoff(now, 60);
        // 11:30 UTC written in +12:00
        assert!(is_new(at("Thu, 19 Sep 2024 23:30:00 +1200"), cutoff));
        // 10:30 UTC written in -02:00
        assert!(!is_new(at("Thu, 19 Sep 2024 08:30:00 -0200"), cutoff));
    }

    #[test]
    fn test_retain_new_drops_empty_users() {
        let now = at("Thu, 19 Sep 2024 12:00:00 +0000");
        let fresh = now - TimeDelta::minutes(5);
        let stale = now - TimeDelta::minutes(90);

        let feeds = vec![
            feed("jane", &[fresh, stale, fresh]),
            feed("bob", &[stale]),
            feed("ann", &[]),
        ];

        let kept = retain_new(feeds, cutoff(now, 60));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].display_name, "jane");
        assert_eq!(kept[0].entries.len(), 2);
        assert_eq!(kept[0].entries[1].link(), "m2");
    }

    #[test]
    fn test_huge_age_does_not_overflow() {
        let now = Utc::now();
        assert_eq!(cutoff(now, u64::MAX), DateTime::<Utc>::MIN_UTC);
    }
}

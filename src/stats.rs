use crate::models::{DailyPoint, PROGRAM_DAYS, ProgressRecord, StatsResponse};
use crate::progress::current_streak;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

pub fn build_stats_at(
    today: NaiveDate,
    record: &ProgressRecord,
    completions: &BTreeSet<NaiveDate>,
) -> StatsResponse {
    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        last_7_days.push(DailyPoint {
            date: date_key(date),
            completed: completions.contains(&date),
        });
    }

    let counted = record.routines_completed.min(PROGRAM_DAYS);
    let completion_percent =
        (f64::from(counted) / f64::from(PROGRAM_DAYS) * 1000.0).round() / 10.0;

    StatsResponse {
        last_7_days,
        calendar_week: week_label(today),
        program_week: record.week(),
        streak: current_streak(completions, today),
        routines_completed: record.routines_completed,
        completion_percent,
        feedback: Vec::new(),
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(current_day: u32, routines_completed: u32) -> ProgressRecord {
        let started = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut record = ProgressRecord::new("u-1", started);
        record.current_day = current_day;
        record.routines_completed = routines_completed;
        record
    }

    #[test]
    fn last_7_days_marks_completions() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let two_days_ago = today - Duration::days(2);
        let completions: BTreeSet<_> = [two_days_ago, today].into_iter().collect();

        let stats = build_stats_at(today, &record(5, 2), &completions);
        assert_eq!(stats.last_7_days.len(), 7);
        assert_eq!(stats.last_7_days[6].date, "2026-01-05");
        let point = stats
            .last_7_days
            .iter()
            .find(|day| day.date == two_days_ago.to_string())
            .expect("missing day");
        assert!(point.completed);
        assert_eq!(stats.last_7_days.iter().filter(|day| day.completed).count(), 2);
        assert_eq!(stats.streak, 1);
    }

    #[test]
    fn percent_and_weeks() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let stats = build_stats_at(today, &record(9, 10), &BTreeSet::new());
        assert_eq!(stats.completion_percent, 33.3);
        assert_eq!(stats.program_week, 2);
        assert_eq!(stats.calendar_week, "2026-W02");
        assert_eq!(stats.streak, 0);
    }
}

//! Chart datasets derived from already-fetched entities.
//!
//! Everything here is a pure function of its inputs and an explicit `now`,
//! so bucket boundaries and scores can be tested without a store.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::quiz::Quiz;
use crate::models::user::User;

/// Labels plus one or more parallel datasets, as consumed by the chart widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<i64>,
}

impl ChartDataset {
    fn new(label: &str, data: Vec<i64>) -> Self {
        Self {
            label: label.to_string(),
            data,
            details: None,
            total: None,
            growth: None,
        }
    }

    fn with_details<T: Serialize>(mut self, details: &[T]) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }
}

/// Calendar-month buckets ending at the current month.
#[derive(Debug)]
pub struct MonthBuckets<'a, T> {
    /// `"Mon YYYY"`, oldest first.
    pub labels: Vec<String>,
    pub counts: Vec<i64>,
    pub records: Vec<Vec<&'a T>>,
}

/// Group `records` into the `months` calendar months ending at `now` (inclusive).
///
/// Records whose date is missing or unparseable, or falls outside the
/// window, are left out of every bucket.
pub fn group_by_month<'a, T, F>(
    records: &'a [T],
    date_of: F,
    months: u32,
    now: DateTime<Utc>,
) -> MonthBuckets<'a, T>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let months = months as i64;
    let current = month_index(now.year(), now.month());
    let first = current - (months - 1);

    let labels = (first..=current).map(month_label).collect();
    let mut buckets: Vec<Vec<&T>> = (0..months).map(|_| Vec::new()).collect();

    for record in records {
        let Some(date) = date_of(record) else {
            continue;
        };
        let slot = month_index(date.year(), date.month()) - first;
        if (0..months).contains(&slot) {
            buckets[slot as usize].push(record);
        }
    }

    MonthBuckets {
        labels,
        counts: buckets.iter().map(|b| b.len() as i64).collect(),
        records: buckets,
    }
}

fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + (month as i64 - 1)
}

fn month_label(index: i64) -> String {
    let year = index.div_euclid(12) as i32;
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_default()
}

/// Round half up, matching how the dashboard has always rounded percentages.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Percent change between the last two values.
///
/// Fewer than two points gives 0; a rise from exactly 0 gives 100.
pub fn growth(values: &[i64]) -> i64 {
    let [.., previous, last] = values else {
        return 0;
    };
    match (*previous, *last) {
        (0, 0) => 0,
        (0, _) => 100,
        (previous, last) => round_half_up((last - previous) as f64 / previous as f64 * 100.0),
    }
}

pub fn users_created(users: &[User], now: DateTime<Utc>) -> ChartData {
    let buckets = group_by_month(
        users,
        |u| u.created_at.as_ref().and_then(|d| d.to_datetime()),
        12,
        now,
    );
    let growth = growth(&buckets.counts);
    let mut dataset = ChartDataset::new("Users Created", buckets.counts);
    dataset.total = Some(users.len() as i64);
    dataset.growth = Some(growth);
    ChartData {
        labels: buckets.labels,
        datasets: vec![dataset],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
    pub completed_courses: i64,
    pub active_courses: i64,
}

/// Score every user (100 per completed, 50 per active enrollment) and keep
/// the top `limit`. Equal scores keep input order.
pub fn leaderboard_entries(
    users: &[User],
    enrollments: &[Enrollment],
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut per_user: HashMap<&str, (i64, i64)> = HashMap::new();
    for enrollment in enrollments {
        let entry = per_user.entry(enrollment.user_id.as_str()).or_default();
        match enrollment.status {
            Some(EnrollmentStatus::Completed) => entry.0 += 1,
            Some(EnrollmentStatus::Active) => entry.1 += 1,
            None => {}
        }
    }

    let mut entries: Vec<LeaderboardEntry> = users
        .iter()
        .map(|user| {
            let (completed, active) = per_user.get(user.id.as_str()).copied().unwrap_or_default();
            LeaderboardEntry {
                username: user.display_name(),
                score: completed * 100 + active * 50,
                completed_courses: completed,
                active_courses: active,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(limit);
    entries
}

pub fn leaderboard(users: &[User], enrollments: &[Enrollment]) -> ChartData {
    let top = leaderboard_entries(users, enrollments, 6);
    ChartData {
        labels: top.iter().map(|e| e.username.clone()).collect(),
        datasets: vec![
            ChartDataset::new("User Score", top.iter().map(|e| e.score).collect())
                .with_details(&top),
        ],
    }
}

/// Expected pass rate for a difficulty label. Unknown labels score as normal.
pub fn difficulty_score(difficulty: Option<&str>) -> f64 {
    match difficulty.map(|d| d.trim().to_ascii_uppercase()).as_deref() {
        Some("EASY") => 90.0,
        Some("NORMAL") | Some("MEDIUM") => 75.0,
        Some("HARD") => 60.0,
        Some("EXPERT") => 45.0,
        _ => 75.0,
    }
}

/// Mean difficulty score plus `jitter` (expected in `[-5, 5]`), rounded.
///
/// No attempt records exist yet, so this stands in for a measured pass rate.
pub fn simulated_pass_rate(quizzes: &[Quiz], jitter: f64) -> i64 {
    if quizzes.is_empty() {
        return 0;
    }
    let total: f64 = quizzes
        .iter()
        .map(|q| difficulty_score(q.difficulty.as_deref()))
        .sum();
    round_half_up(total / quizzes.len() as f64 + jitter)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePassRate {
    pub course_name: String,
    pub pass_rate: i64,
    pub total_quizzes: i64,
}

pub fn quiz_analytics(mut rates: Vec<CoursePassRate>) -> ChartData {
    rates.sort_by(|a, b| b.pass_rate.cmp(&a.pass_rate));
    ChartData {
        labels: rates.iter().map(|r| r.course_name.clone()).collect(),
        datasets: vec![
            ChartDataset::new("Quiz Pass Rate (%)", rates.iter().map(|r| r.pass_rate).collect())
                .with_details(&rates),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthProgress {
    pub month: String,
    pub completion_rate: i64,
    pub total_enrollments: i64,
    pub completed_enrollments: i64,
}

pub fn course_progress_months(enrollments: &[Enrollment], now: DateTime<Utc>) -> Vec<MonthProgress> {
    let buckets = group_by_month(
        enrollments,
        |e| e.created_at.as_ref().and_then(|d| d.to_datetime()),
        6,
        now,
    );
    buckets
        .labels
        .into_iter()
        .zip(buckets.records)
        .map(|(month, records)| {
            let total = records.len() as i64;
            let completed = records.iter().filter(|e| e.is_completed()).count() as i64;
            let completion_rate = if total > 0 {
                round_half_up(completed as f64 / total as f64 * 100.0)
            } else {
                0
            };
            MonthProgress {
                month,
                completion_rate,
                total_enrollments: total,
                completed_enrollments: completed,
            }
        })
        .collect()
}

pub fn course_progress(enrollments: &[Enrollment], now: DateTime<Utc>) -> ChartData {
    let months = course_progress_months(enrollments, now);
    ChartData {
        labels: months.iter().map(|m| m.month.clone()).collect(),
        datasets: vec![ChartDataset::new(
            "Course Completion Rate (%)",
            months.iter().map(|m| m.completion_rate).collect(),
        )
        .with_details(&months)],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub name: &'static str,
    pub count: i64,
}

/// Five fixed milestones. Only "First Course" is measured; the rest are
/// fractions of enrollment and user totals until achievements are recorded.
pub fn achievement_counts(enrollments: &[Enrollment], user_count: i64) -> Vec<Achievement> {
    let enrollment_count = enrollments.len() as i64;
    let completed = enrollments.iter().filter(|e| e.is_completed()).count() as i64;
    let mut achievements = vec![
        Achievement { name: "First Course", count: completed },
        Achievement { name: "Quiz Master", count: enrollment_count * 3 / 10 },
        Achievement { name: "Fast Learner", count: enrollment_count / 4 },
        Achievement { name: "Consistent", count: user_count * 2 / 5 },
        Achievement { name: "All-Rounder", count: user_count / 5 },
    ];
    achievements.sort_by(|a, b| b.count.cmp(&a.count));
    achievements
}

pub fn achievements(enrollments: &[Enrollment], user_count: i64) -> ChartData {
    let items = achievement_counts(enrollments, user_count);
    ChartData {
        labels: items.iter().map(|a| a.name.to_string()).collect(),
        datasets: vec![
            ChartDataset::new("Achievements Unlocked", items.iter().map(|a| a.count).collect())
                .with_details(&items),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timestamp::RecordDate;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn enrollment(user: &str, status: &str, created: Option<&str>) -> Enrollment {
        serde_json::from_value(json!({
            "id": format!("e-{user}-{status}-{}", created.unwrap_or("none")),
            "userId": user,
            "courseId": "c1",
            "status": status,
            "createdAt": created,
        }))
        .unwrap()
    }

    fn user(id: &str, username: &str) -> User {
        serde_json::from_value(json!({"id": id, "username": username})).unwrap()
    }

    fn quiz(difficulty: Option<&str>) -> Quiz {
        serde_json::from_value(json!({
            "id": "q",
            "courseId": "c1",
            "question": "?",
            "difficulty": difficulty,
        }))
        .unwrap()
    }

    #[test]
    fn six_month_labels_end_at_current_month() {
        let now = at(2024, 3, 15);
        let records: Vec<RecordDate> = Vec::new();
        let buckets = group_by_month(&records, |d| d.to_datetime(), 6, now);
        assert_eq!(
            buckets.labels,
            vec!["Oct 2023", "Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024", "Mar 2024"]
        );
        assert_eq!(buckets.counts, vec![0; 6]);
    }

    #[test]
    fn iso_record_lands_in_its_month_only() {
        let now = at(2024, 3, 15);
        let records = vec![RecordDate::Text("2023-12-20T08:30:00Z".to_string())];
        let buckets = group_by_month(&records, |d| d.to_datetime(), 6, now);
        assert_eq!(buckets.counts, vec![0, 0, 1, 0, 0, 0]);
        assert_eq!(buckets.records[2].len(), 1);
    }

    #[test]
    fn all_timestamp_forms_share_a_bucket() {
        let now = at(2024, 3, 15);
        let instant = at(2024, 1, 10);
        let records = vec![
            RecordDate::Text(instant.to_rfc3339()),
            RecordDate::Wire {
                seconds: instant.timestamp(),
                nanoseconds: 0,
            },
            RecordDate::Instant(instant),
        ];
        let buckets = group_by_month(&records, |d| d.to_datetime(), 6, now);
        assert_eq!(buckets.counts, vec![0, 0, 0, 3, 0, 0]);
    }

    #[test]
    fn undated_and_out_of_window_records_are_dropped() {
        let now = at(2024, 3, 15);
        let records = vec![
            RecordDate::Text("not a date".to_string()),
            RecordDate::Text("2022-01-01T00:00:00Z".to_string()),
            RecordDate::Text("2024-04-01T00:00:00Z".to_string()),
        ];
        let buckets = group_by_month(&records, |d| d.to_datetime(), 6, now);
        assert_eq!(buckets.counts.iter().sum::<i64>(), 0);
    }

    #[test]
    fn growth_edge_cases() {
        assert_eq!(growth(&[0, 0]), 0);
        assert_eq!(growth(&[0, 5]), 100);
        assert_eq!(growth(&[10, 15]), 50);
        assert_eq!(growth(&[5]), 0);
        assert_eq!(growth(&[]), 0);
        assert_eq!(growth(&[4, 3, 2]), -33);
    }

    #[test]
    fn leaderboard_scores_completed_and_active() {
        let users = vec![user("u1", "ada"), user("u2", "bob"), user("u3", "cy")];
        let enrollments = vec![
            enrollment("u1", "completed", None),
            enrollment("u1", "completed", None),
            enrollment("u1", "active", None),
            enrollment("u2", "active", None),
        ];
        let entries = leaderboard_entries(&users, &enrollments, 6);
        assert_eq!(entries[0].username, "ada");
        assert_eq!(entries[0].score, 250);
        assert_eq!(entries[1].score, 50);
        assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn leaderboard_keeps_top_six_in_input_order_on_ties() {
        let users: Vec<User> = (0..8).map(|i| user(&format!("u{i}"), &format!("n{i}"))).collect();
        let entries = leaderboard_entries(&users, &[], 6);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].username, "n0");
        assert_eq!(entries[5].username, "n5");
    }

    #[test]
    fn pass_rate_uses_difficulty_table() {
        let quizzes = vec![quiz(Some("EASY")), quiz(Some("Hard"))];
        assert_eq!(simulated_pass_rate(&quizzes, 0.0), 75);
        assert_eq!(simulated_pass_rate(&[quiz(Some("expert"))], 0.0), 45);
        assert_eq!(simulated_pass_rate(&[quiz(None)], 0.0), 75);
        assert_eq!(simulated_pass_rate(&[quiz(Some("bogus"))], 0.0), 75);
    }

    #[test]
    fn pass_rate_jitter_stays_within_five_points() {
        let quizzes = vec![quiz(Some("NORMAL"))];
        assert_eq!(simulated_pass_rate(&quizzes, 5.0), 80);
        assert_eq!(simulated_pass_rate(&quizzes, -5.0), 70);
    }

    #[test]
    fn quiz_analytics_sorts_by_pass_rate() {
        let chart = quiz_analytics(vec![
            CoursePassRate { course_name: "A".into(), pass_rate: 60, total_quizzes: 2 },
            CoursePassRate { course_name: "B".into(), pass_rate: 90, total_quizzes: 1 },
        ]);
        assert_eq!(chart.labels, vec!["B", "A"]);
        assert_eq!(chart.datasets[0].data, vec![90, 60]);
    }

    #[test]
    fn empty_month_has_zero_completion_rate() {
        let now = at(2024, 3, 15);
        let enrollments = vec![
            enrollment("u1", "completed", Some("2024-03-02T00:00:00Z")),
            enrollment("u2", "active", Some("2024-03-03T00:00:00Z")),
            enrollment("u3", "active", Some("2024-03-04T00:00:00Z")),
        ];
        let months = course_progress_months(&enrollments, now);
        assert_eq!(months.len(), 6);
        assert_eq!(months[0].completion_rate, 0);
        assert_eq!(months[0].total_enrollments, 0);
        assert_eq!(months[5].completion_rate, 33);
        assert_eq!(months[5].completed_enrollments, 1);
    }

    #[test]
    fn achievements_are_fractions_sorted_descending() {
        let enrollments: Vec<Enrollment> = (0..10)
            .map(|i| enrollment(&format!("u{i}"), if i < 2 { "completed" } else { "active" }, None))
            .collect();
        let items = achievement_counts(&enrollments, 10);
        let counts: HashMap<_, _> = items.iter().map(|a| (a.name, a.count)).collect();
        assert_eq!(counts["First Course"], 2);
        assert_eq!(counts["Quiz Master"], 3);
        assert_eq!(counts["Fast Learner"], 2);
        assert_eq!(counts["Consistent"], 4);
        assert_eq!(counts["All-Rounder"], 2);
        assert!(items.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn users_created_reports_total_and_growth() {
        let now = at(2024, 3, 15);
        let users: Vec<User> = vec![
            serde_json::from_value(json!({"id": "a", "createdAt": "2024-02-01T00:00:00Z"})).unwrap(),
            serde_json::from_value(json!({"id": "b", "createdAt": {"_seconds": at(2024, 3, 1).timestamp()}}))
                .unwrap(),
            serde_json::from_value(json!({"id": "c", "createdAt": "2024-03-10T00:00:00Z"})).unwrap(),
            serde_json::from_value(json!({"id": "d"})).unwrap(),
        ];
        let chart = users_created(&users, now);
        assert_eq!(chart.labels.len(), 12);
        let dataset = &chart.datasets[0];
        assert_eq!(dataset.total, Some(4));
        assert_eq!(dataset.data[10..], [1, 2]);
        assert_eq!(dataset.growth, Some(100));
    }
}

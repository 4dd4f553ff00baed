//! Dashboard statistics, analytics and chart aggregation.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cache::{keys, DashboardCache};
use crate::errors::AppError;
use crate::models::course::Course;
use crate::models::enrollment::Enrollment;
use crate::models::quiz::Quiz;
use crate::models::user::User;
use crate::services::charts::{self, ChartData, CoursePassRate};
use crate::store::{collections, tally_sum, Filter, Store};

/// Point-in-time counts for the overview page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users: UserCounts,
    pub courses: CourseCounts,
    pub enrollments: EnrollmentCounts,
    pub modules: TotalCount,
    pub lessons: TotalCount,
    pub quizzes: QuizCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseCounts {
    pub total: i64,
    pub published: i64,
    pub draft: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentCounts {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalCount {
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCounts {
    pub total: i64,
    pub active: i64,
}

/// Aggregate counts across every collection.
///
/// Grouping happens in the store; only one row per distinct status value
/// comes back.
pub async fn get_stats(store: &Store) -> Result<DashboardStats, AppError> {
    let all = Filter::new();
    let result = tokio::try_join!(
        store.tally(collections::USERS, "status"),
        store.tally(collections::COURSES, "status"),
        store.tally(collections::ENROLLMENTS, "status"),
        store.count(collections::MODULES, &all),
        store.count(collections::LESSONS, &all),
        store.tally(collections::QUIZZES, "isActive"),
    );
    let (users, courses, enrollments, modules, lessons, quizzes) = result.map_err(|e| {
        tracing::error!(error = %e, "Error getting dashboard stats");
        AppError::from(e)
    })?;

    let everything = |_: &serde_json::Value| true;
    Ok(DashboardStats {
        users: UserCounts {
            total: tally_sum(&users, everything),
            active: tally_sum(&users, |v| v.is_null() || v == "active"),
            inactive: tally_sum(&users, |v| v == "inactive"),
        },
        courses: CourseCounts {
            total: tally_sum(&courses, everything),
            published: tally_sum(&courses, |v| v == "published"),
            draft: tally_sum(&courses, |v| v == "draft"),
        },
        enrollments: EnrollmentCounts {
            total: tally_sum(&enrollments, everything),
            active: tally_sum(&enrollments, |v| v == "active"),
            completed: tally_sum(&enrollments, |v| v == "completed"),
        },
        modules: TotalCount { total: modules },
        lessons: TotalCount { total: lessons },
        quizzes: QuizCounts {
            total: tally_sum(&quizzes, everything),
            active: tally_sum(&quizzes, |v| v != &serde_json::Value::Bool(false)),
        },
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub overview: DashboardStats,
    pub metrics: AnalyticsMetrics,
    pub top_courses: Vec<CourseEnrollmentStats>,
    pub trends: AnalyticsTrends,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub user_engagement_rate: String,
    pub course_publish_rate: String,
    pub enrollment_completion_rate: String,
    pub average_enrollments_per_course: f64,
    pub recent_users_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseEnrollmentStats {
    pub course_id: String,
    pub course_name: String,
    pub enrollments: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTrends {
    pub new_users_last30_days: i64,
    pub active_enrollments: i64,
    pub completed_enrollments: i64,
}

/// `part / whole` as a one-decimal percentage string.
fn percentage(part: i64, whole: i64) -> String {
    if whole > 0 {
        format!("{:.1}%", part as f64 / whole as f64 * 100.0)
    } else {
        "0%".to_string()
    }
}

/// Overview stats plus rates, the five most-enrolled courses and 30-day trends.
pub async fn get_analytics(store: &Store, now: DateTime<Utc>) -> Result<Analytics, AppError> {
    let overview = get_stats(store).await?;
    let all = Filter::new();
    let (users, courses, enrollments) = tokio::try_join!(
        store.find_as::<User>(collections::USERS, &all),
        store.find_as::<Course>(collections::COURSES, &all),
        store.find_as::<Enrollment>(collections::ENROLLMENTS, &all),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Error getting analytics");
        AppError::from(e)
    })?;

    let cutoff = now - Duration::days(30);
    let recent_users = users
        .iter()
        .filter_map(|u| u.created_at.as_ref().and_then(|d| d.to_datetime()))
        .filter(|created| *created >= cutoff)
        .count() as i64;

    let mut per_course: HashMap<&str, (i64, i64)> = HashMap::new();
    for enrollment in &enrollments {
        let entry = per_course.entry(enrollment.course_id.as_str()).or_default();
        entry.0 += 1;
        if enrollment.is_completed() {
            entry.1 += 1;
        }
    }
    let mut top_courses: Vec<CourseEnrollmentStats> = courses
        .iter()
        .map(|course| {
            let (enrolled, completed) = per_course.get(course.id.as_str()).copied().unwrap_or_default();
            CourseEnrollmentStats {
                course_id: course.id.clone(),
                course_name: course.display_name(),
                enrollments: enrolled,
                completed,
            }
        })
        .collect();
    top_courses.sort_by(|a, b| b.enrollments.cmp(&a.enrollments));
    top_courses.truncate(5);

    let average = if overview.courses.total > 0 {
        let raw = overview.enrollments.total as f64 / overview.courses.total as f64;
        (raw * 10.0).round() / 10.0
    } else {
        0.0
    };

    Ok(Analytics {
        metrics: AnalyticsMetrics {
            user_engagement_rate: percentage(overview.users.active, overview.users.total),
            course_publish_rate: percentage(overview.courses.published, overview.courses.total),
            enrollment_completion_rate: percentage(
                overview.enrollments.completed,
                overview.enrollments.total,
            ),
            average_enrollments_per_course: average,
            recent_users_count: recent_users,
        },
        top_courses,
        trends: AnalyticsTrends {
            new_users_last30_days: recent_users,
            active_enrollments: overview.enrollments.active,
            completed_enrollments: overview.enrollments.completed,
        },
        overview,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub user_id: String,
    pub course_id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// The most recent enrollments, newest first. Undated enrollments sort last.
pub async fn recent_activity(store: &Store, limit: usize) -> Result<Vec<Activity>, AppError> {
    let all = Filter::new();
    let (users, courses, mut enrollments) = tokio::try_join!(
        store.find_as::<User>(collections::USERS, &all),
        store.find_as::<Course>(collections::COURSES, &all),
        store.find_as::<Enrollment>(collections::ENROLLMENTS, &all),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Error getting recent activity");
        AppError::from(e)
    })?;

    let users: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();
    let courses: HashMap<&str, &Course> = courses.iter().map(|c| (c.id.as_str(), c)).collect();

    let created = |e: &Enrollment| e.created_at.as_ref().and_then(|d| d.to_datetime());
    enrollments.sort_by(|a, b| created(b).cmp(&created(a)));

    Ok(enrollments
        .iter()
        .take(limit)
        .map(|e| {
            let username = users
                .get(e.user_id.as_str())
                .map(|u| u.display_name())
                .unwrap_or_else(|| "Unknown user".to_string());
            let course = courses
                .get(e.course_id.as_str())
                .map(|c| c.display_name())
                .unwrap_or_else(|| "Unknown course".to_string());
            Activity {
                id: e.id.clone(),
                kind: "enrollment".to_string(),
                message: format!("{username} enrolled in {course}"),
                user_id: e.user_id.clone(),
                course_id: e.course_id.clone(),
                timestamp: created(e),
            }
        })
        .collect())
}

/// The five dashboard charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    UsersCreated,
    Leaderboard,
    QuizAnalytics,
    CourseProgress,
    Achievements,
}

impl FromStr for ChartKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users-created" => Ok(Self::UsersCreated),
            "leaderboard" => Ok(Self::Leaderboard),
            "quiz-analytics" => Ok(Self::QuizAnalytics),
            "course-progress" => Ok(Self::CourseProgress),
            "achievements" => Ok(Self::Achievements),
            other => Err(AppError::NotFound(format!("Unknown chart '{other}'"))),
        }
    }
}

impl ChartKind {
    pub fn cache_key(&self) -> &'static str {
        match self {
            Self::UsersCreated => keys::USERS_CREATED,
            Self::Leaderboard => keys::LEADERBOARD,
            Self::QuizAnalytics => keys::QUIZ_ANALYTICS,
            Self::CourseProgress => keys::COURSE_PROGRESS,
            Self::Achievements => keys::ACHIEVEMENTS,
        }
    }

    /// Compute the chart from current store contents.
    pub async fn fetch(&self, store: &Store, now: DateTime<Utc>) -> Result<ChartData, AppError> {
        match self {
            Self::UsersCreated => users_created_chart(store, now).await,
            Self::Leaderboard => leaderboard_chart(store).await,
            Self::QuizAnalytics => quiz_analytics_chart(store).await,
            Self::CourseProgress => course_progress_chart(store, now).await,
            Self::Achievements => achievements_chart(store).await,
        }
    }
}

pub async fn users_created_chart(store: &Store, now: DateTime<Utc>) -> Result<ChartData, AppError> {
    let users = store
        .find_as::<User>(collections::USERS, &Filter::new())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Error getting users created chart data");
            AppError::from(e)
        })?;
    Ok(charts::users_created(&users, now))
}

pub async fn leaderboard_chart(store: &Store) -> Result<ChartData, AppError> {
    let all = Filter::new();
    let (users, enrollments) = tokio::try_join!(
        store.find_as::<User>(collections::USERS, &all),
        store.find_as::<Enrollment>(collections::ENROLLMENTS, &all),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Error getting leaderboard chart data");
        AppError::from(e)
    })?;
    Ok(charts::leaderboard(&users, &enrollments))
}

/// Number of courses sampled for the pass-rate chart.
const QUIZ_ANALYTICS_COURSES: i64 = 10;

/// Simulated pass rate for the first ten courses that have quizzes.
///
/// A course whose quiz lookup fails is skipped rather than failing the chart.
pub async fn quiz_analytics_chart(store: &Store) -> Result<ChartData, AppError> {
    let courses = store
        .find(collections::COURSES, &Filter::new(), Some(QUIZ_ANALYTICS_COURSES))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Error getting quiz analytics chart data");
            AppError::from(e)
        })?;

    let mut rates = Vec::new();
    for document in courses {
        let course: Course = document.into_entity()?;
        let filter = Filter::new().eq("courseId", course.id.as_str());
        let quizzes = match store.find_as::<Quiz>(collections::QUIZZES, &filter).await {
            Ok(quizzes) => quizzes,
            Err(e) => {
                tracing::debug!(course_id = %course.id, error = %e, "Skipping course quizzes");
                continue;
            }
        };
        if quizzes.is_empty() {
            continue;
        }
        let jitter = rand::rng().random_range(-5.0..=5.0);
        rates.push(CoursePassRate {
            course_name: course.display_name(),
            pass_rate: charts::simulated_pass_rate(&quizzes, jitter),
            total_quizzes: quizzes.len() as i64,
        });
    }

    Ok(charts::quiz_analytics(rates))
}

pub async fn course_progress_chart(
    store: &Store,
    now: DateTime<Utc>,
) -> Result<ChartData, AppError> {
    let enrollments = store
        .find_as::<Enrollment>(collections::ENROLLMENTS, &Filter::new())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Error getting course progress chart data");
            AppError::from(e)
        })?;
    Ok(charts::course_progress(&enrollments, now))
}

pub async fn achievements_chart(store: &Store) -> Result<ChartData, AppError> {
    let all = Filter::new();
    let (enrollments, user_count) = tokio::try_join!(
        store.find_as::<Enrollment>(collections::ENROLLMENTS, &all),
        store.count(collections::USERS, &all),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Error getting achievement insights chart data");
        AppError::from(e)
    })?;
    Ok(charts::achievements(&enrollments, user_count))
}

/// One chart in the batched response: its data, or why it could not be built.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChartSlot {
    Ready(ChartData),
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllCharts {
    pub users_created: ChartSlot,
    pub leaderboard: ChartSlot,
    pub quiz_analytics: ChartSlot,
    pub course_progress: ChartSlot,
    pub achievements: ChartSlot,
}

async fn load_slot(
    store: &Store,
    cache: &DashboardCache,
    kind: ChartKind,
    force: bool,
    now: DateTime<Utc>,
) -> ChartSlot {
    match cache
        .load_at(kind.cache_key(), force, now, || kind.fetch(store, now))
        .await
    {
        Ok(cached) => ChartSlot::Ready(cached.value),
        Err(e) => ChartSlot::Failed {
            error: e.to_string(),
        },
    }
}

/// Build all five charts concurrently. Each goes through its own cache entry
/// and a failure only marks that chart's slot.
pub async fn all_charts(
    store: &Store,
    cache: &DashboardCache,
    force: bool,
    now: DateTime<Utc>,
) -> AllCharts {
    let (users_created, leaderboard, quiz_analytics, course_progress, achievements) = tokio::join!(
        load_slot(store, cache, ChartKind::UsersCreated, force, now),
        load_slot(store, cache, ChartKind::Leaderboard, force, now),
        load_slot(store, cache, ChartKind::QuizAnalytics, force, now),
        load_slot(store, cache, ChartKind::CourseProgress, force, now),
        load_slot(store, cache, ChartKind::Achievements, force, now),
    );
    AllCharts {
        users_created,
        leaderboard,
        quiz_analytics,
        course_progress,
        achievements,
    }
}

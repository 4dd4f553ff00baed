//! Seed script for development: populates an empty store with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Reads the same environment as the server (`STORE_BACKEND`, `DATABASE_URL`, .env).

use anyhow::Context;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;

use coursedesk::config::AppConfig;
use coursedesk::models::assessment::{AssessmentPayload, CreateAssessment};
use coursedesk::models::course::{Course, CourseStatus, CreateCourse};
use coursedesk::models::enrollment::{CreateEnrollment, ProgressUpdate};
use coursedesk::models::lesson::CreateLesson;
use coursedesk::models::module::CreateModule;
use coursedesk::models::quiz::CreateQuiz;
use coursedesk::models::user::{CreateUser, User};
use coursedesk::services::{assessment, course, enrollment, lesson, module, quiz, user};
use coursedesk::store::{collections, Filter, Store};

const USERS: &[(&str, &str)] = &[
    ("ada", "ada@coursedesk.local"),
    ("grace", "grace@coursedesk.local"),
    ("linus", "linus@coursedesk.local"),
    ("barbara", "barbara@coursedesk.local"),
    ("dennis", "dennis@coursedesk.local"),
    ("margaret", "margaret@coursedesk.local"),
    ("ken", "ken@coursedesk.local"),
    ("frances", "frances@coursedesk.local"),
];

const COURSES: &[(&str, &str, &str, CourseStatus)] = &[
    ("Rust Fundamentals", "Rust", "Beginner", CourseStatus::Published),
    ("Async Rust in Practice", "Rust", "Advanced", CourseStatus::Published),
    ("SQL for Analysts", "SQL", "Beginner", CourseStatus::Published),
    ("Go Services", "Go", "Intermediate", CourseStatus::Draft),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let store = Store::connect(&config)
        .await
        .context("Failed to open document store")?;

    println!("=== CourseDesk Seed Script ({}) ===", store.backend_name());

    if store.count(collections::USERS, &Filter::new()).await? > 0 {
        println!("[skip] Store already contains users");
        return Ok(());
    }

    let users = seed_users(&store).await?;
    let courses = seed_courses(&store).await?;
    seed_content(&store, &courses).await?;
    seed_enrollments(&store, &users, &courses).await?;
    seed_assessments(&store, &courses).await?;

    println!("\n=== Seed complete! ===");
    Ok(())
}

async fn seed_users(store: &Store) -> anyhow::Result<Vec<User>> {
    let now = Utc::now();
    let mut created = Vec::with_capacity(USERS.len());
    for (i, (username, email)) in USERS.iter().enumerate() {
        let u = user::create(
            store,
            &CreateUser {
                user_id: None,
                username: username.to_string(),
                email: email.to_string(),
                status: None,
            },
        )
        .await?;

        // Spread sign-ups over the past months so the growth chart has shape.
        let created_at = now - Duration::days(i as i64 * 35);
        store
            .update(
                collections::USERS,
                &u.id,
                json!({ "createdAt": created_at.to_rfc3339_opts(SecondsFormat::Millis, true) }),
                None,
            )
            .await?;
        created.push(u);
    }
    println!("[done] Created {} users", created.len());
    Ok(created)
}

async fn seed_courses(store: &Store) -> anyhow::Result<Vec<Course>> {
    let mut created = Vec::with_capacity(COURSES.len());
    for (title, language, difficulty, status) in COURSES {
        let c = course::create(
            store,
            &CreateCourse {
                course_id: None,
                title: Some(title.to_string()),
                course_name: None,
                description: Some(format!("An introduction to {title}.")),
                difficulty: Some(difficulty.to_string()),
                language: Some(language.to_string()),
                duration: Some(6.0),
                thumbnail: None,
                status: Some(*status),
            },
        )
        .await?;
        created.push(c);
    }
    println!("[done] Created {} courses", created.len());
    Ok(created)
}

async fn seed_content(store: &Store, courses: &[Course]) -> anyhow::Result<()> {
    let difficulties = ["EASY", "NORMAL", "HARD"];
    let mut quiz_count = 0;

    for c in courses {
        for order in 1..=2 {
            let m = module::create(
                store,
                &CreateModule {
                    course_id: c.id.clone(),
                    title: format!("Module {order}"),
                    description: None,
                    order,
                    estimated_minutes: 45,
                    total_lessons: 2,
                    status: None,
                },
            )
            .await?;

            for lesson_order in 1..=2 {
                lesson::create(
                    store,
                    &CreateLesson {
                        module_id: m.id.clone(),
                        course_id: None,
                        title: format!("Lesson {order}.{lesson_order}"),
                        content: Some("Read, then try the exercise.".to_string()),
                        order: lesson_order,
                        duration: Some(15.0),
                    },
                )
                .await?;
            }

            for difficulty in difficulties {
                quiz::create(
                    store,
                    &c.id,
                    CreateQuiz {
                        course_id: String::new(),
                        module_id: Some(m.id.clone()),
                        lesson_id: None,
                        question: format!(
                            "{} check ({difficulty})",
                            m.title.as_deref().unwrap_or("Module")
                        ),
                        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                        correct_option_index: 0,
                        difficulty: Some(difficulty.to_string()),
                        explanation: None,
                        is_active: None,
                    },
                )
                .await?;
                quiz_count += 1;
            }
        }
    }
    println!("[done] Created modules, lessons and {quiz_count} quizzes");
    Ok(())
}

async fn seed_enrollments(store: &Store, users: &[User], courses: &[Course]) -> anyhow::Result<()> {
    let mut count = 0;
    for (i, u) in users.iter().enumerate() {
        for c in courses.iter().skip(i % 2).step_by(2) {
            let e = enrollment::create(
                store,
                &CreateEnrollment {
                    user_id: u.id.clone(),
                    course_id: c.id.clone(),
                    status: None,
                },
            )
            .await?;
            let progress = ((i * 37 + count * 11) % 101) as u8;
            enrollment::update_progress(store, &e.id, &ProgressUpdate { progress }).await?;
            count += 1;
        }
    }
    println!("[done] Created {count} enrollments");
    Ok(())
}

async fn seed_assessments(store: &Store, courses: &[Course]) -> anyhow::Result<()> {
    let course_id = courses.first().map(|c| c.id.clone());

    assessment::create(
        store,
        &CreateAssessment {
            course_id: course_id.clone(),
            title: "Fix the borrow".to_string(),
            description: Some("Make the program compile and print 6.".to_string()),
            difficulty: Some("easy".to_string()),
            status: None,
            is_active: None,
            payload: AssessmentPayload::CodeFix {
                broken_code: "fn main() { let x = 5; x += 1; println!(\"{x}\"); }".to_string(),
                correct_output: "6".to_string(),
                language: Some("rust".to_string()),
            },
        },
    )
    .await?;

    assessment::create(
        store,
        &CreateAssessment {
            course_id,
            title: "Top customers".to_string(),
            description: Some("Return the names of customers with orders.".to_string()),
            difficulty: Some("medium".to_string()),
            status: None,
            is_active: None,
            payload: AssessmentPayload::SqlQuery {
                expected_query: "SELECT DISTINCT c.name FROM customers c JOIN orders o ON o.customer_id = c.id".to_string(),
                sample_table: json!({
                    "columns": ["id", "name"],
                    "rows": [[1, "Ada"], [2, "Grace"]]
                }),
            },
        },
    )
    .await?;

    println!("[done] Created 2 assessments");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_every_collection() {
        let store = Store::memory();
        let users = seed_users(&store).await.unwrap();
        let courses = seed_courses(&store).await.unwrap();
        seed_content(&store, &courses).await.unwrap();
        seed_enrollments(&store, &users, &courses).await.unwrap();
        seed_assessments(&store, &courses).await.unwrap();

        let count = |collection| {
            let store = store.clone();
            async move { store.count(collection, &Filter::new()).await.unwrap() }
        };
        assert_eq!(count(collections::USERS).await, 8);
        assert_eq!(count(collections::COURSES).await, 4);
        assert_eq!(count(collections::MODULES).await, 8);
        assert_eq!(count(collections::LESSONS).await, 16);
        assert_eq!(count(collections::QUIZZES).await, 24);
        assert_eq!(count(collections::ENROLLMENTS).await, 16);
        assert_eq!(count(collections::ASSESSMENTS).await, 2);

        let quiz = store
            .find_as::<coursedesk::models::quiz::Quiz>(collections::QUIZZES, &Filter::new())
            .await
            .unwrap();
        assert_eq!(quiz[0].question, "Module 1 check (EASY)");
    }
}

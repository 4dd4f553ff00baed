//! Courses and the denormalized list of enrolled users.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;
use super::timestamp::RecordDate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Active,
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub course_name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub language: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub enrolled_users: Vec<String>,
    /// Always `enrolled_users.len()` after an enrollment mutation.
    #[serde(default, deserialize_with = "lenient")]
    pub enrolled_students: i64,
    /// Number of enrollment records pointing at this course.
    #[serde(default, deserialize_with = "lenient")]
    pub enrollment_count: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<f64>,
    /// Unrecognised stored values read as unset.
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<CourseStatus>,
    pub created_at: Option<RecordDate>,
    pub updated_at: Option<RecordDate>,
}

impl Course {
    /// `title`, falling back to `courseName`, then the id.
    pub fn display_name(&self) -> String {
        self.title
            .as_deref()
            .or(self.course_name.as_deref())
            .unwrap_or(&self.id)
            .to_string()
    }

    /// Fill the defaults list views expect.
    pub fn normalized(mut self) -> Self {
        self.course_id.get_or_insert_with(|| self.id.clone());
        if self.title.is_none() {
            self.title = self.course_name.clone().or_else(|| Some(self.id.clone()));
        }
        if self.course_name.is_none() {
            self.course_name = self.title.clone();
        }
        self.description
            .get_or_insert_with(|| "No description available".to_string());
        self.difficulty.get_or_insert_with(|| "Beginner".to_string());
        self.language.get_or_insert_with(|| "General".to_string());
        self.duration.get_or_insert(0.0);
        self.rating.get_or_insert(0.0);
        self.status.get_or_insert(CourseStatus::Active);
        self.enrolled_students = self.enrolled_users.len() as i64;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    #[validate(length(min = 1, max = 120))]
    pub course_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub course_name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub language: Option<String>,
    #[validate(range(min = 0.0))]
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourse {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub course_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
}

impl UpdateCourse {
    /// Keep `title` and `courseName` in sync when only one is supplied.
    pub fn synced(mut self) -> Self {
        match (&self.title, &self.course_name) {
            (Some(title), None) => self.course_name = Some(title.clone()),
            (None, Some(name)) => self.title = Some(name.clone()),
            _ => {}
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CourseMember {
    #[validate(email)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalized_fills_defaults_and_recounts_students() {
        let course: Course = serde_json::from_value(json!({
            "id": "rust_1",
            "courseName": "Rust",
            "enrolledUsers": ["a@x.io", "b@x.io"],
            "enrolledStudents": 7
        }))
        .unwrap();
        let course = course.normalized();
        assert_eq!(course.title.as_deref(), Some("Rust"));
        assert_eq!(course.description.as_deref(), Some("No description available"));
        assert_eq!(course.status, Some(CourseStatus::Active));
        assert_eq!(course.enrolled_students, 2);
    }

    #[test]
    fn display_name_prefers_title() {
        let course: Course =
            serde_json::from_value(json!({"id": "c", "title": "T", "courseName": "N"})).unwrap();
        assert_eq!(course.display_name(), "T");
    }

    #[test]
    fn update_syncs_title_and_course_name() {
        let update = UpdateCourse {
            title: Some("New".to_string()),
            ..Default::default()
        }
        .synced();
        assert_eq!(update.course_name.as_deref(), Some("New"));

        let update = UpdateCourse {
            course_name: Some("Other".to_string()),
            ..Default::default()
        }
        .synced();
        assert_eq!(update.title.as_deref(), Some("Other"));
    }
}

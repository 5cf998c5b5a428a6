//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StudyRepository` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use study_assistant_core::domain::{
    Course, NewCourse, NewNote, NewTopic, Note, Topic, DEFAULT_COURSE_COLOR,
};
use study_assistant_core::ports::{PortError, PortResult, StudyRepository};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StudyRepository` port.
#[derive(Clone)]
pub struct PgStudyRepository {
    pool: PgPool,
}

impl PgStudyRepository {
    /// Creates a new `PgStudyRepository`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    code: String,
    color: String,
    created_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self, topics: Vec<Topic>) -> Course {
        Course {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            code: self.code,
            color: self.color,
            created_at: self.created_at,
            topics,
        }
    }
}

#[derive(FromRow)]
struct TopicRecord {
    id: Uuid,
    course_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}
impl TopicRecord {
    fn to_domain(self, notes: Vec<Note>) -> Topic {
        Topic {
            id: self.id,
            course_id: self.course_id,
            name: self.name,
            created_at: self.created_at,
            notes,
        }
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    topic_id: Uuid,
    title: String,
    content: String,
    file_url: Option<String>,
    created_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            topic_id: self.topic_id,
            title: self.title,
            content: self.content,
            file_url: self.file_url,
            created_at: self.created_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a foreign-key violation (parent row missing) to `NotFound`.
fn insert_error(e: sqlx::Error, parent: &str, id: Uuid) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
            PortError::NotFound(format!("{} {} not found", parent, id))
        }
        _ => unexpected(e),
    }
}

//=========================================================================================
// `StudyRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyRepository for PgStudyRepository {
    async fn list_courses(&self, user_id: Uuid) -> PortResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, CourseRecord>(
            "SELECT id, user_id, name, code, color, created_at FROM courses WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        if courses.is_empty() {
            return Ok(Vec::new());
        }

        let course_ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
        let topics = sqlx::query_as::<_, TopicRecord>(
            "SELECT id, course_id, name, created_at FROM topics WHERE course_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&course_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let topic_ids: Vec<Uuid> = topics.iter().map(|t| t.id).collect();
        let notes = sqlx::query_as::<_, NoteRecord>(
            "SELECT id, topic_id, title, content, file_url, created_at FROM notes WHERE topic_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&topic_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        // Group children under their parents, keeping the query order.
        let mut notes_by_topic: HashMap<Uuid, Vec<Note>> = HashMap::new();
        for note in notes {
            notes_by_topic
                .entry(note.topic_id)
                .or_default()
                .push(note.to_domain());
        }

        let mut topics_by_course: HashMap<Uuid, Vec<Topic>> = HashMap::new();
        for topic in topics {
            let notes = notes_by_topic.remove(&topic.id).unwrap_or_default();
            topics_by_course
                .entry(topic.course_id)
                .or_default()
                .push(topic.to_domain(notes));
        }

        Ok(courses
            .into_iter()
            .map(|course| {
                let topics = topics_by_course.remove(&course.id).unwrap_or_default();
                course.to_domain(topics)
            })
            .collect())
    }

    async fn create_course(&self, user_id: Uuid, course: NewCourse) -> PortResult<Course> {
        let color = course
            .color
            .unwrap_or_else(|| DEFAULT_COURSE_COLOR.to_string());
        let record = sqlx::query_as::<_, CourseRecord>(
            "INSERT INTO courses (id, user_id, name, code, color) VALUES ($1, $2, $3, $4, $5) RETURNING id, user_id, name, code, color, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&course.name)
        .bind(&course.code)
        .bind(&color)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic> {
        let record = sqlx::query_as::<_, TopicRecord>(
            "INSERT INTO topics (id, course_id, name) VALUES ($1, $2, $3) RETURNING id, course_id, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(topic.course_id)
        .bind(&topic.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, "Course", topic.course_id))?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(
            "INSERT INTO notes (id, topic_id, title, content, file_url) VALUES ($1, $2, $3, $4, $5) RETURNING id, topic_id, title, content, file_url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(note.topic_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.file_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, "Topic", note.topic_id))?;
        Ok(record.to_domain())
    }

    async fn course_owner(&self, course_id: Uuid) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Course {} not found", course_id))
                }
                _ => unexpected(e),
            })
    }

    async fn topic_owner(&self, topic_id: Uuid) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT c.user_id FROM topics t JOIN courses c ON c.id = t.course_id WHERE t.id = $1",
        )
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Topic {} not found", topic_id)),
            _ => unexpected(e),
        })
    }
}

//! services/api/src/web/protocol.rs
//!
//! Defines the JSON shapes exchanged between clients and the API server, and
//! their conversions to and from the core domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use study_assistant_core::domain::{
    AuthUser, ChatMode, Course, ImageAttachment, Note, SolveRequest, Topic,
};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Chat Proxy
//=========================================================================================

/// Tutor mode as it appears on the wire.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireMode {
    Bounded,
    Expanded,
}

impl From<WireMode> for ChatMode {
    fn from(mode: WireMode) -> Self {
        match mode {
            WireMode::Bounded => ChatMode::Bounded,
            WireMode::Expanded => ChatMode::Expanded,
        }
    }
}

impl From<ChatMode> for WireMode {
    fn from(mode: ChatMode) -> Self {
        match mode {
            ChatMode::Bounded => WireMode::Bounded,
            ChatMode::Expanded => WireMode::Expanded,
        }
    }
}

/// Body of `POST /api/solve`. Unknown fields are rejected.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SolveRequestBody {
    #[serde(default)]
    pub message: String,
    pub mode: WireMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
}

impl SolveRequestBody {
    /// Checks the cross-field rules serde cannot express and builds the domain request.
    pub fn into_domain(self) -> Result<SolveRequest, String> {
        let image_url = self.image_url.filter(|u| !u.trim().is_empty());
        let image_base64 = self.image_base64.filter(|d| !d.trim().is_empty());

        let image = match (image_url, image_base64) {
            (Some(_), Some(_)) => {
                return Err("Send either imageUrl or imageBase64, not both".to_string())
            }
            (Some(url), None) => {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err("imageUrl must be an http(s) URL".to_string());
                }
                Some(ImageAttachment::Url(url))
            }
            (None, Some(data)) => Some(ImageAttachment::Inline {
                data,
                media_type: self.image_type,
            }),
            (None, None) => {
                if self.image_type.is_some() {
                    return Err("imageType requires imageBase64".to_string());
                }
                None
            }
        };

        if self.message.trim().is_empty() && image.is_none() {
            return Err("message must not be empty".to_string());
        }

        Ok(SolveRequest {
            message: self.message,
            mode: self.mode.into(),
            notes: self.notes,
            course_name: self.course_name,
            image,
        })
    }

    /// The wire form of a domain request. Inverse of `into_domain`.
    pub fn from_domain(request: SolveRequest) -> Self {
        let (image_url, image_base64, image_type) = match request.image {
            Some(ImageAttachment::Url(url)) => (Some(url), None, None),
            Some(ImageAttachment::Inline { data, media_type }) => (None, Some(data), media_type),
            None => (None, None, None),
        };
        Self {
            message: request.message,
            mode: request.mode.into(),
            notes: request.notes,
            course_name: request.course_name,
            image_url,
            image_base64,
            image_type,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SolveResponse {
    pub reply: String,
}

/// Body of every error response.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

//=========================================================================================
// Courses, Topics, Notes
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    pub content: String,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Vec<NoteResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub code: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub topics: Vec<TopicResponse>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            topic_id: note.topic_id,
            title: note.title,
            content: note.content,
            file_url: note.file_url,
            created_at: note.created_at,
        }
    }
}

impl From<NoteResponse> for Note {
    fn from(note: NoteResponse) -> Self {
        Self {
            id: note.id,
            topic_id: note.topic_id,
            title: note.title,
            content: note.content,
            file_url: note.file_url,
            created_at: note.created_at,
        }
    }
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            course_id: topic.course_id,
            name: topic.name,
            created_at: topic.created_at,
            notes: topic.notes.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TopicResponse> for Topic {
    fn from(topic: TopicResponse) -> Self {
        Self {
            id: topic.id,
            course_id: topic.course_id,
            name: topic.name,
            created_at: topic.created_at,
            notes: topic.notes.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            user_id: course.user_id,
            name: course.name,
            code: course.code,
            color: course.color,
            created_at: course.created_at,
            topics: course.topics.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<CourseResponse> for Course {
    fn from(course: CourseResponse) -> Self {
        Self {
            id: course.id,
            user_id: course.user_id,
            name: course.name,
            code: course.code,
            color: course.color,
            created_at: course.created_at,
            topics: course.topics.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateCourseRequest {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateTopicRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct UploadResponse {
    pub url: String,
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<AuthUser> for AuthResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

impl From<AuthResponse> for AuthUser {
    fn from(user: AuthResponse) -> Self {
        Self {
            id: user.user_id,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<SolveRequest, String> {
        serde_json::from_value::<SolveRequestBody>(value)
            .map_err(|e| e.to_string())?
            .into_domain()
    }

    #[test]
    fn minimal_request_is_accepted() {
        let request = parse(json!({ "message": "What is a derivative?", "mode": "bounded" })).unwrap();
        assert_eq!(request.mode, ChatMode::Bounded);
        assert!(request.image.is_none());
    }

    #[test]
    fn unknown_fields_and_modes_are_rejected() {
        assert!(parse(json!({ "message": "hi", "mode": "bounded", "temperature": 2 })).is_err());
        assert!(parse(json!({ "message": "hi", "mode": "creative" })).is_err());
        assert!(parse(json!({ "message": "hi" })).is_err());
    }

    #[test]
    fn image_rules() {
        let inline = parse(json!({
            "message": "", "mode": "expanded", "imageBase64": "aGVsbG8=", "imageType": "image/png"
        }))
        .unwrap();
        assert_eq!(
            inline.image,
            Some(ImageAttachment::Inline {
                data: "aGVsbG8=".into(),
                media_type: Some("image/png".into())
            })
        );

        assert!(parse(json!({
            "message": "x", "mode": "expanded",
            "imageBase64": "aGVsbG8=", "imageUrl": "https://example.com/a.png"
        }))
        .is_err());
        assert!(parse(json!({ "message": "x", "mode": "expanded", "imageUrl": "file:///etc/passwd" })).is_err());
        assert!(parse(json!({ "message": "  ", "mode": "bounded" })).is_err());
    }

    #[test]
    fn domain_request_survives_the_wire() {
        let request = SolveRequest {
            message: "hi".into(),
            mode: ChatMode::Expanded,
            notes: Some("n".into()),
            course_name: Some("Calc I".into()),
            image: Some(ImageAttachment::Url("https://example.com/a.png".into())),
        };
        let body = serde_json::to_value(SolveRequestBody::from_domain(request)).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "hi", "mode": "expanded", "notes": "n",
                "courseName": "Calc I", "imageUrl": "https://example.com/a.png"
            })
        );
    }
}

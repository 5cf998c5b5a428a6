//! crates/study_assistant_core/src/prompt.rs
//!
//! Builds the system instruction and the user content blocks for one chat turn.

use crate::domain::{ChatMode, ContentBlock, InlineImage, SolveRequest};

const PERSONA: &str = r#"You are Teech, a friendly and helpful AI tutor. Your goal is to help students understand their course material better.

You should:
- Explain concepts in simple, clear terms
- Use analogies and examples to make things easier to understand
- Break down complex problems step by step
- Be encouraging and supportive
- If solving a problem, show your work clearly"#;

/// The sentence that restricts the tutor to the student's notes.
pub const BOUNDED_RESTRICTION: &str = r#"IMPORTANT: You are in "Bounded" mode. Only use the following notes from the student's course to answer their question. Do not use external knowledge beyond what's in these notes:"#;

const BOUNDED_NO_NOTES: &str = r#"IMPORTANT: You are in "Bounded" mode, but the student has not added any notes to this course yet. Do not answer from external knowledge. Let the student know that there are no notes to work from and suggest they add notes or switch to "Expanded" mode."#;

const BOUNDED_MISSING_ANSWER: &str = r#"If the answer cannot be found in the notes, let the student know and suggest they switch to "Expanded" mode."#;

const EXPANDED_MODE: &str = r#"You are in "Expanded" mode. You can use both the student's notes (if provided) AND your general knowledge to give comprehensive explanations."#;

const IMAGE_INSTRUCTION: &str = r#"The student has attached an image (for example a photo or screenshot of an assignment). Read it carefully, including any handwriting, equations or diagrams, and help them with what it shows."#;

/// Text sent in place of an empty message when only an image is attached.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "Please help me with this image.";

/// Media type assumed when the caller or the remote server does not declare one.
pub const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// Course name used when the request does not name one.
pub const DEFAULT_COURSE_NAME: &str = "General";

/// Builds the system instruction for a chat turn.
///
/// `with_image` is whether an image will actually be attached to the outbound
/// request, which can differ from the request when a remote image failed to load.
pub fn build_system_prompt(request: &SolveRequest, with_image: bool) -> String {
    let course = request
        .course_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_COURSE_NAME);

    let mut prompt = format!("{}\n\nCurrent course: {}\n", PERSONA, course);

    let notes = request
        .notes
        .as_deref()
        .filter(|notes| !notes.trim().is_empty());

    match (request.mode, notes) {
        (ChatMode::Bounded, Some(notes)) => {
            prompt.push_str(&format!(
                "\n\n{}\n\n--- STUDENT'S NOTES ---\n{}\n--- END OF NOTES ---\n\n{}",
                BOUNDED_RESTRICTION, notes, BOUNDED_MISSING_ANSWER
            ));
        }
        (ChatMode::Bounded, None) => {
            prompt.push_str("\n\n");
            prompt.push_str(BOUNDED_NO_NOTES);
        }
        (ChatMode::Expanded, notes) => {
            prompt.push_str("\n\n");
            prompt.push_str(EXPANDED_MODE);
            if let Some(notes) = notes {
                prompt.push_str(&format!("\n\nStudent's notes for reference:\n{}", notes));
            }
        }
    }

    if with_image {
        prompt.push_str("\n\n");
        prompt.push_str(IMAGE_INSTRUCTION);
    }

    prompt
}

/// Builds the user message: the image block first when present, then the text block.
pub fn build_user_content(message: &str, image: Option<InlineImage>) -> Vec<ContentBlock> {
    let has_image = image.is_some();
    let mut blocks = Vec::with_capacity(2);
    if let Some(image) = image {
        blocks.push(ContentBlock::Image(image));
    }

    let text = if message.trim().is_empty() && has_image {
        IMAGE_ONLY_PLACEHOLDER.to_string()
    } else {
        message.to_string()
    };
    blocks.push(ContentBlock::Text(text));
    blocks
}

/// Picks the media type to declare for an image.
///
/// Anything that is not an `image/*` type (missing, `application/octet-stream`,
/// ...) falls back to JPEG. Parameters such as `; charset=` are stripped.
pub fn resolve_media_type(declared: Option<&str>) -> String {
    declared
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value.starts_with("image/") && value.len() > "image/".len())
        .unwrap_or_else(|| DEFAULT_IMAGE_MEDIA_TYPE.to_string())
}

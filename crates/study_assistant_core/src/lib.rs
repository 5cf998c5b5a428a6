pub mod auth_context;
pub mod dashboard;
pub mod domain;
pub mod ports;
pub mod prompt;
pub mod transcript;
pub mod tutor;

pub use domain::{
    AuthSession, AuthUser, Bookmark, ChatMode, ChatPrompt, ContentBlock, Conversation, Course,
    ImageAttachment, InlineImage, Message, NewCourse, NewNote, NewTopic, Note, ReplyBlock, Role,
    SolveRequest, Topic,
};
pub use ports::{
    AuthProvider, ChatCompletionService, ImageFetcher, ObjectStorage, PortError, PortResult,
    SolveService, StudyRepository,
};
pub use tutor::Tutor;

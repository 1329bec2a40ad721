pub mod models;
pub use models::{Message, MessageId, Role, Transcript, Variant};

pub mod session;
pub use session::{
    CONNECTION_ERROR_MESSAGE, ChatSession, ChatSessionBuilder, ChatSnapshot, SubmitOutcome,
};

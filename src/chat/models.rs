//! The core models for a chat with the manual assistant.
use std::fmt;

use serde::Serialize;

/// Allocated in creation order within a session so sorting by id is
/// the same as sorting by time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Reminder,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    display_name: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant: Option<Variant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn variant(&self) -> Option<Variant> {
        self.variant
    }

    pub fn is_reminder(&self) -> bool {
        self.variant == Some(Variant::Reminder)
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Append-only list of messages in display order.
#[derive(Clone, Debug, Default)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    fn next_id(&self) -> MessageId {
        MessageId(self.0.len() as u64 + 1)
    }

    pub(crate) fn push_user(&mut self, display_name: &str, content: &str) -> MessageId {
        self.push(Role::User, display_name, content, None, Vec::new())
    }

    pub(crate) fn push_agent(
        &mut self,
        display_name: &str,
        content: &str,
        variant: Option<Variant>,
        notes: Vec<String>,
    ) -> MessageId {
        self.push(Role::Agent, display_name, content, variant, notes)
    }

    fn push(
        &mut self,
        role: Role,
        display_name: &str,
        content: &str,
        variant: Option<Variant>,
        notes: Vec<String>,
    ) -> MessageId {
        let id = self.next_id();
        self.0.push(Message {
            id,
            role,
            display_name: display_name.to_string(),
            content: content.to_string(),
            variant,
            notes,
        });
        id
    }
}

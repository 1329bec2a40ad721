use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::models::{Message, Transcript, Variant};
use crate::calendar::EventStore;
use crate::core::AppConfig;
use crate::rag::{BoxedRagClient, HttpRagClient, RagQuery, interpret};

pub const CONNECTION_ERROR_MESSAGE: &str = "Sorry, there was a problem connecting to the server.";

/// Everything a view needs to draw the chat. Every snapshot is a
/// committed state, never a partially applied turn.
#[derive(Clone, Debug, Default)]
pub struct ChatSnapshot {
    pub transcript: Transcript,
    pub draft: String,
    pub awaiting: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank question or a request already in flight. Nothing changed.
    Rejected,
    Answered { reminder: bool },
    /// The backend could not be reached or sent something unusable.
    Failed,
}

/// Clears the awaiting flag if a turn is dropped before it completes,
/// e.g. when the task running it is aborted.
struct AwaitingGuard<'a> {
    state: &'a watch::Sender<ChatSnapshot>,
    armed: bool,
}

impl AwaitingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AwaitingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| s.awaiting = false);
        }
    }
}

/// A single conversation with the RAG backend.
///
/// The session is either idle or waiting on exactly one request. All
/// state lives behind one `watch` channel so reads, writes and
/// observers are serialized through the same lock and no lock is held
/// across an `.await`.
///
/// Use `ChatSessionBuilder` to construct a `ChatSession`.
pub struct ChatSession {
    pub session_id: String,
    client: BoxedRagClient,
    events: Option<EventStore>,
    user_name: String,
    agent_name: String,
    state: watch::Sender<ChatSnapshot>,
    background: Mutex<JoinSet<()>>,
    // Set once by `shutdown`, also wakes any `wait_for_background`
    // holding tasks outside the mutex
    stopped: watch::Sender<bool>,
}

impl ChatSession {
    pub fn from_config(config: &AppConfig, events: Option<EventStore>) -> Self {
        let mut builder = ChatSessionBuilder::new(Box::new(HttpRagClient::from_config(config)))
            .display_names(&config.user_display_name, &config.agent_display_name);
        if let Some(events) = events {
            builder = builder.events(events);
        }
        builder.build()
    }

    fn background(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the calendar when the session starts.
    pub async fn initialize(&self) {
        if let Some(events) = &self.events {
            let count = events.initialize().await;
            tracing::debug!(session_id = %self.session_id, "Loaded {} calendar events", count);
        }
    }

    pub async fn submit(&self, question: &str) -> SubmitOutcome {
        self.submit_query(RagQuery::new(question)).await
    }

    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.state.borrow().draft.clone();
        self.submit(&draft).await
    }

    /// Runs one turn of the chat: append the question, ask the
    /// backend, append the answer.
    pub async fn submit_query(&self, mut query: RagQuery) -> SubmitOutcome {
        let question = query.query.trim().to_string();
        if question.is_empty() {
            return SubmitOutcome::Rejected;
        }

        // Checking and setting `awaiting` happens under a single lock
        // so two concurrent submits can't both get through
        let accepted = self.state.send_if_modified(|s| {
            if s.awaiting {
                return false;
            }
            s.transcript.push_user(&self.user_name, &question);
            s.draft.clear();
            s.awaiting = true;
            true
        });
        if !accepted {
            tracing::debug!(session_id = %self.session_id, "Rejected submit while awaiting a response");
            return SubmitOutcome::Rejected;
        }

        let guard = AwaitingGuard {
            state: &self.state,
            armed: true,
        };

        query.query = question;
        let outcome = match self.client.query(&query).await {
            Ok(resp) => {
                let interpretation = interpret(&resp);
                let variant = interpretation.is_reminder.then_some(Variant::Reminder);
                self.state.send_modify(|s| {
                    s.transcript.push_agent(
                        &self.agent_name,
                        &interpretation.display_text,
                        variant,
                        interpretation.notes.clone(),
                    );
                    s.awaiting = false;
                });

                // A reminder may have just created an event so the
                // calendar needs to catch up, without holding up the
                // chat turn
                if interpretation.is_reminder {
                    self.dispatch_refresh();
                }

                SubmitOutcome::Answered {
                    reminder: interpretation.is_reminder,
                }
            }
            Err(e) => {
                tracing::error!(session_id = %self.session_id, "Query failed: {:#}", e);
                self.state.send_modify(|s| {
                    s.transcript
                        .push_agent(&self.agent_name, CONNECTION_ERROR_MESSAGE, None, Vec::new());
                    s.awaiting = false;
                });
                SubmitOutcome::Failed
            }
        };
        guard.disarm();

        outcome
    }

    fn dispatch_refresh(&self) {
        let Some(events) = self.events.clone() else {
            return;
        };
        if *self.stopped.borrow() {
            tracing::debug!(session_id = %self.session_id, "Skipping calendar refresh after shutdown");
            return;
        }
        let mut background = self.background();
        // Reap refreshes that already finished
        while background.try_join_next().is_some() {}
        background.spawn(async move {
            events.refresh().await;
        });
    }

    /// Waits for every calendar refresh dispatched so far. Returns
    /// early, aborting what's left, if the session is shut down.
    pub async fn wait_for_background(&self) {
        let mut tasks = std::mem::take(&mut *self.background());
        let mut stopped = self.stopped.subscribe();
        loop {
            tokio::select! {
                res = tasks.join_next() => match res {
                    Some(Err(e)) if !e.is_cancelled() => {
                        tracing::error!(session_id = %self.session_id, "Calendar refresh task failed: {}", e);
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = async { stopped.wait_for(|stopped| *stopped).await.is_ok() } => {
                    tasks.abort_all();
                    break;
                }
            }
        }
    }

    /// Stops any calendar refreshes still running, including ones a
    /// pending `wait_for_background` is joining. No refreshes are
    /// dispatched afterwards. Questions already submitted are not
    /// affected.
    pub fn shutdown(&self) {
        self.stopped.send_replace(true);
        self.background().abort_all();
        tracing::debug!(session_id = %self.session_id, "Chat session shut down");
    }

    /// Updates the text being typed. Ignored while a request is in
    /// flight, the same way the input box is disabled.
    pub fn set_draft(&self, text: &str) -> bool {
        self.state.send_if_modified(|s| {
            if s.awaiting || s.draft == text {
                return false;
            }
            s.draft = text.to_string();
            true
        })
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.borrow().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().transcript.messages()
    }

    pub fn is_awaiting(&self) -> bool {
        self.state.borrow().awaiting
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.state.subscribe()
    }

    pub fn events(&self) -> Option<&EventStore> {
        self.events.as_ref()
    }
}

pub struct ChatSessionBuilder {
    client: BoxedRagClient,
    events: Option<EventStore>,
    session_id: Option<String>,
    user_name: String,
    agent_name: String,
}

impl ChatSessionBuilder {
    pub fn new(client: BoxedRagClient) -> Self {
        Self {
            client,
            events: None,
            session_id: None,
            user_name: String::from("You"),
            agent_name: String::from("Mindual"),
        }
    }

    pub fn events(mut self, events: EventStore) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session_id(mut self, id: &str) -> Self {
        self.session_id = Some(id.to_string());
        self
    }

    pub fn display_names(mut self, user: &str, agent: &str) -> Self {
        self.user_name = user.to_string();
        self.agent_name = agent.to_string();
        self
    }

    pub fn build(self) -> ChatSession {
        let (state, _rx) = watch::channel(ChatSnapshot::default());
        let (stopped, _rx) = watch::channel(false);
        ChatSession {
            session_id: self
                .session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            client: self.client,
            events: self.events,
            user_name: self.user_name,
            agent_name: self.agent_name,
            state,
            background: Mutex::new(JoinSet::new()),
            stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::models::Role;
    use crate::rag::RagClient;
    use anyhow::{Error, Result, anyhow};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct MockClient {
        resp: Result<Value, String>,
        calls: Arc<AtomicUsize>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl RagClient for MockClient {
        async fn query(&self, _query: &RagQuery) -> Result<Value, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.resp.clone().map_err(|e| anyhow!(e))
        }
    }

    fn session_with(resp: Result<Value, String>) -> (ChatSession, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = MockClient {
            resp,
            calls: calls.clone(),
            gate: None,
        };
        (ChatSessionBuilder::new(Box::new(client)).build(), calls)
    }

    async fn wait_for_calls(calls: &AtomicUsize, n: usize) {
        while calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_builder_defaults() {
        let (session, _) = session_with(Ok(json!({})));
        assert!(!session.session_id.is_empty());
        assert!(session.events().is_none());
        assert!(session.messages().is_empty());
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_builder_session_id() {
        let client = MockClient {
            resp: Ok(json!({})),
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
        };
        let session = ChatSessionBuilder::new(Box::new(client))
            .session_id("fixed-id")
            .build();
        assert_eq!(session.session_id, "fixed-id");
    }

    #[tokio::test]
    async fn test_blank_questions_are_rejected() {
        let (session, calls) = session_with(Ok(json!({"answer": "hi"})));

        assert_eq!(session.submit("").await, SubmitOutcome::Rejected);
        assert_eq!(session.submit("   ").await, SubmitOutcome::Rejected);
        assert_eq!(session.submit("\n\t").await, SubmitOutcome::Rejected);

        assert!(session.messages().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_answered_turn() {
        let (session, calls) = session_with(Ok(json!({
            "answer": "Rinse the filter under running water.",
            "contexts": [{"page": 12}]
        })));

        let outcome = session.submit("  How do I clean the filter?  ").await;
        assert_eq!(outcome, SubmitOutcome::Answered { reminder: false });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), Role::User);
        assert_eq!(messages[0].content(), "How do I clean the filter?");
        assert_eq!(messages[0].display_name(), "You");
        assert_eq!(messages[1].role(), Role::Agent);
        assert_eq!(
            messages[1].content(),
            "Rinse the filter under running water.\n\n(reference: based on manual content around p.12)"
        );
        assert_eq!(messages[1].variant(), None);
        assert!(messages[0].id() < messages[1].id());
        assert!(!session.is_awaiting());
    }

    #[tokio::test]
    async fn test_reminder_turn_without_event_store() {
        let (session, _) = session_with(Ok(json!({
            "answer": "Reminder set for 9am tomorrow.",
            "intent": "reminder"
        })));

        let outcome = session.submit("Remind me to descale").await;
        assert_eq!(outcome, SubmitOutcome::Answered { reminder: true });
        let last = session.messages().pop().unwrap();
        assert!(last.is_reminder());
        assert_eq!(last.content(), "Reminder set for 9am tomorrow.");
        session.wait_for_background().await;
    }

    #[tokio::test]
    async fn test_failed_turn_appends_apology() {
        let (session, calls) = session_with(Err("connection refused".to_string()));

        let outcome = session.submit("hello?").await;
        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1].content(),
            "Sorry, there was a problem connecting to the server."
        );
        assert_eq!(messages[1].role(), Role::Agent);
        assert!(!session.is_awaiting());

        // The user can try again by hand
        let outcome = session.submit("hello?").await;
        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let client = MockClient {
            resp: Ok(json!({"answer": "done"})),
            calls: calls.clone(),
            gate: Some(gate.clone()),
        };
        let session = Arc::new(ChatSessionBuilder::new(Box::new(client)).build());

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first").await })
        };
        wait_for_calls(&calls, 1).await;

        assert!(session.is_awaiting());
        assert_eq!(session.submit("second").await, SubmitOutcome::Rejected);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        assert_eq!(
            first.await.unwrap(),
            SubmitOutcome::Answered { reminder: false }
        );
        assert_eq!(session.messages().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_awaiting());
    }

    #[tokio::test]
    async fn test_shutdown_stops_a_pending_wait() {
        use crate::calendar::EventStoreConfig;
        use std::time::Duration;

        // Accepts connections into the backlog and never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let events = EventStore::new(EventStoreConfig {
            api_base_url: format!("http://{}", listener.local_addr().unwrap()),
            limit: 10,
            timeout: Duration::from_secs(60),
        });
        let client = MockClient {
            resp: Ok(json!({"answer": "Scheduled.", "intent": "reminder"})),
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
        };
        let session = Arc::new(ChatSessionBuilder::new(Box::new(client)).events(events).build());

        let outcome = session.submit("remind me").await;
        assert_eq!(outcome, SubmitOutcome::Answered { reminder: true });

        let stopper = {
            let session = session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                session.shutdown();
            })
        };
        tokio::time::timeout(Duration::from_secs(5), session.wait_for_background())
            .await
            .expect("wait_for_background should return once the session shuts down");
        stopper.await.unwrap();

        // Nothing new is dispatched after shutdown
        let outcome = session.submit("remind me again").await;
        assert_eq!(outcome, SubmitOutcome::Answered { reminder: true });
        assert!(session.background().is_empty());
        drop(listener);
    }

    #[tokio::test]
    async fn test_aborted_turn_clears_awaiting() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = MockClient {
            resp: Ok(json!({"answer": "never"})),
            calls: calls.clone(),
            gate: Some(Arc::new(Notify::new())),
        };
        let session = Arc::new(ChatSessionBuilder::new(Box::new(client)).build());

        let handle = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("stuck").await })
        };
        wait_for_calls(&calls, 1).await;
        assert!(session.is_awaiting());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(!session.is_awaiting());
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_draft_is_cleared_on_submit() {
        let (session, _) = session_with(Ok(json!({"answer": "ok"})));

        assert!(session.set_draft("What does E05 mean?"));
        assert_eq!(session.snapshot().draft, "What does E05 mean?");

        let outcome = session.submit_draft().await;
        assert_eq!(outcome, SubmitOutcome::Answered { reminder: false });
        assert_eq!(session.snapshot().draft, "");
        assert_eq!(session.messages()[0].content(), "What does E05 mean?");
    }

    #[tokio::test]
    async fn test_draft_is_locked_while_awaiting() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let client = MockClient {
            resp: Ok(json!({"answer": "ok"})),
            calls: calls.clone(),
            gate: Some(gate.clone()),
        };
        let session = Arc::new(ChatSessionBuilder::new(Box::new(client)).build());

        let turn = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first").await })
        };
        wait_for_calls(&calls, 1).await;

        assert!(!session.set_draft("typing..."));
        gate.notify_one();
        turn.await.unwrap();
        assert!(session.set_draft("typing..."));
    }

    #[tokio::test]
    async fn test_observers_only_see_committed_states() {
        let (session, _) = session_with(Ok(json!({"answer": "ok"})));
        let mut rx = session.subscribe();

        session.submit("hi").await;

        // Two commits happened: the question, then the answer
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.transcript.len(), 2);
        assert!(!snapshot.awaiting);
    }

    #[tokio::test]
    async fn test_notes_are_kept_on_message() {
        let (session, _) = session_with(Ok(json!({
            "answer": "Refill the tank.",
            "trouble": "[E05] Symptom: no water"
        })));
        session.submit("E05?").await;
        let last = session.messages().pop().unwrap();
        assert_eq!(last.notes(), ["[E05] Symptom: no water".to_string()]);
    }
}

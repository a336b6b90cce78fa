//! In-memory generation sessions.
//!
//! Sessions live for the lifetime of the process. The registry is the only
//! state shared between concurrent generations; each session's responses are
//! written only by the generation that owns it.

use chrono::{DateTime, Local};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;

use crate::coverage::CoverageReport;
use crate::orchestrator::ConversationContext;
use crate::stage::{Stage, StageResponses};

/// One generation session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub product_idea: String,
    pub started_at: DateTime<Local>,
    pub template_id: String,
    pub conversation_context: ConversationContext,
    pub responses: StageResponses,
    /// Last stage with a recorded response
    pub current_step: Option<Stage>,
    pub circles_analysis: Option<CoverageReport>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        product_idea: impl Into<String>,
        template_id: impl Into<String>,
        conversation_context: ConversationContext,
    ) -> Self {
        Self {
            id: id.into(),
            product_idea: product_idea.into(),
            started_at: Local::now(),
            template_id: template_id.into(),
            conversation_context,
            responses: StageResponses::new(),
            current_step: None,
            circles_analysis: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        Stage::ALL.iter().all(|s| self.responses.contains_key(s))
    }
}

/// Concurrent session registry keyed by session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` unless its id is already registered.
    ///
    /// Returns `true` when the session was inserted.
    pub fn insert_if_absent(&self, session: Session) -> bool {
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    /// Record a stage response and advance the cursor.
    pub fn record_stage(&self, id: &str, stage: Stage, response: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.responses.insert(stage, response.to_string());
            session.current_step = Some(stage);
        }
    }

    /// Replace the recorded responses with the final bundle.
    pub fn set_responses(&self, id: &str, responses: &StageResponses) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.responses = responses.clone();
        }
    }

    pub fn set_analysis(&self, id: &str, analysis: CoverageReport) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.circles_analysis = Some(analysis);
        }
    }

    /// Snapshot of a session.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

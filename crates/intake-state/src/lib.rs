//! Per-conversation state machine for the task intake flow
//!
//! [`ConversationEngine`] is shared by every front-end: it loads the
//! [`ConversationState`] for a key, routes the [`Input`] through the transition
//! table and persists the result through a [`ConversationStore`].

pub mod answers;
pub mod config;
pub mod engine;
pub mod event;
pub mod reconciler;
pub mod reply;
pub mod state;
pub mod store;
pub mod transitions;

pub use config::ConversationConfig;
pub use engine::ConversationEngine;
pub use event::{Event, Input, UserAction};
pub use reconciler::AnswerReconciler;
pub use reply::{Notice, Reply, TicketOrigin, TurnOutcome};
pub use state::{ConversationState, GeneratedTicket, Phase, PhaseKind, TaskCycle};
pub use store::{ConversationStore, InMemoryConversationStore};
pub use transitions::{Step, route};

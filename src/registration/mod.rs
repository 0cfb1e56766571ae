//! Registration flow: the conversational questionnaire and menu.
//!
//! Inputs are validated field by field, fed through a pure transition
//! function and orchestrated by the `ConversationEngine`, which owns the
//! per-user sessions and calls storage and the plan generator.

pub mod command;
pub mod engine;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod session;
pub mod state;
pub mod transition;
pub mod validate;

pub use command::Command;
pub use engine::{ConversationEngine, Reply};
pub use model::{Gender, PartialProfile, UserProfile};
pub use routes::{RegistrationRouteState, registration_routes};
pub use session::{SessionPeek, SessionStore};
pub use state::{ConversationState, StateTag};
pub use transition::{Effect, Outcome, Transition, transition};

//! Registration state machine states and the per-user conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::PartialProfile;

/// Which input the conversation expects next.
///
/// Registration progresses AwaitingName → … → AwaitingTimeframe, with
/// AwaitingAllergies skipped when the user has none. AwaitingMenuCommand
/// and AwaitingDeleteConfirmation are steady states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTag {
    AwaitingName,
    AwaitingAge,
    AwaitingGender,
    AwaitingWeight,
    AwaitingHeight,
    AwaitingAllergyConfirmation,
    AwaitingAllergies,
    AwaitingGoal,
    AwaitingTimeframe,
    AwaitingMenuCommand,
    AwaitingDeleteConfirmation,
}

impl Default for StateTag {
    fn default() -> Self {
        Self::AwaitingName
    }
}

impl std::fmt::Display for StateTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingAge => "awaiting_age",
            Self::AwaitingGender => "awaiting_gender",
            Self::AwaitingWeight => "awaiting_weight",
            Self::AwaitingHeight => "awaiting_height",
            Self::AwaitingAllergyConfirmation => "awaiting_allergy_confirmation",
            Self::AwaitingAllergies => "awaiting_allergies",
            Self::AwaitingGoal => "awaiting_goal",
            Self::AwaitingTimeframe => "awaiting_timeframe",
            Self::AwaitingMenuCommand => "awaiting_menu_command",
            Self::AwaitingDeleteConfirmation => "awaiting_delete_confirmation",
        };
        write!(f, "{s}")
    }
}

/// Live, in-memory conversation state for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: i64,
    pub state: StateTag,
    pub partial: PartialProfile,
    /// Last time a message was committed to this session.
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// A fresh session at the start of registration.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            state: StateTag::default(),
            partial: PartialProfile::default(),
            updated_at: Utc::now(),
        }
    }

    /// A session for a user whose registration is already stored.
    pub fn registered(user_id: i64) -> Self {
        Self {
            state: StateTag::AwaitingMenuCommand,
            ..Self::new(user_id)
        }
    }

    /// Drop all collected data and restart registration.
    pub fn reset(&mut self) {
        self.state = StateTag::AwaitingName;
        self.partial = PartialProfile::default();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

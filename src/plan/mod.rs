//! Meal plan generation.
//!
//! The engine only sees the [`PlanGenerator`] trait. [`LlmPlanGenerator`]
//! is the production implementation backed by the Anthropic Messages API.

pub mod llm;
pub mod prompts;

pub use llm::{LlmPlanGenerator, PlanConfig};

use async_trait::async_trait;

use crate::error::PlanError;
use crate::registration::model::UserProfile;

/// Produces a human-readable meal plan from a completed profile.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generate plan text. The result is sent to the user as-is.
    async fn generate(&self, profile: &UserProfile) -> Result<String, PlanError>;

    /// Identifier used in logs.
    fn name(&self) -> &str;
}

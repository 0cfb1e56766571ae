//! Pure registration transition function.
//!
//! Given the current state, the partial profile and one raw input, computes
//! the next state, the updated partial profile, the reply and at most one
//! effect. No I/O happens here; effects are executed by the engine.

use super::model::{NO_ALLERGIES, PartialProfile};
use super::prompts;
use super::state::StateTag;
use super::validate::{self, AllergyAnswer, ValidationError};

/// Side-effecting action requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Registration just completed; store the profile.
    PersistProfile,
    /// User confirmed account deletion.
    DeleteProfile,
    /// User asked for a meal plan.
    GeneratePlan,
}

/// How the input was received.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Input valid; the machine advanced along the happy path.
    Accepted,
    /// Input chose between alternative next states.
    Branched(StateTag),
    /// Input failed validation; nothing changed.
    Rejected(ValidationError),
    /// Input means nothing in a steady state; nothing changed.
    Unrecognized,
}

/// Result of a state transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub outcome: Outcome,
    pub state: StateTag,
    pub partial: PartialProfile,
    pub reply: String,
    pub effect: Effect,
    /// Suggested one-tap answers for the reply.
    pub buttons: Vec<String>,
}

impl Transition {
    fn advance(state: StateTag, partial: PartialProfile, reply: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Accepted,
            state,
            partial,
            reply: reply.into(),
            effect: Effect::None,
            buttons: Vec::new(),
        }
    }

    fn stay(
        state: StateTag,
        partial: &PartialProfile,
        outcome: Outcome,
        reply: impl Into<String>,
    ) -> Self {
        Self {
            outcome,
            state,
            partial: partial.clone(),
            reply: reply.into(),
            effect: Effect::None,
            buttons: Vec::new(),
        }
    }

    fn reject(state: StateTag, partial: &PartialProfile, error: ValidationError) -> Self {
        Self::stay(state, partial, Outcome::Rejected(error), prompts::reprompt(&error))
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    fn with_buttons(mut self, buttons: &[&str]) -> Self {
        self.buttons = buttons.iter().map(|b| b.to_string()).collect();
        self
    }
}

/// Store one validated field and move on, or re-prompt on failure.
fn accept<T>(
    from: StateTag,
    partial: &PartialProfile,
    parsed: Result<T, ValidationError>,
    store: impl FnOnce(&mut PartialProfile, T),
    to: StateTag,
    reply: &str,
) -> Transition {
    match parsed {
        Ok(value) => {
            let mut next = partial.clone();
            store(&mut next, value);
            Transition::advance(to, next, reply)
        }
        Err(error) => Transition::reject(from, partial, error),
    }
}

/// Compute the next state for `input` received in `state`.
pub fn transition(state: StateTag, partial: &PartialProfile, input: &str) -> Transition {
    use StateTag::*;

    match state {
        AwaitingName => accept(
            state,
            partial,
            validate::name(input),
            |p, v| p.name = Some(v),
            AwaitingAge,
            prompts::ASK_AGE,
        ),
        AwaitingAge => accept(
            state,
            partial,
            validate::age(input),
            |p, v| p.age = Some(v),
            AwaitingGender,
            prompts::ASK_GENDER,
        ),
        AwaitingGender => accept(
            state,
            partial,
            validate::gender(input),
            |p, v| p.gender = Some(v),
            AwaitingWeight,
            prompts::ASK_WEIGHT,
        ),
        AwaitingWeight => accept(
            state,
            partial,
            validate::weight(input),
            |p, v| p.weight = Some(v),
            AwaitingHeight,
            prompts::ASK_HEIGHT,
        ),
        AwaitingHeight => accept(
            state,
            partial,
            validate::height(input),
            |p, v| p.height = Some(v),
            AwaitingAllergyConfirmation,
            prompts::ASK_ALLERGY_CONFIRMATION,
        ),
        AwaitingAllergyConfirmation => match validate::allergy_confirmation(input) {
            AllergyAnswer::Yes => Transition {
                outcome: Outcome::Branched(AwaitingAllergies),
                ..Transition::advance(AwaitingAllergies, partial.clone(), prompts::ASK_ALLERGIES)
            },
            AllergyAnswer::No => {
                let mut next = partial.clone();
                next.allergies = Some(NO_ALLERGIES.to_string());
                Transition {
                    outcome: Outcome::Branched(AwaitingGoal),
                    ..Transition::advance(AwaitingGoal, next, prompts::ASK_GOAL)
                }
            }
        },
        AwaitingAllergies => accept(
            state,
            partial,
            validate::allergies(input),
            |p, v| p.allergies = Some(v),
            AwaitingGoal,
            prompts::ASK_GOAL,
        ),
        AwaitingGoal => accept(
            state,
            partial,
            validate::goal(input),
            |p, v| p.goal = Some(v),
            AwaitingTimeframe,
            prompts::ASK_TIMEFRAME,
        ),
        AwaitingTimeframe => match validate::timeframe(input) {
            Ok(timeframe) => {
                let mut next = partial.clone();
                next.timeframe = Some(timeframe);
                // The summary is rendered by the engine, which knows the user id.
                Transition::advance(AwaitingMenuCommand, next, prompts::MENU_HINT)
                    .with_effect(Effect::PersistProfile)
            }
            Err(error) => Transition::reject(state, partial, error),
        },
        AwaitingMenuCommand => {
            if prompts::normalize_phrase(input) == prompts::PLAN_PHRASE {
                Transition::stay(state, partial, Outcome::Accepted, "")
                    .with_effect(Effect::GeneratePlan)
            } else {
                Transition::stay(state, partial, Outcome::Unrecognized, prompts::MENU_HELP)
            }
        }
        AwaitingDeleteConfirmation => match input.trim() {
            prompts::CONFIRM_DELETE => {
                // The session is dropped once storage confirms the delete.
                Transition::advance(AwaitingName, PartialProfile::default(), prompts::DELETE_DONE)
                    .with_effect(Effect::DeleteProfile)
            }
            prompts::CANCEL_DELETE => {
                Transition::advance(AwaitingMenuCommand, partial.clone(), prompts::DELETE_CANCELLED)
            }
            _ => Transition::stay(state, partial, Outcome::Unrecognized, prompts::DELETE_REPROMPT)
                .with_buttons(&[prompts::CONFIRM_DELETE, prompts::CANCEL_DELETE]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::model::Gender;
    use crate::registration::validate::{Field, Reason};

    fn run(steps: &[&str]) -> (StateTag, PartialProfile, Vec<Transition>) {
        let mut state = StateTag::AwaitingName;
        let mut partial = PartialProfile::default();
        let mut history = Vec::new();
        for input in steps {
            let t = transition(state, &partial, input);
            state = t.state;
            partial = t.partial.clone();
            history.push(t);
        }
        (state, partial, history)
    }

    #[test]
    fn happy_path_persists_complete_profile() {
        let (state, partial, history) = run(&[
            "Анна",
            "30",
            "ж",
            "65",
            "170",
            "нет",
            "Похудение",
            "3 месяца",
        ]);

        assert_eq!(state, StateTag::AwaitingMenuCommand);
        let last = history.last().unwrap();
        assert_eq!(last.effect, Effect::PersistProfile);
        for t in &history[..history.len() - 1] {
            assert_eq!(t.effect, Effect::None);
        }

        let profile = partial.complete(1).expect("profile should be complete");
        assert_eq!(profile.name, "Анна");
        assert_eq!(profile.age, 30);
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.weight, 65.0);
        assert_eq!(profile.height, 170);
        assert_eq!(profile.allergies, NO_ALLERGIES);
        assert_eq!(profile.goal, "Похудение");
        assert_eq!(profile.timeframe, "3 месяца");
    }

    #[test]
    fn happy_path_visits_states_in_order() {
        let (_, _, history) = run(&[
            "Иван", "45", "М", "80,2", "182", "да", "молоко, орехи", "Набор массы", "Год",
        ]);
        let states: Vec<StateTag> = history.iter().map(|t| t.state).collect();
        use StateTag::*;
        assert_eq!(
            states,
            vec![
                AwaitingAge,
                AwaitingGender,
                AwaitingWeight,
                AwaitingHeight,
                AwaitingAllergyConfirmation,
                AwaitingAllergies,
                AwaitingGoal,
                AwaitingTimeframe,
                AwaitingMenuCommand,
            ]
        );
        let profile = history.last().unwrap().partial.complete(1).unwrap();
        assert_eq!(profile.allergies, "молоко, орехи");
        assert_eq!(profile.weight, 80.2);
    }

    #[test]
    fn age_advances_only_within_bounds() {
        let partial = PartialProfile {
            name: Some("Анна".into()),
            ..Default::default()
        };
        for a in 0..=120 {
            let t = transition(StateTag::AwaitingAge, &partial, &a.to_string());
            if (10..=100).contains(&a) {
                assert_eq!(t.state, StateTag::AwaitingGender, "age {a}");
                assert_eq!(t.partial.age, Some(a as u8));
            } else {
                assert_eq!(t.state, StateTag::AwaitingAge, "age {a}");
                assert_eq!(t.partial, partial, "partial must be unchanged for age {a}");
                assert_eq!(
                    t.outcome,
                    Outcome::Rejected(ValidationError::new(Field::Age, Reason::OutOfRange))
                );
            }
        }
    }

    #[test]
    fn rejection_keeps_earlier_answers() {
        let (state, partial, history) = run(&["Анна", "30", "x"]);
        assert_eq!(state, StateTag::AwaitingGender);
        assert_eq!(partial.name.as_deref(), Some("Анна"));
        assert_eq!(partial.age, Some(30));
        let last = history.last().unwrap();
        assert!(matches!(last.outcome, Outcome::Rejected(_)));
        assert_eq!(last.reply, "Пожалуйста, введи 'М' (мужской) или 'Ж' (женский).");
    }

    #[test]
    fn allergy_yes_goes_to_allergy_list() {
        let t = transition(
            StateTag::AwaitingAllergyConfirmation,
            &PartialProfile::default(),
            "да",
        );
        assert_eq!(t.state, StateTag::AwaitingAllergies);
        assert_eq!(t.outcome, Outcome::Branched(StateTag::AwaitingAllergies));
        assert!(t.partial.allergies.is_none());
    }

    #[test]
    fn allergy_anything_else_skips_to_goal_with_sentinel() {
        for input in ["нет", "не знаю", "no"] {
            let t = transition(
                StateTag::AwaitingAllergyConfirmation,
                &PartialProfile::default(),
                input,
            );
            assert_eq!(t.state, StateTag::AwaitingGoal, "{input}");
            assert_eq!(t.outcome, Outcome::Branched(StateTag::AwaitingGoal));
            assert_eq!(t.partial.allergies.as_deref(), Some(NO_ALLERGIES));
        }
    }

    #[test]
    fn menu_phrase_requests_plan() {
        let partial = PartialProfile::default();
        let t = transition(StateTag::AwaitingMenuCommand, &partial, "Вперёд К Цели");
        assert_eq!(t.effect, Effect::GeneratePlan);
        assert_eq!(t.state, StateTag::AwaitingMenuCommand);
    }

    #[test]
    fn menu_other_text_returns_help() {
        let partial = PartialProfile::default();
        let t = transition(StateTag::AwaitingMenuCommand, &partial, "привет");
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.outcome, Outcome::Unrecognized);
        assert_eq!(t.state, StateTag::AwaitingMenuCommand);
        assert_eq!(t.reply, prompts::MENU_HELP);
    }

    #[test]
    fn delete_confirmation_paths() {
        let partial = PartialProfile::default();

        let yes = transition(StateTag::AwaitingDeleteConfirmation, &partial, "Да, удалить");
        assert_eq!(yes.effect, Effect::DeleteProfile);
        assert_eq!(yes.state, StateTag::AwaitingName);

        let no = transition(StateTag::AwaitingDeleteConfirmation, &partial, "Нет, отменить");
        assert_eq!(no.effect, Effect::None);
        assert_eq!(no.state, StateTag::AwaitingMenuCommand);

        let other = transition(StateTag::AwaitingDeleteConfirmation, &partial, "да");
        assert_eq!(other.effect, Effect::None);
        assert_eq!(other.state, StateTag::AwaitingDeleteConfirmation);
        assert_eq!(other.reply, prompts::DELETE_REPROMPT);
        assert_eq!(other.buttons, vec!["Да, удалить", "Нет, отменить"]);
    }

    #[test]
    fn weight_separators_in_transition() {
        for raw in ["70,5", "70.5"] {
            let t = transition(StateTag::AwaitingWeight, &PartialProfile::default(), raw);
            assert_eq!(t.partial.weight, Some(70.5));
            assert_eq!(t.state, StateTag::AwaitingHeight);
        }
    }
}

//! User profile and registration data models.

use serde::{Deserialize, Serialize};

/// Stored in `allergies` when the user says they have none.
pub const NO_ALLERGIES: &str = "Нет";

/// Biological sex as collected during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Stable identifier used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Human-readable label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Мужской",
            Self::Female => "Женский",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// A completed registration, the durable artifact owned by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    /// Kilograms.
    pub weight: f64,
    /// Centimetres.
    pub height: i32,
    /// Free text, or [`NO_ALLERGIES`].
    pub allergies: String,
    pub goal: String,
    pub timeframe: String,
}

impl UserProfile {
    pub fn has_allergies(&self) -> bool {
        self.allergies != NO_ALLERGIES
    }

    /// Field lines shared by the registration summary and `/mydata`.
    ///
    /// Weight always shows a fractional part: `65.0 кг`, `70.5 кг`.
    pub fn summary_lines(&self) -> String {
        format!(
            "🆔 ID: {}\n\
             👤 Имя: {}\n\
             🎂 Возраст: {}\n\
             ⚧ Пол: {}\n\
             ⚖ Вес: {:?} кг\n\
             📏 Рост: {} см\n\
             🌿 Аллергии: {}\n\
             🎯 Цель: {}\n\
             ⏳ Срок: {}",
            self.user_id,
            self.name,
            self.age,
            self.gender.label(),
            self.weight,
            self.height,
            self.allergies,
            self.goal,
            self.timeframe,
        )
    }
}

/// Attributes accepted so far in an ongoing registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

impl PartialProfile {
    /// Build the complete profile, or `None` while any field is missing.
    pub fn complete(&self, user_id: i64) -> Option<UserProfile> {
        Some(UserProfile {
            user_id,
            name: self.name.clone()?,
            age: self.age?,
            gender: self.gender?,
            weight: self.weight?,
            height: self.height?,
            allergies: self.allergies.clone()?,
            goal: self.goal.clone()?,
            timeframe: self.timeframe.clone()?,
        })
    }
}

impl From<&UserProfile> for PartialProfile {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: Some(profile.name.clone()),
            age: Some(profile.age),
            gender: Some(profile.gender),
            weight: Some(profile.weight),
            height: Some(profile.height),
            allergies: Some(profile.allergies.clone()),
            goal: Some(profile.goal.clone()),
            timeframe: Some(profile.timeframe.clone()),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_profile(user_id: i64) -> UserProfile {
    UserProfile {
        user_id,
        name: "Анна".to_string(),
        age: 30,
        gender: Gender::Female,
        weight: 65.0,
        height: 170,
        allergies: NO_ALLERGIES.to_string(),
        goal: "Похудение".to_string(),
        timeframe: "3 месяца".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_partial_is_incomplete() {
        let partial = PartialProfile::default();
        assert!(partial.complete(1).is_none());
    }

    #[test]
    fn partial_missing_one_field_is_incomplete() {
        let mut partial = PartialProfile::from(&sample_profile(1));
        partial.timeframe = None;
        assert!(partial.complete(1).is_none());
    }

    #[test]
    fn partial_from_profile_completes_to_same_profile() {
        let profile = sample_profile(42);
        let partial = PartialProfile::from(&profile);
        assert_eq!(partial.complete(42), Some(profile));
    }

    #[test]
    fn gender_serde_and_display_agree() {
        for gender in [Gender::Male, Gender::Female] {
            let json = serde_json::to_string(&gender).unwrap();
            assert_eq!(json, format!("\"{gender}\""));
            assert_eq!(gender.as_str().parse::<Gender>().unwrap(), gender);
        }
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn summary_lists_every_field() {
        let profile = UserProfile {
            weight: 70.5,
            allergies: "молоко, орехи".to_string(),
            ..sample_profile(99)
        };
        let summary = profile.summary_lines();
        assert!(summary.contains("ID: 99"));
        assert!(summary.contains("Анна"));
        assert!(summary.contains("Возраст: 30"));
        assert!(summary.contains("Женский"));
        assert!(summary.contains("70.5 кг"));
        assert!(summary.contains("170 см"));
        assert!(summary.contains("молоко, орехи"));
        assert!(summary.contains("Похудение"));
        assert!(summary.contains("3 месяца"));
    }

    #[test]
    fn whole_weight_keeps_decimal_point() {
        let summary = sample_profile(1).summary_lines();
        assert!(summary.contains("⚖ Вес: 65.0 кг"), "{summary}");
    }

    #[test]
    fn allergy_sentinel() {
        let profile = sample_profile(1);
        assert!(!profile.has_allergies());
        let allergic = UserProfile {
            allergies: "орехи".to_string(),
            ..profile
        };
        assert!(allergic.has_allergies());
    }
}

//! Reply texts for the registration flow and the menu.

use super::model::UserProfile;
use super::validate::{Field, Reason, ValidationError};

/// Button labels for the delete confirmation keyboard.
pub const CONFIRM_DELETE: &str = "Да, удалить";
pub const CANCEL_DELETE: &str = "Нет, отменить";

/// The phrase that requests a meal plan, already normalized.
pub const PLAN_PHRASE: &str = "вперед к цели";

pub const ASK_NAME: &str = "Как тебя зовут?";
pub const ASK_AGE: &str = "Сколько тебе лет?";
pub const ASK_GENDER: &str = "Какой у тебя пол? (М/Ж)";
pub const ASK_WEIGHT: &str = "Какой у тебя текущий вес (в кг)?";
pub const ASK_HEIGHT: &str = "Какой у тебя рост (в см)?";
pub const ASK_ALLERGY_CONFIRMATION: &str = "У тебя есть аллергии? (Да/Нет)";
pub const ASK_ALLERGIES: &str =
    "Перечисли свои аллергии через запятую (например, молоко, орехи).";
pub const ASK_GOAL: &str = "Какова твоя цель? (Похудение, Набор массы, Поддержание веса)";
pub const ASK_TIMEFRAME: &str =
    "За какое время ты хочешь достичь цели? (3 месяца, Полгода, Год)";

pub const MENU_HINT: &str = "Напишите 'Вперёд к цели' для плана питания, /mydata для ваших данных, \
     /regenerate для нового плана или /delete для удаления.";
pub const MENU_HELP: &str = "Напишите 'Вперёд к цели' для плана, /mydata для данных, \
     /regenerate для нового плана или /delete для удаления.";

pub const ASK_DELETE_CONFIRMATION: &str =
    "Вы уверены, что хотите удалить свой аккаунт? Все данные будут потеряны.";
pub const DELETE_DONE: &str = "Ваш аккаунт успешно удален из базы данных.\n\
     Если хотите начать заново, введите /start.";
pub const DELETE_CANCELLED: &str = "Удаление отменено. Напишите 'Вперёд к цели' для меню, \
     /mydata для данных, /regenerate для нового плана или /delete для удаления.";
pub const DELETE_REPROMPT: &str = "Пожалуйста, выберите 'Да, удалить' или 'Нет, отменить'.";

pub const NOT_REGISTERED: &str = "Вы еще не зарегистрированы. Введите /start для регистрации.";
pub const COLLABORATOR_FAILURE: &str =
    "⚠️ Что-то пошло не так. Пожалуйста, попробуйте еще раз чуть позже.";

/// Greeting sent on `/start` and on first contact.
pub fn greeting(user_id: i64) -> String {
    format!(
        "Привет! Добро пожаловать в нашего бота.\nТвой уникальный ID: {user_id}\n\n{ASK_NAME}"
    )
}

/// Summary sent once registration completes, followed by the menu hint.
pub fn registration_complete(profile: &UserProfile) -> String {
    format!(
        "✅ Регистрация завершена!\n\n{}\n\n{MENU_HINT}",
        profile.summary_lines()
    )
}

/// Reply to `/mydata`.
pub fn stored_profile(profile: &UserProfile) -> String {
    format!("📋 Ваши данные:\n\n{}", profile.summary_lines())
}

/// Field-specific corrective message for a rejected input.
pub fn reprompt(error: &ValidationError) -> &'static str {
    match (error.field, error.reason) {
        (Field::Age, _) => "Пожалуйста, введи корректный возраст (от 10 до 100 лет).",
        (Field::Gender, _) => "Пожалуйста, введи 'М' (мужской) или 'Ж' (женский).",
        (Field::Weight, _) => "Пожалуйста, введи корректный вес (например, 70.5).",
        (Field::Height, _) => "Пожалуйста, введи корректное число.",
        (Field::Name, Reason::Empty) => "Пожалуйста, напиши своё имя.",
        (Field::Allergies, Reason::Empty) => {
            "Пожалуйста, перечисли аллергии через запятую (например, молоко, орехи)."
        }
        (Field::Goal, Reason::Empty) => {
            "Пожалуйста, укажи цель (Похудение, Набор массы, Поддержание веса)."
        }
        (Field::Timeframe, Reason::Empty) => {
            "Пожалуйста, укажи срок (3 месяца, Полгода, Год)."
        }
        (Field::Name | Field::Allergies | Field::Goal | Field::Timeframe, _) => {
            "Пожалуйста, попробуй ещё раз."
        }
    }
}

/// Lowercase, fold "ё" into "е", trim. Nothing else.
pub fn normalize_phrase(raw: &str) -> String {
    raw.to_lowercase().replace('ё', "е").trim().to_string()
}

//! Prompt construction for plan generation.

use crate::registration::model::UserProfile;

/// Instructions for the model. Kept separate from the per-user request.
pub const SYSTEM_PROMPT: &str = "Ты — опытный диетолог. Составляешь персональные планы питания \
на русском языке для пользователей Telegram-бота.\n\n\
Правила:\n\
- Учитывай возраст, пол, вес, рост, цель и срок пользователя\n\
- Никогда не включай продукты, на которые у пользователя аллергия\n\
- Укажи примерную суточную калорийность и распределение БЖУ\n\
- Распиши меню на один день: завтрак, обед, ужин и перекусы\n\
- Добавь 2-3 коротких совета, как придерживаться плана\n\
- Пиши кратко, без вступлений, обращайся к пользователю на «ты»\n\
- Не ставь медицинских диагнозов";

/// The user turn: the profile rendered as a short brief.
pub fn plan_request(profile: &UserProfile) -> String {
    let allergies = if profile.has_allergies() {
        format!("аллергии: {} (исключить полностью)", profile.allergies)
    } else {
        "аллергий нет".to_string()
    };

    format!(
        "Составь план питания.\n\n\
         Имя: {name}\n\
         Возраст: {age}\n\
         Пол: {gender}\n\
         Вес: {weight} кг\n\
         Рост: {height} см\n\
         Ограничения: {allergies}\n\
         Цель: {goal}\n\
         Срок: {timeframe}",
        name = profile.name,
        age = profile.age,
        gender = profile.gender.label(),
        weight = profile.weight,
        height = profile.height,
        goal = profile.goal,
        timeframe = profile.timeframe,
    )
}

//! Russian chat texts and inline keyboards for engine replies

use intake_core::{HistoryEntry, IntakeError, Team};
use intake_ops::SuggestedAnswer;
use intake_state::{Notice, Reply, TicketOrigin, TurnOutcome, UserAction};

use super::types::{InlineKeyboardButton, InlineKeyboardMarkup, Outgoing};

/// Bot API limit for one message, in UTF-16 code units
pub const MESSAGE_LIMIT: usize = 4096;

pub const COPY_TOAST: &str = "Задача скопирована в буфер обмена!";

const EDIT_HINT: &str = "✏️ Опишите изменения голосом или текстом.\n\nПримеры:\n\
• \"Добавь в критерии приёмки пункт про тестирование\"\n\
• \"Убери раздел про метрики\"\n\
• \"Измени платформу на iOS\"\n\
• \"Переформулируй проблему короче\"\n\
• \"Измени команду на дизайн\"";

/// What an inline button asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Action(UserAction),
    Copy,
}

pub fn parse_callback(data: &str) -> Option<Callback> {
    let action = match data {
        "copy_task" => return Some(Callback::Copy),
        "skip_question" => UserAction::SkipQuestion,
        "skip_all_questions" => UserAction::SkipAllQuestions,
        "confirm_answers" => UserAction::ConfirmAnswers,
        "edit_task" => UserAction::Edit,
        "cancel_edit" => UserAction::CancelEdit,
        "new_task" => UserAction::NewTask,
        "regenerate" => UserAction::Regenerate,
        other => {
            let rest = other.strip_prefix("team_")?;
            let (team_id, subtype_id) = match rest.split_once(':') {
                Some((team, subtype)) => (team, Some(subtype.to_string())),
                None => (rest, None),
            };
            if team_id.is_empty() {
                return None;
            }
            UserAction::SelectTeam {
                team_id: team_id.to_string(),
                subtype_id,
            }
        }
    };
    Some(Callback::Action(action))
}

fn button(text: &str, data: &str) -> InlineKeyboardButton {
    InlineKeyboardButton::new(text, data)
}

fn ticket_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .row(vec![
            button("📋 Скопировать", "copy_task"),
            button("✏️ Редактировать", "edit_task"),
        ])
        .row(vec![
            button("🔄 Перегенерировать", "regenerate"),
            button("🆕 Новая задача", "new_task"),
        ])
}

fn team_keyboard(teams: &[Team]) -> InlineKeyboardMarkup {
    teams
        .chunks(2)
        .fold(InlineKeyboardMarkup::default(), |keyboard, pair| {
            keyboard.row(
                pair.iter()
                    .map(|t| button(&t.name, &format!("team_{}", t.id)))
                    .collect(),
            )
        })
}

/// Escape text for MarkdownV2 outside code blocks.
pub fn escape_markdown_v2(text: &str) -> String {
    const SPECIAL: [char; 18] = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if SPECIAL.contains(&ch) || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Inside ``` blocks only backslash and backtick need escaping.
fn escape_code(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}

fn ticket_header(origin: TicketOrigin) -> &'static str {
    match origin {
        TicketOrigin::Generated => "📋 Готовая задача:",
        TicketOrigin::Regenerated => "🔄 Новая версия задачи:",
        TicketOrigin::Edited => "📋 Обновлённая задача:",
        TicketOrigin::EditFallback => "⚠️ Не удалось применить изменения, задача осталась прежней:",
    }
}

/// Ticket inside a code block when it fits in one message, plain text otherwise.
fn render_ticket(body: &str, label: &str, origin: TicketOrigin) -> Outgoing {
    let header = format!("{}\n{}", ticket_header(origin), label);
    let markdown = format!(
        "{}\n\n```\n{}\n```",
        escape_markdown_v2(&header),
        escape_code(body)
    );
    let message = if utf16_len(&markdown) <= MESSAGE_LIMIT {
        Outgoing::markdown(markdown)
    } else {
        Outgoing::text(format!("{}\n\n{}", header, body))
    };
    message.with_keyboard(ticket_keyboard())
}

fn render_questions(suggestions: &[SuggestedAnswer]) -> String {
    let list = suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| match s.proposal() {
            Some(answer) => format!("{}. {}\n   💡 {}", i + 1, s.question, answer),
            None => format!("{}. {}", i + 1, s.question),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "📝 Нужны уточнения ({} вопросов):\n\n{}\n\n🎤 Запишите голосовое сообщение с ответами на все вопросы по порядку.\n\nИли напишите \"не знаю\" / \"-\" для пунктов, которые неизвестны. \"Ок\" принимает предложенные ответы.",
        suggestions.len(),
        list
    )
}

fn render_confirmation(questions: &[String], answers: &[String]) -> String {
    let list = questions
        .iter()
        .zip(answers)
        .enumerate()
        .map(|(i, (q, a))| format!("{}. {}\n   → {}", i + 1, q, a))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🔎 Проверьте ответы:\n\n{}\n\nНапишите, что исправить, или подтвердите.",
        list
    )
}

fn notice_text(notice: Notice) -> &'static str {
    match notice {
        Notice::Reset => "🆕 Начинаем новую задачу. Отправьте описание текстом или голосом.",
        Notice::EditCancelled => "Редактирование отменено.",
        Notice::NothingToEdit => "Нет задачи для редактирования. Сначала создайте задачу.",
        Notice::NothingToRegenerate => "Нет задачи для перегенерации. Сначала создайте задачу.",
        Notice::UnknownTeam => {
            "Команда не найдена. Попробуйте еще раз или используйте /teams для списка команд."
        }
        Notice::NotExpected => "Это действие сейчас недоступно.",
        Notice::EmptyInput => "Пустое сообщение. Опишите задачу текстом или голосом.",
    }
}

pub fn render_reply(reply: &Reply) -> Outgoing {
    match reply {
        Reply::Transcribed { text } => Outgoing::text(format!("📝 Распознано:\n\"{}\"", text)),
        Reply::TeamDetected { label, .. } => {
            Outgoing::text(format!("✅ Команда определена: {}", label))
        }
        Reply::ChooseTeam { teams } => Outgoing::text(
            "Не удалось определить команду. На какую команду задача?\n\nВыберите кнопкой или напишите название.",
        )
        .with_keyboard(team_keyboard(teams)),
        Reply::Question {
            index,
            total,
            question,
        } => Outgoing::text(format!("Вопрос {} из {}:\n\n{}", index + 1, total, question))
            .with_keyboard(InlineKeyboardMarkup::default().row(vec![
                button("⏭ Пропустить", "skip_question"),
                button("⏭ Пропустить все", "skip_all_questions"),
            ])),
        Reply::Questions { suggestions } => Outgoing::text(render_questions(suggestions))
            .with_keyboard(
                InlineKeyboardMarkup::default()
                    .row(vec![button("⏭ Пропустить все вопросы", "skip_all_questions")]),
            ),
        Reply::ConfirmAnswers { questions, answers } => {
            Outgoing::text(render_confirmation(questions, answers)).with_keyboard(
                InlineKeyboardMarkup::default().row(vec![
                    button("✅ Всё верно", "confirm_answers"),
                    button("⏭ Пропустить все вопросы", "skip_all_questions"),
                ]),
            )
        }
        Reply::Ticket {
            body,
            label,
            origin,
            ..
        } => render_ticket(body, label, *origin),
        Reply::EditRequested => Outgoing::text(EDIT_HINT).with_keyboard(
            InlineKeyboardMarkup::default().row(vec![button("❌ Отмена", "cancel_edit")]),
        ),
        Reply::Notice { notice } => Outgoing::text(notice_text(*notice)),
    }
}

/// Every reply of a turn, split to the message limit.
pub fn render_outcome(outcome: &TurnOutcome) -> Vec<Outgoing> {
    outcome
        .replies
        .iter()
        .flat_map(|reply| into_chunks(render_reply(reply)))
        .collect()
}

/// Split an oversized message. Only the last chunk keeps the keyboard.
pub fn into_chunks(message: Outgoing) -> Vec<Outgoing> {
    if utf16_len(&message.text) <= MESSAGE_LIMIT {
        return vec![message];
    }
    let mut chunks: Vec<Outgoing> = split_message(&message.text, MESSAGE_LIMIT)
        .into_iter()
        .map(Outgoing::text)
        .collect();
    if let (Some(last), Some(keyboard)) = (chunks.last_mut(), message.keyboard) {
        last.keyboard = Some(keyboard);
    }
    chunks
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split at line boundaries so that each part fits `limit`; overlong lines are cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = utf16_len(line);
        let separator = usize::from(!current.is_empty());

        if current_len + separator + line_len <= limit {
            if separator == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += separator + line_len;
            continue;
        }

        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        for ch in line.chars() {
            let ch_len = ch.len_utf16();
            if current_len + ch_len > limit {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += ch_len;
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

pub fn error_text(err: &IntakeError) -> String {
    match err {
        IntakeError::Transcription(_) | IntakeError::EmptyTranscript => {
            "❌ Не удалось распознать речь. Попробуйте говорить чётче или отправьте текстом."
                .to_string()
        }
        IntakeError::UnknownTeam(_) => notice_text(Notice::UnknownTeam).to_string(),
        err if err.is_timeout() => {
            "⏳ Сервис не ответил вовремя. Попробуйте ещё раз через минуту.".to_string()
        }
        err if err.is_transient() => {
            "⚠️ Сервис временно недоступен. Попробуйте ещё раз.".to_string()
        }
        err => format!("❌ Ошибка: {}", err),
    }
}

pub const VOICE_UNAVAILABLE: &str =
    "🎤 Распознавание речи недоступно. Отправьте описание задачи текстом.";

pub fn start_text() -> &'static str {
    "👋 Привет! Я бот для создания задач в Jira.\n\n\
📝 Отправьте мне описание задачи текстом или голосовым сообщением.\n\n\
Я автоматически определю команду и сгенерирую задачу по шаблону.\n\n\
Используйте /help для списка команд."
}

pub fn help_text() -> &'static str {
    "📚 Доступные команды:\n\n\
/start - Начать работу с ботом\n\
/help - Показать эту справку\n\
/teams - Список доступных команд\n\
/history - Последние созданные задачи\n\n\
💡 Просто отправьте описание задачи, и я создам её автоматически!"
}

pub fn teams_text(teams: &[Team]) -> String {
    let list = teams
        .iter()
        .map(|team| {
            let subtypes: String = team
                .subtypes
                .iter()
                .map(|s| format!("\n    • {}", s.name))
                .collect();
            format!("• {}{}", team.name, subtypes)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("📋 Доступные команды:\n\n{}", list)
}

pub fn history_text(entries: &[HistoryEntry], limit: usize) -> String {
    if entries.is_empty() {
        return "История пуста. Создайте первую задачу!".to_string();
    }
    let mut text = String::from("📜 Последние задачи:\n\n");
    for (i, entry) in entries.iter().take(limit).enumerate() {
        let team = match &entry.subtype {
            Some(subtype) => format!("{} - {}", entry.team, subtype),
            None => entry.team.clone(),
        };
        let preview: String = entry.text.chars().take(100).collect();
        let ellipsis = if entry.text.chars().count() > 100 { "..." } else { "" };
        text.push_str(&format!(
            "{}. {}\n   {}\n   {}{}\n\n",
            i + 1,
            team,
            entry.created_at.format("%d.%m.%Y, %H:%M"),
            preview,
            ellipsis
        ));
    }
    text.trim_end().to_string()
}

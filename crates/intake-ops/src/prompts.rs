//! Prompt templates and rendering

use minijinja::Environment;
use serde::Serialize;
use std::collections::HashMap;

use intake_core::{IntakeError, Result};

const SYSTEM: &str = r#"Ты — помощник, который оформляет задачи для Jira.

Правила:
- Используй только информацию, которую дал пользователь. Ничего не выдумывай: ни сроков, ни имён, ни цифр, ни платформ.
- Если данных для раздела нет, пиши [уточнить: что именно].
- Сохраняй структуру шаблона, заголовки разделов оформляй через ##.
- Пиши кратко и по делу, на русском языке.
- Возвращай только текст задачи без пояснений."#;

const CLASSIFY: &str = r#"Определи, к какой команде относится задача.

Задача:
"""{{ text }}"""

Доступные команды:
{% for team in teams %}
- {{ team.id }} ({{ team.name }}){% if team.subtypes %}, подтипы: {% for subtype in team.subtypes %}{{ subtype.id }} ({{ subtype.name }}){% if not loop.last %}, {% endif %}{% endfor %}{% endif %}

{% endfor %}

Если команду определить нельзя, верни null.
Ответь строго в формате JSON без пояснений:
{"teamId": "id команды или null", "subtypeId": "id подтипа или null"}"#;

const SUFFICIENCY: &str = r#"Проверь, достаточно ли информации в описании, чтобы заполнить шаблон задачи.

Описание:
"""{{ text }}"""

Шаблон:
{{ template }}

Если информации достаточно, ответь {"sufficient": true, "questions": []}.
Если нет, задай не более {{ max_questions }} уточняющих вопросов только о самом важном. Каждый вопрос не длиннее 10 слов. Не спрашивай о том, что уже есть в описании.

Ответь строго в формате JSON без пояснений:
{"sufficient": false, "questions": ["вопрос 1", "вопрос 2"]}"#;

const SUGGEST: &str = r#"Описание задачи:
"""{{ text }}"""

Для каждого вопроса предложи конкретный правдоподобный ответ, исходя из описания.
Не используй фразы "требует уточнения", "не указано", "неизвестно" и квадратные скобки.

Вопросы:
{% for question in questions %}
{{ loop.index }}. {{ question }}
{% endfor %}

Ответь строго в формате JSON без пояснений, по одному ответу на каждый вопрос в том же порядке:
{"answers": [{"question": "текст вопроса", "suggestedAnswer": "ответ"}]}"#;

const GENERATE: &str = r#"Составь задачу по шаблону.

Шаблон:
{{ template }}

Описание от пользователя:
"""{{ text }}"""
{% if additional_info %}

Дополнительная информация:
{{ additional_info }}
{% endif %}

Заполни разделы шаблона только данными из описания и дополнительной информации. Неизвестное помечай как [уточнить: что именно]."#;

const EDIT: &str = r#"Текущая задача:
"""{{ current_task }}"""

Текущая команда: {{ team }}

Инструкция по редактированию:
"""{{ instruction }}"""

Доступные команды:
{% for team in teams %}
- {{ team.id }} ({{ team.name }}){% if team.subtypes %}, подтипы: {% for subtype in team.subtypes %}{{ subtype.id }} ({{ subtype.name }}){% if not loop.last %}, {% endif %}{% endfor %}{% endif %}

{% endfor %}

Внеси изменения по инструкции. Сохраняй структуру задачи, если инструкция явно не требует иного.
Если инструкция требует перенести задачу в другую команду, укажи её id, иначе null.

Ответь строго в формате JSON без пояснений:
{"editedTask": "полный текст задачи", "newTeamId": "id или null", "newSubtypeId": "id или null"}"#;

const CORRECT: &str = r#"Пользователь отвечает на уточняющие вопросы к задаче. К каждому вопросу был предложен ответ.

{% for item in items %}
{{ loop.index }}. {{ item.question }}
Предложено: {{ item.answer }}
{% endfor %}

Ответ пользователя:
"""{{ reply }}"""

Определи итоговый ответ на каждый вопрос. Если пользователь исправил ответ, используй его вариант. Если согласился или не упомянул вопрос, оставь предложенный.

Ответь строго в формате JSON без пояснений, ровно {{ items | length }} элементов:
{"answers": ["ответ 1", "ответ 2"]}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    System,
    Classify,
    Sufficiency,
    Suggest,
    Generate,
    Edit,
    Correct,
}

impl PromptKind {
    pub const ALL: [PromptKind; 7] = [
        Self::System,
        Self::Classify,
        Self::Sufficiency,
        Self::Suggest,
        Self::Generate,
        Self::Edit,
        Self::Correct,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Classify => "classify",
            Self::Sufficiency => "sufficiency",
            Self::Suggest => "suggest",
            Self::Generate => "generate",
            Self::Edit => "edit",
            Self::Correct => "correct",
        }
    }

    fn default_source(&self) -> &'static str {
        match self {
            Self::System => SYSTEM,
            Self::Classify => CLASSIFY,
            Self::Sufficiency => SUFFICIENCY,
            Self::Suggest => SUGGEST,
            Self::Generate => GENERATE,
            Self::Edit => EDIT,
            Self::Correct => CORRECT,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Renders operation prompts from built-in or configured minijinja templates
pub struct PromptRenderer {
    env: Environment<'static>,
    overrides: HashMap<PromptKind, String>,
}

impl std::fmt::Debug for PromptRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRenderer")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        env.set_trim_blocks(true);
        Self {
            env,
            overrides: HashMap::new(),
        }
    }

    /// Apply overrides by prompt name. Unknown names and templates that fail to
    /// compile are configuration errors.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut renderer = Self::new();
        for (name, source) in overrides {
            let kind = PromptKind::from_name(name)
                .ok_or_else(|| IntakeError::Config(format!("Unknown prompt: {}", name)))?;
            let validator = Environment::new();
            validator
                .template_from_str(source)
                .map(|_| ())
                .map_err(|e| IntakeError::Config(format!("Prompt '{}' is invalid: {}", name, e)))?;
            renderer.overrides.insert(kind, source.clone());
        }
        Ok(renderer)
    }

    pub fn source(&self, kind: PromptKind) -> &str {
        self.overrides
            .get(&kind)
            .map(|s| s.as_str())
            .unwrap_or_else(|| kind.default_source())
    }

    pub fn render<S: Serialize>(&self, kind: PromptKind, ctx: S) -> Result<String> {
        self.env
            .render_str(self.source(kind), ctx)
            .map_err(|e| IntakeError::Template(format!("{}: {}", kind.name(), e)))
    }

    pub fn system(&self) -> Result<String> {
        self.render(PromptKind::System, minijinja::context! {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_all_defaults_render() {
        let renderer = PromptRenderer::new();
        for kind in PromptKind::ALL {
            let out = renderer
                .render(
                    kind,
                    context! {
                        text => "t",
                        template => "## A",
                        teams => Vec::<String>::new(),
                        questions => vec!["q"],
                        items => Vec::<String>::new(),
                        max_questions => 7,
                        current_task => "x",
                        instruction => "y",
                        team => "z",
                        reply => "r",
                    },
                )
                .unwrap();
            assert!(!out.is_empty(), "{} rendered empty", kind.name());
        }
    }

    #[test]
    fn test_generate_includes_additional_info_only_when_present() {
        let renderer = PromptRenderer::new();
        let with = renderer
            .render(
                PromptKind::Generate,
                context! { template => "## Цель", text => "кнопка", additional_info => "Москва" },
            )
            .unwrap();
        assert!(with.contains("Дополнительная информация:\nМосква"));

        let without = renderer
            .render(
                PromptKind::Generate,
                context! { template => "## Цель", text => "кнопка", additional_info => "" },
            )
            .unwrap();
        assert!(!without.contains("Дополнительная информация"));
    }

    #[test]
    fn test_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("system".to_string(), "Будь краток.".to_string());
        let renderer = PromptRenderer::with_overrides(&overrides).unwrap();
        assert_eq!(renderer.system().unwrap(), "Будь краток.");

        overrides.insert("unknown".to_string(), "x".to_string());
        assert!(matches!(
            PromptRenderer::with_overrides(&overrides),
            Err(IntakeError::Config(_))
        ));

        let mut broken = HashMap::new();
        broken.insert("classify".to_string(), "{% if %}".to_string());
        assert!(PromptRenderer::with_overrides(&broken).is_err());
    }
}

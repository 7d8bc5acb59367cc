//! Configuration for the LLM-backed operations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use intake_core::LLMConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub sufficiency: SufficiencyConfig,

    #[serde(default)]
    pub suggester: SuggesterConfig,

    #[serde(default)]
    pub generator: CallConfig,

    #[serde(default = "default_editor")]
    pub editor: CallConfig,

    #[serde(default = "default_corrector")]
    pub corrector: CallConfig,

    /// Prompt template overrides by name (`system`, `classify`, `sufficiency`,
    /// `suggest`, `generate`, `edit`, `correct`)
    #[serde(default)]
    pub prompts: HashMap<String, String>,
}

/// LLM alias and sampling parameters for one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    #[serde(default = "default_llm")]
    pub llm: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_llm() -> String {
    "default".to_string()
}

fn default_max_tokens() -> u32 {
    4000
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            llm: default_llm(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

impl CallConfig {
    pub fn new(max_tokens: u32, temperature: Option<f32>) -> Self {
        Self {
            llm: default_llm(),
            max_tokens,
            temperature,
        }
    }

    pub fn llm_config(&self) -> LLMConfig {
        let config = LLMConfig::new().with_max_tokens(self.max_tokens);
        match self.temperature {
            Some(t) => config.with_temperature(t),
            None => config,
        }
    }
}

fn default_editor() -> CallConfig {
    CallConfig::new(4000, None)
}

fn default_corrector() -> CallConfig {
    CallConfig::new(1000, Some(0.2))
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            sufficiency: SufficiencyConfig::default(),
            suggester: SuggesterConfig::default(),
            generator: CallConfig::default(),
            editor: default_editor(),
            corrector: default_corrector(),
            prompts: HashMap::new(),
        }
    }
}

/// Keyword phrase list routed to a team/subtype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub patterns: Vec<String>,
}

impl KeywordRule {
    fn new(team: &str, subtype: Option<&str>, patterns: &[&str]) -> Self {
        Self {
            team: team.to_string(),
            subtype: subtype.map(String::from),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(flatten)]
    pub call: CallConfig,

    /// Only this many leading characters are scanned for keywords
    #[serde(default = "default_prefix_chars")]
    pub prefix_chars: usize,

    /// Ordered; the first rule with a matching pattern wins
    #[serde(default = "default_rules")]
    pub rules: Vec<KeywordRule>,
}

fn default_prefix_chars() -> usize {
    150
}

pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "development",
            Some("tech_research"),
            &["технический рисерч", "тех рисерч", "техрисерч"],
        ),
        KeywordRule::new(
            "development",
            Some("task"),
            &[
                "разработка",
                "разраб",
                "разрабы",
                "разработку",
                "таска",
                "задача на разработку",
                "задача разработка",
                "девелопмент",
                "бэкенд",
                "фронтенд",
                "backend",
                "frontend",
            ],
        ),
        KeywordRule::new("analytics", Some("export"), &["выгрузка", "выгрузку"]),
        KeywordRule::new(
            "analytics",
            Some("dashboard"),
            &["дашборд", "дашборда", "dashboard"],
        ),
        KeywordRule::new(
            "analytics",
            Some("ab_design"),
            &["аб тест", "аб-тест", "ab тест", "ab-тест", "сплит тест"],
        ),
        KeywordRule::new(
            "analytics",
            Some("research"),
            &[
                "аналитика",
                "аналитик",
                "аналитику",
                "аналитике",
                "рисерч",
                "исследование данных",
            ],
        ),
        KeywordRule::new(
            "design",
            None,
            &[
                "дизайн",
                "дизайну",
                "дизайнер",
                "дизайнеру",
                "макет",
                "макеты",
                "дизу",
            ],
        ),
        KeywordRule::new(
            "experts",
            None,
            &["эксперт", "экспертам", "эксперту", "экспертов", "экспертная"],
        ),
        KeywordRule::new(
            "ux",
            None,
            &[
                "юкс",
                "ux",
                "юх",
                "ю экс",
                "исследование пользователей",
                "пользовательское исследование",
                "usability",
            ],
        ),
        KeywordRule::new("search", None, &["поиск", "поиску", "поиске", "серч", "search"]),
        KeywordRule::new(
            "recommendations",
            None,
            &[
                "рекомендации",
                "рекомендашки",
                "рекам",
                "рекомендациям",
                "recommendations",
            ],
        ),
    ]
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            call: CallConfig::new(200, Some(0.1)),
            prefix_chars: default_prefix_chars(),
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyConfig {
    #[serde(flatten)]
    pub call: CallConfig,

    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
}

fn default_max_questions() -> usize {
    7
}

impl Default for SufficiencyConfig {
    fn default() -> Self {
        Self {
            call: CallConfig::new(1000, Some(0.3)),
            max_questions: default_max_questions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggesterConfig {
    #[serde(flatten)]
    pub call: CallConfig,

    /// Replaces any suggestion that is empty or contains a banned phrase
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,

    /// Matched case-insensitively as substrings
    #[serde(default = "default_banned_phrases")]
    pub banned_phrases: Vec<String>,
}

pub fn default_fallback_answer() -> String {
    "Предложите ваш вариант".to_string()
}

fn default_banned_phrases() -> Vec<String> {
    [
        "требует уточнения",
        "требуется уточнение",
        "не указано",
        "неизвестно",
        "не определено",
        "needs clarification",
        "not specified",
        "unknown",
        "[",
        "]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            call: CallConfig::new(2000, Some(0.7)),
            fallback_answer: default_fallback_answer(),
            banned_phrases: default_banned_phrases(),
        }
    }
}

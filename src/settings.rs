// src/settings.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
const DEFAULT_MODEL: &str = "gemma3:4b";
const DEFAULT_MAX_CONTEXT_SIZE: usize = 50;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;

const DEFAULT_SYSTEM_PROMPT_EN: &str = "You are an Assistant specializing in prompt writing for image generation. You receive complex descriptions or briefs from the user and return ONLY the final prompt for an image generation model. Output nothing but the prompt: no explanations, headers, lists, quotes, prefixes, or suffixes.

Rules for writing the prompt:
— Clear composition: foreground / midground / background
— Key objects, their attributes, materials, textures
— Lighting, angle, color palette
— Execution style, technique, level of detail
— Preserve professional domain-specific terms (numismatics: obverse/reverse, relief, legend, field, edge, etc.)

Example of a good prompt:
Silver coin on white background, center — Kamchatka volcano with sharp slopes and grooves from peak downward, above — clouds rendered in fine hatching and a flock of birds flying left to right, along the top arc — inscription \"VOLCANOES OF KAMCHATKA\" with crisp edges, midground — river with wave-pattern engraving of the current, foreground — two bears: left bear walking on stones by the water, right bear sitting on the bank, sides — coniferous forest with branch and needle detail in micro-engraving, along the field edge — thin inner border line, reeded edge, coin fully made of silver.

ALWAYS output the final prompt in English.";

const DEFAULT_SYSTEM_PROMPT_RU: &str = "Ты — Ассистент, специализирующийся на составлении промптов для генерации изображений. Получаешь описания и ТЗ от пользователя и возвращаешь ТОЛЬКО финальный промпт для модели генерации изображений. Ничего кроме промпта не выводи: без пояснений, заголовков, списков, кавычек, префиксов и постфиксов.

Правила составления промпта:
— Чёткая композиция: передний / средний / задний план
— Ключевые объекты, их атрибуты, материалы, текстуры
— Освещение, ракурс, цветовая гамма
— Стиль исполнения, техника, детализация
— Сохраняй профессиональные термины предметной области (нумизматика: аверс/реверс, рельеф, легенда, поле, гурт и т.п.)

Пример хорошего промпта:
Серебряная монета на белом фоне, в центре — вулкан Камчатки с чёткими склонами и бороздами от вершины вниз, над ним — облака тонкой насечкой и стая птиц, летящая слева направо, по дуге сверху — надпись «ВУЛКАНЫ КАМЧАТКИ» с чёткими гранями, средний план — река с волнообразной гравировкой течения, передний план — два медведя: слева медведь идёт по камням у воды, справа сидит на берегу, по бокам хвойный лес с детализацией ветвей и иголок микрогравировкой, по краю поля тонкая внутренняя кантовая линия, гурт рифлёный, монета полностью выполнена из серебра.

ВСЕГДА выводи финальный промпт на английском языке.";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which wire protocol the backend speaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "ollama", alias = "ollama-native", alias = "ollama_native")]
    Ollama,
    #[serde(
        rename = "openai_compatible",
        alias = "openai-compatible",
        alias = "openai",
        alias = "vllm"
    )]
    OpenAICompatible,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAICompatible => "openai_compatible",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    /// Sent in place of an empty message when only images are attached.
    pub fn default_caption(&self) -> &'static str {
        match self {
            Self::En => "Describe this image",
            Self::Ru => "Опишите это изображение",
        }
    }

    /// Stored in the transcript for a message that was only images.
    pub fn image_placeholder(&self) -> &'static str {
        match self {
            Self::En => "(image)",
            Self::Ru => "(изображение)",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct SystemPrompts {
    pub en: String,
    pub ru: String,
}

impl Default for SystemPrompts {
    fn default() -> Self {
        Self {
            en: DEFAULT_SYSTEM_PROMPT_EN.to_string(),
            ru: DEFAULT_SYSTEM_PROMPT_RU.to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub language: Language,
    pub system_prompts: SystemPrompts,
    pub max_context_size: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            language: Language::default(),
            system_prompts: SystemPrompts::default(),
            max_context_size: DEFAULT_MAX_CONTEXT_SIZE,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl BackendConfig {
    /// System prompt for the selected language; English when that one is blank.
    pub fn system_prompt(&self) -> &str {
        let prompt = match self.language {
            Language::En => &self.system_prompts.en,
            Language::Ru => &self.system_prompts.ru,
        };
        if prompt.trim().is_empty() {
            &self.system_prompts.en
        } else {
            prompt
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorSettings {
    pub streaming_enabled: bool,
    pub save_history: bool,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            streaming_enabled: true,
            save_history: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub version: u32,
    pub backend: BackendConfig,
    pub behavior: BehaviorSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            backend: BackendConfig::default(),
            behavior: BehaviorSettings::default(),
        }
    }
}

/// Get the path to the settings file (~/.config/prompt-assistant/settings.json)
pub fn get_settings_path() -> Result<PathBuf, SettingsError> {
    let config_dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(config_dir.join("prompt-assistant").join("settings.json"))
}

/// Load settings from disk, creating default if not exists
pub fn load_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    if !path.exists() {
        let default_settings = AppSettings::default();
        save_settings(path, &default_settings)?;
        log::info!("[settings] Created default settings at {}", path.display());
        return Ok(default_settings);
    }

    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Missing fields fall back to defaults
    let settings: AppSettings = serde_json::from_str(&content)?;

    log::info!("[settings] Loaded settings from {}", path.display());
    Ok(settings)
}

/// Save settings to disk
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content).map_err(io_err)?;

    log::info!("[settings] Saved settings to {}", path.display());
    Ok(())
}

/// Overwrite the settings file with defaults
pub fn reset_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    let settings = AppSettings::default();
    save_settings(path, &settings)?;
    Ok(settings)
}

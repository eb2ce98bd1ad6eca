use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_WORD_COUNT: u32 = 300;
pub const MAX_WORD_COUNT: u32 = 5000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Friendly,
    Authoritative,
    Conversational,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WritingStyle {
    #[default]
    Informative,
    Persuasive,
    Narrative,
    Listicle,
    HowTo,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Authoritative => "authoritative",
            Tone::Conversational => "conversational",
        };
        f.write_str(s)
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "friendly" => Ok(Tone::Friendly),
            "authoritative" => Ok(Tone::Authoritative),
            "conversational" => Ok(Tone::Conversational),
            _ => Err(format!("Invalid tone: {}", s)),
        }
    }
}

impl fmt::Display for WritingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WritingStyle::Informative => "informative",
            WritingStyle::Persuasive => "persuasive",
            WritingStyle::Narrative => "narrative",
            WritingStyle::Listicle => "listicle",
            WritingStyle::HowTo => "how_to",
        };
        f.write_str(s)
    }
}

impl FromStr for WritingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "informative" => Ok(WritingStyle::Informative),
            "persuasive" => Ok(WritingStyle::Persuasive),
            "narrative" => Ok(WritingStyle::Narrative),
            "listicle" => Ok(WritingStyle::Listicle),
            "how_to" => Ok(WritingStyle::HowTo),
            _ => Err(format!("Invalid writing style: {}", s)),
        }
    }
}

fn default_word_count() -> u32 { 1500 }
fn default_language() -> String { "en".to_string() }
fn default_true() -> bool { true }

/// Reusable generation settings stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub writing_style: WritingStyle,
    #[serde(default = "default_word_count")]
    pub word_count: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub include_faq: bool,
    #[serde(default = "default_true")]
    pub include_conclusion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Create/update payload for templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub writing_style: WritingStyle,
    #[serde(default = "default_word_count")]
    pub word_count: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub include_faq: bool,
    #[serde(default = "default_true")]
    pub include_conclusion: bool,
}

impl TemplateDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tone: Tone::default(),
            writing_style: WritingStyle::default(),
            word_count: default_word_count(),
            language: default_language(),
            include_faq: true,
            include_conclusion: true,
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::MissingName);
        }
        if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&self.word_count) {
            return Err(TemplateError::WordCountOutOfRange(self.word_count));
        }
        if self.language.trim().is_empty() {
            return Err(TemplateError::MissingLanguage);
        }
        Ok(())
    }
}

impl From<&BulkTemplate> for TemplateDraft {
    fn from(t: &BulkTemplate) -> Self {
        Self {
            name: t.name.clone(),
            tone: t.tone,
            writing_style: t.writing_style,
            word_count: t.word_count,
            language: t.language.clone(),
            include_faq: t.include_faq,
            include_conclusion: t.include_conclusion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Template name is required")]
    MissingName,
    #[error("Word count {0} is outside {min}..={max}", min = MIN_WORD_COUNT, max = MAX_WORD_COUNT)]
    WordCountOutOfRange(u32),
    #[error("Template language is required")]
    MissingLanguage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_decode() {
        let t: BulkTemplate = serde_json::from_str(r#"{"id": "t1", "name": "Blog"}"#).unwrap();
        assert_eq!(t.word_count, 1500);
        assert_eq!(t.language, "en");
        assert!(t.include_faq && t.include_conclusion);
        assert_eq!(t.writing_style, WritingStyle::Informative);
    }

    #[test]
    fn test_validate() {
        let mut draft = TemplateDraft::new("Blog posts");
        assert!(draft.validate().is_ok());

        draft.word_count = 100;
        assert_eq!(draft.validate(), Err(TemplateError::WordCountOutOfRange(100)));

        draft.word_count = 800;
        draft.name = "   ".into();
        assert_eq!(draft.validate(), Err(TemplateError::MissingName));
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("how-to".parse::<WritingStyle>().unwrap(), WritingStyle::HowTo);
        assert_eq!(serde_json::to_string(&WritingStyle::HowTo).unwrap(), "\"how_to\"");
        assert!("shouty".parse::<Tone>().is_err());
    }
}

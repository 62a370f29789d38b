use serde::{Deserialize, Serialize};

use crate::model::entry::EntryType;

/// How dates are rendered by the display layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    Relative,
    Absolute,
    Locale,
}

impl DateFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DateFormat::Relative => "relative",
            DateFormat::Absolute => "absolute",
            DateFormat::Locale => "locale",
        }
    }

    pub fn parse(s: &str) -> Option<DateFormat> {
        match s {
            "relative" => Some(DateFormat::Relative),
            "absolute" => Some(DateFormat::Absolute),
            "locale" => Some(DateFormat::Locale),
            _ => None,
        }
    }
}

/// User configuration from config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub default_type: EntryType,
    #[serde(default)]
    pub default_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
    pub date_format: DateFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            default_type: EntryType::Idea,
            default_tags: Vec::new(),
            editor: None,
            date_format: DateFormat::Relative,
        }
    }
}

/// Raw, unvalidated shape of the stored config document. Enumerated fields
/// are kept as strings so invalid values can be replaced with defaults and
/// reported as warnings instead of failing the load.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    #[serde(default)]
    pub default_type: Option<String>,
    #[serde(default)]
    pub default_tags: Option<Vec<String>>,
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default)]
    pub date_format: Option<String>,
}

impl RawConfig {
    /// Validate into an `AppConfig`, substituting defaults for invalid
    /// enumerated values and collecting a warning per substitution.
    pub fn validate(self) -> (AppConfig, Vec<String>) {
        let mut config = AppConfig::default();
        let mut warnings = Vec::new();

        if let Some(t) = self.default_type {
            match EntryType::parse(&t) {
                Some(parsed) => config.default_type = parsed,
                None => warnings.push(format!(
                    "invalid defaultType {:?}, using {:?}",
                    t,
                    config.default_type.as_str()
                )),
            }
        }
        if let Some(tags) = self.default_tags {
            config.default_tags = tags;
        }
        config.editor = self.editor;
        if let Some(f) = self.date_format {
            match DateFormat::parse(&f) {
                Some(parsed) => config.date_format = parsed,
                None => warnings.push(format!(
                    "invalid dateFormat {:?}, using {:?}",
                    f,
                    config.date_format.as_str()
                )),
            }
        }

        (config, warnings)
    }
}

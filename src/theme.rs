use crate::models::CurrentConditions;
use serde::Serialize;
use std::fmt;

/// Background theme for the current conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeTag {
    Storm,
    Snow,
    Rain,
    Fog,
    Cloudy,
    ClearDay,
    ClearNight,
    Default,
}

impl ThemeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storm => "storm",
            Self::Snow => "snow",
            Self::Rain => "rain",
            Self::Fog => "fog",
            Self::Cloudy => "cloudy",
            Self::ClearDay => "clear-day",
            Self::ClearNight => "clear-night",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ThemeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked top to bottom, first hit wins. The groups overlap ("overcast"
/// must land on fog before the cloud check sees it), so order matters.
const RULES: &[(ThemeTag, &[&str])] = &[
    (ThemeTag::Storm, &["thunder", "storm"]),
    (ThemeTag::Snow, &["snow", "blizzard", "sleet", "ice"]),
    (ThemeTag::Rain, &["rain", "drizzle", "shower"]),
    (ThemeTag::Fog, &["fog", "mist", "haze", "overcast"]),
    (ThemeTag::Cloudy, &["cloud"]),
];

pub fn classify(current: &CurrentConditions) -> ThemeTag {
    classify_text(current.condition_text(), current.is_daytime())
}

pub fn classify_text(condition: Option<&str>, is_day: bool) -> ThemeTag {
    let text = match condition.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_lowercase(),
        _ => return ThemeTag::Default,
    };

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(tag, _)| *tag)
        .unwrap_or(if is_day {
            ThemeTag::ClearDay
        } else {
            ThemeTag::ClearNight
        })
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a Gemini model identifier.
///
/// This can be a predefined model version or a custom string value
/// for models that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or tuned models)
    Custom(String),
}

/// Known Gemini model versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Gemini 2.5 Flash
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,

    /// Gemini 2.5 Flash-Lite
    #[serde(rename = "gemini-2.5-flash-lite")]
    Gemini25FlashLite,

    /// Gemini 2.5 Pro
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,

    /// Gemini 2.0 Flash
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,
}

impl KnownModel {
    const ALL: [KnownModel; 4] = [
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25FlashLite,
        KnownModel::Gemini25Pro,
        KnownModel::Gemini20Flash,
    ];

    /// The identifier used in request paths.
    pub fn as_str(self) -> &'static str {
        match self {
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
            KnownModel::Gemini20Flash => "gemini-2.0-flash",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini25Flash)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    /// Parses a model name, accepting an optional `models/` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix("models/").unwrap_or(name);
        Ok(KnownModel::ALL
            .into_iter()
            .find(|known| known.as_str() == name)
            .map(Model::Known)
            .unwrap_or_else(|| Model::Custom(name.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let model = Model::Known(KnownModel::Gemini25Flash);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gemini-2.5-flash""#);
    }

    #[test]
    fn model_deserialization() {
        let model: Model = serde_json::from_str(r#""gemini-2.5-pro""#).unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gemini25Pro));

        let model: Model = serde_json::from_str(r#""gemini-exp-1206""#).unwrap();
        assert_eq!(model, Model::Custom("gemini-exp-1206".to_string()));
    }

    #[test]
    fn parse_accepts_resource_prefix() {
        let model: Model = "models/gemini-2.0-flash".parse().unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gemini20Flash));

        let model: Model = "tunedModels/my-bot".parse().unwrap();
        assert_eq!(model, Model::Custom("tunedModels/my-bot".to_string()));
    }

    #[test]
    fn display() {
        assert_eq!(Model::default().to_string(), "gemini-2.5-flash");
        assert_eq!(Model::from("custom-model").to_string(), "custom-model");
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ViewerError};

const KNOWN_TYPES: [&str; 3] = ["changeModel", "loadModel", "materialChange"];

/// Commands the embedding page can post to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostCommand {
    /// Switch to a model from the registry.
    #[serde(rename_all = "camelCase")]
    ChangeModel { model_type: String },
    /// Load an arbitrary URL and label it with `style`.
    #[serde(rename_all = "camelCase")]
    LoadModel { model_url: String, style: String },
    /// Accepted but only logged.
    MaterialChange { material: String },
}

impl HostCommand {
    /// Interprets a host message.
    ///
    /// Messages without a recognized `type` yield `Ok(None)` so unrelated
    /// traffic on the channel is ignored.
    pub fn from_value(message: &Value) -> Result<Option<Self>> {
        let Some(kind) = message.get("type").and_then(Value::as_str) else {
            return Ok(None);
        };
        if !KNOWN_TYPES.contains(&kind) {
            return Ok(None);
        }
        serde_json::from_value(message.clone())
            .map(Some)
            .map_err(ViewerError::MalformedMessage)
    }

    pub fn from_json(text: &str) -> Result<Option<Self>> {
        let value: Value = serde_json::from_str(text).map_err(ViewerError::MalformedMessage)?;
        Self::from_value(&value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChangeModel { .. } => "changeModel",
            Self::LoadModel { .. } => "loadModel",
            Self::MaterialChange { .. } => "materialChange",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_command() {
        assert_eq!(
            HostCommand::from_value(&json!({"type": "changeModel", "modelType": "minimal"}))
                .unwrap(),
            Some(HostCommand::ChangeModel {
                model_type: "minimal".into()
            })
        );
        assert_eq!(
            HostCommand::from_json(
                r#"{"type":"loadModel","modelUrl":"https://cdn/c.glb","style":"custom"}"#
            )
            .unwrap(),
            Some(HostCommand::LoadModel {
                model_url: "https://cdn/c.glb".into(),
                style: "custom".into()
            })
        );
        let material = json!({"type": "materialChange", "material": "gold"});
        let material = HostCommand::from_value(&material).unwrap().unwrap();
        assert_eq!(material.kind(), "materialChange");
    }

    #[test]
    fn unrecognized_messages_are_ignored() {
        assert_eq!(HostCommand::from_value(&json!({"type": "resize"})).unwrap(), None);
        assert_eq!(HostCommand::from_value(&json!({"modelType": "x"})).unwrap(), None);
        assert_eq!(HostCommand::from_value(&json!("ping")).unwrap(), None);
        assert_eq!(HostCommand::from_value(&json!({"type": 7})).unwrap(), None);
    }

    #[test]
    fn known_type_with_missing_fields_is_malformed() {
        let err = HostCommand::from_value(&json!({"type": "loadModel", "style": "custom"}))
            .unwrap_err();
        assert!(matches!(err, ViewerError::MalformedMessage(_)));
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let command = HostCommand::from_value(
            &json!({"type": "changeModel", "modelType": "loving", "source": "toolbar"}),
        )
        .unwrap();
        assert!(command.is_some());
    }
}

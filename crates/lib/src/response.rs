//! Skill response wire types (version, outputSpeech, card).

use serde::{Deserialize, Serialize};

/// Spoken to the user when the session has no linked account.
pub const LINK_ACCOUNT_SPEECH: &str = "Please go to your Alexa app and link your account.";

/// Wire response: `{ "version", "response": { "outputSpeech", "card" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillResponse {
    pub version: String,
    pub response: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
}

/// `{ "type": "PlainText", "text" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub typ: String,
    pub text: String,
}

/// Card directive shown in the companion app (e.g. `{ "type": "LinkAccount" }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "type")]
    pub typ: String,
}

impl SkillResponse {
    /// Fixed reply prompting the user to link their account.
    pub fn account_link() -> Self {
        Self {
            version: "1.0".to_string(),
            response: ResponseBody {
                output_speech: Some(OutputSpeech {
                    typ: "PlainText".to_string(),
                    text: LINK_ACCOUNT_SPEECH.to_string(),
                }),
                card: Some(Card {
                    typ: "LinkAccount".to_string(),
                }),
            },
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// The account-link reply as JSON, in the shape returned to the host.
pub fn account_link_response() -> serde_json::Value {
    SkillResponse::account_link().to_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_link_shape() {
        assert_eq!(
            account_link_response(),
            json!({
                "version": "1.0",
                "response": {
                    "outputSpeech": {
                        "type": "PlainText",
                        "text": "Please go to your Alexa app and link your account."
                    },
                    "card": { "type": "LinkAccount" }
                }
            })
        );
    }

    #[test]
    fn parses_back_from_wire() {
        let v = account_link_response();
        let r: SkillResponse = serde_json::from_value(v).unwrap();
        assert_eq!(r, SkillResponse::account_link());
    }
}

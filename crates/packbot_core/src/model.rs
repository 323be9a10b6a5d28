use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Alias,
    Semantic,
    Suggestions,
    Fuzzy,
    NoneConfident,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Alias => "alias",
            Method::Semantic => "semantic",
            Method::Suggestions => "suggestions",
            Method::Fuzzy => "fuzzy",
            Method::NoneConfident => "none_confident",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
}

/// Outcome of resolving one chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDecision {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
}

/// Four decimal places, as reported to clients.
pub fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}

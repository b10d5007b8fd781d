use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::llm::Message;
use crate::questions::{Evaluation, QuestionCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryName {
    MultipleChoice,
    FillBlank,
    Essay,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub category: CategoryName,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

impl QuestionRequest {
    pub fn to_category(&self) -> Result<QuestionCategory, ApiError> {
        Ok(match self.category {
            CategoryName::MultipleChoice => QuestionCategory::MultipleChoice,
            CategoryName::FillBlank => QuestionCategory::FillBlank,
            CategoryName::Essay => QuestionCategory::Essay,
            CategoryName::Custom => {
                let subject = non_empty(self.subject.as_deref())
                    .ok_or_else(|| ApiError::BadRequest("subject is required".to_string()))?;
                let tone = non_empty(self.tone.as_deref())
                    .ok_or_else(|| ApiError::BadRequest("tone is required".to_string()))?;
                QuestionCategory::Custom {
                    subject: subject.to_string(),
                    tone: tone.to_string(),
                }
            }
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResponse {
    pub category: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSetEntry {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSetResponse {
    pub results: Vec<QuestionSetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub preview: String,
    pub sentence_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayRequest {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayResponse {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

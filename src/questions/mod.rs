mod prompts;

use crate::config::PromptConfig;
use crate::error::LlmError;
use crate::llm::{Message, ModelClient};
use serde::Serialize;
use std::sync::Arc;

pub const QUESTION_MAX_TOKENS: u32 = 500;
pub const ESSAY_MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionCategory {
    MultipleChoice,
    FillBlank,
    Essay,
    Custom { subject: String, tone: String },
}

impl QuestionCategory {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionCategory::MultipleChoice => "multiple_choice",
            QuestionCategory::FillBlank => "fill_blank",
            QuestionCategory::Essay => "essay",
            QuestionCategory::Custom { .. } => "custom",
        }
    }
}

/// Quality evaluation of generated questions. No evaluator exists yet; this
/// is where one would report its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    NotImplemented,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomQuestions {
    pub questions: String,
    pub evaluation: Evaluation,
}

/// Turns source text into question prompts and sends them to the model.
pub struct QuestionGenerator {
    client: Arc<dyn ModelClient>,
    language: String,
    default_count: u32,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn ModelClient>, config: &PromptConfig) -> Self {
        Self {
            client,
            language: config.language.clone(),
            default_count: config.default_count,
        }
    }

    pub fn default_count(&self) -> u32 {
        self.default_count
    }

    pub fn build_messages(
        &self,
        category: &QuestionCategory,
        source_text: &str,
        count: u32,
    ) -> Vec<Message> {
        vec![
            Message::system(prompts::system_prompt(category)),
            Message::user(prompts::user_prompt(
                category,
                source_text,
                count,
                &self.language,
            )),
        ]
    }

    pub async fn generate(
        &self,
        category: &QuestionCategory,
        source_text: &str,
        count: u32,
    ) -> Result<String, LlmError> {
        if source_text.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "source text must not be empty".to_string(),
            ));
        }
        if count == 0 {
            return Err(LlmError::InvalidRequest(
                "question count must be at least 1".to_string(),
            ));
        }

        let messages = self.build_messages(category, source_text, count);
        match self.client.complete(&messages, None, QUESTION_MAX_TOKENS).await {
            Ok(questions) => {
                tracing::info!("Generated {} questions ({} chars)", category.name(), questions.len());
                Ok(questions)
            }
            Err(e) => {
                tracing::error!("Failed to generate {} questions: {}", category.name(), e);
                Err(e)
            }
        }
    }

    pub async fn generate_custom(
        &self,
        source_text: &str,
        count: u32,
        subject: &str,
        tone: &str,
    ) -> Result<CustomQuestions, LlmError> {
        let category = QuestionCategory::Custom {
            subject: subject.to_string(),
            tone: tone.to_string(),
        };
        let questions = self.generate(&category, source_text, count).await?;
        Ok(CustomQuestions {
            questions,
            evaluation: Evaluation::NotImplemented,
        })
    }

    /// Fill-in-the-blank, multiple-choice and essay questions, in that order.
    /// One category failing does not stop the others.
    pub async fn generate_all(
        &self,
        source_text: &str,
    ) -> Vec<(QuestionCategory, Result<String, LlmError>)> {
        let mut results = Vec::with_capacity(3);
        for category in [
            QuestionCategory::FillBlank,
            QuestionCategory::MultipleChoice,
            QuestionCategory::Essay,
        ] {
            let result = self
                .generate(&category, source_text, self.default_count)
                .await;
            results.push((category, result));
        }
        results
    }

    pub async fn write_sample_essay(&self, topic: &str) -> Result<String, LlmError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LlmError::InvalidRequest(
                "essay topic must not be empty".to_string(),
            ));
        }

        let messages = [
            Message::system(prompts::essay_system_prompt(&self.language)),
            Message::user(prompts::essay_user_prompt(topic)),
        ];
        self.client.complete(&messages, None, ESSAY_MAX_TOKENS).await
    }
}

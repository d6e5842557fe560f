//! OpenAI chat completion client used for agent content generation

use crate::models::OpenAiSettings;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Models offered for selection
pub const AVAILABLE_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4-turbo-preview",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
];

const FALLBACK_MODEL: &str = "gpt-4";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenAI client not configured")]
    NotConfigured,

    #[error("OpenAI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("OpenAI response contained no choices")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Per-request overrides; unset fields fall back to the configured defaults
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub role: ChatRole,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: String,
    pub created: i64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: String,
    created: i64,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    role: Option<ChatRole>,
    #[serde(default)]
    content: Option<String>,
}

/// Thin OpenAI chat-completions client
pub struct OpenAiClient {
    client: Client,
    settings: OpenAiSettings,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Send a chat completion request
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<CompletionResponse, LlmError> {
        let api_key = self.api_key().ok_or(LlmError::NotConfigured)?;

        let model = options
            .model
            .as_deref()
            .or(Some(self.settings.default_model.as_str()).filter(|m| !m.is_empty()))
            .unwrap_or(FALLBACK_MODEL);

        let request = ChatRequest {
            model,
            messages,
            max_tokens: options.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: options.temperature.unwrap_or(self.settings.temperature),
            top_p: options.top_p.unwrap_or(1.0),
            frequency_penalty: options.frequency_penalty.unwrap_or(0.0),
            presence_penalty: options.presence_penalty.unwrap_or(0.0),
        };

        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request);
        if let Some(organization) = &self.settings.organization {
            builder = builder.header("OpenAI-Organization", organization);
        }

        tracing::debug!("OpenAI chat completion with model {}", model);
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("OpenAI request failed with status {}", status);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            role: choice.message.role.unwrap_or(ChatRole::Assistant),
            finish_reason: choice.finish_reason,
            usage: response.usage,
            model: response.model,
            created: response.created,
        })
    }

    /// Check the API with a one-token request
    pub async fn test_connection(&self) -> Result<bool, LlmError> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let options = GenerationOptions {
            max_tokens: Some(1),
            ..GenerationOptions::default()
        };
        match self
            .chat_completion(&[ChatMessage::user("Test")], &options)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI connection test failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Complete a task on behalf of an agent
    pub async fn generate_for_agent(
        &self,
        agent_id: &str,
        context: &str,
        task: &str,
        options: &GenerationOptions,
    ) -> Result<CompletionResponse, LlmError> {
        let system_prompt = format!(
            "You are an autonomous AI agent (ID: {agent_id}) working on a project management board.\n\
             Your role is to generate content, code, and manage projects based on the given context and task.\n\
             You should be proactive, creative, and focused on delivering high-quality results.\n\
             \n\
             Context: {context}\n\
             Task: {task}\n\
             \n\
             Please provide a detailed response that addresses the task thoroughly."
        );

        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(format!("Please complete this task: {task}")),
        ];

        self.chat_completion(&messages, options).await
    }

    /// Ask the model what an agent should do next
    pub async fn generate_autonomous_prompt(
        &self,
        agent_id: &str,
        project_context: &str,
        previous_actions: &[String],
    ) -> Result<String, LlmError> {
        let system_prompt = format!(
            "You are an autonomous AI agent (ID: {agent_id}) that needs to generate your next task.\n\
             Based on the project context and your previous actions, determine what you should work on next.\n\
             Be specific and actionable in your task generation.\n\
             \n\
             Project Context: {project_context}\n\
             Previous Actions: {}\n\
             \n\
             Generate a specific, actionable task that you should work on next. Respond with just the task description.",
            previous_actions.join(", ")
        );

        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user("What should I work on next?"),
        ];
        let options = GenerationOptions {
            max_tokens: Some(200),
            temperature: Some(0.8),
            ..GenerationOptions::default()
        };

        Ok(self.chat_completion(&messages, &options).await?.content)
    }

    /// Review code for bugs and improvements
    pub async fn analyze_code(
        &self,
        code: &str,
        language: &str,
    ) -> Result<CompletionResponse, LlmError> {
        let messages = [
            ChatMessage::system(format!(
                "You are a code analysis expert. Analyze the provided {language} code and provide suggestions for improvements, potential bugs, and best practices."
            )),
            ChatMessage::user(format!(
                "Please analyze this {language} code:\n\n```{language}\n{code}\n```"
            )),
        ];
        let options = GenerationOptions {
            max_tokens: Some(1500),
            ..GenerationOptions::default()
        };

        self.chat_completion(&messages, &options).await
    }

    /// Generate code from requirements
    pub async fn generate_code(
        &self,
        requirements: &str,
        language: &str,
        context: Option<&str>,
    ) -> Result<CompletionResponse, LlmError> {
        let extra = context
            .filter(|c| !c.is_empty())
            .map(|c| format!("Additional context: {c}"))
            .unwrap_or_default();
        let system_prompt = format!(
            "You are an expert {language} developer. Generate clean, well-documented, and efficient code based on the requirements.\n\
             {extra}\n\
             \n\
             Provide only the code with appropriate comments. Ensure the code follows best practices and is production-ready."
        );

        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(format!("Requirements: {requirements}")),
        ];
        let options = GenerationOptions {
            max_tokens: Some(2000),
            ..GenerationOptions::default()
        };

        self.chat_completion(&messages, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_errors() {
        let client = OpenAiClient::new(OpenAiSettings::default());
        assert!(!client.is_configured());

        let err = client
            .chat_completion(&[ChatMessage::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "OpenAI client not configured");
        assert!(matches!(
            client.test_connection().await,
            Err(LlmError::NotConfigured)
        ));
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let client = OpenAiClient::new(OpenAiSettings {
            api_key: Some("  ".to_string()),
            ..OpenAiSettings::default()
        });
        assert!(!client.is_configured());
    }
}

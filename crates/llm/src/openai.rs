//! Chat-completions client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use callflow_core::Speaker;

use crate::{LlmError, ReplyGenerator};

/// OpenAI-compatible chat-completions client
pub struct ChatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl ChatClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Build the ordered message list: system prompt, retained history,
    /// then the new utterance.
    fn build_messages(&self, history: &[(Speaker, String)], utterance: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: self.system_prompt.clone(),
        });

        for (speaker, text) in history {
            messages.push(ChatMessage {
                role: speaker.role().to_string(),
                content: text.clone(),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: utterance.to_string(),
        });

        messages
    }
}

#[async_trait]
impl ReplyGenerator for ChatClient {
    async fn generate(
        &self,
        history: &[(Speaker, String)],
        utterance: &str,
    ) -> Result<String, LlmError> {
        let payload = ChatRequest {
            model: self.model.clone(),
            messages: self.build_messages(history, utterance),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(reply)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_order() {
        let client = ChatClient::new("https://api.example", "key", "gpt-4o-mini", "Be helpful.");

        let history = vec![
            (Speaker::Caller, "Do you install fences?".to_string()),
            (Speaker::Assistant, "We do.".to_string()),
        ];
        let messages = client.build_messages(&history, "How much?");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].content, "How much?");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":" We're open 8 to 6 "}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.choices[0].message.content.trim(),
            "We're open 8 to 6"
        );
    }
}

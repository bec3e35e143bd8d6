// Azure OpenAI クライアント

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::info;
use serde_json::json;

use super::schemas::{ChatMessage, OpenAIResponse};
use crate::config::OpenAIConfig;

/// 1回分の補完リクエスト
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// モデル（Azureのデプロイ名）
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// テキスト補完の呼び出し口
///
/// 設定は呼び出しごとに渡されるので、セッション中に設定が変わってもそのまま反映される。
/// 失敗（認証・通信・クォータ）は分類せずにそのまま返す。
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, config: &OpenAIConfig, request: &CompletionRequest) -> Result<String>;
}

/// reqwest を使った Azure OpenAI 実装
pub struct AzureOpenAIClient {
    client: reqwest::Client,
}

impl AzureOpenAIClient {
    pub fn new() -> Self {
        AzureOpenAIClient {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for AzureOpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

// チャット完了エンドポイントのURLを組み立てる
pub fn chat_completions_url(config: &OpenAIConfig, model: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        config.endpoint.trim().trim_end_matches('/'),
        model,
        config.api_version.trim()
    )
}

// レスポンス本文から最初の選択肢を取り出す
fn first_choice(response: OpenAIResponse) -> Result<(String, usize)> {
    let tokens = response.usage.map_or(0, |usage| usage.total_tokens);
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("OpenAI API 応答に選択肢がありません (id: {})", response.id))?;
    Ok((choice.message.content, tokens))
}

#[async_trait]
impl CompletionClient for AzureOpenAIClient {
    async fn complete(&self, config: &OpenAIConfig, request: &CompletionRequest) -> Result<String> {
        let url = chat_completions_url(config, &request.model);

        let request_body = json!({
            "messages": [ChatMessage::user(request.prompt.clone())],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(&url)
            .header("api-key", config.api_key.trim())
            .json(&request_body)
            .send()
            .await?;

        if response.status().is_success() {
            let openai_response: OpenAIResponse = response.json().await?;
            let (content, tokens_used) = first_choice(openai_response)?;
            info!("🤖 [{}] 補完完了 (トークン数: {})", request.model, tokens_used);
            Ok(content)
        } else {
            let status = response.status();
            let error_text = response.text().await?;
            Err(anyhow!(
                "OpenAI API エラー: ステータス {}, レスポンス: {}",
                status,
                error_text
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> OpenAIConfig {
        OpenAIConfig {
            api_key: "key".to_string(),
            endpoint: endpoint.to_string(),
            deployment_name: "gpt-4o-mini".to_string(),
            api_version: "2025-01-01-preview".to_string(),
        }
    }

    #[test]
    fn url_joins_endpoint_deployment_and_version() {
        assert_eq!(
            chat_completions_url(&config("https://demo.openai.azure.com/"), "gpt-4o"),
            "https://demo.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2025-01-01-preview"
        );
        assert_eq!(
            chat_completions_url(&config(" https://demo.openai.azure.com "), "gpt-4o"),
            "https://demo.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2025-01-01-preview"
        );
    }

    #[test]
    fn first_choice_content_is_returned() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "优势：\n1. 问题"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let response: OpenAIResponse = serde_json::from_str(body).unwrap();
        let (content, tokens) = first_choice(response).unwrap();
        assert_eq!(content, "优势：\n1. 问题");
        assert_eq!(tokens, 15);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let response: OpenAIResponse =
            serde_json::from_str(r#"{"id": "chatcmpl-2", "choices": []}"#).unwrap();
        assert!(first_choice(response).is_err());
    }
}

// Azure OpenAI チャット完了APIのスキーマ定義

use serde::{Deserialize, Serialize};

/// チャットメッセージ
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatMessage {
    /// メッセージの役割（"system", "user", "assistant"など）
    pub role: String,
    /// メッセージの内容
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// トークン使用量
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub total_tokens: usize,
}

/// チャット選択肢
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: ChatMessage,
}

/// チャット完了レスポンス
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub id: String,
    pub choices: Vec<OpenAIChoice>,
    // コンテンツフィルタ等で省略されることがある
    pub usage: Option<OpenAIUsage>,
}

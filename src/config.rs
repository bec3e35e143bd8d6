// Azure OpenAI 接続設定とその保存先

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// APIバージョンの既定値
pub const DEFAULT_API_VERSION: &str = "2025-01-01-preview";

/// 設定画面で選べるデプロイ名
pub const DEPLOYMENT_CHOICES: [&str; 3] = ["gpt-4o-mini", "gpt-4o", "gpt-35-turbo"];

/// Azure OpenAI の接続設定
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub endpoint: String,
    pub deployment_name: String,
    pub api_version: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        OpenAIConfig {
            api_key: String::new(),
            endpoint: String::new(),
            deployment_name: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl OpenAIConfig {
    /// モデル呼び出しに必要な項目が揃っているか（api_version は既定値で補える）
    pub fn is_complete(&self) -> bool {
        [&self.api_key, &self.endpoint, &self.deployment_name]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// 空の api_version を既定値で埋める
    pub fn with_default_version(mut self) -> Self {
        if self.api_version.trim().is_empty() {
            self.api_version = DEFAULT_API_VERSION.to_string();
        }
        self
    }
}

/// 設定ファイルの読み書き
///
/// `persist` が無効な場合、保存は何もせず読み込みは常に初期値を返す。
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
    persist: bool,
    seed: OpenAIConfig,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, persist: bool) -> Self {
        ConfigStore {
            path: path.into(),
            persist,
            seed: OpenAIConfig::default(),
        }
    }

    /// ファイルが無いときに使う初期値（環境変数やCLI引数から）
    pub fn with_seed(mut self, seed: OpenAIConfig) -> Self {
        self.seed = seed.with_default_version();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn persists(&self) -> bool {
        self.persist
    }

    /// 設定を読み込む（ファイルが無ければ初期値）
    pub async fn load(&self) -> Result<OpenAIConfig> {
        if !self.persist {
            return Ok(self.seed.clone());
        }

        // ファイルが無い場合だけ初期値にする
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(self.seed.clone()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("設定ファイル {} の読み込みに失敗", self.path.display()));
            }
        };
        let config: OpenAIConfig = serde_json::from_str(&content)
            .with_context(|| format!("設定ファイル {} の解析に失敗", self.path.display()))?;

        Ok(config)
    }

    /// 設定を保存する
    pub async fn save(&self, config: &OpenAIConfig) -> Result<()> {
        if !self.persist {
            debug!("設定の永続化は無効です。保存をスキップします");
            return Ok(());
        }

        let json_data = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json_data)
            .await
            .with_context(|| format!("設定ファイル {} の保存に失敗", self.path.display()))?;
        info!("💾 設定を保存しました: {}", self.path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> OpenAIConfig {
        OpenAIConfig {
            api_key: "secret".to_string(),
            endpoint: "https://demo.openai.azure.com".to_string(),
            deployment_name: "gpt-4o".to_string(),
            api_version: String::new(),
        }
    }

    #[test]
    fn defaults_are_empty_except_version() {
        let config = OpenAIConfig::default();
        assert!(config.api_key.is_empty());
        assert!(config.endpoint.is_empty());
        assert!(config.deployment_name.is_empty());
        assert_eq!(config.api_version, "2025-01-01-preview");
        assert!(!config.is_complete());
    }

    #[test]
    fn completeness_ignores_api_version() {
        assert!(filled().is_complete());

        let mut blank_key = filled();
        blank_key.api_key = "  ".to_string();
        assert!(!blank_key.is_complete());
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("swot_config.json"), true);
        assert_eq!(store.load().await.unwrap(), OpenAIConfig::default());
    }

    #[tokio::test]
    async fn persisted_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("swot_config.json"), true);
        let config = filled().with_default_version();

        store.save(&config).await.unwrap();
        assert_eq!(store.load().await.unwrap(), config);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn disabled_persistence_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("swot_config.json"), false);

        store.save(&filled()).await.unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().await.unwrap(), OpenAIConfig::default());
    }

    #[tokio::test]
    async fn unreadable_config_path_is_an_error() {
        // ディレクトリは読めないので NotFound 以外のエラーになる
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path(), true);
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn seed_is_used_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("swot_config.json"), false).with_seed(filled());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.api_key, "secret");
        assert_eq!(loaded.api_version, DEFAULT_API_VERSION);
    }
}

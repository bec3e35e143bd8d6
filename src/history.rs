// 完了した分析の履歴
//
// 履歴はJSON配列1ファイルで、追加・削除のたびに全体を書き直す。
// プロセス間のロックはしないので、同時に書き込むと後勝ちになる。

use anyhow::{Context, Result, bail};
use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::swot::{AnswerSet, QuestionSet};

/// タイムスタンプの書式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 1回分の分析記録
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub scenario: String,
    pub questions: QuestionSet,
    pub answers: AnswerSet,
    pub analysis: String,
}

impl HistoryRecord {
    /// 現在時刻で記録を作る
    pub fn now(scenario: String, questions: QuestionSet, answers: AnswerSet, analysis: String) -> Self {
        HistoryRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            scenario,
            questions,
            answers,
            analysis,
        }
    }
}

/// 履歴ファイルの読み書き
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// 履歴を読み込む（ファイルが無ければ空）
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("履歴ファイル {} の解析に失敗", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📂 履歴ファイルがありません。空の履歴で開始します: {}", path.display());
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("履歴ファイル {} の読み込みに失敗", path.display()));
            }
        };

        Ok(HistoryStore { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 古い順の一覧
    pub fn list(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryRecord> {
        self.records.get(index)
    }

    /// 記録を追加してファイルを書き直す
    pub async fn append(&mut self, record: HistoryRecord) -> Result<()> {
        self.records.push(record);
        self.write().await?;
        info!("📝 履歴に追加しました (件数: {})", self.records.len());
        Ok(())
    }

    /// 古い順で数えた位置の記録を削除してファイルを書き直す
    pub async fn delete_at(&mut self, index: usize) -> Result<HistoryRecord> {
        if index >= self.records.len() {
            warn!("⚠️ 履歴の削除位置が範囲外です: {} (件数: {})", index, self.records.len());
            bail!("履歴 {} は存在しません (件数: {})", index, self.records.len());
        }

        let removed = self.records.remove(index);
        self.write().await?;
        info!("🗑️ 履歴を削除しました: {} (残り: {})", removed.timestamp, self.records.len());
        Ok(removed)
    }

    // 全件をJSON配列として保存
    async fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json_data = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, json_data)
            .await
            .with_context(|| format!("履歴ファイル {} の保存に失敗", self.path.display()))?;
        Ok(())
    }
}

// セッションの状態遷移
//
// 1ブラウザセッション = 1 `Session`。表示層はイベントを投げ、結果の状態から再描画する。
// モデル呼び出しを伴う遷移の前には必ず設定の完全性を確認する。

use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{ConfigStore, OpenAIConfig};
use crate::history::{HistoryRecord, HistoryStore};
use crate::llm::client::{CompletionClient, CompletionRequest};
use crate::llm::parser::parse_questions;
use crate::llm::prompts::{
    ANALYSIS_MAX_TOKENS, QUESTION_MAX_TOKENS, TEMPERATURE, build_analysis_prompt,
    build_question_prompt,
};
use crate::swot::{
    AnswerSet, Category, QuestionSet, empty_answers, empty_question_set, format_answers,
    missing_answers,
};

/// 画面状態
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Config,
    ScenarioInput,
    QuestionsPending,
    Answering,
    Analyzed,
}

/// ユーザー操作
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    SaveConfig(OpenAIConfig),
    Configure,
    SubmitScenario(String),
    EditAnswer {
        category: Category,
        index: usize,
        text: String,
    },
    Analyze,
    NewAnalysis,
    LoadHistory(usize),
    DeleteHistory(usize),
}

/// 操作の結果（エラーではない中断もここで表す）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Moved(Page),
    Updated,
    ConfigurationRequired,
    EmptyScenario,
    IncompleteAnswers(usize),
    Ignored,
}

/// セッション間で共有する外部協調者
pub struct Services {
    pub client: Arc<dyn CompletionClient>,
    pub config_store: ConfigStore,
    pub history: Mutex<HistoryStore>,
}

/// 1セッション分の状態
#[derive(Clone, Debug)]
pub struct Session {
    pub config: OpenAIConfig,
    pub page: Page,
    pub scenario: String,
    pub questions: Option<QuestionSet>,
    pub answers: AnswerSet,
    pub analysis: Option<String>,
}

impl Session {
    pub fn new(config: OpenAIConfig) -> Self {
        Session {
            config,
            page: Page::Config,
            scenario: String::new(),
            questions: None,
            answers: empty_question_set(),
            analysis: None,
        }
    }

    /// 分析の送信が可能か
    pub fn can_analyze(&self) -> bool {
        matches!(self.page, Page::Answering | Page::Analyzed) && missing_answers(&self.answers) == 0
    }

    /// イベントを処理する
    ///
    /// モデル呼び出しやファイル入出力の失敗は `Err` でそのまま返す。
    pub async fn dispatch(&mut self, event: Event, services: &Services) -> Result<Outcome> {
        match event {
            Event::SaveConfig(config) => self.save_config(config, services).await,
            Event::Configure => Ok(self.configure()),
            Event::SubmitScenario(scenario) => self.submit_scenario(scenario, services).await,
            Event::EditAnswer { category, index, text } => Ok(self.edit_answer(category, index, text)),
            Event::Analyze => self.analyze(services).await,
            Event::NewAnalysis => Ok(self.new_analysis()),
            Event::LoadHistory(index) => self.load_history(index, services).await,
            Event::DeleteHistory(index) => {
                let mut history = services.history.lock().await;
                if index >= history.len() {
                    return Ok(Outcome::Ignored);
                }
                history.delete_at(index).await?;
                Ok(Outcome::Updated)
            }
        }
    }

    // 設定画面を離れたときに戻る画面
    fn resume_page(&self) -> Page {
        if self.analysis.is_some() {
            Page::Analyzed
        } else if self.questions.is_some() {
            Page::Answering
        } else {
            Page::ScenarioInput
        }
    }

    fn move_to(&mut self, page: Page) -> Outcome {
        self.page = page;
        Outcome::Moved(page)
    }

    async fn save_config(&mut self, config: OpenAIConfig, services: &Services) -> Result<Outcome> {
        self.config = config.with_default_version();
        if !self.config.is_complete() {
            warn!("⚠️ 設定が不完全です（APIキー・エンドポイント・デプロイ名が必要）");
            self.page = Page::Config;
            return Ok(Outcome::ConfigurationRequired);
        }

        services.config_store.save(&self.config).await?;
        info!("⚙️ 設定を更新しました (デプロイ: {})", self.config.deployment_name);
        Ok(self.move_to(self.resume_page()))
    }

    fn configure(&mut self) -> Outcome {
        self.move_to(Page::Config)
    }

    async fn submit_scenario(&mut self, scenario: String, services: &Services) -> Result<Outcome> {
        if !self.config.is_complete() {
            self.page = Page::Config;
            return Ok(Outcome::ConfigurationRequired);
        }
        if scenario.trim().is_empty() {
            return Ok(Outcome::EmptyScenario);
        }

        // 新しいシナリオでは前回の結果を破棄する
        self.scenario = scenario;
        self.questions = None;
        self.answers = empty_question_set();
        self.analysis = None;
        self.page = Page::QuestionsPending;

        let request = CompletionRequest {
            model: self.config.deployment_name.clone(),
            prompt: build_question_prompt(&self.scenario),
            temperature: TEMPERATURE,
            max_tokens: QUESTION_MAX_TOKENS,
        };
        info!("❓ 質問を生成中...");
        let reply = match services.client.complete(&self.config, &request).await {
            Ok(reply) => reply,
            Err(e) => {
                self.page = Page::ScenarioInput;
                return Err(e);
            }
        };

        let questions = parse_questions(&reply);
        self.answers = empty_answers(&questions);
        self.questions = Some(questions);
        Ok(self.move_to(Page::Answering))
    }

    fn edit_answer(&mut self, category: Category, index: usize, text: String) -> Outcome {
        if !matches!(self.page, Page::Answering | Page::Analyzed) {
            return Outcome::Ignored;
        }
        match self.answers.get_mut(&category).and_then(|list| list.get_mut(index)) {
            Some(slot) => {
                *slot = text;
                Outcome::Updated
            }
            None => Outcome::Ignored,
        }
    }

    async fn analyze(&mut self, services: &Services) -> Result<Outcome> {
        if !matches!(self.page, Page::Answering | Page::Analyzed) {
            return Ok(Outcome::Ignored);
        }
        if !self.config.is_complete() {
            self.page = Page::Config;
            return Ok(Outcome::ConfigurationRequired);
        }
        let missing = missing_answers(&self.answers);
        if missing > 0 {
            return Ok(Outcome::IncompleteAnswers(missing));
        }

        let request = CompletionRequest {
            model: self.config.deployment_name.clone(),
            prompt: build_analysis_prompt(&self.scenario, &format_answers(&self.answers)),
            temperature: TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
        };
        info!("🔍 分析中...");
        let analysis = services.client.complete(&self.config, &request).await?;

        let record = HistoryRecord::now(
            self.scenario.clone(),
            self.questions.clone().unwrap_or_else(empty_question_set),
            self.answers.clone(),
            analysis.clone(),
        );
        self.analysis = Some(analysis);
        services.history.lock().await.append(record).await?;

        Ok(self.move_to(Page::Analyzed))
    }

    fn new_analysis(&mut self) -> Outcome {
        self.scenario.clear();
        self.questions = None;
        self.answers = empty_question_set();
        self.analysis = None;
        self.move_to(Page::ScenarioInput)
    }

    async fn load_history(&mut self, index: usize, services: &Services) -> Result<Outcome> {
        let history = services.history.lock().await;
        let Some(record) = history.get(index) else {
            return Ok(Outcome::Ignored);
        };

        self.scenario = record.scenario.clone();
        self.questions = Some(record.questions.clone());
        self.answers = record.answers.clone();
        self.analysis = Some(record.analysis.clone());
        Ok(self.move_to(Page::Analyzed))
    }
}

// swot-assistant - Azure OpenAI を使った SWOT 分析助手
//
// シナリオからSWOT各カテゴリの質問を生成し、回答をもとに分析レポートを作る。
// 画面はブラウザから操作する。

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use simple_logger::SimpleLogger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

mod config;
mod history;
mod llm;
mod session;
mod swot;
mod web;

use config::{ConfigStore, DEFAULT_API_VERSION, OpenAIConfig};
use history::HistoryStore;
use llm::client::AzureOpenAIClient;
use session::Services;
use web::AppState;

// コマンドライン引数の定義

#[derive(Parser, Debug)]
#[clap(
    name = "swot-assistant",
    about = "Azure OpenAI で SWOT 分析を支援するWebアプリ",
    version = "0.1.0"
)]
struct Args {
    /// 待ち受けアドレス
    #[clap(long, env = "SWOT_BIND", default_value = "127.0.0.1:8501")]
    bind: String,

    /// 設定ファイル
    #[clap(long, env = "SWOT_CONFIG_FILE", default_value = "swot_config.json")]
    config_file: String,

    /// 履歴ファイル
    #[clap(long, env = "SWOT_HISTORY_FILE", default_value = "swot_history.json")]
    history_file: String,

    /// 保存した設定をファイルに書き出す
    #[clap(long, env = "SWOT_PERSIST_CONFIG")]
    persist_config: bool,

    /// 初期値として使う Azure OpenAI のAPIキー
    #[clap(long, env = "AZURE_OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// 初期値として使うエンドポイント
    #[clap(long, env = "AZURE_OPENAI_ENDPOINT", default_value = "")]
    endpoint: String,

    /// 初期値として使うデプロイ名
    #[clap(long, env = "AZURE_OPENAI_DEPLOYMENT", default_value = "")]
    deployment_name: String,

    /// APIバージョン
    #[clap(long, env = "AZURE_OPENAI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// 放置されたセッションを破棄するまでの秒数
    #[clap(long, env = "SWOT_SESSION_TTL_SECS", default_value_t = 3600)]
    session_ttl_secs: u64,

    /// ログレベル (error, warn, info, debug, trace)
    #[clap(long, env = "SWOT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

// メイン関数
#[tokio::main]
async fn main() -> Result<()> {
    // .envファイルを読み込み
    dotenv().ok();

    // コマンドライン引数を解析
    let args = Args::parse();

    // ロガー初期化
    let level: log::LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| anyhow!("不正なログレベル: {}", args.log_level))?;
    SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| anyhow!("ロガーの初期化に失敗: {}", e))?;

    let seed = OpenAIConfig {
        api_key: args.api_key,
        endpoint: args.endpoint,
        deployment_name: args.deployment_name,
        api_version: args.api_version,
    };
    let config_store = ConfigStore::new(&args.config_file, args.persist_config).with_seed(seed);
    let history = HistoryStore::load(&args.history_file).await?;

    info!("📊 SWOT 分析助手 起動中...");
    info!(
        "設定ファイル: {} (永続化: {})",
        config_store.path().display(),
        if config_store.persists() { "有効" } else { "無効" }
    );
    info!("履歴ファイル: {} (件数: {})", history.path().display(), history.len());
    info!("セッション有効期限: {}秒", args.session_ttl_secs);

    let services = Services {
        client: Arc::new(AzureOpenAIClient::new()),
        config_store,
        history: Mutex::new(history),
    };

    web::serve(
        AppState::new(services, Duration::from_secs(args.session_ttl_secs)),
        &args.bind,
    )
    .await
}

// ブラウザ向けのHTTPアダプター
//
// セッションはCookieのIDで引き当てる。POSTはイベントに変換して `Session::dispatch` に渡し、
// `/` へリダイレクトして現在の状態から描画し直す。

use anyhow::Result;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use log::{error, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::OpenAIConfig;
use crate::session::{Event, Outcome, Services, Session};
use crate::swot::Category;

mod pages;

/// セッションIDを入れるCookie名
pub const SESSION_COOKIE: &str = "swot_session";

/// 画面上部に一度だけ出す通知
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
}

impl Notice {
    fn success(text: impl Into<String>) -> Option<Notice> {
        Some(Notice {
            kind: NoticeKind::Success,
            text: text.into(),
        })
    }

    fn warning(text: impl Into<String>) -> Option<Notice> {
        Some(Notice {
            kind: NoticeKind::Warning,
            text: text.into(),
        })
    }
}

/// ブラウザ1セッション分の状態
pub struct WebSession {
    pub session: Session,
    pub notice: Option<Notice>,
}

// 登録済みセッションと最終アクセス時刻
struct SessionEntry {
    state: Arc<Mutex<WebSession>>,
    last_seen: Instant,
}

/// セッションIDと状態の対応表
///
/// `ttl` より長くアクセスの無いセッションは次の `open` で破棄される。
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// 既存セッションを返すか、新しく作る（新規なら3番目が true）
    async fn open(
        &self,
        id: Option<String>,
        services: &Services,
    ) -> Result<(String, Arc<Mutex<WebSession>>, bool)> {
        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions);

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_seen = Instant::now();
                return Ok((id, entry.state.clone(), false));
            }
        }

        let config = services.config_store.load().await?;
        let id = Uuid::new_v4().to_string();
        let state = Arc::new(Mutex::new(WebSession {
            session: Session::new(config),
            notice: None,
        }));
        sessions.insert(
            id.clone(),
            SessionEntry {
                state: state.clone(),
                last_seen: Instant::now(),
            },
        );
        info!("🆕 新しいセッション: {} (合計: {})", id, sessions.len());

        Ok((id, state, true))
    }

    // 処理中のリクエストが握っているセッションは残す
    fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_seen.elapsed() < self.ttl || Arc::strong_count(&entry.state) > 1
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("🧹 放置されたセッションを {} 件破棄しました (残り: {})", evicted, sessions.len());
        }
    }

    /// セッションを破棄する
    async fn end(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id).is_some();
        if removed {
            info!("👋 セッション終了: {}", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(services: Services, session_ttl: Duration) -> Self {
        AppState {
            services: Arc::new(services),
            sessions: Arc::new(SessionRegistry::new(session_ttl)),
        }
    }
}

// 処理できなかった失敗はエラーページとして返す
pub struct WebError(anyhow::Error);

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        error!("❌ リクエスト処理エラー: {}", message);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::render_error(&message)),
        )
            .into_response()
    }
}

impl<E> From<E> for WebError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Deserialize)]
struct ConfigForm {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    deployment_name: String,
    #[serde(default)]
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct ScenarioForm {
    #[serde(default)]
    scenario: String,
}

/// ルーティングを組み立てる
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/configure", get(configure))
        .route("/config", post(save_config))
        .route("/scenario", post(submit_scenario))
        .route("/answers", post(submit_answers))
        .route("/new", post(new_analysis))
        .route("/history/:index/load", post(load_history))
        .route("/history/:index/delete", post(delete_history))
        .route("/session/end", post(end_session))
        .with_state(state)
}

/// サーバーを起動する
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("🚀 SWOT 分析サーバー起動: http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// CookieヘッダーからセッションIDを取り出す
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

// 新規セッションならCookieを付ける
fn with_cookie(mut response: Response, id: &str, fresh: bool) -> Result<Response, WebError> {
    if fresh {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        response
            .headers_mut()
            .insert(header::SET_COOKIE, HeaderValue::from_str(&cookie)?);
    }
    Ok(response)
}

// "answer:<category>:<index>" 形式のフィールド名を解釈
fn parse_answer_field(name: &str) -> Option<(Category, usize)> {
    let mut parts = name.split(':');
    if parts.next()? != "answer" {
        return None;
    }
    let category = Category::from_key(parts.next()?)?;
    let index = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((category, index))
}

// 操作結果を画面の通知に変換
fn notice_for(event: &Event, outcome: &Outcome) -> Option<Notice> {
    match (event, outcome) {
        (Event::SaveConfig(_), Outcome::ConfigurationRequired) => {
            Notice::warning("请填写 API 密钥、终端点和部署名称。")
        }
        (_, Outcome::ConfigurationRequired) => Notice::warning("请先配置 Azure OpenAI 设置。"),
        (_, Outcome::EmptyScenario) => Notice::warning("请输入您的场景。"),
        (_, Outcome::IncompleteAnswers(missing)) => {
            Notice::warning(format!("还有 {} 个问题尚未回答。", missing))
        }
        (Event::SaveConfig(_), Outcome::Moved(_)) => Notice::success("配置保存成功！"),
        (Event::DeleteHistory(_), Outcome::Updated) => Notice::success("历史记录已删除。"),
        (Event::LoadHistory(_) | Event::DeleteHistory(_), Outcome::Ignored) => {
            Notice::warning("该历史记录不存在。")
        }
        _ => None,
    }
}

// イベントを順に処理して `/` に戻す
async fn apply(state: &AppState, headers: &HeaderMap, events: Vec<Event>) -> Result<Response, WebError> {
    let (id, handle, fresh) = state
        .sessions
        .open(session_cookie(headers), &state.services)
        .await?;

    {
        let mut web = handle.lock().await;
        for event in events {
            let outcome = web.session.dispatch(event.clone(), &state.services).await?;
            if let Some(notice) = notice_for(&event, &outcome) {
                web.notice = Some(notice);
            }
        }
    }

    with_cookie(Redirect::to("/").into_response(), &id, fresh)
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    let (id, handle, fresh) = state
        .sessions
        .open(session_cookie(&headers), &state.services)
        .await?;

    let html = {
        let mut web = handle.lock().await;
        let notice = web.notice.take();
        let history = state.services.history.lock().await;
        pages::render_page(&pages::PageView {
            session: &web.session,
            history: history.list(),
            notice: notice.as_ref(),
            persist_config: state.services.config_store.persists(),
        })
    };

    with_cookie(Html(html).into_response(), &id, fresh)
}

async fn configure(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    apply(&state, &headers, vec![Event::Configure]).await
}

async fn save_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ConfigForm>,
) -> Result<Response, WebError> {
    let config = OpenAIConfig {
        api_key: form.api_key,
        endpoint: form.endpoint,
        deployment_name: form.deployment_name,
        api_version: form.api_version,
    };
    apply(&state, &headers, vec![Event::SaveConfig(config)]).await
}

async fn submit_scenario(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ScenarioForm>,
) -> Result<Response, WebError> {
    apply(&state, &headers, vec![Event::SubmitScenario(form.scenario)]).await
}

async fn submit_answers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let mut events = Vec::new();
    let mut analyze = false;

    for (name, value) in fields {
        if name == "action" {
            analyze = value == "analyze";
        } else if let Some((category, index)) = parse_answer_field(&name) {
            events.push(Event::EditAnswer {
                category,
                index,
                text: value,
            });
        }
    }
    if analyze {
        events.push(Event::Analyze);
    }

    apply(&state, &headers, events).await
}

async fn new_analysis(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    apply(&state, &headers, vec![Event::NewAnalysis]).await
}

async fn load_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Result<Response, WebError> {
    apply(&state, &headers, vec![Event::LoadHistory(index)]).await
}

async fn delete_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Result<Response, WebError> {
    apply(&state, &headers, vec![Event::DeleteHistory(index)]).await
}

async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(id) = session_cookie(&headers) {
        state.sessions.end(&id).await;
    }

    let mut response = Redirect::to("/").into_response();
    let expired = format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE);
    response
        .headers_mut()
        .insert(header::SET_COOKIE, HeaderValue::from_str(&expired)?);
    Ok(response)
}

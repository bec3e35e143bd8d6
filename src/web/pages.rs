// HTML描画
//
// 状態を受け取って文字列を返すだけの関数群。ユーザー入力とモデル出力は必ずエスケープする。

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use super::{Notice, NoticeKind};
use crate::config::DEPLOYMENT_CHOICES;
use crate::history::HistoryRecord;
use crate::session::{Page, Session};
use crate::swot::Category;

// 履歴一覧に表示するシナリオの最大文字数
const HISTORY_TITLE_CHARS: usize = 24;

const STYLE: &str = r#"
body { font-family: -apple-system, "PingFang SC", "Microsoft YaHei", sans-serif; margin: 0; display: grid; grid-template-columns: 280px 1fr; min-height: 100vh; background: #fafafa; color: #222; }
aside { background: #f0f2f6; padding: 16px; border-right: 1px solid #ddd; }
main { padding: 24px 40px; max-width: 1200px; }
textarea, input, select { width: 100%; box-sizing: border-box; padding: 8px; margin: 4px 0 12px; font: inherit; }
button { padding: 8px 16px; margin: 4px 4px 4px 0; cursor: pointer; }
button[disabled] { cursor: not-allowed; opacity: 0.5; }
.notice { padding: 10px 14px; border-radius: 6px; margin-bottom: 16px; }
.notice.success { background: #e3f6e8; color: #17692f; }
.notice.warning { background: #fff5d6; color: #7a5b00; }
.columns { display: grid; grid-template-columns: 1fr 1fr; gap: 24px; }
fieldset { border: 1px solid #ddd; border-radius: 6px; margin-bottom: 16px; }
.result { white-space: pre-wrap; background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 16px; }
.history-entry { border-bottom: 1px solid #ddd; padding: 8px 0; }
.history-entry form { display: inline; }
.muted { color: #777; font-size: 0.85em; }
"#;

/// 1画面分の描画に必要な情報
pub struct PageView<'a> {
    pub session: &'a Session,
    pub history: &'a [HistoryRecord],
    pub notice: Option<&'a Notice>,
    pub persist_config: bool,
}

/// 現在の状態を描画する
pub fn render_page(view: &PageView<'_>) -> String {
    let body = match view.session.page {
        Page::Config => config_form(view.session, view.persist_config),
        Page::ScenarioInput | Page::QuestionsPending => analysis_header(view.session),
        Page::Answering | Page::Analyzed => format!(
            "{}<div class=\"columns\"><section>{}</section><section>{}</section></div>",
            analysis_header(view.session),
            questions_form(view.session),
            result_section(view.session),
        ),
    };

    layout(
        &format!("{}{}", notice_banner(view.notice), body),
        &history_sidebar(view.history),
    )
}

/// 処理失敗時のページ
pub fn render_error(message: &str) -> String {
    layout(
        &format!(
            "<h1>处理失败</h1><div class=\"notice warning\">{}</div><p><a href=\"/\">返回</a></p>",
            text(message)
        ),
        "",
    )
}

fn layout(main: &str, sidebar: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>SWOT 分析助手</title>
<style>{}</style>
</head>
<body>
<aside>{}</aside>
<main>{}</main>
</body>
</html>"#,
        STYLE, sidebar, main
    )
}

fn notice_banner(notice: Option<&Notice>) -> String {
    match notice {
        Some(notice) => {
            let class = match notice.kind {
                NoticeKind::Success => "success",
                NoticeKind::Warning => "warning",
            };
            format!("<div class=\"notice {}\">{}</div>", class, text(&notice.text))
        }
        None => String::new(),
    }
}

fn config_form(session: &Session, persist_config: bool) -> String {
    let config = &session.config;

    let mut options = String::new();
    let stored = config.deployment_name.as_str();
    let mut choices: Vec<&str> = DEPLOYMENT_CHOICES.to_vec();
    if !stored.is_empty() && !choices.contains(&stored) {
        choices.push(stored);
    }
    for choice in choices {
        let selected = if choice == stored { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            attr(choice),
            selected,
            text(choice)
        ));
    }

    let persistence = if persist_config {
        "配置将保存到本地文件。"
    } else {
        "配置仅在当前会话中有效。"
    };

    format!(
        r#"<h1>Azure OpenAI 配置</h1>
<form method="post" action="/config">
<label>Azure OpenAI API 密钥<input type="password" name="api_key" value="{}"></label>
<label>Azure OpenAI 终端点<input type="text" name="endpoint" value="{}"></label>
<label>部署名称<select name="deployment_name">{}</select></label>
<label>API 版本<input type="text" name="api_version" value="{}"></label>
<button type="submit">保存配置</button>
</form>
<p class="muted">{}</p>"#,
        attr(&config.api_key),
        attr(&config.endpoint),
        options,
        attr(&config.api_version),
        persistence
    )
}

fn analysis_header(session: &Session) -> String {
    format!(
        r#"<h1>SWOT 分析助手</h1>
<form method="get" action="/configure"><button type="submit">⚙️ 配置 OpenAI</button></form>
<p>请输入您的场景，我们将帮助您进行 SWOT 分析。</p>
<form method="post" action="/scenario">
<label>请输入您的场景：<textarea name="scenario" rows="4">{}</textarea></label>
<button type="submit">生成问题</button>
</form>
<form method="post" action="/new"><button type="submit">新的分析</button></form>"#,
        text(&session.scenario)
    )
}

fn questions_form(session: &Session) -> String {
    let mut groups = String::new();

    for category in Category::ALL {
        let questions = session
            .questions
            .as_ref()
            .and_then(|set| set.get(&category))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut fields = String::new();
        for (i, question) in questions.iter().enumerate() {
            let answer = session
                .answers
                .get(&category)
                .and_then(|list| list.get(i))
                .map(String::as_str)
                .unwrap_or_default();
            fields.push_str(&format!(
                "<label>{} {}: {}<textarea name=\"answer:{}:{}\" rows=\"3\">{}</textarea></label>",
                category.label(),
                i + 1,
                text(question),
                category.key(),
                i,
                text(answer)
            ));
        }
        if questions.is_empty() {
            fields.push_str("<p class=\"muted\">（未能生成该类别的问题）</p>");
        }

        groups.push_str(&format!(
            "<fieldset id=\"{}\"><legend>{}</legend>{}</fieldset>",
            category.key(),
            category.label(),
            fields
        ));
    }

    // 「分析」は保存済みの回答で判定するので、未保存の間は手順を案内する
    let (disabled, hint) = if session.can_analyze() {
        ("", "")
    } else {
        (
            " disabled",
            "<p class=\"muted\">填写答案后请先点击“保存答案”，全部回答保存后“分析”按钮才会启用。</p>",
        )
    };
    format!(
        r#"<h2>SWOT 分析问题</h2>
<form method="post" action="/answers">
{}
<button type="submit" name="action" value="save">保存答案</button>
<button type="submit" name="action" value="analyze"{}>分析</button>
</form>{}"#,
        groups, disabled, hint
    )
}

fn result_section(session: &Session) -> String {
    match &session.analysis {
        Some(analysis) => format!(
            "<h2>分析结果</h2><div class=\"result\">{}</div>",
            text(analysis)
        ),
        None => "<p class=\"muted\">回答所有问题后点击“分析”。</p>".to_string(),
    }
}

fn history_title(scenario: &str) -> String {
    let mut title: String = scenario.chars().take(HISTORY_TITLE_CHARS).collect();
    if scenario.chars().count() > HISTORY_TITLE_CHARS {
        title.push('…');
    }
    title
}

// 新しい順に並べるが、操作には古い順のインデックスを使う
fn history_sidebar(history: &[HistoryRecord]) -> String {
    let mut entries = String::new();
    for (index, record) in history.iter().enumerate().rev() {
        entries.push_str(&format!(
            r#"<div class="history-entry">
<div class="muted">{}</div>
<div>{}</div>
<form method="post" action="/history/{}/load"><button type="submit">加载</button></form>
<form method="post" action="/history/{}/delete"><button type="submit">删除</button></form>
</div>"#,
            text(&record.timestamp),
            text(&history_title(&record.scenario)),
            index,
            index
        ));
    }
    if history.is_empty() {
        entries.push_str("<p class=\"muted\">暂无历史记录</p>");
    }

    format!(
        "<h2>历史记录</h2>{}<form method=\"post\" action=\"/session/end\"><button type=\"submit\">结束会话</button></form>",
        entries
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAIConfig;
    use crate::swot::{empty_answers, empty_question_set};

    fn record(scenario: &str, stamp: &str) -> HistoryRecord {
        HistoryRecord {
            timestamp: stamp.to_string(),
            scenario: scenario.to_string(),
            questions: empty_question_set(),
            answers: empty_question_set(),
            analysis: String::new(),
        }
    }

    fn render(session: &Session, history: &[HistoryRecord]) -> String {
        render_page(&PageView {
            session,
            history,
            notice: None,
            persist_config: false,
        })
    }

    #[test]
    fn history_is_listed_newest_first_with_chronological_indices() {
        let session = Session::new(OpenAIConfig::default());
        let history = [record("旧场景", "2026-01-01 00:00:00"), record("新场景", "2026-02-01 00:00:00")];
        let html = render(&session, &history);

        let newer = html.find("新场景").unwrap();
        let older = html.find("旧场景").unwrap();
        assert!(newer < older);
        assert!(html.find("/history/1/load").unwrap() < html.find("/history/0/load").unwrap());
    }

    #[test]
    fn stored_deployment_outside_choices_stays_selected() {
        let mut config = OpenAIConfig::default();
        config.deployment_name = "my-gpt4".to_string();
        let html = render(&Session::new(config), &[]);
        assert!(html.contains("<option value=\"my-gpt4\" selected>my-gpt4</option>"));
        assert!(html.contains("<option value=\"gpt-4o-mini\">"));
    }

    #[test]
    fn analyze_button_disabled_until_answers_complete() {
        let mut session = Session::new(OpenAIConfig::default());
        let mut questions = empty_question_set();
        questions.insert(Category::Strengths, vec!["<问题>".to_string()]);
        session.answers = empty_answers(&questions);
        session.questions = Some(questions);
        session.page = Page::Answering;

        let html = render(&session, &[]);
        assert!(html.contains("value=\"analyze\" disabled"));
        assert!(html.contains("&lt;问题&gt;"));

        session.answers.get_mut(&Category::Strengths).unwrap()[0] = "回答".to_string();
        let html = render(&session, &[]);
        assert!(!html.contains("value=\"analyze\" disabled"));
    }

    #[test]
    fn disabled_analyze_button_explains_save_first() {
        let mut session = Session::new(OpenAIConfig::default());
        let mut questions = empty_question_set();
        questions.insert(Category::Threats, vec!["竞争？".to_string()]);
        session.answers = empty_answers(&questions);
        session.questions = Some(questions);
        session.page = Page::Answering;

        let html = render(&session, &[]);
        assert!(html.contains("请先点击“保存答案”"));

        session.answers.get_mut(&Category::Threats).unwrap()[0] = "价格战".to_string();
        let html = render(&session, &[]);
        assert!(!html.contains("请先点击“保存答案”"));
    }

    #[test]
    fn long_scenarios_are_truncated_in_sidebar() {
        let title = history_title(&"长".repeat(30));
        assert_eq!(title.chars().count(), HISTORY_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));
        assert_eq!(history_title("短"), "短");
    }
}

// モデル応答の質問パーサー
//
// 「カテゴリ見出し行 + 番号付き行」の形式を前提にした行単位の解析。
// 形式が崩れていても失敗はせず、該当カテゴリが空になるだけ。

use log::warn;

use crate::swot::{Category, QuestionSet, empty_question_set};

// 番号付き行の先頭 "N. " を取り除く文字数
const NUMBER_PREFIX_CHARS: usize = 3;

/// 質問生成の応答テキストをカテゴリ別の質問に分解する
pub fn parse_questions(raw: &str) -> QuestionSet {
    let mut questions = empty_question_set();
    let mut current: Option<Category> = None;
    let mut orphaned = 0usize;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(category) = Category::from_heading(line) {
            current = Some(category);
            continue;
        }

        // 全角数字や丸数字も番号として扱う
        let numbered = line.chars().next().is_some_and(char::is_numeric);
        if !numbered {
            continue;
        }

        match current {
            Some(category) => {
                let question: String = line.chars().skip(NUMBER_PREFIX_CHARS).collect();
                if let Some(list) = questions.get_mut(&category) {
                    list.push(question);
                }
            }
            None => orphaned += 1,
        }
    }

    if orphaned > 0 {
        warn!("⚠️ カテゴリ見出しより前の番号付き行を {} 行破棄しました", orphaned);
    }
    for (category, list) in &questions {
        if list.is_empty() {
            warn!("⚠️ カテゴリ「{}」の質問を抽出できませんでした", category.label());
        }
    }

    questions
}

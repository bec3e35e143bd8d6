// SWOT分析のドメイン型
//
// カテゴリは固定の4種類で、表示順と回答の整形順はこの宣言順に従う。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SWOTカテゴリ
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Category {
    #[serde(rename = "优势")]
    Strengths,
    #[serde(rename = "劣势")]
    Weaknesses,
    #[serde(rename = "机会")]
    Opportunities,
    #[serde(rename = "威胁")]
    Threats,
}

impl Category {
    /// 固定順のカテゴリ一覧
    pub const ALL: [Category; 4] = [
        Category::Strengths,
        Category::Weaknesses,
        Category::Opportunities,
        Category::Threats,
    ];

    /// 画面とプロンプトで使う表示名
    pub fn label(self) -> &'static str {
        match self {
            Category::Strengths => "优势",
            Category::Weaknesses => "劣势",
            Category::Opportunities => "机会",
            Category::Threats => "威胁",
        }
    }

    /// 見出し行（全角コロン付き）
    pub fn heading(self) -> String {
        format!("{}：", self.label())
    }

    /// フォームのフィールド名などに使うASCIIキー
    pub fn key(self) -> &'static str {
        match self {
            Category::Strengths => "strengths",
            Category::Weaknesses => "weaknesses",
            Category::Opportunities => "opportunities",
            Category::Threats => "threats",
        }
    }

    pub fn from_key(key: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.key() == key)
    }

    /// 見出し行からカテゴリを判定
    pub fn from_heading(line: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.heading() == line)
    }
}

/// カテゴリごとの質問リスト
pub type QuestionSet = BTreeMap<Category, Vec<String>>;

/// カテゴリごとの回答リスト（質問とインデックスで対応する）
pub type AnswerSet = BTreeMap<Category, Vec<String>>;

/// 全カテゴリを空リストで持つマップ
pub fn empty_question_set() -> QuestionSet {
    Category::ALL.into_iter().map(|c| (c, Vec::new())).collect()
}

/// 質問数に合わせた空の回答を作る
pub fn empty_answers(questions: &QuestionSet) -> AnswerSet {
    Category::ALL
        .into_iter()
        .map(|c| {
            let len = questions.get(&c).map_or(0, Vec::len);
            (c, vec![String::new(); len])
        })
        .collect()
}

/// 空白のみの回答の数
pub fn missing_answers(answers: &AnswerSet) -> usize {
    answers
        .values()
        .flatten()
        .filter(|answer| answer.trim().is_empty())
        .count()
}

/// すべての回答が埋まっているか（質問ゼロは完了扱い）
pub fn is_complete(answers: &AnswerSet) -> bool {
    missing_answers(answers) == 0
}

/// 分析プロンプトに埋め込む回答ブロックを整形
pub fn format_answers(answers: &AnswerSet) -> String {
    let mut formatted = String::new();
    for category in Category::ALL {
        formatted.push_str(&format!("\n{}\n", category.heading()));
        if let Some(list) = answers.get(&category) {
            for (i, answer) in list.iter().enumerate() {
                formatted.push_str(&format!("{}. {}\n", i + 1, answer));
            }
        }
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parser::parse_questions;

    fn answers_with(counts: [usize; 4], text: &str) -> AnswerSet {
        Category::ALL
            .into_iter()
            .zip(counts)
            .map(|(c, n)| (c, vec![text.to_string(); n]))
            .collect()
    }

    #[test]
    fn empty_answers_match_question_lengths() {
        let mut questions = empty_question_set();
        questions.insert(Category::Strengths, vec!["a".into(), "b".into()]);
        questions.insert(Category::Threats, vec!["c".into()]);

        let answers = empty_answers(&questions);
        for category in Category::ALL {
            assert_eq!(answers[&category].len(), questions[&category].len());
            assert!(answers[&category].iter().all(String::is_empty));
        }
    }

    #[test]
    fn whitespace_answer_is_incomplete() {
        let mut answers = answers_with([2, 2, 2, 2], "ok");
        assert!(is_complete(&answers));

        answers.get_mut(&Category::Opportunities).unwrap()[1] = "  \n\t".to_string();
        assert!(!is_complete(&answers));
        assert_eq!(missing_answers(&answers), 1);
    }

    #[test]
    fn zero_questions_are_vacuously_complete() {
        let answers = empty_answers(&empty_question_set());
        assert!(is_complete(&answers));
    }

    #[test]
    fn formatted_answers_keep_category_order() {
        let mut answers = answers_with([1, 0, 0, 1], "x");
        answers.get_mut(&Category::Strengths).unwrap()[0] = "品牌知名度高".to_string();

        assert_eq!(
            format_answers(&answers),
            "\n优势：\n1. 品牌知名度高\n\n劣势：\n\n机会：\n\n威胁：\n1. x\n"
        );
    }

    #[test]
    fn formatted_answers_reparse_to_same_shape() {
        let answers = answers_with([3, 1, 0, 2], "回答");
        let reparsed = parse_questions(&format_answers(&answers));
        for category in Category::ALL {
            assert_eq!(reparsed[&category].len(), answers[&category].len());
        }
    }

    #[test]
    fn heading_and_key_lookups() {
        assert_eq!(Category::from_heading("机会："), Some(Category::Opportunities));
        assert_eq!(Category::from_heading("机会:"), None);
        assert_eq!(Category::from_key("threats"), Some(Category::Threats));
        assert_eq!(Category::from_key("risks"), None);
    }

    #[test]
    fn categories_serialize_by_label() {
        let answers = answers_with([1, 0, 0, 0], "a");
        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"优势":["a"],"劣势":[],"机会":[],"威胁":[]}"#);
    }
}

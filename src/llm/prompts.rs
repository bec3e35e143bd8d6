// プロンプトテンプレートを管理するモジュール

/// 生成時の温度（質問・分析共通）
pub const TEMPERATURE: f32 = 0.7;

/// 質問生成の最大出力トークン数
pub const QUESTION_MAX_TOKENS: usize = 800;

/// 分析の最大出力トークン数
pub const ANALYSIS_MAX_TOKENS: usize = 1000;

// テンプレート変数のタイプ
pub type TemplateVariables = Vec<(String, String)>;

// SWOT質問生成用テンプレート
const QUESTION_TEMPLATE: &str = r#"基于以下场景，为每个 SWOT 类别（优势、劣势、机会、威胁）生成 2-3 个具体问题：

场景：{{scenario}}

请按照以下格式输出：
优势：
1. [问题]
2. [问题]

劣势：
1. [问题]
2. [问题]

机会：
1. [问题]
2. [问题]

威胁：
1. [问题]
2. [问题]"#;

// SWOT回答分析用テンプレート
const ANALYSIS_TEMPLATE: &str = r#"基于以下场景和 SWOT 分析答案，提供全面的分析和建议：

场景：{{scenario}}

SWOT 分析答案：
{{answers}}

请提供：
1. 关键发现总结
2. 主要优势及如何利用
3. 关键劣势及如何改进
4. 重要机会及如何把握
5. 主要威胁及如何应对
6. 整体建议和下一步行动方案"#;

// テンプレート内の変数を置換
//
// 置換は一度だけ走査するので、値の中に `{{...}}` が含まれていても再展開されない。
pub fn render_template(template: &str, variables: &TemplateVariables) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match variables.iter().find(|(name, _)| name == key) {
                    Some((_, value)) => rendered.push_str(value),
                    None => {
                        rendered.push_str("{{");
                        rendered.push_str(key);
                        rendered.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                rendered.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);

    rendered
}

/// シナリオからSWOT質問生成プロンプトを作る
pub fn build_question_prompt(scenario: &str) -> String {
    render_template(
        QUESTION_TEMPLATE,
        &vec![("scenario".to_string(), scenario.to_string())],
    )
}

/// シナリオと整形済み回答から分析プロンプトを作る
pub fn build_analysis_prompt(scenario: &str, formatted_answers: &str) -> String {
    render_template(
        ANALYSIS_TEMPLATE,
        &vec![
            ("scenario".to_string(), scenario.to_string()),
            ("answers".to_string(), formatted_answers.to_string()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parser::parse_questions;
    use crate::swot::Category;

    #[test]
    fn question_prompt_embeds_scenario_verbatim() {
        let prompt = build_question_prompt("Expand into Southeast Asia market");
        assert!(prompt.contains("场景：Expand into Southeast Asia market\n"));
        assert_eq!(prompt, build_question_prompt("Expand into Southeast Asia market"));
    }

    #[test]
    fn question_prompt_example_format_is_parseable() {
        // 出力例の部分がそのままパーサーの期待形式になっていること
        let questions = parse_questions(&build_question_prompt("x"));
        for category in Category::ALL {
            assert_eq!(questions[&category], vec!["[问题]", "[问题]"]);
        }
    }

    #[test]
    fn empty_scenario_is_accepted() {
        let prompt = build_question_prompt("");
        assert!(prompt.contains("场景：\n"));
    }

    #[test]
    fn analysis_prompt_lists_six_sections() {
        let prompt = build_analysis_prompt("开咖啡店", "\n优势：\n1. 位置好\n");
        assert!(prompt.contains("场景：开咖啡店"));
        assert!(prompt.contains("SWOT 分析答案：\n\n优势：\n1. 位置好\n"));
        for n in 1..=6 {
            assert!(prompt.contains(&format!("\n{}. ", n)));
        }
        assert!(prompt.ends_with("6. 整体建议和下一步行动方案"));
    }

    #[test]
    fn placeholders_in_values_are_not_expanded() {
        let prompt = build_analysis_prompt("{{answers}}", "A");
        assert!(prompt.contains("场景：{{answers}}"));
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let vars = vec![("a".to_string(), "1".to_string())];
        assert_eq!(render_template("{{a}}-{{b}}-{{", &vars), "1-{{b}}-{{");
    }
}

// LLMモジュール - Azure OpenAI とのやり取りに関わる機能をまとめたモジュール

pub mod client;
pub mod parser;
pub mod prompts;
pub mod schemas;

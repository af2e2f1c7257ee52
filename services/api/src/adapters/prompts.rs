//! services/api/src/adapters/prompts.rs
//!
//! Implements the `PromptRenderer` port with plain `{placeholder}` templates.
//!
//! The built-in templates can be replaced by dropping `question.txt` and/or
//! `answer.txt` into the prompts directory. Language and personality fragments are
//! resolved by name; unknown names use the default fragment.

use std::path::Path;
use std::sync::OnceLock;

use movie_quiz_core::{Movie, PortError, PortResult, PromptRenderer, PromptStyle};
use regex::{Captures, Regex};
use tracing::info;

const QUESTION_TEMPLATE: &str = "\
{personality}

你正在主持一个电影猜谜游戏。参与者需要根据你的问题猜出电影的名字。
请根据以下电影信息提出一个问题，不要在问题或提示中直接说出电影名字。

{language}

电影名字: {title}
宣传语: {tagline}
简介: {overview}
类型: {genres}
预算: {budget}
票房: {revenue}
平均评分: {average_rating}
评分人数: {rating_count}
上映日期: {release_date}
片长(分钟): {runtime}";

const ANSWER_TEMPLATE: &str = "\
你正在主持一个电影猜谜游戏，参与者刚刚提交了他们猜测的电影名字。
请把参与者的猜测和正确的电影名字进行比较并打分。

正确的电影名字: {title}
参与者的答案: {answer}";

const QUESTION_FILE: &str = "question.txt";
const ANSWER_FILE: &str = "answer.txt";

//=========================================================================================
// Language and Personality Fragments
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Chinese,
    English,
    German,
}

impl Language {
    fn by_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "english" => Self::English,
            "german" => Self::German,
            _ => Self::Chinese,
        }
    }

    fn fragment(self) -> &'static str {
        match self {
            Self::Chinese => "请用中文提问和回答。",
            Self::English => "请用英文提问和回答 (ask and reply in English)。",
            Self::German => "请用德文提问和回答 (frage und antworte auf Deutsch)。",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Personality {
    Default,
    Christmas,
    Scientist,
    Dad,
}

impl Personality {
    fn by_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "christmas" => Self::Christmas,
            "scientist" => Self::Scientist,
            "dad" => Self::Dad,
            _ => Self::Default,
        }
    }

    fn fragment(self) -> &'static str {
        match self {
            Self::Default => "你是一个友好又风趣的电影猜谜主持人。",
            Self::Christmas => "你是圣诞老人，说话充满节日气氛，喜欢提到礼物、雪和驯鹿。",
            Self::Scientist => "你是一位严谨的科学家，喜欢用数据和实验的口吻描述事物。",
            Self::Dad => "你是一位爱讲冷笑话的老爸，每句话都忍不住加一个谐音梗。",
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Debug, Clone)]
pub struct TemplatePromptRenderer {
    question_template: String,
    answer_template: String,
}

impl Default for TemplatePromptRenderer {
    fn default() -> Self {
        Self {
            question_template: QUESTION_TEMPLATE.to_string(),
            answer_template: ANSWER_TEMPLATE.to_string(),
        }
    }
}

impl TemplatePromptRenderer {
    /// Uses the templates found in `dir`, falling back to the built-in ones for
    /// any file that does not exist.
    pub fn from_dir(dir: &Path) -> PortResult<Self> {
        let mut renderer = Self::default();
        if let Some(template) = read_template(&dir.join(QUESTION_FILE))? {
            renderer.question_template = template;
        }
        if let Some(template) = read_template(&dir.join(ANSWER_FILE))? {
            renderer.answer_template = template;
        }
        Ok(renderer)
    }
}

fn read_template(path: &Path) -> PortResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(template) => {
            info!("Using prompt template {}", path.display());
            Ok(Some(template))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PortError::Unexpected(format!(
            "Could not read prompt template {}: {}",
            path.display(),
            e
        ))),
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Replaces every `{name}` in one pass, so braces inside substituted values are
/// never expanded. Unknown placeholders stay as they are.
fn render(template: &str, values: &[(&str, String)]) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

//=========================================================================================
// `PromptRenderer` Trait Implementation
//=========================================================================================

impl PromptRenderer for TemplatePromptRenderer {
    fn render_question_prompt(&self, movie: &Movie, style: &PromptStyle) -> PortResult<String> {
        let values = [
            ("personality", Personality::by_name(&style.personality).fragment().to_string()),
            ("language", Language::by_name(&style.language).fragment().to_string()),
            ("title", movie.title.clone()),
            ("tagline", movie.tagline.clone()),
            ("overview", movie.overview.clone()),
            ("genres", movie.genres.join(", ")),
            ("budget", movie.budget.to_string()),
            ("revenue", movie.revenue.to_string()),
            ("average_rating", movie.vote_average.to_string()),
            ("rating_count", movie.vote_count.to_string()),
            ("release_date", movie.release_date.clone()),
            ("runtime", movie.runtime.to_string()),
        ];
        Ok(render(&self.question_template, &values))
    }

    fn render_answer_prompt(&self, movie: &Movie, answer: &str) -> PortResult<String> {
        let values = [
            ("title", movie.title.clone()),
            ("answer", answer.to_string()),
        ];
        Ok(render(&self.answer_template, &values))
    }
}

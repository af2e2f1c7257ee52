//! crates/movie_quiz_core/src/parser.rs
//!
//! Turns free-form chat replies into fixed-shape `Question` and `Answer` values.
//!
//! Replies are read as a sequence of `label: value` lines. Labels are ignored and
//! values are assigned by position, so a generator that reorders its lines will
//! have its fields silently swapped.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::domain::{Answer, Question};
use crate::error::{QuizError, QuizResult};

/// Instruction sent alongside the question prompt. Its three lines are the shape
/// `parse_question` expects.
pub const QUESTION_REPLY_FORMAT: &str = r#"
    您的回复只能包含三行!您只能严格使用以下三行模板进行回复:
    问题: <您的问题>
    提示1: <对参与者有帮助的第一个提示>
    提示2: <更轻松获得称号的第二个提示>
"#;

/// Instruction sent alongside the answer prompt. Its two lines are the shape
/// `parse_answer` expects.
pub const ANSWER_REPLY_FORMAT: &str = r#"
    参与者获得多少积分由您决定。根据这个定义，他们得到 0、1、2 或 3 分:

    0: 无分，与原标题相差甚远
    1-2: 足够接近，取决于你的决定
    3: 最好的结果，标题准确，小拼写错误没关系

    友善点，如果靠近的话就好了。以有趣且友善的方式回答。

    您的回复只能包含两行！您只能严格使用以下两行模板进行回复:
    分数: <0-3>
    答案: <您对参与者的回答>
"#;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The label part may span a newline, so leading blank lines fold into the next label.
    PATTERN.get_or_init(|| Regex::new(r"[^:]+: ([^\n]+)").expect("line pattern is valid"))
}

/// Collects the value of every `label: value` line, in order.
fn extract_values(raw: &str) -> Vec<&str> {
    line_pattern()
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

fn format_error(raw: &str) -> QuizError {
    warn!("Chat replied with an unexpected format. chat_reply: {}", raw);
    QuizError::Format {
        raw: raw.to_string(),
    }
}

/// Parses a three-line reply into a question and two hints.
pub fn parse_question(raw: &str) -> QuizResult<Question> {
    match extract_values(raw).as_slice() {
        [text, hint1, hint2] => Ok(Question {
            text: text.to_string(),
            hint1: hint1.to_string(),
            hint2: hint2.to_string(),
        }),
        _ => Err(format_error(raw)),
    }
}

/// Parses a two-line reply into points and the grader's comment.
///
/// Every non-digit in the first value is dropped before parsing, so `"2/3"`
/// reads as 23. Points are not range checked.
pub fn parse_answer(raw: &str) -> QuizResult<Answer> {
    let values = extract_values(raw);
    let [points, text] = values.as_slice() else {
        return Err(format_error(raw));
    };

    let digits: String = points.chars().filter(|c| c.is_ascii_digit()).collect();
    let points = digits.parse::<i64>().map_err(|_| format_error(raw))?;

    Ok(Answer {
        points,
        text: text.to_string(),
    })
}

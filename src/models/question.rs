use serde::{Deserialize, Serialize};

/// A question as stored in the exam's JSONB snapshot. The correct answer is
/// never serialized into student-facing payloads; see `Question::redacted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: i32,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default = "default_points")]
    pub points: i32,
}

fn default_points() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Mcq,
    Text,
}

/// Student-facing view of a question with the answer key stripped.
#[derive(Debug, Clone, Serialize)]
pub struct RedactedQuestion {
    pub id: i32,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub points: i32,
}

impl Question {
    pub fn redacted(&self) -> RedactedQuestion {
        RedactedQuestion {
            id: self.id,
            text: self.text.clone(),
            question_type: self.question_type,
            options: self.options.clone(),
            points: self.points,
        }
    }
}

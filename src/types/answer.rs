use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(alias = "questionNumber", alias = "question")]
    pub question_number: u32,
    #[serde(alias = "value")]
    pub score: u8,
}

impl Answer {
    pub fn new(question_number: u32, score: u8) -> Self {
        Self {
            question_number,
            score,
        }
    }
}

/// Answers keyed by question number. Recording a question twice keeps the
/// later score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    scores: BTreeMap<u32, u8>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, answer: Answer) {
        self.scores.insert(answer.question_number, answer.score);
    }

    pub fn get(&self, question_number: u32) -> Option<u8> {
        self.scores.get(&question_number).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn answers(&self) -> Vec<Answer> {
        self.scores
            .iter()
            .map(|(&number, &score)| Answer::new(number, score))
            .collect()
    }
}

impl FromIterator<Answer> for AnswerSheet {
    fn from_iter<I: IntoIterator<Item = Answer>>(iter: I) -> Self {
        let mut sheet = Self::new();
        for answer in iter {
            sheet.record(answer);
        }
        sheet
    }
}

impl From<&[Answer]> for AnswerSheet {
    fn from(answers: &[Answer]) -> Self {
        answers.iter().copied().collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersFile {
    List(Vec<Answer>),
    Wrapped { answers: Vec<Answer> },
}

/// Parses an answers file: either a bare JSON array, or any object with an
/// `answers` array (saved progress, an exported result).
pub fn parse_answers(json: &str) -> Result<Vec<Answer>, serde_json::Error> {
    let file: AnswersFile = serde_json::from_str(json)?;
    Ok(match file {
        AnswersFile::List(answers) | AnswersFile::Wrapped { answers } => answers,
    })
}

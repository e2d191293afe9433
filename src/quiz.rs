use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use uuid::Uuid;

use crate::label::{same_choice, strip_label};

/// Returns a fresh opaque identifier for quizzes, questions and results.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time at the millisecond precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A single multiple choice question as authored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    /// Question stem without its numeric prefix.
    pub text: String,
    /// Options in authored order, label prefixes included (`"a) Berlin"`).
    pub options: Vec<String>,
    /// Correct answer as authored, with or without a label.
    pub correct_answer: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,
    #[error("question \"{question}\" has no options")]
    NoOptions { question: String },
    #[error("answer \"{answer}\" for question \"{question}\" does not match any option")]
    AnswerNotInOptions { question: String, answer: String },
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            options,
            correct_answer: correct_answer.into(),
        }
    }

    /// Checks that the question can be scored: it has a stem, at least one option, and its
    /// correct answer names one of the options (see [`Question::correct_option`]).
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        if self.options.is_empty() {
            return Err(QuestionError::NoOptions {
                question: self.text.clone(),
            });
        }

        if self.correct_option().is_none() {
            return Err(QuestionError::AnswerNotInOptions {
                question: self.text.clone(),
                answer: self.correct_answer.clone(),
            });
        }

        Ok(())
    }

    /// Options with their labels removed, in authored order.
    pub fn stripped_options(&self) -> Vec<String> {
        self.options.iter().map(|option| strip_label(option)).collect()
    }

    pub fn stripped_answer(&self) -> String {
        strip_label(&self.correct_answer)
    }

    /// Index of the option the correct answer names, ignoring case.
    ///
    /// An option whose stripped text equals the answer as written wins. Only when none does is
    /// the answer's own label removed, so `"A. Lincoln"` picks `"a) A. Lincoln"` and never
    /// collapses to `"Lincoln"`.
    pub fn correct_option(&self) -> Option<usize> {
        let options = self.stripped_options();
        let written = self.correct_answer.trim();

        options
            .iter()
            .position(|option| same_choice(option, written))
            .or_else(|| {
                let answer = self.stripped_answer();
                options.iter().position(|option| same_choice(option, &answer))
            })
    }
}

/// A titled, ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn new(title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: None,
            questions,
            created_at: now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Text shown under the title in list views.
    pub fn summary(&self) -> String {
        match &self.description {
            Some(description) if !description.trim().is_empty() => description.clone(),
            _ => format!(
                "{} to test your knowledge.",
                question_count(self.questions.len())
            ),
        }
    }
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.title,
            question_count(self.questions.len())
        )
    }
}

/// `"1 question"`, `"3 questions"`.
pub(crate) fn question_count(count: usize) -> String {
    match count {
        1 => "1 question".to_string(),
        _ => format!("{count} questions"),
    }
}

/// Outcome of one completed quiz attempt. Results only live for the current process.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: String,
    /// Weak reference, the quiz may have been deleted since.
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: usize,
    pub total_questions: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
}

/// Coarse verdict shown with a result summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Outstanding,
    GreatJob,
    GoodEffort,
    KeepPracticing,
}

impl Grade {
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 90 {
            Grade::Outstanding
        } else if percentage >= 70 {
            Grade::GreatJob
        } else if percentage < 50 {
            Grade::KeepPracticing
        } else {
            Grade::GoodEffort
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Grade::Outstanding => "Outstanding!",
            Grade::GreatJob => "Great job!",
            Grade::GoodEffort => "Good effort!",
            Grade::KeepPracticing => "Keep practicing!",
        };
        f.write_str(message)
    }
}

/// Rounded percentage of `part` over `whole`, or 0 when `whole` is 0.
pub(crate) fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

impl QuizResult {
    pub fn percentage(&self) -> u32 {
        percentage(self.score, self.total_questions)
    }

    pub fn incorrect(&self) -> usize {
        self.total_questions.saturating_sub(self.score)
    }

    pub fn is_perfect(&self) -> bool {
        self.score == self.total_questions
    }

    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage())
    }
}

impl fmt::Display for QuizResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} out of {} ({}%)",
            self.quiz_title,
            self.score,
            self.total_questions,
            self.percentage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn capital_question() -> Question {
        Question::new(
            "Capital of France?",
            vec!["a) Berlin".to_string(), "b) Paris".to_string()],
            "Paris",
        )
    }

    fn result(score: usize, total_questions: usize) -> QuizResult {
        QuizResult {
            id: new_id(),
            quiz_id: new_id(),
            quiz_title: "Capitals".to_string(),
            score,
            total_questions,
            date: Utc::now(),
        }
    }

    #[test]
    fn validates_answer_against_stripped_options() {
        assert_eq!(capital_question().validate(), Ok(()));

        let mut labelled = capital_question();
        labelled.correct_answer = "B) paris".to_string();
        assert_eq!(labelled.validate(), Ok(()));
    }

    #[test]
    fn correct_option_prefers_the_answer_as_written() {
        let mut question = Question::new(
            "Who gave the Gettysburg Address?",
            vec!["a) A. Lincoln".to_string(), "b) B. Lincoln".to_string()],
            "A. Lincoln",
        );
        assert_eq!(question.correct_option(), Some(0));

        question.correct_answer = "b) B. Lincoln".to_string();
        assert_eq!(question.correct_option(), Some(1));

        question.correct_answer = "Lincoln".to_string();
        assert_eq!(question.correct_option(), None);
    }

    #[test]
    fn rejects_answer_missing_from_options() {
        let mut question = capital_question();
        question.correct_answer = "Lyon".to_string();

        assert_eq!(
            question.validate(),
            Err(QuestionError::AnswerNotInOptions {
                question: "Capital of France?".to_string(),
                answer: "Lyon".to_string(),
            })
        );
    }

    #[test]
    fn rejects_questions_without_options_or_text() {
        let mut question = capital_question();
        question.options.clear();
        assert!(matches!(
            question.validate(),
            Err(QuestionError::NoOptions { .. })
        ));

        let mut question = capital_question();
        question.text = "   ".to_string();
        assert_eq!(question.validate(), Err(QuestionError::EmptyText));
    }

    #[test]
    fn serializes_with_camel_case_and_millisecond_timestamps() {
        let mut quiz = Quiz::new("Capitals", vec![capital_question()]);
        quiz.created_at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();

        let json = serde_json::to_value(&quiz).expect("quiz should serialize");

        assert_eq!(json["createdAt"], 1_700_000_000_123i64);
        assert_eq!(json["questions"][0]["correctAnswer"], "Paris");
        assert!(json.get("description").is_none());

        let decoded: Quiz = serde_json::from_value(json).expect("quiz should deserialize");
        assert_eq!(decoded, quiz);
    }

    #[test]
    fn summary_falls_back_to_question_count() {
        let quiz = Quiz::new("Capitals", vec![capital_question()]);
        assert_eq!(quiz.summary(), "1 question to test your knowledge.");
        assert_eq!(quiz.to_string(), "Capitals (1 question)");

        let described = quiz.with_description("European capitals");
        assert_eq!(described.summary(), "European capitals");
    }

    #[test]
    fn grades_follow_percentage_thresholds() {
        assert_eq!(result(9, 10).grade(), Grade::Outstanding);
        assert_eq!(result(7, 10).grade(), Grade::GreatJob);
        assert_eq!(result(5, 10).grade(), Grade::GoodEffort);
        assert_eq!(result(4, 10).grade(), Grade::KeepPracticing);
        assert_eq!(result(2, 3).percentage(), 67);
        assert_eq!(result(2, 3).incorrect(), 1);
        assert!(result(3, 3).is_perfect());
    }
}

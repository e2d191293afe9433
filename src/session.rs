use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::debug;

use crate::label::{same_choice, strip_label};
use crate::quiz::{Question, Quiz, QuizResult, new_id, now};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("quiz \"{title}\" has no questions to take")]
    EmptyQuiz { title: String },
    #[error("question {question_id} is not part of this session")]
    UnknownQuestion { question_id: String },
    #[error("this session has already been submitted")]
    AlreadySubmitted,
}

/// A question as presented in one attempt: options shuffled and every label stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Submitted,
}

/// What a call to [`QuizSession::select`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Recorded,
    Replaced,
    /// The session was already submitted, nothing changed.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// Per-question breakdown shown after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question_id: String,
    pub text: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub correct_answer: String,
    pub outcome: Outcome,
}

/// Working state of one attempt at a quiz.
///
/// The source [`Quiz`] is never modified. Questions and options are shuffled once at start and
/// keep that order for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz_id: String,
    quiz_title: String,
    questions: Vec<SessionQuestion>,
    answers: HashMap<String, String>,
    phase: SessionPhase,
    score: usize,
}

impl QuizSession {
    /// Starts a fresh attempt with questions and options in a random order.
    ///
    /// # Errors
    /// Returns [`SessionError::EmptyQuiz`] when the quiz has no questions.
    pub fn start<R: Rng + ?Sized>(rng: &mut R, quiz: &Quiz) -> Result<Self, SessionError> {
        if quiz.questions.is_empty() {
            return Err(SessionError::EmptyQuiz {
                title: quiz.title.clone(),
            });
        }

        let mut order: Vec<&Question> = quiz.questions.iter().collect();
        order.shuffle(rng);

        let mut questions = Vec::with_capacity(order.len());
        for question in order {
            let mut options = question.options.clone();
            options.shuffle(rng);

            questions.push(SessionQuestion {
                id: question.id.clone(),
                text: question.text.clone(),
                options: options.iter().map(|option| strip_label(option)).collect(),
                correct_answer: question
                    .correct_option()
                    .map(|index| strip_label(&question.options[index]))
                    .unwrap_or_else(|| question.stripped_answer()),
            });
        }

        debug!(quiz_id = %quiz.id, questions = questions.len(), "quiz session started");

        Ok(Self {
            quiz_id: quiz.id.clone(),
            quiz_title: quiz.title.clone(),
            questions,
            answers: HashMap::new(),
            phase: SessionPhase::Active,
            score: 0,
        })
    }

    /// Records the chosen option for a question, replacing any earlier choice.
    ///
    /// `option` is one of the stripped options shown for the question and is stored as given.
    /// Does nothing once the session is submitted.
    pub fn select(
        &mut self,
        question_id: &str,
        option: &str,
    ) -> Result<Selection, SessionError> {
        if self.phase == SessionPhase::Submitted {
            return Ok(Selection::Ignored);
        }

        if !self.questions.iter().any(|question| question.id == question_id) {
            return Err(SessionError::UnknownQuestion {
                question_id: question_id.to_string(),
            });
        }

        let previous = self
            .answers
            .insert(question_id.to_string(), option.to_string());

        Ok(match previous {
            Some(_) => Selection::Replaced,
            None => Selection::Recorded,
        })
    }

    /// Scores the attempt, closes the session and returns its result.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadySubmitted`] on a second call.
    pub fn submit(&mut self) -> Result<QuizResult, SessionError> {
        if self.phase == SessionPhase::Submitted {
            return Err(SessionError::AlreadySubmitted);
        }

        self.score = self
            .questions
            .iter()
            .filter(|question| self.outcome_of(question) == Outcome::Correct)
            .count();
        self.phase = SessionPhase::Submitted;

        debug!(quiz_id = %self.quiz_id, score = self.score, "quiz session submitted");

        Ok(QuizResult {
            id: new_id(),
            quiz_id: self.quiz_id.clone(),
            quiz_title: self.quiz_title.clone(),
            score: self.score,
            total_questions: self.questions.len(),
            date: now(),
        })
    }

    fn outcome_of(&self, question: &SessionQuestion) -> Outcome {
        match self.answers.get(&question.id) {
            None => Outcome::Unanswered,
            Some(selected) if same_choice(selected, &question.correct_answer) => {
                Outcome::Correct
            }
            Some(_) => Outcome::Incorrect,
        }
    }

    /// Per-question outcomes in presentation order. Empty until the session is submitted.
    pub fn review(&self) -> Vec<QuestionReview> {
        if self.phase != SessionPhase::Submitted {
            return Vec::new();
        }

        self.questions
            .iter()
            .map(|question| QuestionReview {
                question_id: question.id.clone(),
                text: question.text.clone(),
                options: question.options.clone(),
                selected: self.answers.get(&question.id).cloned(),
                correct_answer: question.correct_answer.clone(),
                outcome: self.outcome_of(question),
            })
            .collect()
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn quiz_title(&self) -> &str {
        &self.quiz_title
    }

    pub fn questions(&self) -> &[SessionQuestion] {
        &self.questions
    }

    pub fn selection(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    /// Number of correct answers, zero until submitted.
    pub fn score(&self) -> usize {
        self.score
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == self.total()
    }
}

/// Holds the single active attempt. Taking a different quiz always starts over.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<QuizSession>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the attempt for `quiz`, keeping the current one when it belongs to the same quiz.
    pub fn take<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        quiz: &Quiz,
    ) -> Result<&mut QuizSession, SessionError> {
        let reusable = self
            .current
            .as_ref()
            .is_some_and(|session| session.quiz_id == quiz.id);

        if !reusable {
            self.current = Some(QuizSession::start(rng, quiz)?);
        }

        self.current_mut().ok_or_else(|| SessionError::EmptyQuiz {
            title: quiz.title.clone(),
        })
    }

    /// Discards the current attempt and starts a new one for `quiz`.
    pub fn restart<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        quiz: &Quiz,
    ) -> Result<&mut QuizSession, SessionError> {
        self.current = None;
        self.take(rng, quiz)
    }

    pub fn current(&self) -> Option<&QuizSession> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut QuizSession> {
        self.current.as_mut()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

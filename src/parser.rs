use lazy_static::lazy_static;
use regex::Regex;
use std::mem;
use tracing::debug;

use crate::label::strip_label;
use crate::quiz::{Question, QuestionError, Quiz, new_id, now};

lazy_static! {
    static ref ANSWER_REGEX: Regex =
        Regex::new(r"(?i)^\**Answer:\s*(?:[a-z][).]\s*)?(.+?)\**$").unwrap();
    static ref QUESTION_START_REGEX: Regex = Regex::new(r"^[0-9]+\.\s+(.+)").unwrap();
    static ref OPTION_REGEX: Regex = Regex::new(r"^[a-zA-Z][).]\s+(.+)").unwrap();
}

const MIN_LINES: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Text is too short to be a quiz.")]
    TooShort { lines: usize },
    #[error("No valid questions found. Check the format.")]
    NoValidQuestions { discarded: usize },
    #[error("Question on line {line} is invalid: {source}")]
    InvalidQuestion { line: usize, source: QuestionError },
}

/// Something the parser dropped or skipped without failing.
///
/// `line` is the 1-based line number in the submitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A started question never reached an answer line with options collected.
    DiscardedQuestion { line: usize, stem: String },
    /// An answer line arrived with no question ready to receive it.
    OrphanAnswer { line: usize, answer: String },
    /// A line matched no pattern and could not extend a stem.
    IgnoredLine { line: usize, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuiz {
    pub quiz: Quiz,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedQuiz {
    pub fn into_quiz(self) -> Quiz {
        self.quiz
    }

    pub fn discarded_questions(&self) -> usize {
        count_discarded(&self.diagnostics)
    }
}

fn count_discarded(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|diagnostic| matches!(diagnostic, Diagnostic::DiscardedQuestion { .. }))
        .count()
}

#[derive(Debug)]
struct PendingQuestion {
    line: usize,
    text: String,
    options: Vec<String>,
}

#[derive(Debug, Default)]
enum Cursor {
    #[default]
    Idle,
    ReadingOptions(PendingQuestion),
}

#[derive(Debug, Default)]
struct QuizTextParser {
    cursor: Cursor,
    questions: Vec<Question>,
    diagnostics: Vec<Diagnostic>,
}

impl QuizTextParser {
    fn feed(&mut self, line_number: usize, line: &str) -> Result<(), ParseError> {
        if let Some(captures) = ANSWER_REGEX.captures(line) {
            return self.on_answer(line_number, &captures[1]);
        }

        if let Some(captures) = QUESTION_START_REGEX.captures(line) {
            self.on_question_start(line_number, &captures[1]);
        } else if OPTION_REGEX.is_match(line) {
            self.on_option(line_number, line);
        } else {
            self.on_other(line_number, line);
        }

        Ok(())
    }

    fn on_answer(&mut self, line_number: usize, captured: &str) -> Result<(), ParseError> {
        let mut answer = captured.trim();
        if let Some(stripped) = answer.strip_suffix("**") {
            answer = stripped;
        }

        match mem::take(&mut self.cursor) {
            Cursor::ReadingOptions(pending) if !pending.options.is_empty() => {
                let question = Question::new(pending.text, pending.options, answer);
                question
                    .validate()
                    .map_err(|source| ParseError::InvalidQuestion {
                        line: pending.line,
                        source,
                    })?;
                self.questions.push(question);
            }
            unchanged => {
                self.cursor = unchanged;
                self.diagnostics.push(Diagnostic::OrphanAnswer {
                    line: line_number,
                    answer: answer.to_string(),
                });
            }
        }

        Ok(())
    }

    fn on_question_start(&mut self, line_number: usize, stem: &str) {
        let next = Cursor::ReadingOptions(PendingQuestion {
            line: line_number,
            text: stem.to_string(),
            options: Vec::new(),
        });

        if let Cursor::ReadingOptions(unfinished) = mem::replace(&mut self.cursor, next) {
            self.discard(unfinished);
        }
    }

    fn on_option(&mut self, line_number: usize, line: &str) {
        if let Cursor::ReadingOptions(pending) = &mut self.cursor {
            pending.options.push(line.to_string());
            return;
        }
        self.ignore(line_number, line);
    }

    fn on_other(&mut self, line_number: usize, line: &str) {
        if let Cursor::ReadingOptions(pending) = &mut self.cursor {
            if pending.options.is_empty() {
                pending.text.push(' ');
                pending.text.push_str(line);
                return;
            }
        }
        self.ignore(line_number, line);
    }

    fn discard(&mut self, unfinished: PendingQuestion) {
        self.diagnostics.push(Diagnostic::DiscardedQuestion {
            line: unfinished.line,
            stem: unfinished.text,
        });
    }

    fn ignore(&mut self, line_number: usize, line: &str) {
        self.diagnostics.push(Diagnostic::IgnoredLine {
            line: line_number,
            text: line.to_string(),
        });
    }

    fn finish(mut self) -> Result<(Vec<Question>, Vec<Diagnostic>), ParseError> {
        if let Cursor::ReadingOptions(unfinished) = mem::take(&mut self.cursor) {
            self.discard(unfinished);
        }

        if self.questions.is_empty() {
            return Err(ParseError::NoValidQuestions {
                discarded: count_discarded(&self.diagnostics),
            });
        }

        Ok((self.questions, self.diagnostics))
    }
}

/// Parses pasted quiz text into a [`Quiz`].
///
/// The first non-blank line is the title. Questions start with `"<n>. "`, options with a single
/// letter label (`"a) "` or `"A. "`) and every question is closed by an `Answer:` line, optionally
/// wrapped in `**`. When `existing` is given its id is kept so the result replaces it on save.
///
/// # Errors
/// * [`ParseError::TooShort`] when fewer than three non-blank lines are present.
/// * [`ParseError::NoValidQuestions`] when no question block was completed.
/// * [`ParseError::InvalidQuestion`] when a completed question's answer matches none of its options.
pub fn parse_quiz(raw: &str, existing: Option<&Quiz>) -> Result<ParsedQuiz, ParseError> {
    let lines: Vec<(usize, &str)> = raw
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if lines.len() < MIN_LINES {
        return Err(ParseError::TooShort { lines: lines.len() });
    }

    let title = lines[0].1.to_string();
    let mut parser = QuizTextParser::default();
    for &(line_number, line) in &lines[1..] {
        parser.feed(line_number, line)?;
    }
    let (questions, diagnostics) = parser.finish()?;

    for diagnostic in &diagnostics {
        debug!(?diagnostic, "quiz text line skipped");
    }

    let quiz = Quiz {
        id: existing
            .map(|quiz| quiz.id.clone())
            .unwrap_or_else(new_id),
        title,
        description: None,
        questions,
        created_at: now(),
    };

    Ok(ParsedQuiz { quiz, diagnostics })
}

/// Rebuilds the editable text form of a quiz, the inverse of [`parse_quiz`].
///
/// Every option is written with a fresh letter label over its stripped text, and the answer
/// repeats the label of the option it names. Digit labels would read as new questions.
pub fn render_quiz_text(quiz: &Quiz) -> String {
    let mut text = format!("{}\n\n", quiz.title);

    for (index, question) in quiz.questions.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, question.text));

        for (option_index, option) in question.options.iter().enumerate() {
            text.push_str(&format!(
                "{}) {}\n",
                option_letter(option_index),
                strip_label(option)
            ));
        }

        text.push_str(&format!("**Answer: {}**\n\n", rendered_answer(question)));
    }

    text
}

fn option_letter(index: usize) -> char {
    char::from(b'a' + (index % 26) as u8)
}

fn rendered_answer(question: &Question) -> String {
    match question.correct_option() {
        Some(index) => format!(
            "{}) {}",
            option_letter(index),
            strip_label(&question.options[index])
        ),
        None => question.stripped_answer(),
    }
}

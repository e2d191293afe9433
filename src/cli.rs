use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use quizmaster::{
    Config, Diagnostic, FileBackend, GenerationError, GenerationRequest, GenerationTransport,
    Outcome, Quiz, QuizGenerator, QuizLibrary, QuizResult, QuizSession, SessionSlot,
    SessionStats, Upsert, parse_quiz, render_quiz_text,
};

#[derive(Parser, Debug)]
#[command(
    name = "quizmaster",
    version,
    about = "Author, store and take multiple choice quizzes."
)]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the quiz library, overrides the config
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a quiz text file and add it to the library
    Import {
        file: PathBuf,

        /// Replace the quiz with this id instead of adding a new one
        #[arg(long)]
        replace: Option<String>,
    },

    /// Ask the generation service for a quiz about a topic and store it
    Generate { topic: String },

    /// List stored quizzes, newest first
    List,

    /// Print a quiz in the text format accepted by `import`
    Show { id: String },

    /// Delete a quiz
    Delete { id: String },

    /// Take one or more quizzes in a row and print session stats at the end
    Take {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        }
        .with_api_key_from_env();
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }

        let mut library = QuizLibrary::open(
            FileBackend::new(&config.data_dir),
            config.storage_key.clone(),
        );
        let stdout = io::stdout();
        let mut out = stdout.lock();

        match self.command {
            Command::Import { file, replace } => {
                let raw = fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                import(&mut library, &raw, replace.as_deref(), &mut out)
            }
            Command::Generate { topic } => {
                let generator = QuizGenerator::new(ReqwestTransport::new(), config.generator);
                let runtime = tokio::runtime::Runtime::new()?;
                let Ok(quiz) = runtime.block_on(generator.generate(&topic)) else {
                    bail!(GenerationError::USER_MESSAGE);
                };

                library.upsert(quiz.clone());
                writeln!(out, "Added {} [{}]", quiz, quiz.id)?;
                Ok(())
            }
            Command::List => list(&library, &mut out),
            Command::Show { id } => {
                let quiz = find(&library, &id)?;
                write!(out, "{}", render_quiz_text(quiz))?;
                Ok(())
            }
            Command::Delete { id } => {
                if !library.remove(&id) {
                    bail!("no quiz with id {id}");
                }
                writeln!(out, "Deleted {id}")?;
                Ok(())
            }
            Command::Take { ids } => {
                let quizzes = ids
                    .iter()
                    .map(|id| find(&library, id).cloned())
                    .collect::<Result<Vec<_>>>()?;
                let stdin = io::stdin();
                let mut input = stdin.lock();
                let mut rng = rand::thread_rng();
                let mut slot = SessionSlot::new();
                let mut results = Vec::with_capacity(quizzes.len());

                for quiz in &quizzes {
                    results.push(take(&mut input, &mut out, &mut rng, &mut slot, quiz)?);
                }

                print_stats(&SessionStats::from_results(&results), &mut out)
            }
        }
    }
}

/// Native transport for the generation service.
struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

fn transport_error(error: reqwest::Error) -> GenerationError {
    GenerationError::Transport {
        reason: error.to_string(),
    }
}

impl GenerationTransport for ReqwestTransport {
    async fn send(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.client
            .post(&request.url)
            .header("x-goog-api-key", &request.api_key)
            .json(&request.body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport_error)?
            .text()
            .await
            .map_err(transport_error)
    }
}

fn find<'a>(library: &'a QuizLibrary<FileBackend>, id: &str) -> Result<&'a Quiz> {
    library
        .get(id)
        .with_context(|| format!("no quiz with id {id}"))
}

fn import<W: Write>(
    library: &mut QuizLibrary<FileBackend>,
    raw: &str,
    replace: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let existing = replace.map(|id| find(library, id)).transpose()?;
    let parsed = parse_quiz(raw, existing)?;

    for diagnostic in &parsed.diagnostics {
        match diagnostic {
            Diagnostic::DiscardedQuestion { line, stem } => {
                writeln!(out, "line {line}: skipped incomplete question \"{stem}\"")?;
            }
            Diagnostic::OrphanAnswer { line, answer } => {
                writeln!(out, "line {line}: answer \"{answer}\" has no question")?;
            }
            Diagnostic::IgnoredLine { .. } => {}
        }
    }

    let quiz = parsed.into_quiz();
    let verb = match library.upsert(quiz.clone()) {
        Upsert::Added => "Added",
        Upsert::Updated => "Updated",
    };
    writeln!(out, "{verb} {} [{}]", quiz, quiz.id)?;
    Ok(())
}

fn list<W: Write>(library: &QuizLibrary<FileBackend>, out: &mut W) -> Result<()> {
    if library.is_empty() {
        writeln!(out, "No quizzes yet. Use `import` to add one.")?;
        return Ok(());
    }

    for quiz in library.quizzes() {
        writeln!(
            out,
            "{}  {}  {}",
            quiz.id,
            quiz.created_at.format("%Y-%m-%d"),
            quiz
        )?;
        writeln!(out, "    {}", quiz.summary())?;
    }
    Ok(())
}

/// Starts a fresh attempt at `quiz` in `slot` and answers it from `input`.
fn take<R: BufRead, W: Write, G: Rng + ?Sized>(
    input: &mut R,
    out: &mut W,
    rng: &mut G,
    slot: &mut SessionSlot,
    quiz: &Quiz,
) -> Result<QuizResult> {
    let session = slot.restart(rng, quiz)?;
    run_attempt(input, out, session)
}

/// Asks every question of `session` over `input`. An empty line skips a question.
fn run_attempt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    session: &mut QuizSession,
) -> Result<QuizResult> {
    writeln!(out, "{}", session.quiz_title())?;

    let questions = session.questions().to_vec();
    for (index, question) in questions.iter().enumerate() {
        writeln!(out, "\n{}. {}", index + 1, question.text)?;
        for (number, option) in question.options.iter().enumerate() {
            writeln!(out, "  {}) {}", number + 1, option)?;
        }

        if let Some(choice) = prompt_choice(input, out, question.options.len())? {
            session.select(&question.id, &question.options[choice])?;
        }
    }

    let result = session.submit()?;
    writeln!(out, "\n{}", result.grade())?;
    writeln!(
        out,
        "You scored {} out of {} ({}%)",
        result.score,
        result.total_questions,
        result.percentage()
    )?;

    for review in session.review() {
        let verdict = match review.outcome {
            Outcome::Correct => continue,
            Outcome::Incorrect => "incorrect",
            Outcome::Unanswered => "not answered",
        };
        writeln!(
            out,
            "  {} ({verdict}), correct answer: {}",
            review.text, review.correct_answer
        )?;
    }

    Ok(result)
}

fn prompt_choice<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    count: usize,
) -> Result<Option<usize>> {
    loop {
        write!(out, "Answer [1-{count}, empty to skip]: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        match line.parse::<usize>() {
            Ok(choice) if (1..=count).contains(&choice) => return Ok(Some(choice - 1)),
            _ => writeln!(out, "Please enter a number between 1 and {count}.")?,
        }
    }
}

fn print_stats<W: Write>(stats: &SessionStats, out: &mut W) -> Result<()> {
    writeln!(out, "\nQuizzes taken: {}", stats.total_taken)?;
    writeln!(out, "Accuracy: {}%", stats.overall_accuracy)?;
    writeln!(out, "Perfect scores: {}", stats.perfect_scores)?;
    for entry in &stats.history {
        writeln!(out, "  {:<18} {:>3}%", entry.name, entry.percentage)?;
    }
    Ok(())
}

pub mod config;
pub mod generator;
pub mod label;
pub mod library;
pub mod logging;
pub mod parser;
pub mod quiz;
pub mod session;
pub mod stats;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::{API_KEY_ENV, Config, ConfigError, GeneratorConfig};
pub use generator::{
    GeneratedQuestion, GeneratedQuiz, GenerationError, GenerationRequest, GenerationTransport,
    QuizGenerator, extract_response_text, parse_generated_quiz,
};
pub use label::{same_choice, strip_label};
pub use library::{
    DEFAULT_STORAGE_KEY, FileBackend, MemoryBackend, PersistenceError, QuizLibrary, QuizStore,
    StorageBackend, Upsert,
};
pub use parser::{Diagnostic, ParseError, ParsedQuiz, parse_quiz, render_quiz_text};
pub use quiz::{Grade, Question, QuestionError, Quiz, QuizResult};
pub use session::{
    Outcome, QuestionReview, QuizSession, Selection, SessionError, SessionPhase, SessionQuestion,
    SessionSlot,
};
pub use stats::{HistoryEntry, SessionStats};

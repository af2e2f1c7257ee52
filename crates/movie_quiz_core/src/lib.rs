pub mod domain;
pub mod error;
pub mod parser;
pub mod ports;
pub mod quiz;
pub mod quota;
pub mod retry;
pub mod session_store;
pub mod stats;

pub use domain::{
    Answer, FinishedQuiz, Movie, MovieFilters, MovieSummary, PromptStyle, Question, QuizConfig,
    QuizSession, QuotaSnapshot, QuotaState, StartedQuiz, StatsReport, StatsState,
};
pub use error::{QuizError, QuizResult, Recoverable};
pub use parser::{parse_answer, parse_question};
pub use ports::{
    ChatBackend, ChatHandle, MovieCatalog, PortError, PortResult, PromptRenderer,
    StatsRepository,
};
pub use quiz::{QuizPorts, QuizService, QuizSettings};
pub use quota::QuotaTracker;
pub use retry::RetryPolicy;
pub use session_store::SessionStore;
pub use stats::StatsAggregator;

// DSS Matcher - Core Library
// Identity matching & ranking against a population register, plus the match ledger

pub mod config;
pub mod error;
pub mod validation;
pub mod identity;
pub mod query;
pub mod comparator;     // Field Comparator
pub mod scorer;         // Composite Scorer
pub mod ranker;         // Ranker
pub mod register;       // Register store
pub mod engine;         // Scatter-score / gather-rank
pub mod ledger;         // Match Ledger
pub mod service;

// Re-export commonly used types
pub use config::{MatcherConfig, Settings};
pub use error::{MatchError, Result};
pub use validation::{ValidationError, ValidationResult};
pub use identity::{Field, FieldKind, FieldValue, RegisterIdentity};
pub use query::MatchQuery;
pub use comparator::{
    FieldComparator, NameComparator, CategoricalComparator, DatePartComparator, PlaceComparator,
    comparator_for,
};
pub use scorer::{CompositeScorer, FieldScores};
pub use ranker::{rank_by, Ranked};
pub use register::{
    RegisterSource, InMemoryRegister, SqliteRegister,
    load_register_csv, import_register, setup_register,
};
pub use engine::{CandidateResult, MatchEngine};
pub use ledger::{
    CaseKey, ClinicIdentifiers, MatchLedger, MatchRecord, MatchStatus, ReviewEvent, StoredMatch,
    setup_ledger,
};
pub use service::{MatchService, snapshot_record};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

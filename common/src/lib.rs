//! Medprice Common Library
//!
//! CLIとテストで共有される型と照合ロジック（I/Oなし）

pub mod types;
pub mod error;
pub mod scorer;
pub mod tier;
pub mod parser;
pub mod export;

pub use types::{Candidate, ConfidenceTier, MatchResult, MedicineQuery, ResultRow, TierSummary};
pub use error::{Error, Result};
pub use scorer::{score, select_best};
pub use tier::Thresholds;
pub use parser::{parse_candidates, CandidateParseError, ParsedCandidates};

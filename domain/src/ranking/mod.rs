//! Selection and ranking of terminal candidates.

pub mod features;
pub mod model;
pub mod ranker;
pub mod scored;

pub use features::{Feature, FeatureVector};
pub use model::{RankingModel, default_weights};
pub use ranker::{DEFAULT_RELIABILITY, RankingContext, rank};
pub use scored::ScoredCandidate;

//! Outcome feedback and ranking model retraining.

pub mod outcome;
pub mod trainer;

pub use outcome::{OutcomeSignal, Signal, TrainingSample};
pub use trainer::{LearningParams, retrain};

use super::jsonl::{append_lines, read_lines, write_atomic};
use alchemy_application::{FeedbackRepository, RepositoryError};
use alchemy_domain::{OutcomeSignal, RankingModel};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const OUTCOMES_FILE: &str = "outcomes.jsonl";
const MODEL_FILE: &str = "ranking_model.json";

/// Outcome log plus the last published ranking model.
///
/// Outcomes are append-only. The model file is replaced atomically, so a
/// reader sees either the previous snapshot or the new one.
pub struct JsonlFeedbackRepository {
    dir: PathBuf,
}

impl JsonlFeedbackRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn outcomes_path(&self) -> PathBuf {
        self.dir.join(OUTCOMES_FILE)
    }

    fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }
}

#[async_trait]
impl FeedbackRepository for JsonlFeedbackRepository {
    async fn append_signals(&self, signals: &[OutcomeSignal]) -> Result<(), RepositoryError> {
        let written = append_lines(&self.outcomes_path(), signals).await?;
        debug!("Appended {} outcome signal(s)", written);
        Ok(())
    }

    async fn load_signals(&self) -> Result<Vec<OutcomeSignal>, RepositoryError> {
        read_lines(&self.outcomes_path()).await
    }

    async fn save_model(&self, model: &RankingModel) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(model)?;
        write_atomic(&self.model_path(), &json).await?;
        debug!("Saved ranking model v{}", model.version());
        Ok(())
    }

    async fn load_model(&self) -> Result<Option<RankingModel>, RepositoryError> {
        let bytes = match tokio::fs::read(self.model_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alchemy_domain::{CandidateId, Feature, Signal};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_signals_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlFeedbackRepository::new(dir.path());

        let first = OutcomeSignal::new(CandidateId::new(), Signal::Accepted);
        let second = OutcomeSignal::new(CandidateId::new(), Signal::Rejected);
        repo.append_signals(std::slice::from_ref(&first)).await.unwrap();
        repo.append_signals(std::slice::from_ref(&second)).await.unwrap();

        assert_eq!(repo.load_signals().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_missing_model_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlFeedbackRepository::new(dir.path());
        assert!(repo.load_model().await.unwrap().is_none());
        assert!(repo.load_signals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_round_trip_keeps_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlFeedbackRepository::new(dir.path().join("data"));

        let weights = BTreeMap::from([(Feature::LengthAppropriateness, 0.4), (Feature::ProviderReliability, 0.6)]);
        let model = RankingModel::from_weights(7, weights, 42).unwrap();
        repo.save_model(&model).await.unwrap();

        let loaded = repo.load_model().await.unwrap().unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.version(), 7);
        assert_eq!(loaded.training_sample_count(), 42);
    }

    #[tokio::test]
    async fn test_invalid_model_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MODEL_FILE),
            r#"{"version": 1, "weights": {"length_appropriateness": -1.0}}"#,
        )
        .unwrap();

        let repo = JsonlFeedbackRepository::new(dir.path());
        assert!(matches!(
            repo.load_model().await,
            Err(RepositoryError::Serialization(_))
        ));
    }
}

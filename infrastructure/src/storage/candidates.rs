use super::jsonl::{append_lines, read_lines};
use alchemy_application::{CandidateRepository, RepositoryError, SelectionRecord};
use alchemy_domain::Candidate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CANDIDATES_FILE: &str = "candidates.jsonl";
const SELECTIONS_FILE: &str = "selections.jsonl";

/// A candidate line, tagged with the run that produced it
#[derive(Debug, Serialize, Deserialize)]
struct CandidateRecord {
    session_id: String,
    #[serde(flatten)]
    candidate: Candidate,
}

/// Candidate store backed by two JSONL files under one directory
pub struct JsonlCandidateRepository {
    dir: PathBuf,
}

impl JsonlCandidateRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn candidates_path(&self) -> PathBuf {
        self.dir.join(CANDIDATES_FILE)
    }

    fn selections_path(&self) -> PathBuf {
        self.dir.join(SELECTIONS_FILE)
    }

    /// Every candidate persisted for `session_id`, in write order.
    pub async fn load_candidates(&self, session_id: &str) -> Result<Vec<Candidate>, RepositoryError> {
        let records: Vec<CandidateRecord> = read_lines(&self.candidates_path()).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| r.candidate)
            .collect())
    }
}

#[async_trait]
impl CandidateRepository for JsonlCandidateRepository {
    async fn save_candidates(
        &self,
        session_id: &str,
        candidates: &[Candidate],
    ) -> Result<(), RepositoryError> {
        let records = candidates.iter().map(|candidate| CandidateRecord {
            session_id: session_id.to_string(),
            candidate: candidate.clone(),
        });
        append_lines(&self.candidates_path(), records).await?;
        Ok(())
    }

    async fn save_selection(&self, selection: &SelectionRecord) -> Result<(), RepositoryError> {
        append_lines(&self.selections_path(), [selection]).await?;
        Ok(())
    }

    async fn load_selections(&self) -> Result<Vec<SelectionRecord>, RepositoryError> {
        read_lines(&self.selections_path()).await
    }
}

//! Shared helpers for append-only JSONL files.

use alchemy_application::RepositoryError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Append one JSON line per record, creating the file if needed.
pub(super) async fn append_lines<T: Serialize>(
    path: &Path,
    records: impl IntoIterator<Item = T>,
) -> Result<usize, RepositoryError> {
    let mut buffer = String::new();
    let mut count = 0;
    for record in records {
        buffer.push_str(&serde_json::to_string(&record)?);
        buffer.push('\n');
        count += 1;
    }
    if count == 0 {
        return Ok(0);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(buffer.as_bytes()).await?;
    file.flush().await?;
    Ok(count)
}

/// Read every record in a JSONL file. A missing file reads as empty.
///
/// Blank lines are skipped. A line that fails to parse is reported with its
/// 1-based line number.
pub(super) async fn read_lines<T: DeserializeOwned>(
    path: &Path,
) -> Result<Vec<T>, RepositoryError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| RepositoryError::Corrupt {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Replace `path` with `contents` via a sibling temp file and rename.
pub(super) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), RepositoryError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        n: u32,
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = read_lines(&dir.path().join("none.jsonl")).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.jsonl");

        assert_eq!(append_lines(&path, [Row { n: 1 }, Row { n: 2 }]).await.unwrap(), 2);
        assert_eq!(append_lines(&path, Vec::<Row>::new()).await.unwrap(), 0);
        append_lines(&path, [Row { n: 3 }]).await.unwrap();

        let rows: Vec<Row> = read_lines(&path).await.unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }, Row { n: 3 }]);
    }

    #[tokio::test]
    async fn test_corrupt_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        std::fs::write(&path, "{\"n\":1}\n\n{not json\n").unwrap();

        let err = read_lines::<Row>(&path).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt { line: 3, .. }));
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("model.json.tmp").exists());
    }
}

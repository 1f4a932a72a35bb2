use crate::error::{Result, ScoreError};
use crate::types::answer::{Answer, AnswerSheet};
use crate::types::instrument::Instrument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_STORE_DIR: &str = ".psyscore";

/// An in-progress answer sheet, resumable across invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProgress {
    pub answers: Vec<Answer>,
    pub current_index: usize,
    pub saved_at: DateTime<Utc>,
}

impl SavedProgress {
    pub fn sheet(&self) -> AnswerSheet {
        AnswerSheet::from(self.answers.as_slice())
    }

    /// Records `answer` (replacing any earlier answer to the same question)
    /// and moves `current_index` to the first unanswered question.
    pub fn record(&mut self, answer: Answer, instrument: &Instrument) {
        let mut sheet = self.sheet();
        sheet.record(answer);
        let bank = instrument.question_bank();
        self.current_index = bank
            .iter()
            .position(|question| sheet.get(question.number).is_none())
            .unwrap_or(bank.len());
        self.answers = sheet.answers();
        self.saved_at = Utc::now();
    }
}

impl Default for SavedProgress {
    fn default() -> Self {
        Self {
            answers: Vec::new(),
            current_index: 0,
            saved_at: Utc::now(),
        }
    }
}

/// Key-value persistence for in-progress sheets, keyed by instrument id.
pub trait ProgressStore {
    fn load(&self, key: &str) -> Result<Option<SavedProgress>>;
    fn save(&self, key: &str, progress: &SavedProgress) -> Result<()>;
    fn clear(&self, key: &str) -> Result<()>;
}

/// Stores each sheet as `<root>/progress/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join("progress"),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(ScoreError::InvalidAnswer(format!(
                "progress key must be a plain instrument id: {key}"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self, key: &str) -> Result<Option<SavedProgress>> {
        let path = self.path_for(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(ScoreError::Io(error)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, key: &str, progress: &SavedProgress) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(progress)?)?;
        debug!(path = %path.display(), answers = progress.answers.len(), "saved progress");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ScoreError::Io(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn instrument() -> Instrument {
        toml::from_str(
            r#"
[instrument]
id = "mini"
name = "mini"

[scale]
min = 1
max = 5

[[groups]]
id = "A"
name = "A"
items = [1, 2, 3]
"#,
        )
        .expect("instrument should parse")
    }

    #[test]
    fn load_returns_none_before_anything_is_saved() {
        let root = TempDir::new().expect("temp dir should be created");
        let store = FileProgressStore::new(root.path());
        assert!(store.load("mini").expect("load should not fail").is_none());
    }

    #[test]
    fn save_load_and_clear() {
        let root = TempDir::new().expect("temp dir should be created");
        let store = FileProgressStore::new(root.path());
        let instrument = instrument();

        let mut progress = SavedProgress::default();
        progress.record(Answer::new(1, 4), &instrument);
        progress.record(Answer::new(1, 2), &instrument);
        store.save("mini", &progress).expect("save should succeed");

        let loaded = store
            .load("mini")
            .expect("load should succeed")
            .expect("progress should exist");
        assert_eq!(loaded.answers, vec![Answer::new(1, 2)]);
        assert_eq!(loaded.current_index, 1);

        store.clear("mini").expect("clear should succeed");
        assert!(store.load("mini").expect("load should succeed").is_none());
        store.clear("mini").expect("clearing twice should succeed");
    }

    #[test]
    fn current_index_points_at_first_gap() {
        let instrument = instrument();
        let mut progress = SavedProgress::default();
        progress.record(Answer::new(1, 3), &instrument);
        progress.record(Answer::new(3, 3), &instrument);
        assert_eq!(progress.current_index, 1);
        progress.record(Answer::new(2, 3), &instrument);
        assert_eq!(progress.current_index, 3);
    }

    #[test]
    fn keys_cannot_escape_the_store() {
        let root = TempDir::new().expect("temp dir should be created");
        let store = FileProgressStore::new(root.path());
        assert!(store.load("../etc/passwd").is_err());
        assert!(store.save("", &SavedProgress::default()).is_err());
    }
}

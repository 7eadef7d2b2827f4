use crate::constants::SESSION_DIR_PREFIX;
use crate::error::{OcmonError, Result};
use crate::types::{Interaction, InteractionRecord, Session, SessionId};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::task;

/// Discovers session directories and turns their interaction files into
/// [`Session`] values.
///
/// Layout: `<messages_dir>/ses_*/<message>.json`, with optional session
/// titles under `<storage_dir>/session/<project>/<session_id>.json`.
#[derive(Debug, Clone)]
pub struct SessionLoader {
    messages_dir: PathBuf,
    storage_dir: Option<PathBuf>,
}

impl SessionLoader {
    pub fn new(messages_dir: impl Into<PathBuf>) -> Self {
        Self {
            messages_dir: messages_dir.into(),
            storage_dir: None,
        }
    }

    pub fn with_storage_dir(mut self, storage_dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(storage_dir.into());
        self
    }

    pub fn messages_dir(&self) -> &Path {
        &self.messages_dir
    }

    /// Session directories, newest first. A missing messages dir yields none.
    pub fn find_session_directories(&self) -> Result<Vec<PathBuf>> {
        if !self.messages_dir.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.messages_dir).map_err(|source| OcmonError::DirectoryAccess {
                path: self.messages_dir.clone(),
                source,
            })?;

        let dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(SESSION_DIR_PREFIX)
            })
            .map(|entry| entry.path())
            .collect();

        Ok(newest_first(dirs))
    }

    /// Load one session directory.
    ///
    /// Returns `None` when the directory is missing, has no JSON files, or
    /// none of its interactions used any tokens.
    pub fn load_session(&self, session_path: &Path) -> Option<Session> {
        if !session_path.is_dir() {
            return None;
        }

        let session_id = SessionId::from(session_path.file_name()?.to_string_lossy().into_owned());
        let files = find_json_files(session_path);
        if files.is_empty() {
            return None;
        }

        // Parse files in parallel; collect keeps file order
        let interactions: Vec<Interaction> = files
            .par_iter()
            .filter_map(|path| parse_interaction_file(path, &session_id))
            .filter(|interaction| !interaction.tokens().is_zero())
            .collect();

        if interactions.is_empty() {
            tracing::debug!(session = %session_id, "no interactions with token usage");
            return None;
        }

        let title = self
            .storage_dir
            .as_deref()
            .and_then(|storage| find_session_title(storage, &session_id));

        let mut session = Session::new(session_id, session_path).with_interactions(interactions);
        if let Some(title) = title {
            session = session.with_title(title);
        }
        Some(session)
    }

    /// The newest session that has any token usage
    pub fn most_recent_session(&self) -> Result<Option<Session>> {
        let dirs = self.find_session_directories()?;
        Ok(dirs.iter().find_map(|dir| self.load_session(dir)))
    }

    /// Load up to `limit` sessions, newest first
    pub fn load_all_sessions(&self, limit: Option<usize>) -> Result<Vec<Session>> {
        let mut dirs = self.find_session_directories()?;
        if let Some(limit) = limit {
            dirs.truncate(limit);
        }

        let sessions: Vec<Session> = dirs
            .par_iter()
            .filter_map(|dir| self.load_session(dir))
            .collect();

        tracing::info!(
            dir = %self.messages_dir.display(),
            sessions = sessions.len(),
            "loaded sessions"
        );
        Ok(sessions)
    }

    /// [`Self::load_all_sessions`] on a blocking worker thread
    pub async fn load_all_sessions_async(&self, limit: Option<usize>) -> Result<Vec<Session>> {
        let loader = self.clone();
        task::spawn_blocking(move || loader.load_all_sessions(limit)).await?
    }
}

/// JSON files directly inside `dir`, newest first
pub fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default();

    newest_first(files)
}

/// Parse one interaction file. Unreadable or invalid files yield `None`.
pub fn parse_interaction_file(path: &Path, session_id: &SessionId) -> Option<Interaction> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    };

    let record: InteractionRecord = match serde_json::from_str(&contents) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping invalid JSON");
            return None;
        }
    };

    let interaction = match Interaction::from_record(record, session_id.clone(), path) {
        Ok(interaction) => interaction,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping invalid interaction");
            return None;
        }
    };

    Some(match modified_time(path) {
        Some(mtime) => interaction.with_modified_at(DateTime::<Utc>::from(mtime)),
        None => interaction,
    })
}

/// Title of `session_id` from `<storage>/session/<project>/<id>.json`
pub fn find_session_title(storage_dir: &Path, session_id: &SessionId) -> Option<String> {
    let session_storage = storage_dir.join("session");
    let file_name = format!("{}.json", session_id);

    fs::read_dir(&session_storage)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter(|entry| entry.file_name() != "global")
        .map(|entry| entry.path().join(&file_name))
        .filter(|path| path.is_file())
        .find_map(|path| {
            let contents = fs::read_to_string(&path).ok()?;
            let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
            value.get("title")?.as_str().map(str::to_string)
        })
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn newest_first(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by_cached_key(|path| Reverse(modified_time(path)));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenUsage;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_json(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, json).unwrap();
        path
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch);
        File::open(path).unwrap().set_modified(time).unwrap();
    }

    fn message(model: &str, input: i64) -> String {
        let tokens =
            format!(r#"{{"input": {input}, "output": 10, "cache": {{"write": 0, "read": 5}}}}"#);
        let time = r#"{"created": 1000, "completed": 2000}"#;
        format!(r#"{{"modelID": "{model}", "tokens": {tokens}, "time": {time}}}"#)
    }

    fn fixture() -> TempDir {
        let root = tempfile::tempdir().unwrap();
        let messages = root.path().join("message");

        let older = messages.join("ses_older");
        fs::create_dir_all(&older).unwrap();
        write_json(&older, "msg_1.json", &message("sonnet", 100));

        let newer = messages.join("ses_newer");
        fs::create_dir_all(&newer).unwrap();
        let first = write_json(&newer, "msg_1.json", &message("sonnet", 200));
        let second = write_json(&newer, "msg_2.json", &message("opus", 300));
        write_json(&newer, "broken.json", "{ not json");
        write_json(&newer, "empty.json", r#"{"modelID": "sonnet", "tokens": {}}"#);
        write_json(&newer, "negative.json", r#"{"tokens": {"input": -1}}"#);
        fs::write(newer.join("notes.txt"), "ignored").unwrap();
        set_mtime(&first, 1_000);
        set_mtime(&second, 2_000);

        fs::create_dir_all(messages.join("not_a_session")).unwrap();
        fs::create_dir_all(messages.join("ses_empty")).unwrap();

        set_mtime(&older, 1_000);
        set_mtime(&newer, 3_000);
        set_mtime(&messages.join("ses_empty"), 500);

        let project = root.path().join("storage/session/proj");
        fs::create_dir_all(&project).unwrap();
        write_json(&project, "ses_newer.json", r#"{"title": "Refactor loader"}"#);
        let global = root.path().join("storage/session/global");
        fs::create_dir_all(&global).unwrap();
        write_json(&global, "ses_older.json", r#"{"title": "should be skipped"}"#);

        root
    }

    fn loader(root: &TempDir) -> SessionLoader {
        SessionLoader::new(root.path().join("message"))
            .with_storage_dir(root.path().join("storage"))
    }

    #[test]
    fn test_find_session_directories_sorted_newest_first() {
        let root = fixture();
        let dirs = loader(&root).find_session_directories().unwrap();
        let names: Vec<String> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ses_newer", "ses_older", "ses_empty"]);
    }

    #[test]
    fn test_missing_messages_dir_is_empty() {
        let loader = SessionLoader::new("/definitely/not/here");
        assert!(loader.find_session_directories().unwrap().is_empty());
        assert!(loader.most_recent_session().unwrap().is_none());
    }

    #[test]
    fn test_load_session_skips_bad_and_empty_files() {
        let root = fixture();
        let loader = loader(&root);
        let session = loader
            .load_session(&root.path().join("message/ses_newer"))
            .unwrap();

        assert_eq!(session.session_id().as_str(), "ses_newer");
        assert_eq!(session.interaction_count(), 2);
        assert_eq!(session.title(), Some("Refactor loader"));
        assert_eq!(session.total_tokens(), TokenUsage::new(500, 20, 0, 10));

        // Newest file first
        let files: Vec<&str> = session.interactions().map(|i| i.file_name()).collect();
        assert_eq!(files, vec!["msg_2.json", "msg_1.json"]);
        assert_eq!(
            session.most_recent_interaction().unwrap().file_name(),
            "msg_2.json"
        );
    }

    #[test]
    fn test_load_session_without_interactions() {
        let root = fixture();
        let loader = loader(&root);
        assert!(loader.load_session(&root.path().join("message/ses_empty")).is_none());
        assert!(loader.load_session(&root.path().join("message/missing")).is_none());
    }

    #[test]
    fn test_title_lookup_skips_global() {
        let root = fixture();
        let title = find_session_title(&root.path().join("storage"), &SessionId::from("ses_older"));
        assert!(title.is_none());
    }

    #[test]
    fn test_most_recent_and_all_sessions() {
        let root = fixture();
        let loader = loader(&root);

        let recent = loader.most_recent_session().unwrap().unwrap();
        assert_eq!(recent.session_id().as_str(), "ses_newer");

        let all = loader.load_all_sessions(None).unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.session_id().as_str()).collect();
        assert_eq!(ids, vec!["ses_newer", "ses_older"]);

        let limited = loader.load_all_sessions(Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_load_all_sessions_async() {
        let root = fixture();
        let sessions = loader(&root).load_all_sessions_async(None).await.unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_parse_interaction_file_sets_modified_time() {
        let root = tempfile::tempdir().unwrap();
        let path = write_json(root.path(), "m.json", &message("sonnet", 1));
        set_mtime(&path, 42);

        let interaction = parse_interaction_file(&path, &SessionId::from("ses_x")).unwrap();
        assert_eq!(interaction.modified_at().unwrap().timestamp(), 42);
        assert_eq!(interaction.duration_ms(), Some(1000));
    }
}

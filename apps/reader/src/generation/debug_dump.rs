//! Opt-in recording of every prompt sent and every reply parsed, for
//! inspecting generator behaviour after the fact.
//!
//! Files: `{slug}_{kind}_PROMPT_{ts}.txt` and `{slug}_{kind}_{ts}.json`.

use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct DebugDump {
    dir: Option<PathBuf>,
}

impl DebugDump {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn prompt(&self, kind: &str, slug: &str, prompt: &str) {
        self.write(format!("{slug}_{kind}_PROMPT_{}.txt", timestamp()), prompt.as_bytes());
    }

    pub fn reply<T: Serialize + ?Sized>(&self, kind: &str, slug: &str, reply: &T) {
        if self.dir.is_none() {
            return;
        }
        match serde_json::to_vec_pretty(reply) {
            Ok(json) => self.write(format!("{slug}_{kind}_{}.json", timestamp()), &json),
            Err(e) => warn!("debug dump: could not serialize {kind} reply: {e}"),
        }
    }

    /// Never fails the caller; problems are logged.
    fn write(&self, name: String, contents: &[u8]) {
        let Some(dir) = &self.dir else { return };
        let path = dir.join(name);
        let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, contents));
        match result {
            Ok(()) => debug!("debug dump: saved {}", path.display()),
            Err(e) => warn!("debug dump: failed to write {}: {e}", path.display()),
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_writes_prompt_and_reply() {
        let dir = tempfile::tempdir().unwrap();
        let dump = DebugDump::new(Some(dir.path().to_path_buf()));
        dump.prompt("story", "umi", "prompt text");
        dump.reply("story", "umi", &serde_json::json!({"title": "海"}));

        let names = names(dir.path());
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("umi_story_") && names[0].ends_with(".json"));
        assert!(names[1].starts_with("umi_story_PROMPT_") && names[1].ends_with(".txt"));
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let dump = DebugDump::disabled();
        assert!(!dump.is_enabled());
        dump.prompt("story", "umi", "x");
    }

    #[test]
    fn test_unwritable_dir_does_not_panic() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot be used as a directory.
        let dump = DebugDump::new(Some(file.path().join("sub")));
        dump.prompt("split", "umi", "x");
        dump.reply("split", "umi", &vec![1, 2, 3]);
    }
}

//! Zoom API payloads.
//!
//! Only the fields the downloader reads are typed; everything else the API
//! returns is kept in `extra` so cached snapshots stay faithful to the
//! original responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `recording_type` of files that are never downloaded.
pub const AUDIO_ONLY: &str = "audio_only";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single meeting's cloud recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub recording_files: Vec<RecordingFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub recording_type: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordingFile {
    pub fn is_audio_only(&self) -> bool {
        self.recording_type == AUDIO_ONLY
    }
}

/// Recordings of one user across the configured month range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecordings {
    pub user_id: String,
    pub recordings: Vec<Recording>,
}

/// User id → recordings, in the order users were listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingIndex {
    pub users: Vec<UserRecordings>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append recordings for `user_id`, creating the entry on first use.
    pub fn extend(&mut self, user_id: &str, recordings: Vec<Recording>) {
        match self.users.iter_mut().find(|entry| entry.user_id == user_id) {
            Some(entry) => entry.recordings.extend(recordings),
            None => self.users.push(UserRecordings {
                user_id: user_id.to_string(),
                recordings,
            }),
        }
    }

    pub fn get(&self, user_id: &str) -> Option<&[Recording]> {
        self.users
            .iter()
            .find(|entry| entry.user_id == user_id)
            .map(|entry| entry.recordings.as_slice())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn recording_count(&self) -> usize {
        self.users.iter().map(|entry| entry.recordings.len()).sum()
    }

    pub fn file_count(&self) -> usize {
        self.users
            .iter()
            .flat_map(|entry| entry.recordings.iter())
            .map(|recording| recording.recording_files.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_keeps_passthrough_fields() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "a@example.com",
            "first_name": "Ada",
            "type": 2
        }))
        .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.extra.get("first_name"), Some(&json!("Ada")));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["type"], json!(2));
    }

    #[test]
    fn test_recording_without_files() {
        let recording: Recording =
            serde_json::from_value(json!({"topic": "Standup", "uuid": "abc=="})).unwrap();
        assert!(recording.recording_files.is_empty());
        assert_eq!(recording.topic, "Standup");
    }

    #[test]
    fn test_index_extend_concatenates_in_order() {
        let recording = |topic: &str| Recording {
            topic: topic.to_string(),
            recording_files: Vec::new(),
            extra: Map::new(),
        };

        let mut index = RecordingIndex::new();
        index.extend("u1", vec![recording("jan")]);
        index.extend("u2", vec![]);
        index.extend("u1", vec![recording("feb"), recording("feb-2")]);

        let topics: Vec<_> = index
            .get("u1")
            .unwrap()
            .iter()
            .map(|r| r.topic.as_str())
            .collect();
        assert_eq!(topics, ["jan", "feb", "feb-2"]);
        assert_eq!(index.user_count(), 2);
        assert_eq!(index.recording_count(), 3);
        assert_eq!(index.users[1].user_id, "u2");
    }
}

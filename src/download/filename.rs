use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::calendar::format_date;

const EXTENSION: &str = "mp4";
/// Leaves room for the date prefix and extension under the 255-byte name limit.
const MAX_STEM_BYTES: usize = 200;

fn non_alphanumeric() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid sanitizer pattern"))
}

/// Collapse every run of non-alphanumeric characters into one underscore.
pub fn sanitize(name: &str) -> String {
    non_alphanumeric().replace_all(name, "_").into_owned()
}

/// `{dir}/{YYYY-MM-DD}_{sanitize(topic_fileid)}.mp4`
///
/// Long topics are cut so the stem fits in `MAX_STEM_BYTES`; the file id is
/// always kept whole so files of one recording never collide.
pub fn target_path(dir: &Path, run_date: NaiveDate, topic: &str, file_id: &str) -> PathBuf {
    let mut stem = sanitize(&format!("{topic}_{file_id}"));
    if stem.len() > MAX_STEM_BYTES {
        let budget = MAX_STEM_BYTES.saturating_sub(sanitize(file_id).len() + 1);
        let topic = sanitize(topic);
        stem = sanitize(&format!("{}_{file_id}", truncate_at_char(&topic, budget)));
    }
    dir.join(format!("{}_{}.{}", format_date(run_date), stem, EXTENSION))
}

fn truncate_at_char(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

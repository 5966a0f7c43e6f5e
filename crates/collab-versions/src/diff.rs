use std::collections::HashMap;

use dissimilar::Chunk;
use serde::Serialize;

/// Segment kind for a line-oriented diff (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentType {
    Added,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffSegment {
    pub segment_type: SegmentType,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Resolved by [`crate::VersionManager`] scanning change-log entries
    /// linked to the target version; `None` for UNCHANGED segments and for
    /// ADDED/REMOVED segments nothing in the log matched.
    pub attributed_user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DiffStats {
    pub added_lines: usize,
    pub removed_lines: usize,
    pub added_chars: usize,
    pub removed_chars: usize,
    pub net_change: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentDiff {
    pub segments: Vec<DiffSegment>,
    pub stats: DiffStats,
}

fn lines_of(content: &str) -> Vec<&str> {
    if content.is_empty() {
        Vec::new()
    } else {
        content.split_inclusive('\n').collect()
    }
}

/// Computes a line-oriented diff between two full document contents.
///
/// `dissimilar` diffs at character granularity, so whole lines are first
/// mapped down to single private-use-area codepoints (the classic
/// "diff lines by mapping to chars" trick) — this makes the underlying
/// Myers diff operate line-by-line instead of splitting mid-line. Caps out
/// past the private-use area's ~6,400 codepoints, far beyond any document
/// this system expects to hold resident in a session.
pub fn diff_lines<'a>(from: &'a str, to: &'a str) -> DocumentDiff {
    let from_lines = lines_of(from);
    let to_lines = lines_of(to);

    let mut dictionary: HashMap<&str, char> = HashMap::new();
    let mut table: Vec<&str> = Vec::new();
    let mut intern = |line: &str| -> char {
        if let Some(code) = dictionary.get(line) {
            return *code;
        }
        let idx = table.len();
        table.push(line);
        let code = char::from_u32(0xE000 + idx as u32).expect("fits in the private-use area");
        dictionary.insert(line, code);
        code
    };

    let from_tokens: String = from_lines.iter().map(|l| intern(l)).collect();
    let to_tokens: String = to_lines.iter().map(|l| intern(l)).collect();

    let chunks = dissimilar::diff(&from_tokens, &to_tokens);

    let mut segments = Vec::new();
    let mut stats = DiffStats::default();
    let mut from_line_no = 1usize;
    let mut to_line_no = 1usize;

    for chunk in chunks {
        let (segment_type, token_text) = match chunk {
            Chunk::Equal(t) => (SegmentType::Unchanged, t),
            Chunk::Delete(t) => (SegmentType::Removed, t),
            Chunk::Insert(t) => (SegmentType::Added, t),
        };
        if token_text.is_empty() {
            continue;
        }

        let line_texts: Vec<&str> = token_text
            .chars()
            .map(|c| table[(c as u32 - 0xE000) as usize])
            .collect();
        let content: String = line_texts.concat();
        let char_count = content.chars().count();
        let n_lines = line_texts.len();

        let (start_line, end_line) = match segment_type {
            SegmentType::Removed => {
                let start = from_line_no;
                from_line_no += n_lines;
                (start, from_line_no - 1)
            }
            SegmentType::Added => {
                let start = to_line_no;
                to_line_no += n_lines;
                (start, to_line_no - 1)
            }
            SegmentType::Unchanged => {
                let start = to_line_no;
                from_line_no += n_lines;
                to_line_no += n_lines;
                (start, to_line_no - 1)
            }
        };

        match segment_type {
            SegmentType::Added => {
                stats.added_lines += n_lines;
                stats.added_chars += char_count;
            }
            SegmentType::Removed => {
                stats.removed_lines += n_lines;
                stats.removed_chars += char_count;
            }
            SegmentType::Unchanged => {}
        }

        segments.push(DiffSegment {
            segment_type,
            content,
            start_line,
            end_line,
            attributed_user_id: None,
        });
    }

    stats.net_change = stats.added_chars as i64 - stats.removed_chars as i64;

    DocumentDiff { segments, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_is_all_unchanged() {
        let diff = diff_lines("a\nb\nc\n", "a\nb\nc\n");
        assert!(diff.segments.iter().all(|s| s.segment_type == SegmentType::Unchanged));
        assert_eq!(diff.stats.added_lines, 0);
        assert_eq!(diff.stats.removed_lines, 0);
    }

    #[test]
    fn appended_line_is_added() {
        let diff = diff_lines("a\nb\n", "a\nb\nc\n");
        let added: Vec<&DiffSegment> = diff
            .segments
            .iter()
            .filter(|s| s.segment_type == SegmentType::Added)
            .collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].content, "c\n");
        assert_eq!(diff.stats.added_lines, 1);
        assert_eq!(diff.stats.net_change, "c\n".chars().count() as i64);
    }

    #[test]
    fn removed_line_is_tracked_with_source_line_numbers() {
        let diff = diff_lines("a\nb\nc\n", "a\nc\n");
        let removed: Vec<&DiffSegment> = diff
            .segments
            .iter()
            .filter(|s| s.segment_type == SegmentType::Removed)
            .collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].content, "b\n");
        assert_eq!(removed[0].start_line, 2);
    }

    #[test]
    fn net_change_can_be_negative() {
        let diff = diff_lines("a\nb\nc\n", "a\n");
        assert!(diff.stats.net_change < 0);
    }
}

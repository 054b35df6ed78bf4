//! Track Reader: picks the newest playlist snapshot and pulls the last entry.
//!
//! The external playout appends to `Playlist_*` files and rotates them on its
//! own schedule. Filenames embed a zero-padded sequence, so the lexically
//! greatest name is the current file. Nothing here keeps a handle open
//! between calls.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// A track title with its ordinal prefix removed.
pub type TrackEntry = String;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("no playlist files in {}", dir.display())]
    NoPlaylistFiles { dir: PathBuf },

    #[error("listing {}: {source}", dir.display())]
    ListDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no entries yet", path.display())]
    EmptyPlaylist { path: PathBuf },
}

fn ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+\s").expect("static regex"))
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("static regex"))
}

/// Lexically greatest name carrying `prefix`, regardless of listing order.
pub fn latest_playlist_name<I, S>(names: I, prefix: &str) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter(|n| n.as_ref().starts_with(prefix))
        .map(|n| n.as_ref().to_string())
        .max()
}

/// Decode playlist bytes. Valid UTF-8 is kept as is; anything else is taken
/// as Latin-1, one byte per char, so no byte is ever lost.
pub fn decode_playlist(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Remove one leading `<digits><whitespace>` ordinal.
pub fn strip_ordinal(line: &str) -> &str {
    match ordinal_re().find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Last entry of a playlist body, ordinal stripped. `None` when the body
/// holds nothing but whitespace.
pub fn parse_latest_track(bytes: &[u8]) -> Option<TrackEntry> {
    let text = decode_playlist(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let last = line_break_re().split(trimmed).last()?;
    Some(strip_ordinal(last).to_string())
}

/// List `dir` and return the path of the current playlist file.
pub async fn find_latest_playlist(dir: &Path, prefix: &str) -> Result<PathBuf, TrackError> {
    let list_err = |source| TrackError::ListDir {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        // Non-UTF-8 names can't carry the ASCII prefix in a comparable way.
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    latest_playlist_name(names, prefix)
        .map(|name| dir.join(name))
        .ok_or_else(|| TrackError::NoPlaylistFiles {
            dir: dir.to_path_buf(),
        })
}

/// Read the newest track from the playlists directory.
pub async fn read_latest_track(dir: &Path, prefix: &str) -> Result<TrackEntry, TrackError> {
    let path = find_latest_playlist(dir, prefix).await?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| TrackError::FileRead {
            path: path.clone(),
            source,
        })?;
    debug!("[reader] {} ({} bytes)", path.display(), bytes.len());
    parse_latest_track(&bytes).ok_or(TrackError::EmptyPlaylist { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_name_ignores_listing_order() {
        let forward = ["Playlist_0001.txt", "Playlist_0002.txt", "Playlist_0010.txt"];
        let mut shuffled = forward;
        shuffled.swap(0, 2);
        shuffled.swap(1, 2);
        assert_eq!(
            latest_playlist_name(forward, "Playlist_").as_deref(),
            Some("Playlist_0010.txt")
        );
        assert_eq!(
            latest_playlist_name(shuffled, "Playlist_").as_deref(),
            Some("Playlist_0010.txt")
        );
    }

    #[test]
    fn test_latest_name_filters_prefix() {
        let names = ["Playlist_0001.txt", "zz_notes.txt", "backup_Playlist_9999.txt"];
        assert_eq!(
            latest_playlist_name(names, "Playlist_").as_deref(),
            Some("Playlist_0001.txt")
        );
        assert!(latest_playlist_name(["notes.txt"], "Playlist_").is_none());
        assert!(latest_playlist_name(Vec::<String>::new(), "Playlist_").is_none());
    }

    #[test]
    fn test_strip_ordinal_once() {
        assert_eq!(strip_ordinal("12 Song"), "Song");
        assert_eq!(strip_ordinal("3 14 Days"), "14 Days");
        assert_eq!(strip_ordinal("1\tTabbed"), "Tabbed");
        assert_eq!(strip_ordinal("No Number"), "No Number");
        assert_eq!(strip_ordinal("99Luftballons"), "99Luftballons");
        assert_eq!(strip_ordinal("7  Two Spaces"), " Two Spaces");
    }

    #[test]
    fn test_parse_picks_last_line() {
        let body = b"1 Intro\n2 xbn1\n3 Real Song Name";
        assert_eq!(parse_latest_track(body).as_deref(), Some("Real Song Name"));
    }

    #[test]
    fn test_parse_mixed_line_breaks_and_trailing_space() {
        let body = b"1 First\r\n\r\n2 Second\r3 Third\n\n\n  ";
        assert_eq!(parse_latest_track(body).as_deref(), Some("Third"));
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_latest_track(b"").is_none());
        assert!(parse_latest_track(b" \r\n\n").is_none());
    }

    #[test]
    fn test_latin1_body_is_decoded() {
        // "Caf\xe9" is Latin-1, not valid UTF-8.
        let body = b"1 Intro\n2 Caf\xe9 del Mar";
        assert_eq!(parse_latest_track(body).as_deref(), Some("Café del Mar"));
    }

    #[test]
    fn test_utf8_body_is_kept() {
        let body = "1 Intro\n2 Sigur Rós – Hoppípolla".as_bytes();
        assert_eq!(
            parse_latest_track(body).as_deref(),
            Some("Sigur Rós – Hoppípolla")
        );
    }
}

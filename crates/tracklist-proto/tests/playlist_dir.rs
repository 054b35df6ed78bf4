//! Track Reader against a real directory that gets rotated between reads.
//!
//! Run with: cargo test -p tracklist-proto --test playlist_dir

use std::path::Path;
use tracklist_proto::detector::ChangeDetector;
use tracklist_proto::playlist::{read_latest_track, TrackError};

const PREFIX: &str = "Playlist_";

fn write(dir: &Path, name: &str, body: &[u8]) {
    std::fs::write(dir.join(name), body).expect("write playlist");
}

#[tokio::test]
async fn reads_newest_file_only() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Playlist_20240101_0900.txt", b"1 Old Morning Song\n");
    write(dir.path(), "Playlist_20240101_1000.txt", b"1 Intro\n2 xbn1\n3 Real Song Name");
    write(dir.path(), "notes.txt", b"1 Not A Playlist");
    write(dir.path(), "Zzz_other.txt", b"1 Also Not");

    let track = read_latest_track(dir.path(), PREFIX).await.unwrap();
    assert_eq!(track, "Real Song Name");
}

#[tokio::test]
async fn no_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "readme.txt", b"hello");

    let err = read_latest_track(dir.path(), PREFIX).await.unwrap_err();
    assert!(matches!(err, TrackError::NoPlaylistFiles { .. }), "{err:?}");
}

#[tokio::test]
async fn missing_directory_is_a_list_error() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("gone");

    let err = read_latest_track(&gone, PREFIX).await.unwrap_err();
    assert!(matches!(err, TrackError::ListDir { .. }), "{err:?}");
}

#[tokio::test]
async fn freshly_rotated_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Playlist_0001.txt", b"1 Song\n");
    write(dir.path(), "Playlist_0002.txt", b"");

    let err = read_latest_track(dir.path(), PREFIX).await.unwrap_err();
    assert!(matches!(err, TrackError::EmptyPlaylist { .. }), "{err:?}");
}

#[tokio::test]
async fn appends_and_rotation_are_seen_on_next_read() {
    let dir = tempfile::tempdir().unwrap();
    let mut detector = ChangeDetector::new();

    write(dir.path(), "Playlist_0001.txt", b"1 First\n");
    let t = read_latest_track(dir.path(), PREFIX).await.unwrap();
    assert!(detector.detect_change(&t));

    // Same file, same last line.
    let t = read_latest_track(dir.path(), PREFIX).await.unwrap();
    assert!(!detector.detect_change(&t));

    // Appended in place.
    write(dir.path(), "Playlist_0001.txt", b"1 First\n2 Second\n");
    let t = read_latest_track(dir.path(), PREFIX).await.unwrap();
    assert!(detector.detect_change(&t));
    assert_eq!(detector.last_seen(), Some("Second"));

    // Rotated to a new file that starts with a jingle.
    write(dir.path(), "Playlist_0002.txt", b"1 xbn3\n");
    let t = read_latest_track(dir.path(), PREFIX).await.unwrap();
    assert!(!detector.detect_change(&t));
    assert_eq!(detector.last_seen(), Some("Second"));

    write(dir.path(), "Playlist_0002.txt", b"1 xbn3\n2 Third\n");
    let t = read_latest_track(dir.path(), PREFIX).await.unwrap();
    assert!(detector.detect_change(&t));
    assert_eq!(detector.last_seen(), Some("Third"));
}

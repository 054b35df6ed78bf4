use std::path::PathBuf;

/// Name used when the executable path cannot be resolved.
pub const DEFAULT_PROCESS_NAME: &str = "tracklist";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/tracklist/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("tracklist")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tracklist")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("tracklist")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tracklist")
    }
}

/// Invocation name of the running program, as the OS process table reports it.
///
/// Linux truncates process names to 15 bytes (`comm`), so the stem is cut the
/// same way to keep the comparison exact.
pub fn process_name() -> String {
    let stem = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PROCESS_NAME.to_string());
    truncate_comm(&stem)
}

fn truncate_comm(name: &str) -> String {
    #[cfg(target_os = "linux")]
    {
        let mut end = name.len().min(15);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name[..end].to_string()
    }
    #[cfg(not(target_os = "linux"))]
    {
        name.to_string()
    }
}

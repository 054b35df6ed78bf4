use regex::Regex;
use std::sync::OnceLock;

/// Filler slots (jingles, station IDs) are logged by the playout as
/// `xbn<digit>...` and must never be announced.
fn filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^xbn[0-9]").expect("static regex"))
}

pub fn is_filler(candidate: &str) -> bool {
    filler_re().is_match(candidate)
}

/// Holds the last announced track for the life of the process.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_seen: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// `true` when `candidate` is a new, non-filler track; it then becomes
    /// the last seen track. Filler is checked first so it never overwrites
    /// the previous real track.
    pub fn detect_change(&mut self, candidate: &str) -> bool {
        if is_filler(candidate) {
            return false;
        }
        if self.last_seen.as_deref() == Some(candidate) {
            return false;
        }
        self.last_seen = Some(candidate.to_string());
        true
    }
}

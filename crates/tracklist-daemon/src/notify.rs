/// Fan-out of a detected track change.
///
/// Each enabled HTTP channel gets one GET with the percent-encoded payload
/// appended to its base URL, and the now-playing file is rewritten. Every
/// piece runs as its own task: a dead endpoint never holds up the others,
/// and the poll loop never waits on any of them.
///
/// ```text
///   notify(track)
///         ├── read prefix file (awaited, local)
///         ├── chat      GET <chat_url><enc(prefix + " " + track)>   ┐
///         ├── graphics  GET <graphics_url><enc(track)>              ├ spawned
///         ├── tweet     GET <tweet_url><enc(prefix + " " + track)>  │
///         └── sink      queued to the single SinkWriter task         ┘
/// ```
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::io::Write;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracklist_proto::config::{Config, NotifyConfig, TargetConfig};

/// Upper bound for a single outbound call, connect included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Outbound requests allowed in flight across all ticks.
pub const MAX_IN_FLIGHT: usize = 16;

/// Same unreserved set as ECMAScript `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Chat,
    Graphics,
    Tweet,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Graphics => "graphics",
            Self::Tweet => "tweet",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("reading tweet prefix {}: {source}", path.display())]
    PrefixRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} request to {url} failed: {source}", channel.label())]
    Dispatch {
        channel: Channel,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{} request to {url} returned {status}", channel.label())]
    Status {
        channel: Channel,
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("writing {}: {source}", path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} request dropped: too many requests in flight", channel.label())]
    Saturated { channel: Channel },
}

/// Chat and tweet message: `prefix + " " + track`, or the bare track when
/// no prefix is available.
pub fn compose_message(prefix: Option<&str>, track: &str) -> String {
    match prefix {
        Some(p) => format!("{} {}", p, track),
        None => track.to_string(),
    }
}

/// Full request URLs for every enabled channel with a usable base URL.
pub fn plan_requests(
    targets: &NotifyConfig,
    prefix: Option<&str>,
    track: &str,
) -> Vec<(Channel, String)> {
    let escaped_song = encode_component(track);
    let escaped_msg = encode_component(&compose_message(prefix, track));

    let channels: [(Channel, &TargetConfig, &str); 3] = [
        (Channel::Chat, &targets.chat, &escaped_msg),
        (Channel::Graphics, &targets.graphics, &escaped_song),
        (Channel::Tweet, &targets.tweet, &escaped_msg),
    ];

    channels
        .into_iter()
        .filter(|(_, target, _)| target.enabled)
        .filter_map(|(channel, target, payload)| {
            if target.url.trim().is_empty() {
                warn!("[notify] {} is enabled but has no URL, skipping", channel.label());
                return None;
            }
            Some((channel, format!("{}{}", target.url, payload)))
        })
        .collect()
}

pub async fn read_prefix(path: &Path) -> Result<String, NotifyError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| NotifyError::PrefixRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(raw.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Replace `path` with `track` in one step so the encoder never sees a
/// half-written file. Each call stages into its own temp file beside the
/// target, so overlapping calls can't clobber each other's staging.
pub async fn write_now_playing(path: &Path, track: &str) -> Result<(), NotifyError> {
    let target = path.to_path_buf();
    let track = track.to_string();
    tokio::task::spawn_blocking(move || persist_now_playing(&target, &track))
        .await
        .map_err(|e| NotifyError::SinkWrite {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?
}

fn persist_now_playing(path: &Path, track: &str) -> Result<(), NotifyError> {
    let sink_err = |source| NotifyError::SinkWrite {
        path: path.to_path_buf(),
        source,
    };

    if path.file_name().is_none() {
        return Err(sink_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "sink path has no file name",
        )));
    }
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(dir).map_err(sink_err)?;
    staged.write_all(track.as_bytes()).map_err(sink_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(sink_err)?;
    }

    staged.persist(path).map_err(|e| sink_err(e.error))?;
    Ok(())
}

/// Single writer for the now-playing file.
///
/// Writes happen one at a time in the order tracks were announced. If the
/// disk is slower than the announcements, intermediate tracks are skipped
/// and only the newest one lands.
pub struct SinkWriter {
    tx: watch::Sender<Option<String>>,
}

impl SinkWriter {
    /// Must be called from within a tokio runtime.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = watch::channel(None::<String>);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(track) = rx.borrow_and_update().clone() else {
                    continue;
                };
                if let Err(e) = write_now_playing(&path, &track).await {
                    warn!("[notify] {}", e);
                }
            }
        });
        Self { tx }
    }

    pub fn write(&self, track: &str) {
        self.tx.send_replace(Some(track.to_string()));
    }
}

async fn send(client: &Client, channel: Channel, url: &str) -> Result<(), NotifyError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|source| NotifyError::Dispatch {
            channel,
            url: url.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(NotifyError::Status {
            channel,
            url: url.to_string(),
            status,
        });
    }
    Ok(())
}

pub struct Notifier {
    client: Client,
    targets: NotifyConfig,
    prefix_file: PathBuf,
    sink_file: PathBuf,
    sink: SinkWriter,
    permits: Arc<Semaphore>,
}

impl Notifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_limit(config, MAX_IN_FLIGHT)
    }

    /// Must be called from within a tokio runtime (spawns the sink writer).
    pub fn with_limit(config: &Config, max_in_flight: usize) -> anyhow::Result<Self> {
        let client = Client::builder()
            // Endpoints are local scripts; never route them through an env proxy
            .no_proxy()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            targets: config.notify.clone(),
            prefix_file: config.output.tweet_prefix_file.clone(),
            sink_file: config.output.now_playing_file.clone(),
            sink: SinkWriter::spawn(config.output.now_playing_file.clone()),
            permits: Arc::new(Semaphore::new(max_in_flight)),
        })
    }

    /// Start every notification for `track`. Only the prefix file read is
    /// awaited; the returned request handles may be dropped.
    pub async fn notify(&self, track: &str) -> Vec<JoinHandle<()>> {
        let wants_prefix = self.targets.chat.enabled || self.targets.tweet.enabled;
        let prefix = if wants_prefix {
            match read_prefix(&self.prefix_file).await {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("[notify] {}; sending track without prefix", e);
                    None
                }
            }
        } else {
            None
        };

        let mut handles = Vec::new();
        for (channel, url) in plan_requests(&self.targets, prefix.as_deref(), track) {
            info!("Pinging {} script...", channel.label());
            if let Some(h) = self.dispatch(channel, url) {
                handles.push(h);
            }
        }

        info!("Writing to {}", self.sink_file.display());
        self.sink.write(track);

        handles
    }

    fn dispatch(&self, channel: Channel, url: String) -> Option<JoinHandle<()>> {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                warn!("[notify] {}", NotifyError::Saturated { channel });
                return None;
            }
        };

        let client = self.client.clone();
        Some(tokio::spawn(async move {
            let _permit = permit;
            match send(&client, channel, &url).await {
                Ok(()) => debug!("[notify] {} ok: {}", channel.label(), url),
                Err(e) => warn!("[notify] {}", e),
            }
        }))
    }
}

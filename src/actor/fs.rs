//! FileSystem Actor
//!
//! Watches the app source for changes and sends one debounced FileChange
//! trigger per settled burst of events to the render loop.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → RenderMsg::FileChange
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use tokio::sync::mpsc;

use super::messages::RenderMsg;

const DEBOUNCE_MS: u64 = 300;

/// FileSystem Actor - watches the app source for changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    /// Channel to send triggers to the render loop
    render_tx: mpsc::Sender<RenderMsg>,
    /// Debouncer state
    debouncer: Debouncer,
}

impl FsActor {
    /// Watch the app source path. The watcher starts immediately, so
    /// changes during startup are buffered rather than lost.
    pub fn new(app_path: &Path, render_tx: mpsc::Sender<RenderMsg>) -> notify::Result<Self> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // Watch the parent directory: editors replace files by rename,
        // which drops a watch attached to the file itself.
        let app_path = app_path.canonicalize().unwrap_or_else(|_| app_path.to_path_buf());
        let target = if app_path.is_dir() {
            app_path.clone()
        } else {
            app_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        };
        watcher.watch(&target, RecursiveMode::Recursive)?;

        Ok(Self {
            notify_rx,
            watcher,
            render_tx,
            debouncer: Debouncer::new(app_path),
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        // Extract fields before consuming self
        let notify_rx = self.notify_rx;
        let render_tx = self.render_tx;
        let mut debouncer = self.debouncer;
        let _watcher = self.watcher;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if debouncer.take_if_ready() {
                        crate::debug!("watch"; "change settled, triggering render");
                        if render_tx.send(RenderMsg::FileChange).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Pure debouncer: collapses a burst of notify events into one trigger
/// after a quiet period. No business logic, no global state access.
struct Debouncer {
    /// The watched app source (watching covers its whole parent dir)
    app_path: PathBuf,
    pending: bool,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(app_path: PathBuf) -> Self {
        Self {
            app_path,
            pending: false,
            last_event: None,
        }
    }

    fn add_event(&mut self, event: &notify::Event) {
        // mtime/atime/chmod noise must not trigger re-render loops
        match event.kind {
            EventKind::Access(_) => return,
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_) => {}
            _ => return,
        }

        if !event.paths.iter().any(|path| self.is_relevant(path)) {
            return;
        }

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
        self.pending = true;
        self.last_event = Some(Instant::now());
    }

    /// Only the watched source counts; sibling files and editor temp
    /// artifacts in the same directory are ignored.
    fn is_relevant(&self, path: &Path) -> bool {
        if is_temp_file(path) {
            return false;
        }
        path == self.app_path || path.starts_with(&self.app_path)
    }

    /// Consume the pending trigger if the quiet period elapsed.
    fn take_if_ready(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.pending = false;
        self.last_event = None;
        true
    }

    fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        self.pending && last_event.elapsed() >= Duration::from_millis(DEBOUNCE_MS)
    }

    /// Precise sleep duration until next possible ready time.
    fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        Duration::from_millis(DEBOUNCE_MS)
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, MetadataKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_temp_files_ignored() {
        assert!(is_temp_file(Path::new("/app/.app.pixel.json.swp")));
        assert!(is_temp_file(Path::new("/app/app.pixel.json~")));
        assert!(is_temp_file(Path::new("/app/app.pixel.json.bak")));
        assert!(!is_temp_file(Path::new("/app/app.pixel.json")));
    }

    #[test]
    fn test_debouncer_only_tracks_watched_source() {
        let mut debouncer = Debouncer::new(PathBuf::from("/app/app.pixel.json"));

        debouncer.add_event(&event(
            EventKind::Create(CreateKind::File),
            "/app/notes.txt",
        ));
        assert!(!debouncer.pending);

        debouncer.add_event(&event(
            EventKind::Create(CreateKind::File),
            "/app/app.pixel.json",
        ));
        assert!(debouncer.pending);
    }

    #[test]
    fn test_debouncer_ignores_metadata_and_access() {
        let mut debouncer = Debouncer::new(PathBuf::from("/app/app.pixel.json"));

        debouncer.add_event(&event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
            "/app/app.pixel.json",
        ));
        debouncer.add_event(&event(
            EventKind::Access(notify::event::AccessKind::Any),
            "/app/app.pixel.json",
        ));
        assert!(!debouncer.pending);
    }

    #[test]
    fn test_debouncer_waits_for_quiet_period() {
        let mut debouncer = Debouncer::new(PathBuf::from("/app/app.pixel.json"));
        debouncer.add_event(&event(
            EventKind::Create(CreateKind::File),
            "/app/app.pixel.json",
        ));

        // Just fired, quiet period not elapsed
        assert!(!debouncer.take_if_ready());
        assert!(debouncer.sleep_duration() <= Duration::from_millis(DEBOUNCE_MS));

        // Simulate elapsed quiet period
        debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS + 10));
        assert!(debouncer.take_if_ready());

        // Consumed; no second trigger
        assert!(!debouncer.take_if_ready());
        assert_eq!(debouncer.sleep_duration(), Duration::from_secs(86400));
    }

    #[test]
    fn test_debouncer_covers_directory_sources() {
        let mut debouncer = Debouncer::new(PathBuf::from("/app/sprites"));
        debouncer.add_event(&event(
            EventKind::Create(CreateKind::File),
            "/app/sprites/frame1.json",
        ));
        assert!(debouncer.pending);
    }
}

//! File system watcher driving incremental builds.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   mpsc   ┌──────────────────────────────┐
//! │  notify watcher  │ ───────▶ │  run_loop (owns the Site)    │
//! │  (own thread)    │          │  raw_changes → Site::dispatch│
//! └──────────────────┘          └──────────────────────────────┘
//! ```
//!
//! The watcher thread only produces events. The loop is the single consumer
//! and the only code that touches the [`Site`], so events are applied one at
//! a time in arrival order. A failing event is logged by
//! [`Site::dispatch`] and the loop carries on.
//!
//! The loop wakes up every [`POLL_INTERVAL`] to check the stop flag. An event
//! being handled when the flag is set finishes first.

use crate::events::EventKind;
use crate::imaging::ImageBackend;
use crate::output::print_watch_root;
use crate::site::Site;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
}

fn tagged(paths: &[PathBuf], kind: EventKind) -> Vec<(PathBuf, EventKind)> {
    paths.iter().map(|p| (p.clone(), kind)).collect()
}

/// Created when the path exists now, deleted otherwise.
fn by_existence(paths: &[PathBuf]) -> Vec<(PathBuf, EventKind)> {
    paths
        .iter()
        .map(|p| {
            let kind = if p.exists() {
                EventKind::Created
            } else {
                EventKind::Deleted
            };
            (p.clone(), kind)
        })
        .collect()
}

/// Translate one notify event into per-path changes.
///
/// Metadata-only modifications (permissions, timestamps) and access events
/// produce nothing. A rename is a deletion of the old name and a creation of
/// the new one.
pub fn raw_changes(event: &Event) -> Vec<(PathBuf, EventKind)> {
    use notify::EventKind as Kind;

    match &event.kind {
        Kind::Create(_) => tagged(&event.paths, EventKind::Created),
        Kind::Remove(_) => tagged(&event.paths, EventKind::Deleted),
        Kind::Modify(ModifyKind::Metadata(_)) | Kind::Access(_) => Vec::new(),
        Kind::Modify(ModifyKind::Name(RenameMode::From)) => {
            tagged(&event.paths, EventKind::Deleted)
        }
        Kind::Modify(ModifyKind::Name(RenameMode::To)) => {
            tagged(&event.paths, EventKind::Created)
        }
        Kind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = if i == 0 {
                    EventKind::Deleted
                } else {
                    EventKind::Created
                };
                (p.clone(), kind)
            })
            .collect(),
        Kind::Modify(ModifyKind::Name(_)) | Kind::Any | Kind::Other => by_existence(&event.paths),
        Kind::Modify(_) => tagged(&event.paths, EventKind::Modified),
    }
}

/// Consume watcher events until `stop` is set or the sender goes away.
pub fn run_loop<B: ImageBackend>(
    site: &mut Site<B>,
    rx: &Receiver<notify::Result<Event>>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                for (path, kind) in raw_changes(&event) {
                    site.dispatch(&path, kind);
                }
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "watcher error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Watch the site's content root and apply changes until `stop` is set.
///
/// Blocks the calling thread.
pub fn watch<B: ImageBackend>(site: &mut Site<B>, stop: &AtomicBool) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(site.input(), RecursiveMode::Recursive)?;
    print_watch_root(site.input());

    run_loop(site, &rx, stop);
    tracing::info!("watcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::markup::AsciiDocRenderer;
    use crate::test_helpers::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn event(kind: notify::EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    // =========================================================================
    // raw_changes
    // =========================================================================

    #[test]
    fn create_remove_and_modify() {
        let created = event(notify::EventKind::Create(CreateKind::File), &["/c/a.adoc"]);
        assert_eq!(
            raw_changes(&created),
            vec![(PathBuf::from("/c/a.adoc"), EventKind::Created)]
        );

        let removed = event(notify::EventKind::Remove(RemoveKind::File), &["/c/a.adoc"]);
        assert_eq!(
            raw_changes(&removed),
            vec![(PathBuf::from("/c/a.adoc"), EventKind::Deleted)]
        );

        let modified = event(
            notify::EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/c/a.adoc"],
        );
        assert_eq!(
            raw_changes(&modified),
            vec![(PathBuf::from("/c/a.adoc"), EventKind::Modified)]
        );
    }

    #[test]
    fn metadata_changes_are_ignored() {
        let touched = event(
            notify::EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/c/a.adoc"],
        );
        assert!(raw_changes(&touched).is_empty());
    }

    #[test]
    fn rename_both_deletes_old_and_creates_new() {
        let renamed = event(
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/c/old.adoc", "/c/new.adoc"],
        );
        assert_eq!(
            raw_changes(&renamed),
            vec![
                (PathBuf::from("/c/old.adoc"), EventKind::Deleted),
                (PathBuf::from("/c/new.adoc"), EventKind::Created),
            ]
        );
    }

    #[test]
    fn ambiguous_rename_checks_existence() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("here.adoc");
        fs::write(&present, "").unwrap();
        let absent = tmp.path().join("gone.adoc");

        let renamed = Event::new(notify::EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(present.clone())
            .add_path(absent.clone());
        assert_eq!(
            raw_changes(&renamed),
            vec![(present, EventKind::Created), (absent, EventKind::Deleted)]
        );
    }

    // =========================================================================
    // run_loop
    // =========================================================================

    fn built_site(tmp: &TempDir) -> Site<MockBackend> {
        let input = tmp.path().join("content");
        write_site_config(&input);
        write_post(&input, "a.adoc", "Alpha", "2026-01-01", "one", "Body");
        let mut site = Site::with_parts(
            &input,
            &tmp.path().join("public"),
            Box::new(AsciiDocRenderer::new()),
            MockBackend::new(),
        )
        .unwrap();
        site.build_all(false).unwrap();
        site
    }

    #[test]
    fn loop_applies_events_until_sender_drops() {
        let tmp = TempDir::new().unwrap();
        let mut site = built_site(&tmp);
        let input = site.input().to_path_buf();

        write_post(&input, "b.adoc", "Beta", "2026-01-02", "two", "Body");
        fs::remove_file(input.join("a.adoc")).unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(Ok(event(
            notify::EventKind::Create(CreateKind::File),
            &[input.join("b.adoc").to_str().unwrap()],
        )))
        .unwrap();
        tx.send(Err(notify::Error::generic("backend hiccup"))).unwrap();
        tx.send(Ok(event(
            notify::EventKind::Remove(RemoveKind::File),
            &[input.join("a.adoc").to_str().unwrap()],
        )))
        .unwrap();
        drop(tx);

        run_loop(&mut site, &rx, &AtomicBool::new(false));

        let titles: Vec<&str> = site.posts().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Beta"]);
        assert!(site.output().join("b/index.html").exists());
        assert!(!site.output().join("a").exists());
    }

    #[test]
    fn loop_exits_when_stopped() {
        let tmp = TempDir::new().unwrap();
        let mut site = built_site(&tmp);
        let (_tx, rx) = mpsc::channel();

        // Returns immediately without waiting for events
        run_loop(&mut site, &rx, &AtomicBool::new(true));
        assert_eq!(site.posts().len(), 1);
    }
}

//! Resource directory watcher - rebuilds and republishes the rule engine

mod handler;

pub use handler::{EventHandler, is_resource_file};

use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::{self, ConfigIssue, validation};
use crate::rules::FallbackOutput;
use crate::snapshot::SharedEngine;

/// Watches the resources directory and swaps in a fresh engine on change
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Result<notify::Event, notify::Error>>,
    event_handler: EventHandler,
    shared: Arc<SharedEngine>,
    resources_dir: PathBuf,
    fallback: FallbackOutput,
    reloads: Arc<AtomicU64>,
}

impl ConfigWatcher {
    /// Create a watcher publishing into `shared`
    pub fn new(
        shared: Arc<SharedEngine>,
        resources_dir: impl Into<PathBuf>,
        fallback: FallbackOutput,
        polling_interval_secs: u64,
        debounce_seconds: u64,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Err(e) = tx.send(res) {
                    error!("Failed to send watch event: {}", e);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(polling_interval_secs)),
        )?;

        Ok(Self {
            watcher,
            rx,
            event_handler: EventHandler::new(Duration::from_secs(debounce_seconds)),
            shared,
            resources_dir: resources_dir.into(),
            fallback,
            reloads: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start watching the resources directory recursively
    pub fn start(&mut self) -> Result<()> {
        self.watcher
            .watch(&self.resources_dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", self.resources_dir.display()))?;
        info!("Watching resources: {}", self.resources_dir.display());
        Ok(())
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// Drain pending events (non-blocking)
    pub fn poll(&self) -> Vec<notify::Event> {
        let mut events = Vec::new();

        while let Ok(result) = self.rx.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(e) => error!("Watch error: {}", e),
            }
        }

        events
    }

    /// Feed already-polled events through the debouncer and reload once the
    /// touched files have settled. Returns the issues of the reload, if one
    /// happened.
    pub fn process_polled_events(
        &mut self,
        events: Vec<notify::Event>,
    ) -> Result<Option<Vec<ConfigIssue>>> {
        let now = Instant::now();
        for event in &events {
            let recorded = self.event_handler.record(event, now);
            if recorded == 0 {
                debug!("Ignoring event: {:?}", event.kind);
            }
        }

        let ready = self.event_handler.take_ready(now);
        if ready.is_empty() {
            return Ok(None);
        }

        for path in &ready {
            info!("Resource changed: {}", path.display());
        }
        self.reload().map(Some)
    }

    /// Poll and process in one step
    pub fn process_events(&mut self) -> Result<Option<Vec<ConfigIssue>>> {
        let events = self.poll();
        self.process_polled_events(events)
    }

    /// Rebuild the engine from disk and publish it.
    ///
    /// On failure the previously published engine stays in place.
    pub fn reload(&self) -> Result<Vec<ConfigIssue>> {
        let (engine, issues) = config::build_engine_from(&self.resources_dir, &self.fallback)
            .with_context(|| format!("Failed to reload {}", self.resources_dir.display()))?;
        validation::log_issues(&issues);

        self.shared.replace(engine);
        self.reloads.fetch_add(1, Ordering::Relaxed);
        Ok(issues)
    }

    /// Number of successful reloads
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn shared(&self) -> &Arc<SharedEngine> {
        &self.shared
    }
}

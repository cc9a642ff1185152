//! Background writer for scores and the trail save.
//!
//! Rooms report what should be recorded; the publisher queues it here
//! after the room lock is gone. One task drains the queue in order and
//! runs each write on the blocking pool, so an older save can never land
//! on top of a newer one. Failures are logged and dropped: the in-memory
//! game stays authoritative.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, warn};
use trailforge_room::{GameStore, Leaderboard, ScoreEntry, TrailSave};

enum Job {
    Scores(Vec<ScoreEntry>),
    Save(Box<TrailSave>),
    Clear,
}

/// Handle for queueing writes. The writer task runs until every handle
/// is dropped, so writes queued before shutdown still land.
#[derive(Clone)]
pub(crate) struct Recorder {
    jobs: mpsc::UnboundedSender<Job>,
}

impl Recorder {
    pub(crate) fn spawn(
        leaderboard: Arc<dyn Leaderboard>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(rx, leaderboard, store));
        Self { jobs }
    }

    pub(crate) fn scores(&self, entries: Vec<ScoreEntry>) {
        if !entries.is_empty() {
            self.queue(Job::Scores(entries));
        }
    }

    pub(crate) fn save(&self, save: TrailSave) {
        self.queue(Job::Save(Box::new(save)));
    }

    pub(crate) fn clear(&self) {
        self.queue(Job::Clear);
    }

    fn queue(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            warn!("recorder stopped; write dropped");
        }
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<Job>,
    leaderboard: Arc<dyn Leaderboard>,
    store: Arc<dyn GameStore>,
) {
    while let Some(job) = rx.recv().await {
        let leaderboard = leaderboard.clone();
        let store = store.clone();
        let result = tokio::task::spawn_blocking(move || match job {
            Job::Scores(entries) => leaderboard
                .record(&entries)
                .map_err(|e| ("leaderboard record failed", e)),
            Job::Save(save) => store.save(&save).map_err(|e| ("trail save failed", e)),
            Job::Clear => store.clear().map_err(|e| ("trail save clear failed", e)),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err((what, e))) => warn!(error = %e, "{what}"),
            Err(e) => error!(error = %e, "recorder write panicked"),
        }
    }
}

use std::{
    path::{Path, PathBuf},
    sync::{mpsc as std_mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use tokio::sync::{mpsc, oneshot};

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// The thread that owns the connection, and the queue feeding it.
struct Worker {
    jobs: Option<mpsc::UnboundedSender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(path: PathBuf) -> Result<Self> {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

        let thread = thread::Builder::new()
            .name("scanlog-db".into())
            .spawn(move || serve(&path, ready_tx, jobs_rx))
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before it was ready")??;

        Ok(Self {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        })
    }

    fn submit(&self, job: Job) -> Result<()> {
        self.jobs
            .as_ref()
            .ok_or_else(|| anyhow!("database worker is shutting down"))?
            .send(job)
            .map_err(|_| anyhow!("database worker has stopped"))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the queue lets the thread finish pending jobs and return.
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Database worker panicked");
            }
        }
    }
}

fn open(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL journal unavailable, using the default: {err}");
    }
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn serve(
    path: &Path,
    ready: std_mpsc::SyncSender<Result<()>>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    let mut conn = match open(path) {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Some(job) = jobs.blocking_recv() {
        job(&mut conn);
    }
    info!("Database worker for {} stopped", path.display());
}

/// Handle to the SQLite worker thread. All statements run on that one thread,
/// so writes from concurrent frame contexts are serialized.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let worker = Worker::spawn(db_path.clone())?;
        info!("Database initialized at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(worker),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs `task` on the worker thread. Jobs run in submission order, and a
    /// submitted job runs even if the caller stops waiting for it.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.worker.submit(Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                debug!("database caller went away before its result");
            }
        }))?;

        reply_rx
            .await
            .context("database worker dropped the request")?
    }
}

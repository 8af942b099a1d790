use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use rusqlite::{Connection, OpenFlags};
use tokio::sync::oneshot;

use crate::config::StoreCredentials;

mod helpers;
mod repositories;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Message {
    Run(Job),
    Close,
}

/// The connection thread. Dropping the last handle closes it.
struct Worker {
    jobs: mpsc::Sender<Message>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.jobs.send(Message::Close).is_err() {
            debug!("sqlite worker already gone");
        }
        if thread.join().is_err() {
            error!("sqlite worker panicked");
        }
    }
}

/// Handle to the sensor database. All queries run on one worker thread that
/// owns the connection; the handle is cheap to clone.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Opens an existing database read-only. The viewer never writes.
    pub fn open(path: PathBuf, credentials: Option<StoreCredentials>) -> Result<Self> {
        let target = path.clone();
        Self::start(path, move || {
            let conn = Connection::open_with_flags(
                &target,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("failed to open SQLite database {}", target.display()))?;

            if let Some(credentials) = credentials {
                // Passed through untouched; only meaningful on encrypted builds.
                conn.pragma_update(None, "key", credentials.expose())
                    .context("failed to apply store credentials")?;
            }

            Ok(conn)
        })
    }

    /// Private read-write database, used by tests and local seeding.
    pub fn open_in_memory() -> Result<Self> {
        Self::start(PathBuf::from(":memory:"), || {
            Connection::open_in_memory().context("failed to open in-memory SQLite database")
        })
    }

    /// Spawns the worker and waits until `connect` has succeeded or failed on
    /// it, so open errors surface here rather than on the first query.
    fn start<F>(path: PathBuf, connect: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Connection> + Send + 'static,
    {
        let (jobs, inbox) = mpsc::channel::<Message>();
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<()>>(1);

        let thread = thread::Builder::new()
            .name("vitalview-db".into())
            .spawn(move || match connect() {
                Ok(conn) => {
                    let _ = opened_tx.send(Ok(()));
                    drain(conn, inbox);
                }
                Err(err) => {
                    let _ = opened_tx.send(Err(err));
                }
            })
            .context("failed to spawn sqlite worker")?;

        match opened_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err);
            }
            Err(_) => return Err(anyhow!("sqlite worker exited while opening {}", path.display())),
        }

        info!("Database opened at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs,
                thread: Some(thread),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `task` on the connection thread and awaits its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // The caller may have been cancelled mid-query.
            let _ = reply.send(task(conn));
        });

        self.worker
            .jobs
            .send(Message::Run(job))
            .map_err(|_| anyhow!("sqlite worker is not running"))?;

        response
            .await
            .map_err(|_| anyhow!("sqlite worker dropped the query"))?
    }
}

fn drain(mut conn: Connection, inbox: mpsc::Receiver<Message>) {
    for message in inbox {
        match message {
            Message::Run(job) => job(&mut conn),
            Message::Close => break,
        }
    }
    info!("sqlite worker closed");
}

//! Single-writer daemon serving the store over HTTP.
//!
//! The daemon provides:
//! - Exclusive ownership of the store (one task applies every request)
//! - A bounded request queue fed by the HTTP handlers
//! - Graceful shutdown on Ctrl-C or a `Shutdown` request

use crate::protocol::{Request, Response};
use crate::store::{Store, StoreConfig};
use crate::types::{Entity, Kind};
use eyre::{Context, Result, eyre};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// Default HTTP port, bound on localhost.
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of requests that may wait for the store.
const DEFAULT_QUEUE_DEPTH: usize = 100;

type Envelope = (Request, oneshot::Sender<Response>);

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Snapshot file; `None` keeps everything in memory
    pub data_file: Option<PathBuf>,

    /// HTTP listen address
    pub bind: SocketAddr,

    /// Bound on history entries
    pub history_limit: Option<usize>,

    /// Capacity of the request queue
    pub queue_depth: usize,
}

impl DaemonConfig {
    /// Create config with default settings.
    pub fn new(data_file: Option<PathBuf>) -> Self {
        Self {
            data_file,
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            history_limit: None,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            history_limit: self.history_limit,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

/// The tempo daemon.
pub struct Daemon {
    config: DaemonConfig,
    store: Store,
}

impl Daemon {
    /// Create a new daemon instance, opening the configured store.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let store = match &config.data_file {
            Some(path) => Store::open_with(path, config.store_config()).context("Failed to open store")?,
            None => Store::with_config(config.store_config()),
        };

        Ok(Self { config, store })
    }

    /// Create a daemon around an existing store.
    pub fn with_store(config: DaemonConfig, store: Store) -> Self {
        Self { config, store }
    }

    /// Start the request loop on the current tokio runtime.
    pub fn spawn(self) -> DaemonHandle {
        let (tx, rx) = mpsc::channel::<Envelope>(self.config.queue_depth.max(1));
        tokio::spawn(self.process(rx));
        DaemonHandle { tx }
    }

    /// Serve HTTP until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let bind = self.config.bind;
        let handle = self.spawn();

        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .with_context(|| format!("Failed to bind to {}", bind))?;
        log::info!("Daemon listening on http://{}", listener.local_addr()?);

        let shutdown = handle.clone();
        axum::serve(listener, crate::http::router(handle))
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                }
                if let Err(e) = shutdown.call(Request::Shutdown).await {
                    log::warn!("Shutdown request failed: {}", e);
                }
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }

    async fn process(mut self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some((request, reply)) = rx.recv().await {
            let is_shutdown = matches!(request, Request::Shutdown);
            let response = self.handle_request(request);
            if reply.send(response).is_err() {
                log::warn!("Client went away before the response was sent");
            }
            if is_shutdown {
                break;
            }
        }
        log::info!("Daemon shutting down");
    }

    /// Handle a single request.
    pub fn handle_request(&mut self, request: Request) -> Response {
        let store = &mut self.store;
        match request {
            Request::CreateTask { task } => created(store.create_task(task).map(Entity::Task)),
            Request::CreateEpic { epic } => created(store.create_epic(epic).map(Entity::Epic)),
            Request::CreateSubtask { subtask } => created(store.create_subtask(subtask).map(Entity::Subtask)),

            Request::UpdateTask { task } => updated(store.update_task(task).map(Entity::Task)),
            Request::UpdateEpic { epic } => updated(store.update_epic(epic).map(Entity::Epic)),
            Request::UpdateSubtask { subtask } => updated(store.update_subtask(subtask).map(Entity::Subtask)),

            Request::Get { kind, id } => {
                let result = match kind {
                    Kind::Task => store.get_task(id).map(|t| t.map(Entity::Task)),
                    Kind::Epic => store.get_epic(id).map(|e| e.map(Entity::Epic)),
                    Kind::Subtask => store.get_subtask(id).map(|s| s.map(Entity::Subtask)),
                };
                match result {
                    Ok(Some(entity)) => Response::Entity { entity },
                    Ok(None) => Response::NotFound {
                        message: format!("{} not found: {}", kind.as_str().to_lowercase(), id),
                    },
                    Err(e) => Response::from_report(&e),
                }
            }

            Request::List { kind } => {
                let entities = match kind {
                    Kind::Task => store.tasks().into_iter().map(Entity::Task).collect(),
                    Kind::Epic => store.epics().into_iter().map(Entity::Epic).collect(),
                    Kind::Subtask => store.subtasks().into_iter().map(Entity::Subtask).collect(),
                };
                Response::Entities { entities }
            }

            Request::EpicSubtasks { id } => match store.epic_subtasks(id) {
                Some(subtasks) => Response::Entities {
                    entities: subtasks.into_iter().map(Entity::Subtask).collect(),
                },
                None => Response::NotFound {
                    message: format!("epic not found: {}", id),
                },
            },

            Request::Delete { kind, id } => done(match kind {
                Kind::Task => store.delete_task(id),
                Kind::Epic => store.delete_epic(id),
                Kind::Subtask => store.delete_subtask(id),
            }),

            Request::Clear { kind } => done(match kind {
                Kind::Task => store.clear_tasks(),
                Kind::Epic => store.clear_epics(),
                Kind::Subtask => store.clear_subtasks(),
            }),

            Request::Prioritized => Response::Entities {
                entities: store.prioritized(),
            },

            Request::History => Response::Entities {
                entities: store.history(),
            },

            Request::Shutdown => Response::Ok,
        }
    }
}

fn created(result: Result<Entity>) -> Response {
    match result {
        Ok(entity) => Response::Created { entity },
        Err(e) => Response::from_report(&e),
    }
}

fn updated(result: Result<Entity>) -> Response {
    match result {
        Ok(entity) => Response::Updated { entity },
        Err(e) => Response::from_report(&e),
    }
}

fn done(result: Result<()>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => Response::from_report(&e),
    }
}

/// Cloneable sender side of the daemon's request queue.
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    tx: mpsc::Sender<Envelope>,
}

impl DaemonHandle {
    /// Queue a request and wait for its response.
    pub async fn call(&self, request: Request) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| eyre!("daemon is not running"))?;
        reply_rx.await.context("Daemon dropped the request")
    }
}

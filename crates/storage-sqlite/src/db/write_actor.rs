use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use eventhub_core::errors::{DatabaseError, Error, Result};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A write job runs against the actor's connection inside one IMMEDIATE
// transaction. Returning Err rolls the whole job back.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job<Box<dyn Any + Send + 'static>>, Reply)>,
}

fn actor_gone(detail: &str) -> Error {
    Error::Database(DatabaseError::Internal(format!("Writer actor: {}", detail)))
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// Jobs run one at a time, so read-check-write sequences inside a single
    /// job cannot interleave with other writers.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| actor_gone("receiving channel is closed"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| actor_gone("reply dropped before a result was sent"))??;

        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| actor_gone("unexpected result type"))
    }
}

/// Spawns a background Tokio task that acts as the single writer to the database.
///
/// The actor holds one pooled connection for its lifetime. If that connection
/// cannot be acquired every queued job is answered with the pool error.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(Job<Box<dyn Any + Send + 'static>>, Reply)>(1024);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Writer actor could not acquire a connection: {}", e);
                while let Some((_, reply_tx)) = rx.recv().await {
                    let _ = reply_tx.send(Err(StorageError::CoreError(e.to_string()).into()));
                }
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(|e: StorageError| e.into());

            // The requester may have gone away; nothing to do then.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}

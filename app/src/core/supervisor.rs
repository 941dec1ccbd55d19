use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::{self, OwnedMutexGuard, mpsc};

/// Map from room id to the command channel of its running worker.
///
/// Starting inserts the handle before anyone else can observe the id, and
/// stopping removes it before signalling, so a room never has two workers.
/// Dropping the sender is the stop signal: the worker sees its channel close.
pub struct WorkerRegistry<C> {
    workers: Arc<Mutex<HashMap<i32, mpsc::UnboundedSender<C>>>>,
}

impl<C> Clone for WorkerRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            workers: self.workers.clone(),
        }
    }
}

impl<C: Send + 'static> WorkerRegistry<C> {
    pub fn new() -> Self {
        Self {
            workers: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, mpsc::UnboundedSender<C>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns `worker` unless one is already registered for `id`.
    pub fn start<F, Fut>(&self, id: i32, worker: F) -> bool
    where
        F: FnOnce(mpsc::UnboundedReceiver<C>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut workers = self.lock();
        if workers.contains_key(&id) {
            return false;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(rx));
        workers.insert(id, tx);
        true
    }

    pub fn stop(&self, id: i32) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Hands `command` to the worker of `id`, giving it back when there is none.
    pub fn send(&self, id: i32, command: C) -> Result<(), C> {
        let workers = self.lock();
        match workers.get(&id) {
            Some(tx) => tx.send(command).map_err(|e| e.0),
            None => Err(command),
        }
    }

    pub fn contains(&self, id: i32) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Send + 'static> Default for WorkerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

type LockMap = Arc<Mutex<HashMap<i32, Arc<sync::Mutex<()>>>>>;

/// One async lock per id. Entries are created on demand and removed when
/// the last holder or waiter lets go, so unrelated ids never contend.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: LockMap,
}

/// Held lock of one id; dropping it releases the id.
pub struct KeyedGuard {
    id: i32,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: i32) -> KeyedGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };
        KeyedGuard {
            id,
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let lock = OwnedMutexGuard::mutex(&guard).clone();
        drop(guard);

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // the map and `lock` are the only references left
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&self.id);
        }
    }
}

//! Registry of live connections, indexed by user and by room.
//!
//! Every connection owns two tasks once [`ConnectionHub::serve`] is called: a
//! read loop that dispatches inbound messages and a heartbeat loop that pings
//! the peer. Either of them failing unregisters the connection.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, join_all};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::{
    sync::{Mutex, watch},
    time::{Instant, MissedTickBehavior, interval_at, timeout},
};
use tracing::{debug, info, warn};

mod message;
mod transport;

pub use message::{Envelope, Inbound, kind};
pub use transport::{Frame, LiveSink, LiveStream, TransportError};

use crate::{
    config::Timings,
    error::{AppError, AppResult, code},
};

pub type ConnectionId = u64;

pub type MessageHandler =
    Arc<dyn Fn(LiveContext, Option<Value>) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

pub type LeaveHook = Arc<dyn Fn(LiveContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// What a handler knows about the connection a message came from.
#[derive(Clone)]
pub struct LiveContext {
    pub hub: ConnectionHub,
    pub connection: ConnectionId,
    pub user_id: i32,
    /// Zero when the connection is not bound to a room.
    pub room_id: i32,
}

type SharedSink = Arc<Mutex<Box<dyn LiveSink>>>;

struct Connection {
    user_id: i32,
    room_id: i32,
    sink: SharedSink,
    // Dropped on unregister, which wakes both connection loops.
    closed: watch::Sender<()>,
}

#[derive(Default)]
struct Registry {
    conns: HashMap<ConnectionId, Connection>,
    by_user: HashMap<i32, HashSet<ConnectionId>>,
    by_room: HashMap<i32, HashSet<ConnectionId>>,
}

impl Registry {
    fn insert(&mut self, id: ConnectionId, conn: Connection) {
        self.by_user.entry(conn.user_id).or_default().insert(id);
        if conn.room_id > 0 {
            self.by_room.entry(conn.room_id).or_default().insert(id);
        }
        self.conns.insert(id, conn);
    }

    fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let conn = self.conns.remove(&id)?;
        detach(&mut self.by_user, conn.user_id, id);
        if conn.room_id > 0 {
            detach(&mut self.by_room, conn.room_id, id);
        }
        Some(conn)
    }

    fn bind(&mut self, id: ConnectionId, room_id: i32) -> bool {
        let Some(conn) = self.conns.get_mut(&id) else {
            return false;
        };
        if conn.room_id == room_id {
            return true;
        }
        let previous = std::mem::replace(&mut conn.room_id, room_id);
        if previous > 0 {
            detach(&mut self.by_room, previous, id);
        }
        self.by_room.entry(room_id).or_default().insert(id);
        true
    }

    fn unbind(&mut self, id: ConnectionId, room_id: i32) -> Option<i32> {
        let conn = self.conns.get_mut(&id)?;
        let room = if room_id > 0 { room_id } else { conn.room_id };
        if room <= 0 {
            return None;
        }
        if conn.room_id == room {
            conn.room_id = 0;
        }
        detach(&mut self.by_room, room, id);
        Some(room)
    }

    fn sinks<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ConnectionId>,
    ) -> Vec<(ConnectionId, SharedSink)> {
        ids.into_iter()
            .filter_map(|id| self.conns.get(id).map(|c| (*id, c.sink.clone())))
            .collect()
    }
}

fn detach(index: &mut HashMap<i32, HashSet<ConnectionId>>, key: i32, id: ConnectionId) {
    if let Some(bucket) = index.get_mut(&key) {
        bucket.remove(&id);
        if bucket.is_empty() {
            index.remove(&key);
        }
    }
}

struct HubInner {
    registry: RwLock<Registry>,
    handlers: RwLock<HashMap<String, MessageHandler>>,
    leave_hook: RwLock<Option<LeaveHook>>,
    next_id: AtomicU64,
    heartbeat_interval: Duration,
    liveness_wait: Duration,
    write_wait: Duration,
}

#[derive(Clone)]
pub struct ConnectionHub {
    inner: Arc<HubInner>,
}

impl ConnectionHub {
    pub fn new(timings: &Timings) -> Self {
        let hub = Self {
            inner: Arc::new(HubInner {
                registry: RwLock::default(),
                handlers: RwLock::default(),
                leave_hook: RwLock::default(),
                next_id: AtomicU64::new(0),
                heartbeat_interval: timings.heartbeat_interval,
                liveness_wait: timings.liveness_wait,
                write_wait: timings.write_wait,
            }),
        };

        hub.on(kind::PING, |ctx, _| async move {
            let pong = Envelope::success(kind::PONG, json!({ "ts": Utc::now().timestamp_millis() }));
            ctx.hub.send(ctx.connection, &pong).await
        });

        hub
    }

    fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the handler for an inbound message type, replacing any previous one.
    pub fn on<F, Fut>(&self, kind: &str, handler: F)
    where
        F: Fn(LiveContext, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        let handler: MessageHandler =
            Arc::new(move |ctx: LiveContext, data: Option<Value>| handler(ctx, data).boxed());
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind.to_owned(), handler);
    }

    /// Runs after a connection that was bound to a room is unregistered.
    pub fn on_leave<F, Fut>(&self, hook: F)
    where
        F: Fn(LiveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: LeaveHook = Arc::new(move |ctx: LiveContext| hook(ctx).boxed());
        *self
            .inner
            .leave_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn handler(&self, kind: &str) -> Option<MessageHandler> {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
    }

    fn leave_hook(&self) -> Option<LeaveHook> {
        self.inner
            .leave_hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn register(&self, sink: Box<dyn LiveSink>, user_id: i32, room_id: i32) -> ConnectionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (closed, _) = watch::channel(());
        let conn = Connection {
            user_id,
            room_id: room_id.max(0),
            sink: Arc::new(Mutex::new(sink)),
            closed,
        };
        self.registry_mut().insert(id, conn);
        info!(connection = id, user_id, room_id, "connection registered");
        id
    }

    /// Spawns the read and heartbeat loops of a registered connection.
    pub fn serve(&self, id: ConnectionId, stream: Box<dyn LiveStream>) -> bool {
        let closed = self.registry().conns.get(&id).map(|c| c.closed.subscribe());
        let Some(closed) = closed else {
            return false;
        };
        tokio::spawn(self.clone().read_loop(id, stream, closed.clone()));
        tokio::spawn(self.clone().heartbeat_loop(id, closed));
        true
    }

    /// Moves the connection into `room_id`, leaving its previous room.
    pub fn bind_room(&self, id: ConnectionId, room_id: i32) -> bool {
        if room_id <= 0 {
            return false;
        }
        let bound = self.registry_mut().bind(id, room_id);
        if bound {
            debug!(connection = id, room_id, "connection bound to room");
        }
        bound
    }

    /// Takes the connection out of `room_id`, or out of its current room when
    /// `room_id` is not positive. Returns the room it left.
    pub fn unbind_room(&self, id: ConnectionId, room_id: i32) -> Option<i32> {
        let room = self.registry_mut().unbind(id, room_id);
        if let Some(room_id) = room {
            debug!(connection = id, room_id, "connection unbound from room");
        }
        room
    }

    /// Removes the connection everywhere and closes its transport. Only the
    /// first call for a connection has any effect.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.registry_mut().remove(id);
        let Some(Connection {
            user_id,
            room_id,
            sink,
            closed,
        }) = removed
        else {
            return false;
        };
        drop(closed);
        info!(connection = id, user_id, room_id, "connection unregistered");

        {
            let mut guard = sink.lock().await;
            if let Ok(Err(e)) = timeout(self.inner.write_wait, guard.close()).await {
                debug!(connection = id, "close failed: {e}");
            }
        }

        if user_id > 0 && room_id > 0 {
            if let Some(hook) = self.leave_hook() {
                hook(LiveContext {
                    hub: self.clone(),
                    connection: id,
                    user_id,
                    room_id,
                })
                .await;
            }
        }
        true
    }

    pub fn context(&self, id: ConnectionId) -> Option<LiveContext> {
        let reg = self.registry();
        reg.conns.get(&id).map(|c| LiveContext {
            hub: self.clone(),
            connection: id,
            user_id: c.user_id,
            room_id: c.room_id,
        })
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.registry().conns.contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry().conns.len()
    }

    pub fn active_user_ids(&self) -> Vec<i32> {
        let reg = self.registry();
        let mut users: Vec<i32> = reg.by_user.keys().copied().filter(|u| *u > 0).collect();
        users.sort_unstable();
        users
    }

    pub fn active_room_user_ids(&self, room_id: i32) -> Vec<i32> {
        let reg = self.registry();
        let Some(bucket) = reg.by_room.get(&room_id) else {
            return Vec::new();
        };
        bucket
            .iter()
            .filter_map(|id| reg.conns.get(id))
            .map(|c| c.user_id)
            .filter(|u| *u > 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn sink_of(&self, id: ConnectionId) -> Option<SharedSink> {
        self.registry().conns.get(&id).map(|c| c.sink.clone())
    }

    async fn write(&self, sink: &SharedSink, text: String) -> Result<(), TransportError> {
        let mut guard = sink.lock().await;
        match timeout(self.inner.write_wait, guard.send_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::WriteTimeout),
        }
    }

    /// Sends to a single connection; a failed write unregisters it.
    pub async fn send<T: Serialize + ?Sized>(&self, id: ConnectionId, message: &T) -> AppResult<()> {
        let text = serde_json::to_string(message).map_err(anyhow::Error::from)?;
        let Some(sink) = self.sink_of(id) else {
            return Err(TransportError::Closed.into());
        };
        if let Err(e) = self.write(&sink, text).await {
            debug!(connection = id, "dropping connection after failed send: {e}");
            self.unregister(id).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Returns how many connections accepted the message.
    pub async fn send_to_user<T: Serialize + ?Sized>(&self, user_id: i32, message: &T) -> usize {
        let targets = {
            let reg = self.registry();
            reg.by_user
                .get(&user_id)
                .map(|ids| reg.sinks(ids))
                .unwrap_or_default()
        };
        self.fan_out(targets, message).await
    }

    pub async fn send_to_room<T: Serialize + ?Sized>(&self, room_id: i32, message: &T) -> usize {
        let targets = {
            let reg = self.registry();
            reg.by_room
                .get(&room_id)
                .map(|ids| reg.sinks(ids))
                .unwrap_or_default()
        };
        self.fan_out(targets, message).await
    }

    pub async fn broadcast<T: Serialize + ?Sized>(&self, message: &T) -> usize {
        let targets = {
            let reg = self.registry();
            reg.sinks(reg.conns.keys())
        };
        self.fan_out(targets, message).await
    }

    async fn fan_out<T: Serialize + ?Sized>(
        &self,
        targets: Vec<(ConnectionId, SharedSink)>,
        message: &T,
    ) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode outbound message: {e}");
                return 0;
            }
        };

        let writes = targets.into_iter().map(|(id, sink)| {
            let text = text.clone();
            async move { (id, self.write(&sink, text).await) }
        });

        let mut delivered = 0;
        for (id, result) in join_all(writes).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(connection = id, "dropping connection after failed send: {e}");
                    self.unregister(id).await;
                }
            }
        }
        delivered
    }

    /// Routes one inbound message to its handler. Problems are reported to
    /// the sender as error envelopes.
    pub async fn dispatch(&self, id: ConnectionId, raw: &str) {
        let inbound = match serde_json::from_str::<Inbound>(raw) {
            Ok(inbound) if !inbound.kind.is_empty() => inbound,
            _ => {
                self.reply_error(id, code::PARAM_NOT_VALID, "malformed message")
                    .await;
                return;
            }
        };

        let Some(handler) = self.handler(&inbound.kind) else {
            let message = format!("message type {} does not exist", inbound.kind);
            self.reply_error(id, code::MESSAGE_NOT_EXIST, message).await;
            return;
        };
        let Some(ctx) = self.context(id) else {
            return;
        };

        if let Err(e) = handler(ctx, inbound.data).await {
            debug!(connection = id, kind = %inbound.kind, "handler failed: {e}");
            self.reply_error(id, e.live_code(), e.to_string()).await;
        }
    }

    async fn reply_error(&self, id: ConnectionId, code: i32, message: impl Into<String>) {
        let envelope = Envelope::error(code, message);
        if let Err(e) = self.send(id, &envelope).await {
            debug!(connection = id, "failed to deliver error reply: {e}");
        }
    }

    async fn read_loop(
        self,
        id: ConnectionId,
        mut stream: Box<dyn LiveStream>,
        mut closed: watch::Receiver<()>,
    ) {
        let wait = self.inner.liveness_wait;
        loop {
            let frame = tokio::select! {
                _ = closed.changed() => return,
                frame = timeout(wait, stream.next_frame()) => frame,
            };
            match frame {
                Err(_) => {
                    debug!(connection = id, "nothing received within the liveness window");
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    debug!(connection = id, "read failed: {e}");
                    break;
                }
                Ok(Some(Ok(Frame::Text(text)))) => self.dispatch(id, &text).await,
                Ok(Some(Ok(Frame::Control))) => {}
            }
        }
        self.unregister(id).await;
    }

    async fn heartbeat_loop(self, id: ConnectionId, mut closed: watch::Receiver<()>) {
        let period = self.inner.heartbeat_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = closed.changed() => return,
                _ = ticker.tick() => {}
            }
            let Some(sink) = self.sink_of(id) else {
                return;
            };
            let result = {
                let mut guard = sink.lock().await;
                timeout(self.inner.write_wait, guard.send_ping()).await
            };
            let failure = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(_) => TransportError::WriteTimeout,
            };
            debug!(connection = id, "heartbeat failed: {failure}");
            self.unregister(id).await;
            return;
        }
    }
}

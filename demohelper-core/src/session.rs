//! # Console Session
//!
//! Owns the netcon stream. One read loop pumps lines into the
//! [`LineWaiterRegistry`]; everything else (commands, cvar requests,
//! prompts, listeners) goes through the public API here.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::listener::ListenerService;
use crate::registry::{LineWaiterRegistry, ListenerId, WaiterId};
use crate::timeout::{TimeoutGuard, WaitKind};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Lifecycle of a session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Running,
    Closed,
}

pub struct ConsoleSession {
    me: Weak<ConsoleSession>,
    reader: Mutex<Option<BoxedReader>>,
    writer: tokio::sync::Mutex<BoxedWriter>,
    registry: Mutex<LineWaiterRegistry>,
    state: Mutex<SessionState>,
    timeouts: TimeoutGuard,
    /// One task per subscribed listener, drained when the loop exits.
    workers: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("state", &self.state())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a one-shot waiter when the caller stops waiting for it.
///
/// Resolved waiters are already gone, so the removal is a no-op for them. For
/// timed-out or cancelled waits it guarantees a late line cannot resolve a
/// slot nobody is listening to any more.
struct WaiterTicket<'a> {
    registry: &'a Mutex<LineWaiterRegistry>,
    id: WaiterId,
}

impl Drop for WaiterTicket<'_> {
    fn drop(&mut self) {
        if relock(self.registry).remove_waiter(self.id) {
            debug!(waiter = self.id, "expunged unresolved waiter");
        }
    }
}

impl ConsoleSession {
    pub fn new<R, W>(reader: R, writer: W, timeouts: TimeoutGuard) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            reader: Mutex::new(Some(Box::new(reader))),
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            registry: Mutex::new(LineWaiterRegistry::new()),
            state: Mutex::new(SessionState::Unstarted),
            timeouts,
            workers: Mutex::new(JoinSet::new()),
        })
    }

    pub fn state(&self) -> SessionState {
        *relock(&self.state)
    }

    pub fn timeouts(&self) -> &TimeoutGuard {
        &self.timeouts
    }

    pub fn pending_waiters(&self) -> usize {
        relock(&self.registry).pending_waiters()
    }

    pub fn listener_count(&self) -> usize {
        relock(&self.registry).listener_count()
    }

    // ====================================================================
    // Writing
    // ====================================================================

    pub async fn send(&self, line: &str) -> ConsoleResult<()> {
        self.send_all(&[line]).await
    }

    /// Write each line in order. The batch is not interleaved with other writers.
    pub async fn send_all(&self, lines: &[&str]) -> ConsoleResult<()> {
        if self.state() == SessionState::Closed {
            return Err(ConsoleError::Transport(
                "console stream is no longer writable".to_string(),
            ));
        }

        let mut writer = self.writer.lock().await;
        for line in lines {
            debug!("Writing to console: '{}'", line);
            let mut bytes = Vec::with_capacity(line.len() + 1);
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
            if let Err(e) = writer.write_all(&bytes).await {
                error!(command = %line, "console write failed: {}", e);
                return Err(e.into());
            }
        }
        writer.flush().await?;
        Ok(())
    }

    // ====================================================================
    // Request / response
    // ====================================================================

    /// Ask the console for a cvar's numeric value.
    ///
    /// Naming a cvar with no argument makes the game echo
    /// `"<name>" = "<value>" ...`, which resolves the waiter.
    pub async fn request_named_value(&self, name: &str) -> ConsoleResult<f64> {
        let (id, slot) = relock(&self.registry).add_named_value(name)?;
        let _ticket = WaiterTicket {
            registry: &self.registry,
            id,
        };

        self.send(name).await?;

        let label = format!("Request for cvar '{name}'");
        self.timeouts
            .guard(
                async { slot.await.map_err(|_| ConsoleError::Closed) },
                &label,
                WaitKind::Response,
            )
            .await
    }

    /// Write `commands` (possibly none) and wait for the first line matching
    /// `pattern`. The waiter is registered before anything is written.
    pub async fn await_pattern(
        &self,
        commands: &[&str],
        pattern: &Regex,
        kind: WaitKind,
    ) -> ConsoleResult<String> {
        let (id, slot) = relock(&self.registry).add_pattern(pattern.clone())?;
        let _ticket = WaiterTicket {
            registry: &self.registry,
            id,
        };

        if !commands.is_empty() {
            self.send_all(commands).await?;
        }

        let label = format!("Waiting for console output matching '{pattern}'");
        self.timeouts
            .guard(
                async { slot.await.map_err(|_| ConsoleError::Closed) },
                &label,
                kind,
            )
            .await
    }

    // ====================================================================
    // Listeners
    // ====================================================================

    /// Register a persistent listener. Lines it accepts are delivered to it in
    /// arrival order on its own task, so it may issue requests of its own.
    pub fn subscribe(&self, listener: Arc<dyn ListenerService>) -> ConsoleResult<ListenerId> {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let id = relock(&self.registry).add_listener(listener.clone(), mailbox)?;
        info!(listener = listener.name(), "Subscribed listener");

        relock(&self.workers).spawn(listener_worker(self.me.clone(), listener, inbox));
        Ok(id)
    }

    /// Stop offering lines to a listener. Lines already handed to it still run.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        relock(&self.registry).remove_listener(id)
    }

    // ====================================================================
    // Read loop
    // ====================================================================

    /// Consume the stream until it closes, routing every line.
    ///
    /// May be called once. On exit every pending waiter fails with
    /// [`ConsoleError::Closed`] and listener tasks are drained before this
    /// returns.
    pub async fn run(&self) -> ConsoleResult<()> {
        let reader = {
            let mut state = relock(&self.state);
            match *state {
                SessionState::Running => return Err(ConsoleError::AlreadyRunning),
                SessionState::Closed => return Err(ConsoleError::Closed),
                SessionState::Unstarted => {}
            }
            let reader = relock(&self.reader).take().ok_or(ConsoleError::Closed)?;
            *state = SessionState::Running;
            reader
        };
        info!("Console session running");

        let outcome = self.pump(reader).await;
        self.shutdown().await;
        outcome
    }

    async fn pump(&self, reader: BoxedReader) -> ConsoleResult<()> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    info!("Console stream closed");
                    return Ok(());
                }
                Ok(_) => {
                    let raw = String::from_utf8_lossy(&buf);
                    // Trailing whitespace, \r\n included, is never significant.
                    let line = raw.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    trace!(%line, "console line");
                    relock(&self.registry).route_line(line);
                }
                Err(e) => {
                    error!("Console read failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    async fn shutdown(&self) {
        *relock(&self.state) = SessionState::Closed;
        relock(&self.registry).close();

        let mut workers = std::mem::take(&mut *relock(&self.workers));
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("listener task ended abnormally: {}", e);
            }
        }
        debug!("Console session closed");
    }
}

async fn listener_worker(
    session: Weak<ConsoleSession>,
    listener: Arc<dyn ListenerService>,
    mut inbox: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = inbox.recv().await {
        let Some(console) = session.upgrade() else {
            break;
        };

        let handler = listener.clone();
        // A panic in one line's handling must not take the listener down.
        let handled =
            tokio::spawn(async move { handler.handle_line(&console, &line).await }).await;

        match handled {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(listener = listener.name(), "Listener failed: {:#}", e),
            Err(e) => error!(listener = listener.name(), "Listener task aborted: {}", e),
        }
    }
    debug!(listener = listener.name(), "listener task finished");
}

//! Owner-thread bridge.
//!
//! Workers never touch a machine directly. They hand closures to a
//! [`Dispatcher`], which queues them on an unbounded channel consumed only
//! by the [`OwnerLoop`]. Whatever thread drives the loop is the owner
//! thread: every queued closure runs there, one at a time, in the order it
//! was sent from any given sender thread.
//!
//! Sending never blocks. If the loop has been dropped or shut down, requests
//! are discarded.

mod error;

pub use error::BridgeError;

use crate::registry::panic_message;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

type Owner = Arc<Mutex<Option<ThreadId>>>;

/// Create a connected dispatcher and owner loop.
///
/// There is no owner thread until the loop is driven. From then on it is
/// the thread driving the loop, until the loop stops.
pub fn channel() -> (Dispatcher, OwnerLoop) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let owner: Owner = Arc::new(Mutex::new(None));

    (
        Dispatcher {
            sender,
            owner: Arc::clone(&owner),
        },
        OwnerLoop {
            receiver,
            owner,
            closed: false,
        },
    )
}

/// Sending half of the bridge. Cheap to clone and safe to share.
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Message>,
    owner: Owner,
}

impl Dispatcher {
    /// Queue `f` to run on the owner thread and return immediately.
    pub fn schedule<F>(&self, f: F) -> Result<(), BridgeError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Message::Run(Box::new(f))).map_err(|_| {
            debug!("owner loop is gone, dropping scheduled call");
            BridgeError::OwnerGone
        })
    }

    /// Whether the current thread is the one driving the owner loop.
    pub fn is_owner_thread(&self) -> bool {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }

    /// Run `f` on the owner thread and wait for its result.
    ///
    /// On the owner thread itself `f` runs inline, since waiting for the
    /// loop from inside it would never return. Must not be called from
    /// within an async runtime; use [`Dispatcher::call`] there.
    pub fn call_blocking<F, R>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner_thread() {
            return Ok(f());
        }

        let (tx, rx) = oneshot::channel();
        self.schedule(move || {
            let _ = tx.send(f());
        })?;
        rx.blocking_recv().map_err(|_| BridgeError::CompletionLost)
    }

    /// Run `f` on the owner thread and await its result.
    pub async fn call<F, R>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.schedule(move || {
            let _ = tx.send(f());
        })?;
        rx.await.map_err(|_| BridgeError::CompletionLost)
    }

    /// Wrap `f` so that calling the wrapper from any thread runs `f` on
    /// the owner thread.
    pub fn make_threadsafe<A, F>(&self, f: F) -> Threadsafe<A>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Threadsafe {
            dispatcher: self.clone(),
            f: Arc::new(f),
        }
    }

    /// Ask the owner loop to stop after the requests already queued.
    pub fn shutdown(&self) -> Result<(), BridgeError> {
        self.sender
            .send(Message::Shutdown)
            .map_err(|_| BridgeError::OwnerGone)
    }

    /// Whether the owner loop can no longer receive requests.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A function that always runs on the owner thread, whoever calls it.
pub struct Threadsafe<A> {
    dispatcher: Dispatcher,
    f: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A: Send + 'static> Threadsafe<A> {
    /// Schedule the call and return without waiting.
    /// Dropped silently if the owner loop is gone.
    pub fn call(&self, args: A) {
        let _ = self.try_call(args);
    }

    /// Schedule the call, reporting whether it was queued.
    pub fn try_call(&self, args: A) -> Result<(), BridgeError> {
        let f = Arc::clone(&self.f);
        self.dispatcher.schedule(move || f(args))
    }

    /// Run the call on the owner thread and wait until it has finished.
    pub fn call_blocking(&self, args: A) -> Result<(), BridgeError> {
        let f = Arc::clone(&self.f);
        self.dispatcher.call_blocking(move || f(args))
    }
}

impl<A> Clone for Threadsafe<A> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

/// Receiving half of the bridge, driven by the owner thread.
pub struct OwnerLoop {
    receiver: mpsc::UnboundedReceiver<Message>,
    owner: Owner,
    closed: bool,
}

impl OwnerLoop {
    fn set_owner(&self, owner: Option<ThreadId>) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = owner;
    }

    fn claim(&self) {
        self.set_owner(Some(thread::current().id()));
    }

    fn release(&self) {
        self.set_owner(None);
    }

    fn execute(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Run(job) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    error!(
                        "owner-thread call panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
                ControlFlow::Continue(())
            }
            Message::Shutdown => {
                info!("owner loop shutting down");
                self.close();
                ControlFlow::Break(())
            }
        }
    }

    /// Stop accepting calls and drop the ones still queued, which fails
    /// any caller waiting on them with `CompletionLost`.
    fn close(&mut self) {
        self.closed = true;
        self.receiver.close();
        let mut dropped = 0;
        while let Ok(message) = self.receiver.try_recv() {
            if matches!(message, Message::Run(_)) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "dropped calls queued after shutdown");
        }
    }

    /// Run everything queued right now, without waiting for more.
    /// Returns the number of calls run.
    ///
    /// Suited to hosts with their own event loop that poll the bridge.
    pub fn run_pending(&mut self) -> usize {
        self.claim();
        let mut ran = 0;

        while !self.closed {
            match self.receiver.try_recv() {
                Ok(message) => {
                    let is_call = matches!(message, Message::Run(_));
                    if self.execute(message).is_break() {
                        break;
                    }
                    if is_call {
                        ran += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }

        if self.closed {
            self.release();
        }
        ran
    }

    /// Run calls as they arrive until shutdown or until every dispatcher
    /// has been dropped.
    ///
    /// Only code running inside a call counts as the owner thread here.
    pub async fn run(&mut self) {
        while !self.closed {
            let Some(message) = self.receiver.recv().await else {
                self.closed = true;
                break;
            };
            self.claim();
            let flow = self.execute(message);
            self.release();
            if flow.is_break() {
                break;
            }
        }
        debug!("owner loop stopped");
    }

    /// Like [`OwnerLoop::run`], blocking the current thread.
    /// Must not be called from within an async runtime.
    pub fn blocking_run(&mut self) {
        self.claim();
        while !self.closed {
            let Some(message) = self.receiver.blocking_recv() else {
                self.closed = true;
                break;
            };
            if self.execute(message).is_break() {
                break;
            }
        }
        self.release();
        debug!("owner loop stopped");
    }

    /// Whether the loop has stopped accepting calls.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

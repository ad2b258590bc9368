//! A generic gen-server-style multi-threading pattern: a thread owns
//! its own state and handles all inter-thread communication through a
//! message channel, Erlang gen-server style, rather than through
//! shared mutable state.
//!
//! The dispatcher's organizer thread ([`crate::dispatcher`]) is built
//! on this.

use std::mem;
use std::sync::{mpsc, Arc};
use std::thread as std_thread;

use crate::error::Result;

enum Tx<Q, R> {
    N(mpsc::Sender<(Q, Option<mpsc::Sender<R>>)>),
    S(mpsc::SyncSender<(Q, Option<mpsc::Sender<R>>)>),
}

impl<Q, R> Clone for Tx<Q, R> {
    fn clone(&self) -> Self {
        match self {
            Tx::N(tx) => Tx::N(tx.clone()),
            Tx::S(tx) => Tx::S(tx.clone()),
        }
    }
}

/// Channel handed to a thread's main loop. Recv a disconnect (every
/// `Writer` and the owning `Thread` dropped) to know when to exit.
pub type Rx<Q, R> = mpsc::Receiver<(Q, Option<mpsc::Sender<R>>)>;

/// Owns a spawned OS thread and the channel used to drive it. Dropping
/// a `Thread` drops its send half, which unblocks the main loop's recv
/// with a disconnect, then joins the underlying `JoinHandle`.
pub struct Thread<Q, R, T> {
    inner: Option<Inner<Q, R, T>>,
    refn: Arc<bool>,
}

struct Inner<Q, R, T> {
    tx: Tx<Q, R>,
    handle: std_thread::JoinHandle<Result<T>>,
}

impl<Q, R, T> Inner<Q, R, T> {
    fn close_wait(self) -> Result<T> {
        mem::drop(self.tx);
        self.handle.join().unwrap()
    }
}

impl<Q, R, T> Drop for Thread<Q, R, T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            let _ = inner.close_wait();
        }
    }
}

impl<Q, R, T> Thread<Q, R, T> {
    /// Spawn a thread with an unbounded channel.
    pub fn new<F, N>(main_loop: F) -> Thread<Q, R, T>
    where
        F: 'static + FnOnce(Rx<Q, R>) -> N + Send,
        N: 'static + Send + FnOnce() -> Result<T>,
        T: 'static + Send,
    {
        let (tx, rx) = mpsc::channel();
        let handle = std_thread::spawn(main_loop(rx));
        Thread { inner: Some(Inner { tx: Tx::N(tx), handle }), refn: Arc::new(true) }
    }

    /// Spawn a thread with a bounded channel, applying backpressure to
    /// callers once `channel_size` messages are queued.
    pub fn new_sync<F, N>(main_loop: F, channel_size: usize) -> Thread<Q, R, T>
    where
        F: 'static + FnOnce(Rx<Q, R>) -> N + Send,
        N: 'static + Send + FnOnce() -> Result<T>,
        T: 'static + Send,
    {
        let (tx, rx) = mpsc::sync_channel(channel_size);
        let handle = std_thread::spawn(main_loop(rx));
        Thread { inner: Some(Inner { tx: Tx::S(tx), handle }), refn: Arc::new(true) }
    }

    /// A new write handle to this thread. All write handles (and the
    /// `Thread` itself) must be dropped for the main loop to exit.
    pub fn to_writer(&self) -> Writer<Q, R> {
        let _refn = Arc::clone(&self.refn);
        Writer { tx: self.inner.as_ref().unwrap().tx.clone(), _refn }
    }

    /// Send a message without waiting for a response.
    pub fn post(&self, msg: Q) -> Result<()> {
        match &self.inner {
            Some(inner) => {
                match &inner.tx {
                    Tx::N(tx) => err_at!(Fatal, tx.send((msg, None)))?,
                    Tx::S(tx) => err_at!(Fatal, tx.send((msg, None)))?,
                };
                Ok(())
            }
            None => err_at!(Fatal, msg: "Thread.post() on a closed thread"),
        }
    }

    /// Send a message and block for the response.
    pub fn request(&self, request: Q) -> Result<R> {
        match &self.inner {
            Some(inner) => {
                let (tx, rx) = mpsc::channel();
                match &inner.tx {
                    Tx::N(thread_tx) => err_at!(Fatal, thread_tx.send((request, Some(tx))))?,
                    Tx::S(thread_tx) => err_at!(Fatal, thread_tx.send((request, Some(tx))))?,
                }
                err_at!(Fatal, rx.recv())
            }
            None => err_at!(Fatal, msg: "Thread.request() on a closed thread"),
        }
    }

    /// Send a message and block for the response, but never wait for
    /// room in a bounded channel: a full channel (built with
    /// [`Self::new_sync`]) is rejected immediately with `QueueFull`
    /// instead of applying backpressure to the caller. An unbounded
    /// channel (built with [`Self::new`]) never reports `QueueFull`.
    pub fn try_request(&self, request: Q) -> Result<R> {
        match &self.inner {
            Some(inner) => {
                let (tx, rx) = mpsc::channel();
                match &inner.tx {
                    Tx::N(thread_tx) => {
                        err_at!(Fatal, thread_tx.send((request, Some(tx))))?;
                    }
                    Tx::S(thread_tx) => match thread_tx.try_send((request, Some(tx))) {
                        Ok(()) => (),
                        Err(mpsc::TrySendError::Full(_)) => {
                            return err_at!(QueueFull, msg: "dispatcher inbound queue is full")
                        }
                        Err(mpsc::TrySendError::Disconnected(_)) => {
                            return err_at!(Fatal, msg: "Thread.try_request() on a closed thread")
                        }
                    },
                }
                err_at!(Fatal, rx.recv())
            }
            None => err_at!(Fatal, msg: "Thread.try_request() on a closed thread"),
        }
    }

    /// Number of live handles on this thread (writers + one for the
    /// `Thread` value itself).
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.refn)
    }

    /// Close the input channel and block until the main loop returns.
    pub fn close_wait(mut self) -> Result<T> {
        match self.inner.take() {
            Some(inner) => inner.close_wait(),
            None => err_at!(Fatal, msg: "Thread.close_wait() on a closed thread"),
        }
    }
}

/// A cloneable handle applications use to talk to a `Thread`.
pub struct Writer<Q, R> {
    tx: Tx<Q, R>,
    _refn: Arc<bool>,
}

impl<Q, R> Clone for Writer<Q, R> {
    fn clone(&self) -> Writer<Q, R> {
        Writer { tx: self.tx.clone(), _refn: Arc::clone(&self._refn) }
    }
}

impl<Q, R> Writer<Q, R> {
    pub fn post(&self, msg: Q) -> Result<()> {
        match &self.tx {
            Tx::N(tx) => err_at!(Fatal, tx.send((msg, None))),
            Tx::S(tx) => err_at!(Fatal, tx.send((msg, None))),
        }
    }

    pub fn request(&self, request: Q) -> Result<R> {
        let (tx, rx) = mpsc::channel();
        match &self.tx {
            Tx::N(thread_tx) => err_at!(Fatal, thread_tx.send((request, Some(tx))))?,
            Tx::S(thread_tx) => err_at!(Fatal, thread_tx.send((request, Some(tx))))?,
        }
        err_at!(Fatal, rx.recv())
    }
}

#[cfg(test)]
#[path = "thread_test.rs"]
mod thread_test;

//! The asynchronous brick-write dispatcher (C6).
//!
//! Callers hand a write to [`Dispatcher::put`] and return immediately;
//! an organizer thread holds the pending queue and a per-key stash so
//! that a write arriving while its key is already being processed
//! waits for that write to finish instead of racing it, and a pool of
//! worker threads ([`crate::worker`]) pull work from it and apply it
//! through [`crate::persisted_storage`]. Failures are retried up to a
//! configured limit before being handed to a caller-supplied callback
//! and dropped; the dispatcher keeps running afterwards.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, warn};

use crate::config::DispatcherConfig;
use crate::domain::Selection;
use crate::dtype::Array;
use crate::error::Result;
use crate::persistence::PersistenceLayer;
use crate::thread::Thread;
use crate::work::WorkItem;
use crate::work::WorkKey;
use crate::worker;

/// Invoked exactly once per work item that exhausts its retries,
/// per §4.6/§7: "surfaced to the user-supplied `failure_callback`,
/// which is responsible for logging and decision-making."
pub type FailureCallback = dyn Fn(String, WorkItem) + Send + Sync;

pub(crate) enum OrganizerMsg {
    Put(WorkItem),
    RequestWork,
    ReportSuccess(WorkKey),
    ReportFailure(WorkKey, WorkItem, String),
    DrainSignal,
    Shutdown,
}

pub(crate) enum OrganizerResp {
    Ack,
    Work(Option<WorkItem>),
    Drained(bool),
}

struct OrganizerState {
    /// The latest value queued or in flight for each key. Holds
    /// exactly one entry per key that is pending, active, or stashed;
    /// removed once the key's last known value either lands on disk
    /// or is permanently dropped after exhausting its retries.
    items: HashMap<WorkKey, WorkItem>,
    pending: VecDeque<WorkKey>,
    queued: HashSet<WorkKey>,
    active: HashSet<WorkKey>,
    /// Keys that received a new `put` while already active. On
    /// completion (success or retry) a stashed key is requeued so the
    /// newer value in `items` still gets written, per §4.6's
    /// organizer rule 2: "If key ∈ active: append to stashed[key]".
    stashed: HashSet<WorkKey>,
    failures: HashMap<Vec<u8>, u32>,
    config: DispatcherConfig,
    on_failure: Arc<FailureCallback>,
}

impl OrganizerState {
    fn new(config: DispatcherConfig, on_failure: Arc<FailureCallback>) -> OrganizerState {
        OrganizerState {
            items: HashMap::new(),
            pending: VecDeque::new(),
            queued: HashSet::new(),
            active: HashSet::new(),
            stashed: HashSet::new(),
            failures: HashMap::new(),
            config,
            on_failure,
        }
    }

    fn requeue(&mut self, key: WorkKey) {
        if !self.queued.contains(&key) {
            self.queued.insert(key.clone());
            self.pending.push_back(key);
        }
    }

    /// §4.6 organizer rules: a key already active gets stashed rather
    /// than handed to a second worker, preserving "at most one active
    /// work item per brick key" and the per-key ordering guarantee.
    fn put(&mut self, item: WorkItem) {
        let key = item.key.clone();
        self.items.insert(key.clone(), item);
        if self.active.contains(&key) {
            self.stashed.insert(key);
            return;
        }
        self.requeue(key);
    }

    fn take_work(&mut self) -> Option<WorkItem> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        let item = self.items.get(&key).cloned();
        if item.is_some() {
            self.active.insert(key);
        }
        item
    }

    fn report_success(&mut self, key: &WorkKey) {
        self.active.remove(key);
        if self.stashed.remove(key) {
            self.requeue(key.clone());
        } else {
            self.items.remove(key);
        }
    }

    /// The failure-counter key is the item's encoded bytes, not the
    /// `WorkKey` alone: a retry of the exact same payload keeps
    /// accumulating against the same counter, but once a newer `put`
    /// supersedes it (the stashed case below) the next attempt carries
    /// different bytes and starts its own counter at zero, so a
    /// fast-changing key is never penalized for an older value's
    /// failures.
    fn report_failure(&mut self, key: WorkKey, item: WorkItem, message: String) {
        self.active.remove(&key);
        let packed = item.packed().map(|p| p.0).unwrap_or_default();
        let attempts = {
            let counter = self.failures.entry(packed).or_insert(0);
            *counter += 1;
            *counter
        };

        // Whether or not a newer value was stashed while this one was
        // active, `items[key]` already holds the value that should be
        // tried next (the failed one, or the superseding one); only
        // the stash bookkeeping itself needs clearing before requeue.
        self.stashed.remove(&key);

        if attempts <= self.config.max_retries {
            warn!("brick write {:?} failed (attempt {}/{}): {}", key, attempts, self.config.max_retries, message);
            self.requeue(key);
        } else {
            error!("brick write {:?} permanently failed after {} attempts: {}", key, attempts, message);
            (self.on_failure)(message, item);
            self.items.remove(&key);
        }
    }

    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty() && self.stashed.is_empty()
    }
}

/// Handle to a running write dispatcher.
pub struct Dispatcher {
    organizer: Thread<OrganizerMsg, OrganizerResp, ()>,
    workers: Vec<thread::JoinHandle<()>>,
    shutting_down: Arc<AtomicBool>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Start a dispatcher with `config.workers` worker threads, all
    /// sharing `layer` behind a mutex. `on_failure` is called exactly
    /// once per work item that exhausts `config.max_retries` attempts;
    /// it never blocks retries of other keys.
    pub fn start(layer: Arc<Mutex<PersistenceLayer>>, config: DispatcherConfig, on_failure: Arc<FailureCallback>) -> Dispatcher {
        let organizer_config = config;
        let organizer = Thread::new_sync(move |rx| {
            move || {
                let mut state = OrganizerState::new(organizer_config, on_failure);
                loop {
                    match rx.recv() {
                        Ok((OrganizerMsg::Put(item), reply)) => {
                            state.put(item);
                            respond(reply, OrganizerResp::Ack);
                        }
                        Ok((OrganizerMsg::RequestWork, reply)) => {
                            let work = state.take_work();
                            respond(reply, OrganizerResp::Work(work));
                        }
                        Ok((OrganizerMsg::ReportSuccess(key), reply)) => {
                            state.report_success(&key);
                            respond(reply, OrganizerResp::Ack);
                        }
                        Ok((OrganizerMsg::ReportFailure(key, item, message), reply)) => {
                            state.report_failure(key, item, message);
                            respond(reply, OrganizerResp::Ack);
                        }
                        Ok((OrganizerMsg::DrainSignal, reply)) => {
                            respond(reply, OrganizerResp::Drained(state.is_drained()));
                        }
                        Ok((OrganizerMsg::Shutdown, reply)) => {
                            respond(reply, OrganizerResp::Ack);
                            break;
                        }
                        Err(_) => break, // every Writer dropped
                    }
                }
                Ok(())
            }
        }, config.queue_capacity.max(1));

        let shutting_down = Arc::new(AtomicBool::new(false));
        let retry_backoff = Duration::from_millis(config.retry_backoff_ms);
        let workers = (0..config.workers.max(1))
            .map(|id| {
                let writer = organizer.to_writer();
                let layer = Arc::clone(&layer);
                thread::spawn(move || worker::run(id, writer, layer, retry_backoff))
            })
            .collect();

        Dispatcher { organizer, workers, shutting_down, config }
    }

    /// Queue a write. A write arriving for a key that is already being
    /// processed waits for that write to finish rather than racing it;
    /// a write arriving for a key already waiting supersedes it
    /// outright (only the newest value for a key is ever applied).
    ///
    /// Per §5's backpressure policy, the inbound queue is bounded
    /// (`config.queue_capacity`); a submission arriving while it is
    /// full is rejected immediately with `QueueFull` rather than
    /// blocking the caller.
    pub fn put(&self, parameter: &str, selection: Selection, data: Array) -> Result<()> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return err_at!(ShutdownAfterSubmit, msg: "dispatcher is shutting down, rejected write to {:?}", parameter);
        }
        let item = WorkItem::new(parameter, selection, data);
        match self.organizer.try_request(OrganizerMsg::Put(item))? {
            OrganizerResp::Ack => Ok(()),
            _ => err_at!(Fatal, msg: "unexpected organizer response to Put"),
        }
    }

    /// `true` once every queued, active and stashed write has
    /// completed (succeeded or been handed to the failure callback).
    pub fn is_drained(&self) -> Result<bool> {
        match self.organizer.request(OrganizerMsg::DrainSignal)? {
            OrganizerResp::Drained(d) => Ok(d),
            _ => err_at!(Fatal, msg: "unexpected organizer response to DrainSignal"),
        }
    }

    /// Block until [`Self::is_drained`] would return `true`, or
    /// `timeout` elapses, whichever comes first. Returns whether the
    /// dispatcher actually drained.
    pub fn drain_signal(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_drained()? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    /// Stop accepting new writes. If `force` is `false`, blocks up to
    /// `timeout` for the queue to drain before tearing down workers;
    /// writes still pending past the timeout are abandoned with no
    /// callback invocation, per §5's acknowledged limitation.
    pub fn shutdown(self, force: bool, timeout: Duration) -> Result<()> {
        self.shutting_down.store(true, Ordering::SeqCst);

        if !force {
            self.drain_signal(timeout)?;
        }

        self.organizer.request(OrganizerMsg::Shutdown)?;
        self.organizer.close_wait()?;
        for handle in self.workers {
            let _ = handle.join();
        }
        Ok(())
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

fn respond(reply: Option<std::sync::mpsc::Sender<OrganizerResp>>, resp: OrganizerResp) {
    if let Some(reply) = reply {
        let _ = reply.send(resp);
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;

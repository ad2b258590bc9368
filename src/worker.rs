//! Dispatcher worker threads (C7): pull one work item at a time from
//! the organizer, apply it through [`crate::persisted_storage`], and
//! report back so the organizer can retire or retry it.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::dispatcher::{OrganizerMsg, OrganizerResp};
use crate::persisted_storage::PersistedStorage;
use crate::persistence::PersistenceLayer;
use crate::thread::Writer;

const IDLE_POLL: Duration = Duration::from_millis(20);

pub(crate) fn run(
    _id: usize,
    organizer: Writer<OrganizerMsg, OrganizerResp>,
    layer: Arc<Mutex<PersistenceLayer>>,
    retry_backoff: Duration,
) {
    loop {
        let item = match organizer.request(OrganizerMsg::RequestWork) {
            Ok(OrganizerResp::Work(Some(item))) => item,
            Ok(OrganizerResp::Work(None)) => {
                thread::sleep(IDLE_POLL);
                continue;
            }
            Ok(_) => continue,
            Err(_) => return, // organizer shut down
        };

        let key = item.key.clone();
        let outcome = {
            let mut guard = match layer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut storage = PersistedStorage::new(&mut guard, &item.parameter);
            storage.set(&item.selection, &item.data)
        };

        let failed = outcome.is_err();
        let msg = match outcome {
            Ok(()) => OrganizerMsg::ReportSuccess(key),
            Err(err) => OrganizerMsg::ReportFailure(key, item, err.to_string()),
        };
        let _ = organizer.post(msg);

        // Give a failing brick a brief pause before this worker comes
        // back asking for more work, so a persistently failing write
        // doesn't spin the retry loop against the same contended file.
        if failed && !retry_backoff.is_zero() {
            thread::sleep(retry_backoff);
        }
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;

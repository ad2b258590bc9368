use super::*;
use std::sync::Mutex;

use crate::config::BrickSizingPolicy;
use crate::domain::{AxisSelection, Selection};
use crate::dtype::{Array, ElementType, Scalar};
use crate::thread::Thread;
use crate::work::WorkItem;

#[test]
fn test_worker_applies_one_item_then_stops() {
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter(
            "p",
            vec![6],
            ElementType::F64,
            Scalar::F64(0.0),
            &BrickSizingPolicy::default(),
        )
        .unwrap();
    let layer = Arc::new(Mutex::new(layer));

    let sel = Selection::new(vec![AxisSelection::range(0, 6)]);
    let data = Array::F64 { shape: vec![6], data: vec![1.0; 6] };
    let item = WorkItem::new("p", sel.clone(), data.clone());

    let organizer: Thread<OrganizerMsg, OrganizerResp, ()> = Thread::new(move |rx| {
        let mut served = false;
        move || {
            while let Ok((msg, reply)) = rx.recv() {
                let resp = match msg {
                    OrganizerMsg::RequestWork if !served => {
                        served = true;
                        OrganizerResp::Work(Some(item.clone()))
                    }
                    OrganizerMsg::RequestWork => OrganizerResp::Work(None),
                    OrganizerMsg::ReportSuccess(_) => OrganizerResp::Ack,
                    OrganizerMsg::ReportFailure(..) => OrganizerResp::Ack,
                    OrganizerMsg::DrainSignal => OrganizerResp::Drained(served),
                    OrganizerMsg::Shutdown => {
                        if let Some(reply) = reply {
                            let _ = reply.send(OrganizerResp::Ack);
                        }
                        break;
                    }
                };
                if let Some(reply) = reply {
                    let _ = reply.send(resp);
                }
            }
            Ok(())
        }
    });

    let writer = organizer.to_writer();
    let layer_clone = Arc::clone(&layer);
    let handle = std::thread::spawn(move || run(0, writer, layer_clone, std::time::Duration::from_millis(0)));

    // give the worker a moment to pick up and apply the item
    std::thread::sleep(std::time::Duration::from_millis(100));
    organizer.request(OrganizerMsg::Shutdown).unwrap();
    handle.join().unwrap();

    let mut guard = layer.lock().unwrap();
    let mut storage = PersistedStorage::new(&mut guard, "p");
    let got = storage.get(&sel).unwrap();
    assert_eq!(got, data);
}

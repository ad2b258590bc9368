use super::*;
use crate::error::Error;

#[test]
fn test_post_and_close() {
    let t: Thread<i32, (), i32> = Thread::new(|rx: Rx<i32, ()>| {
        move || {
            let mut sum = 0;
            while let Ok((msg, _)) = rx.recv() {
                sum += msg;
            }
            Ok(sum)
        }
    });
    t.post(1).unwrap();
    t.post(2).unwrap();
    t.post(3).unwrap();
    let total = t.close_wait().unwrap();
    assert_eq!(total, 6);
}

#[test]
fn test_request_response() {
    let t: Thread<i32, i32, ()> = Thread::new(|rx: Rx<i32, i32>| {
        move || {
            while let Ok((msg, reply)) = rx.recv() {
                if let Some(reply) = reply {
                    let _ = reply.send(msg * 2);
                }
            }
            Ok(())
        }
    });
    assert_eq!(t.request(21).unwrap(), 42);
    t.close_wait().unwrap();
}

#[test]
fn test_try_request_rejects_when_bounded_channel_is_full() {
    // A rendezvous channel (capacity 0) has no room until a `recv` is
    // actively waiting for it; holding the main loop back with
    // `start_rx` keeps it unready so the first `try_request` observes
    // a full channel deterministically instead of racing the thread.
    let (start_tx, start_rx) = mpsc::channel::<()>();
    let t: Thread<i32, i32, ()> = Thread::new_sync(
        move |rx: Rx<i32, i32>| {
            move || {
                let _ = start_rx.recv();
                while let Ok((msg, reply)) = rx.recv() {
                    if let Some(reply) = reply {
                        let _ = reply.send(msg);
                    }
                }
                Ok(())
            }
        },
        0,
    );

    match t.try_request(1) {
        Err(Error::QueueFull(_, _)) => (),
        other => panic!("expected QueueFull, got {:?}", other.map(|_| ())),
    }

    start_tx.send(()).unwrap();
    assert_eq!(t.request(2).unwrap(), 2);
    t.close_wait().unwrap();
}

#[test]
fn test_writer_handles_keep_ref_count() {
    let t: Thread<i32, (), ()> = Thread::new(|rx: Rx<i32, ()>| {
        move || {
            while rx.recv().is_ok() {}
            Ok(())
        }
    });
    let w1 = t.to_writer();
    let w2 = t.to_writer();
    assert_eq!(t.ref_count(), 3);
    drop(w1);
    drop(w2);
    assert_eq!(t.ref_count(), 1);
}

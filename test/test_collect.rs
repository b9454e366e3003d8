use std::sync::mpsc::channel;
use std::time::Duration;
use promissory::{pair, Error, Future, Outcome};
use super::{init_logging, spawn, sleep_ms};

#[test]
pub fn test_concurrent_collectors_see_same_outcome() {
    init_logging();

    let (f, c) = pair::<String>();
    let (tx, rx) = channel();

    for _ in 0..8 {
        let f = f.clone();
        let tx = tx.clone();

        spawn(move || {
            tx.send(f.collect().unwrap()).unwrap();
        });
    }

    sleep_ms(30);
    c.resolve("done".to_string());

    for _ in 0..8 {
        assert_eq!(rx.recv().unwrap(), "done");
    }
}

#[test]
pub fn test_repeated_collect_after_completion() {
    let f = Future::<u32>::rejected(Error::msg("E"));

    for _ in 0..5 {
        assert_eq!(f.collect().unwrap_err().to_string(), "E");
    }
}

#[test]
pub fn test_collect_timeout_then_complete() {
    let (f, c) = pair::<u32>();

    spawn(move || {
        sleep_ms(50);
        c.resolve(1);
    });

    assert!(f.collect_timeout(Duration::from_millis(1)).is_none());
    assert_eq!(f.collect_timeout(Duration::from_secs(5)).unwrap().unwrap(), 1);
}

#[test]
pub fn test_outcome_snapshot() {
    let (f, c) = pair::<u32>();
    assert!(matches!(f.outcome(), Outcome::Pending));

    c.reject(Error::msg("E"));
    assert!(matches!(f.outcome(), Outcome::Rejected(_)));
}

#[test]
pub fn test_conversions_block_for_outcome() {
    let f = Future::create(|c| {
        sleep_ms(20);
        c.resolve(3);
    });

    assert_eq!(f.to_either().right(), Some(3));
    assert!(!f.to_either().is_left());
    assert_eq!(f.to_result().unwrap(), 3);
    assert_eq!(f.to_option(), Some(3));
}

#[test]
pub fn test_abandoned_producer_rejects() {
    let f = Future::<u32>::create(|_c| {
        // Completer dropped without resolving
    });

    assert!(matches!(f.collect(), Err(Error::Abandoned)));
}

#[test]
pub fn test_panicking_producer_rejects() {
    let f = Future::<u32>::create(|_c| {
        panic!("producer failed");
    });

    let next = f.then(|v| Ok(v + 1));

    assert_eq!(f.collect().unwrap_err().to_string(), "panicked: producer failed");
    assert_eq!(next.collect().unwrap_err().to_string(), "panicked: producer failed");
}

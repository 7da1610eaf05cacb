//! End-to-end tests for `ProcessVariable` against a recording mock of the
//! event-service collaborator, so subscription counts and published traffic
//! can be asserted precisely.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use procvar::{
    int_key, Event, EventCallback, EventKey, EventService, Params, ProcessVariable, PvError,
    PvResult, Refreshable, Subscription, SubscriptionId, TransportError,
};

struct RecordedSubscription {
    id: SubscriptionId,
    cancelled: AtomicBool,
}

impl Subscription for RecordedSubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Mock collaborator: records every publish and subscription request, and
/// lets the test drive inbound deliveries by hand.
#[derive(Default)]
struct RecordingService {
    subscribe_calls: AtomicUsize,
    fail_subscribe: AtomicBool,
    fail_publish: AtomicBool,
    published: Mutex<Vec<Event>>,
    callbacks: Mutex<Vec<(EventKey, EventCallback)>>,
}

impl RecordingService {
    fn deliver(&self, event: &Event) {
        let callbacks = self.callbacks.lock().unwrap();
        for (_key, callback) in callbacks.iter().filter(|(key, _)| key == event.key()) {
            callback(event);
        }
    }

    fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl EventService for RecordingService {
    fn publish(&self, event: Event) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed {
                message: "publisher unavailable".to_string(),
            });
        }

        self.published.lock().unwrap().push(event);
        Ok(())
    }

    fn subscribe(
        &self,
        key: &EventKey,
        on_event: EventCallback,
    ) -> Result<Box<dyn Subscription>, TransportError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed {
                message: "subscriber unavailable".to_string(),
            });
        }

        self.callbacks.lock().unwrap().push((key.clone(), on_event));
        Ok(Box::new(RecordedSubscription {
            id: SubscriptionId::new(),
            cancelled: AtomicBool::new(false),
        }))
    }

    fn latest(&self, _key: &EventKey) -> Result<Option<Event>, TransportError> {
        Ok(None)
    }
}

#[derive(Default)]
struct CountingObserver {
    refreshes: AtomicUsize,
}

impl Refreshable for CountingObserver {
    fn refresh(&self, _context: &Params) -> PvResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingObserver {
    attempts: AtomicUsize,
}

impl Refreshable for FailingObserver {
    fn refresh(&self, _context: &Params) -> PvResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PvError::internal("observer is broken"))
    }
}

struct ContextObserver {
    seen: Mutex<Vec<Params>>,
}

impl Refreshable for ContextObserver {
    fn refresh(&self, context: &Params) -> PvResult<()> {
        self.seen.lock().unwrap().push(context.clone());
        Ok(())
    }
}

fn temperature_variable(service: &Arc<RecordingService>) -> ProcessVariable<i64> {
    ProcessVariable::new(
        Event::system("TCS", "filter"),
        int_key("temperature"),
        Arc::clone(service) as Arc<dyn EventService>,
    )
}

#[test]
fn temperature_scenario() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    // Unpopulated key reads as not-found.
    let err = pv.get().unwrap_err();
    assert!(err.is_not_found());

    // Read-your-own-write before any round trip.
    pv.set(42).unwrap();
    assert_eq!(pv.get().unwrap(), 42);
    assert_eq!(service.published_count(), 1);

    let a = Arc::new(CountingObserver::default());
    let b = Arc::new(CountingObserver::default());
    let a_ref: Arc<dyn Refreshable> = a.clone();
    let b_ref: Arc<dyn Refreshable> = b.clone();
    pv.bind(&a_ref).unwrap();
    pv.bind(&b_ref).unwrap();
    assert_eq!(service.subscribe_calls.load(Ordering::SeqCst), 1);

    // One inbound delivery refreshes each attached observer exactly once.
    let inbound = Event::system("TCS", "filter").add(int_key("temperature").set(77));
    service.deliver(&inbound);

    assert_eq!(a.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(b.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(pv.get().unwrap(), 77);
}

#[test]
fn concurrent_binds_issue_one_subscription() {
    const BINDERS: usize = 8;

    let service = Arc::new(RecordingService::default());
    let pv = Arc::new(temperature_variable(&service));
    let barrier = Arc::new(Barrier::new(BINDERS));

    let handles: Vec<_> = (0..BINDERS)
        .map(|_| {
            let pv = Arc::clone(&pv);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let observer: Arc<dyn Refreshable> = Arc::new(CountingObserver::default());
                barrier.wait();
                pv.bind(&observer).unwrap();
                // Keep the observer alive past the bind.
                observer
            })
        })
        .collect();

    let observers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(service.subscribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pv.observer_count(), BINDERS);
    drop(observers);
}

#[test]
fn fanout_reaches_every_attached_observer() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    let observers: Vec<Arc<CountingObserver>> =
        (0..3).map(|_| Arc::new(CountingObserver::default())).collect();
    for observer in &observers {
        let as_refreshable: Arc<dyn Refreshable> = observer.clone();
        pv.bind(&as_refreshable).unwrap();
    }

    service.deliver(&Event::system("TCS", "filter").add(int_key("temperature").set(1)));
    service.deliver(&Event::system("TCS", "filter").add(int_key("temperature").set(2)));

    for observer in &observers {
        assert_eq!(observer.refreshes.load(Ordering::SeqCst), 2);
    }
    assert_eq!(pv.get().unwrap(), 2);
}

#[test]
fn publish_failure_keeps_local_write() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    service.fail_publish.store(true, Ordering::SeqCst);
    let err = pv.set(42).unwrap_err();
    assert!(matches!(err, PvError::Publish(_)));

    // Last-writer-local: the snapshot already reflects the write.
    assert_eq!(pv.get().unwrap(), 42);
    assert_eq!(service.published_count(), 0);

    // An explicit retry publishes the merged state.
    service.fail_publish.store(false, Ordering::SeqCst);
    pv.set(42).unwrap();
    assert_eq!(service.published_count(), 1);
}

#[test]
fn merging_never_mutates_the_previous_snapshot() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    let before = pv.latest_event().unwrap();
    pv.set(42).unwrap();
    let after = pv.latest_event().unwrap();

    assert_ne!(before.id(), after.id());
    assert!(before.params().is_empty());
    assert_eq!(before.key(), after.key());
}

#[test]
fn key_populated_by_inbound_delivery_alone() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    let observer: Arc<dyn Refreshable> = Arc::new(CountingObserver::default());
    pv.bind(&observer).unwrap();

    assert!(pv.get().unwrap_err().is_not_found());

    service.deliver(&Event::system("TCS", "filter").add(int_key("temperature").set(9)));
    assert_eq!(pv.get().unwrap(), 9);
}

#[test]
fn failing_observer_does_not_starve_the_rest() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    let broken = Arc::new(FailingObserver {
        attempts: AtomicUsize::new(0),
    });
    let healthy = Arc::new(CountingObserver::default());
    let broken_ref: Arc<dyn Refreshable> = broken.clone();
    let healthy_ref: Arc<dyn Refreshable> = healthy.clone();
    pv.bind(&broken_ref).unwrap();
    pv.bind(&healthy_ref).unwrap();

    service.deliver(&Event::system("TCS", "filter").add(int_key("temperature").set(1)));
    service.deliver(&Event::system("TCS", "filter").add(int_key("temperature").set(2)));

    // The broken observer was attempted each time and the healthy one was
    // never skipped.
    assert_eq!(broken.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(healthy.refreshes.load(Ordering::SeqCst), 2);
}

#[test]
fn refresh_context_carries_delivered_params() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    let observer = Arc::new(ContextObserver {
        seen: Mutex::new(Vec::new()),
    });
    let as_refreshable: Arc<dyn Refreshable> = observer.clone();
    pv.bind(&as_refreshable).unwrap();

    let inbound = Event::system("TCS", "filter").add(int_key("temperature").set(77));
    service.deliver(&inbound);

    let seen = observer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].first_value(&int_key("temperature")).unwrap(), 77);
}

#[test]
fn event_key_is_fixed_at_construction() {
    let service = Arc::new(RecordingService::default());
    let pv = temperature_variable(&service);

    assert_eq!(format!("{}", pv.event_key()), "TCS.filter");

    // Updates replace the snapshot but never the routing identity.
    pv.set(1).unwrap();
    service.deliver(&Event::system("TCS", "filter").add(int_key("temperature").set(2)));
    assert_eq!(format!("{}", pv.event_key()), "TCS.filter");
}

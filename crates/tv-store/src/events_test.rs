use super::*;

fn recorder(bus: &EventBus) -> (SubscriptionId, Arc<Mutex<Vec<MigrationEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (id, seen)
}

#[test]
fn test_emit_without_listeners_is_noop() {
    let bus = EventBus::new();
    bus.emit(&MigrationEvent::MigrationStarted);
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_listeners_receive_events_in_order() {
    let bus = EventBus::new();
    let (_, seen) = recorder(&bus);

    bus.emit(&MigrationEvent::SlowOperationStarted {
        title: "Importing".to_string(),
        message: "Please wait".to_string(),
    });
    bus.emit(&MigrationEvent::SlowOperationPulse);
    bus.emit(&MigrationEvent::SlowOperationFinished);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], MigrationEvent::SlowOperationStarted { .. }));
    assert_eq!(seen[1], MigrationEvent::SlowOperationPulse);
    assert_eq!(seen[2], MigrationEvent::SlowOperationFinished);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let bus = EventBus::new();
    let (first, first_seen) = recorder(&bus);
    let (_, second_seen) = recorder(&bus);

    assert!(bus.unsubscribe(first));
    bus.emit(&MigrationEvent::MigrationFinished);

    assert!(first_seen.lock().unwrap().is_empty());
    assert_eq!(second_seen.lock().unwrap().len(), 1);
    assert_eq!(bus.listener_count(), 1);
}

#[test]
fn test_unsubscribe_unknown_id() {
    let bus = EventBus::new();
    let (id, _) = recorder(&bus);
    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
}

#[test]
fn test_listener_may_unsubscribe_during_emit() {
    let bus = Arc::new(EventBus::new());
    let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

    let bus_ref = Arc::clone(&bus);
    let slot_ref = Arc::clone(&slot);
    let id = bus.subscribe(move |_| {
        if let Some(id) = slot_ref.lock().unwrap().take() {
            bus_ref.unsubscribe(id);
        }
    });
    *slot.lock().unwrap() = Some(id);

    bus.emit(&MigrationEvent::SlowOperationPulse);
    assert_eq!(bus.listener_count(), 0);
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use slotguard::clock::{format_hhmm, parse_slot};
use slotguard::config::{EngineConfig, ReportFormat};
use slotguard::engine::{Engine, EngineError};
use slotguard::model::{Event, ReservationRequest, TimeSlot};
use slotguard::notify::NotifyHub;
use slotguard::reporter;

// ── Test infrastructure ──────────────────────────────────────

fn campus(auto_resolve: bool) -> (Arc<Engine>, Arc<NotifyHub>) {
    let notify = Arc::new(NotifyHub::new());
    let config = EngineConfig {
        auto_resolve,
        ..EngineConfig::default()
    };
    let engine = Engine::new(["A101", "B201", "C301"], config, notify.clone()).unwrap();
    (Arc::new(engine), notify)
}

/// `"HH:MM-HH:MM"`
fn slot(when: &str) -> TimeSlot {
    let (start, end) = when.split_once('-').unwrap();
    parse_slot(start, end).unwrap()
}

fn book(resource: &str, activity: &str, when: &str, priority: u8) -> ReservationRequest {
    ReservationRequest::new(resource, activity, slot(when)).with_priority(priority)
}

/// Wait for an event with timeout.
async fn recv_event(rx: &mut broadcast::Receiver<Event>, timeout: Duration) -> Option<Event> {
    tokio::time::timeout(timeout, rx.recv()).await.ok()?.ok()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn booking_day_end_to_end() {
    let (engine, _notify) = campus(false);

    let lecture = engine.add_reservation(book("A101", "lecture", "09:00-11:00", 5)).await.unwrap();
    engine.add_reservation(book("B201", "seminar", "09:00-10:00", 3)).await.unwrap();
    engine.add_reservation(book("A101", "lab", "13:00-15:00", 7)).await.unwrap();

    let clash = engine.add_reservation(book("A101", "exam", "10:00-12:00", 9)).await;
    assert_eq!(
        clash,
        Err(EngineError::Conflict {
            resource: "A101".into(),
            conflicting: vec![lecture],
        })
    );

    let slot = slot("10:00-12:00");
    assert_eq!(engine.find_available_resources(slot).await.unwrap(), vec!["B201", "C301"]);
    assert_eq!(engine.find_best_resource(slot, 1).await.unwrap().as_deref(), Some("B201"));
    let exam = engine.add_reservation(book("B201", "exam", "10:00-12:00", 9)).await.unwrap();

    let schedule = engine.schedule_report(Some("A101")).await.unwrap();
    let starts: Vec<String> = schedule.resources[0]
        .entries
        .iter()
        .map(|r| format_hhmm(r.slot.start))
        .collect();
    assert_eq!(starts, vec!["09:00", "13:00"]);

    assert!(engine.detect_all_conflicts().await.is_empty());
    assert_eq!(engine.get_total_reservations(), 4);
    assert_eq!(engine.get_reservation(exam).await.unwrap().resource, "B201");

    let text = reporter::render(&engine, ReportFormat::Text).await;
    assert!(text.contains("A101: 2 reservations, utilization 50.0%"));
    assert!(text.contains("no conflicts"));
}

#[tokio::test]
async fn auto_resolve_notifies_subscribers() {
    let (engine, notify) = campus(true);
    let mut rx = notify.subscribe("A101");
    let timeout = Duration::from_secs(1);

    let standup = engine.add_reservation(book("A101", "standup", "09:00-09:30", 2)).await.unwrap();
    let review = engine.add_reservation(book("A101", "review", "09:00-10:00", 8)).await.unwrap();

    assert!(matches!(
        recv_event(&mut rx, timeout).await,
        Some(Event::ReservationAdded { reservation }) if reservation.id == standup
    ));
    assert_eq!(
        recv_event(&mut rx, timeout).await,
        Some(Event::ReservationEvicted {
            id: standup,
            resource: "A101".into(),
            by: review,
        })
    );
    assert!(matches!(
        recv_event(&mut rx, timeout).await,
        Some(Event::ReservationAdded { reservation }) if reservation.id == review
    ));
    assert!(engine.get_reservation(standup).await.is_none());
}

#[tokio::test]
async fn moving_between_resources_notifies_both() {
    let (engine, notify) = campus(false);
    let mut from = notify.subscribe("A101");
    let mut to = notify.subscribe("C301");
    let timeout = Duration::from_secs(1);

    let id = engine.add_reservation(book("A101", "workshop", "14:00-16:00", 5)).await.unwrap();
    let _ = recv_event(&mut from, timeout).await;

    engine.update_reservation(id, book("C301", "workshop", "14:00-16:00", 5)).await.unwrap();
    for rx in [&mut from, &mut to] {
        match recv_event(rx, timeout).await {
            Some(Event::ReservationUpdated { previous, current }) => {
                assert_eq!(previous.resource, "A101");
                assert_eq!(current.resource, "C301");
                assert_eq!(current.id, id);
            }
            other => panic!("expected update event, got {other:?}"),
        }
    }

    // Nothing else was sent to A101.
    assert!(recv_event(&mut from, Duration::from_millis(50)).await.is_none());
}

#[tokio::test]
async fn alternatives_when_everything_is_taken() {
    let (engine, _notify) = campus(false);
    let slot = slot("09:00-10:00");
    for room in ["A101", "B201", "C301"] {
        engine.add_reservation(book(room, "talk", "09:00-10:00", 6)).await.unwrap();
    }

    assert!(engine.find_available_resources(slot).await.unwrap().is_empty());
    assert_eq!(engine.find_best_resource(slot, 6).await.unwrap(), None);
    assert_eq!(engine.find_best_resource(slot, 7).await.unwrap().as_deref(), Some("A101"));

    let slots = engine.suggest_alternative_slots("A101", slot, 60).await.unwrap();
    assert_eq!(slots, vec![TimeSlot::new(480, 540), TimeSlot::new(600, 660)]);

    let free = engine.find_free_slots("A101", 60).await.unwrap();
    assert_eq!(free, vec![TimeSlot::new(480, 540), TimeSlot::new(600, 1080)]);
}

#[tokio::test]
async fn removing_resource_cancels_its_bookings() {
    let (engine, notify) = campus(false);
    let mut rx = notify.subscribe("C301");
    let a = engine.add_reservation(book("C301", "a", "08:00-09:00", 5)).await.unwrap();
    let b = engine.add_reservation(book("C301", "b", "09:00-10:00", 5)).await.unwrap();
    let _ = recv_event(&mut rx, Duration::from_secs(1)).await;
    let _ = recv_event(&mut rx, Duration::from_secs(1)).await;

    let cancelled = engine.remove_resource("C301").await.unwrap();
    assert_eq!(cancelled.len(), 2);
    assert_eq!(
        recv_event(&mut rx, Duration::from_secs(1)).await,
        Some(Event::ResourceRemoved {
            resource: "C301".into(),
            cascaded: vec![a, b],
        })
    );
    // Channel is dropped with the resource.
    assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    assert_eq!(engine.get_available_resources(), vec!["A101", "B201"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_never_double_book() {
    let (engine, _notify) = campus(false);
    let mut handles = Vec::new();
    for client in 0..8u32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut won = Vec::new();
            for hour in 8..18u32 {
                let req = ReservationRequest::new(
                    "A101",
                    format!("client-{client}"),
                    TimeSlot::new(hour * 60, hour * 60 + 60),
                );
                if let Ok(id) = engine.add_reservation(req).await {
                    won.push(id);
                }
            }
            won
        }));
    }

    let mut total = 0;
    for h in handles {
        total += h.await.unwrap().len();
    }
    assert_eq!(total, 10);
    assert_eq!(
        engine
            .query_occupancy("A101", TimeSlot::new(0, 1440))
            .await
            .unwrap(),
        1
    );
    assert!(engine.detect_all_conflicts().await.is_empty());
}

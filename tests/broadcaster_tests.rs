use chrono::Utc;
use pix_monitor::application::broadcaster::{EventBroadcaster, SUBSCRIPTION_CAPACITY};
use pix_monitor::domain::event::PaymentEvent;
use pix_monitor::domain::payment::{Amount, PaymentId, PaymentStatus, PixPayment};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn event(id: u64, status: PaymentStatus) -> PaymentEvent {
    let amount = Amount::new(dec!(10)).unwrap();
    let payment = PixPayment::restore(PaymentId(id), amount, status, Utc::now());
    PaymentEvent::transition(&payment, Utc::now())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_and_broadcast_across_payments() {
    let broadcaster = Arc::new(EventBroadcaster::new());
    let mut tasks = Vec::new();

    for id in 1..=50u64 {
        let broadcaster = Arc::clone(&broadcaster);
        tasks.push(tokio::spawn(async move {
            let mut subscription = broadcaster.subscribe(PaymentId(id));
            broadcaster.broadcast(event(id, PaymentStatus::Created));
            broadcaster.broadcast(event(id, PaymentStatus::Authorized));

            let first = subscription.recv().await.unwrap();
            let second = subscription.recv().await.unwrap();
            assert_eq!(first.payment_id(), PaymentId(id));
            assert_eq!(first.status(), PaymentStatus::Created);
            assert_eq!(second.status(), PaymentStatus::Authorized);

            broadcaster.unsubscribe(&mut subscription);
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(broadcaster.tracked_payments(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churning_subscribers_do_not_disturb_a_steady_one() {
    let broadcaster = Arc::new(EventBroadcaster::new());
    let mut steady = broadcaster.subscribe(PaymentId(7));

    let churn = {
        let broadcaster = Arc::clone(&broadcaster);
        tokio::spawn(async move {
            for _ in 0..200 {
                let mut subscription = broadcaster.subscribe(PaymentId(7));
                tokio::task::yield_now().await;
                broadcaster.unsubscribe(&mut subscription);
                assert!(subscription.recv().await.is_none());
            }
        })
    };

    let mut received = 0;
    for _ in 0..SUBSCRIPTION_CAPACITY {
        assert!(broadcaster.broadcast(event(7, PaymentStatus::Authorized)) >= 1);
        tokio::task::yield_now().await;
    }
    while steady.pending() > 0 {
        steady.recv().await.unwrap();
        received += 1;
    }
    churn.await.unwrap();

    assert_eq!(received, SUBSCRIPTION_CAPACITY);
    assert!(broadcaster.is_registered(&steady));
    assert_eq!(broadcaster.subscriber_count(PaymentId(7)), 1);
}

#[tokio::test]
async fn test_broadcast_without_subscribers_is_a_no_op() {
    let broadcaster = EventBroadcaster::new();
    assert_eq!(broadcaster.broadcast(event(1, PaymentStatus::Created)), 0);
    assert_eq!(broadcaster.tracked_payments(), 0);
}

#[tokio::test]
async fn test_unsubscribed_observer_misses_later_events() {
    let broadcaster = EventBroadcaster::new();
    let mut leaving = broadcaster.subscribe(PaymentId(1));
    let mut sibling = broadcaster.subscribe(PaymentId(1));
    let mut other = broadcaster.subscribe(PaymentId(2));

    broadcaster.unsubscribe(&mut leaving);
    assert_eq!(broadcaster.broadcast(event(1, PaymentStatus::Authorized)), 1);

    assert!(leaving.recv().await.is_none());
    let received = sibling.recv().await.unwrap();
    assert_eq!(received.status(), PaymentStatus::Authorized);
    assert_eq!(other.pending(), 0);

    assert_eq!(broadcaster.broadcast(event(2, PaymentStatus::Settled)), 1);
    assert_eq!(other.recv().await.unwrap().status(), PaymentStatus::Settled);
    assert_eq!(sibling.pending(), 0);
}

#[tokio::test]
async fn test_dropping_a_subscription_unregisters_it() {
    let broadcaster = EventBroadcaster::new();
    drop(broadcaster.subscribe(PaymentId(9)));
    assert_eq!(broadcaster.tracked_payments(), 0);
    assert_eq!(broadcaster.broadcast(event(9, PaymentStatus::Created)), 0);
}

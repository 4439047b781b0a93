//! Pump-to-Dispatcher Handoff
//!
//! A single-slot channel carries update messages from the pump thread to the
//! cooperative loop. The pump blocks while the slot is occupied, then posts a
//! work-ready signal; the dispatcher task wakes on the signal and takes
//! exactly one message per wake-up.

use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PublishError, UpdateInbox, UpdatePublisher};
use crate::application::services::Dispatcher;
use crate::domain::series::UpdateMessage;

/// Messages that may be in flight at once.
pub const HANDOFF_CAPACITY: usize = 1;

/// Create the handoff pair. `ready` is the work-ready signal of the
/// consuming loop.
#[must_use]
pub fn channel(ready: Arc<Notify>) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
    (UpdateSender { tx, ready }, UpdateReceiver { rx })
}

// =============================================================================
// Producer
// =============================================================================

/// Pump-side half. Must be used from a thread outside the async runtime.
#[derive(Debug)]
pub struct UpdateSender {
    tx: mpsc::Sender<UpdateMessage>,
    ready: Arc<Notify>,
}

impl UpdatePublisher for UpdateSender {
    fn publish(&self, message: UpdateMessage) -> Result<(), PublishError> {
        self.tx
            .blocking_send(message)
            .map_err(|_| PublishError::ConsumerGone)?;
        self.ready.notify_one();
        Ok(())
    }
}

// =============================================================================
// Consumer
// =============================================================================

/// Loop-side half.
#[derive(Debug)]
pub struct UpdateReceiver {
    rx: mpsc::Receiver<UpdateMessage>,
}

impl UpdateInbox for UpdateReceiver {
    fn try_take(&mut self) -> Option<UpdateMessage> {
        self.rx.try_recv().ok()
    }
}

/// Apply updates as they are signalled until `closed` is cancelled.
///
/// On close, a message that was already handed over is still applied.
/// Returns the dispatcher so its final series can be inspected.
pub async fn run_dispatcher(
    mut dispatcher: Dispatcher,
    mut inbox: UpdateReceiver,
    ready: Arc<Notify>,
    closed: CancellationToken,
) -> Dispatcher {
    tracing::info!("Dispatcher started");

    loop {
        tokio::select! {
            biased;
            () = closed.cancelled() => break,
            () = ready.notified() => {
                dispatcher.dispatch_once(&mut inbox);
            }
        }
    }

    let mut drained = 0usize;
    while let Some(message) = inbox.try_take() {
        dispatcher.apply(message);
        drained += 1;
    }

    tracing::info!(
        applied = dispatcher.applied(),
        drained,
        "Dispatcher stopped"
    );
    dispatcher
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::application::ports::SeriesKind;
    use crate::domain::chart::{ChartParams, ChartRow, compute_chart_rows};
    use crate::domain::record::RawRecord;
    use crate::infrastructure::surface::MemorySurface;

    fn rows(line: &str) -> Vec<ChartRow> {
        let record = RawRecord::parse_line(line).unwrap();
        compute_chart_rows(&[record], &ChartParams::default())
    }

    fn historical(line: &str) -> UpdateMessage {
        UpdateMessage {
            historical: Some(rows(line)),
            live: None,
        }
    }

    #[test]
    fn second_message_waits_for_the_first_to_be_taken() {
        let ready = Arc::new(Notify::new());
        let (sender, mut receiver) = channel(Arc::clone(&ready));
        sender.publish(historical("100,10.0,5,3,8,1.0,1.0,0.5")).unwrap();

        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);
        let producer = std::thread::spawn(move || {
            sender.publish(historical("101,10.25,2,9,11,4.0,1.0,0.75")).unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(!delivered.load(Ordering::SeqCst));

        let first = receiver.try_take().unwrap();
        producer.join().unwrap();
        assert!(delivered.load(Ordering::SeqCst));

        let second = receiver.try_take().unwrap();
        assert_eq!(first.historical.unwrap()[0].middle, 100.0);
        assert_eq!(second.historical.unwrap()[0].middle, 101.0);
        assert!(receiver.try_take().is_none());
    }

    #[test]
    fn publish_fails_once_the_receiver_is_gone() {
        let (sender, receiver) = channel(Arc::new(Notify::new()));
        drop(receiver);

        let result = sender.publish(UpdateMessage::default());
        assert_eq!(result, Err(PublishError::ConsumerGone));
    }

    #[tokio::test]
    async fn dispatcher_applies_every_published_message_in_order() {
        let ready = Arc::new(Notify::new());
        let closed = CancellationToken::new();
        let (sender, receiver) = channel(Arc::clone(&ready));

        let surface = MemorySurface::new();
        let dispatcher = Dispatcher::new(Box::new(surface.clone()), Vec::new());

        let producer_closed = closed.clone();
        let producer = std::thread::spawn(move || {
            sender.publish(historical("100,10.0,5,3,8,1.0,1.0,0.5")).unwrap();
            sender.publish(historical("101,10.25,2,9,11,4.0,1.0,0.75")).unwrap();
            sender
                .publish(UpdateMessage {
                    historical: None,
                    live: Some(rows("200,11.0,9,9,18,1.0,1.0,1.0")),
                })
                .unwrap();
            producer_closed.cancel();
        });

        let dispatcher = run_dispatcher(dispatcher, receiver, ready, closed).await;
        producer.join().unwrap();

        assert_eq!(dispatcher.applied(), 3);
        let historical_rows = surface.snapshot(SeriesKind::Historical).unwrap();
        assert_eq!(historical_rows.len(), 2);
        assert_eq!(historical_rows[0].middle, 100.0);
        assert_eq!(historical_rows[1].middle, 101.0);
        assert_eq!(surface.snapshot(SeriesKind::Live).unwrap().len(), 1);
    }
}

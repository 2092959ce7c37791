//! Periodic telemetry publishers.
//!
//! A [`TelemetryPublisher`] pairs a topic with a payload producer and an
//! interval.  Once started it runs on its own thread and pushes a
//! [`TelemetryMessage`] onto a [`tokio::sync::broadcast`] channel every
//! interval until its [`PublisherHandle`] is stopped or dropped.
//!
//! Sending to a channel without subscribers is not an error; the message is
//! simply discarded.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use simbot_runtime::Signal;
use simbot_types::RobotError;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// One telemetry sample addressed to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryMessage {
    pub topic: String,
    /// JSON-encoded payload.
    pub payload: String,
}

type Producer = Box<dyn Fn() -> Result<String, RobotError> + Send + 'static>;

/// A not-yet-started periodic publisher.
pub struct TelemetryPublisher {
    name: String,
    topic: String,
    interval: Duration,
    producer: Producer,
}

impl TelemetryPublisher {
    pub fn new<F>(
        name: impl Into<String>,
        topic: impl Into<String>,
        interval: Duration,
        producer: F,
    ) -> Self
    where
        F: Fn() -> Result<String, RobotError> + Send + 'static,
    {
        Self {
            name: name.into(),
            topic: topic.into(),
            interval,
            producer: Box::new(producer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the publishing thread.
    ///
    /// The first sample is sent immediately; subsequent samples follow every
    /// `interval`.  Producer errors are logged and the sample is skipped.
    pub fn start(
        self,
        sender: broadcast::Sender<TelemetryMessage>,
    ) -> Result<PublisherHandle, RobotError> {
        let stop = Arc::new(Signal::new(false));
        let name = self.name.clone();
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("telemetry-{}", self.name))
            .spawn(move || self.run(&sender, &thread_stop))
            .map_err(|e| RobotError::Telemetry(format!("failed to spawn {name} publisher: {e}")))?;

        Ok(PublisherHandle {
            name,
            stop,
            thread: Some(thread),
        })
    }

    fn run(self, sender: &broadcast::Sender<TelemetryMessage>, stop: &Signal) {
        info!(publisher = %self.name, topic = %self.topic, interval = ?self.interval, "telemetry publisher started");
        loop {
            match (self.producer)() {
                Ok(payload) => {
                    let message = TelemetryMessage {
                        topic: self.topic.clone(),
                        payload,
                    };
                    if sender.send(message).is_err() {
                        debug!(topic = %self.topic, "no telemetry subscribers");
                    }
                }
                Err(e) => warn!(publisher = %self.name, error = %e, "failed to produce telemetry"),
            }
            if stop.wait_timeout(self.interval) {
                break;
            }
        }
        info!(publisher = %self.name, "telemetry publisher stopped");
    }
}

/// Handle to a running publisher thread.  Dropping it stops the thread.
pub struct PublisherHandle {
    name: String,
    stop: Arc<Signal>,
    thread: Option<JoinHandle<()>>,
}

impl PublisherHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.set();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(publisher = %self.name, "telemetry publisher thread panicked");
            }
        }
    }
}

impl Drop for PublisherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::sync::broadcast::error::TryRecvError;

    fn recv_within(
        rx: &mut broadcast::Receiver<TelemetryMessage>,
        timeout: Duration,
    ) -> Option<TelemetryMessage> {
        let started = Instant::now();
        while started.elapsed() < timeout {
            match rx.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(2)),
                Err(_) => return None,
            }
        }
        None
    }

    #[test]
    fn publisher_sends_payloads_on_its_topic() {
        let (tx, mut rx) = broadcast::channel(16);
        let publisher = TelemetryPublisher::new("pose", "isar/test/pose", Duration::from_millis(10), || {
            Ok("{\"x\":1}".to_string())
        });
        assert_eq!(publisher.topic(), "isar/test/pose");

        let handle = publisher.start(tx).unwrap();
        assert_eq!(handle.name(), "pose");

        let first = recv_within(&mut rx, Duration::from_secs(2)).expect("no telemetry received");
        assert_eq!(first.topic, "isar/test/pose");
        assert_eq!(first.payload, "{\"x\":1}");
        assert!(recv_within(&mut rx, Duration::from_secs(2)).is_some());

        handle.stop();
    }

    #[test]
    fn stop_interrupts_a_long_interval() {
        let (tx, _rx) = broadcast::channel(4);
        let handle = TelemetryPublisher::new("slow", "t", Duration::from_secs(60), || Ok(String::new()))
            .start(tx)
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(handle.is_running());

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn producer_errors_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (tx, mut rx) = broadcast::channel(16);
        let handle = TelemetryPublisher::new("flaky", "t", Duration::from_millis(5), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RobotError::Serialization("boom".to_string()))
            } else {
                Ok("ok".to_string())
            }
        })
        .start(tx)
        .unwrap();

        let message = recv_within(&mut rx, Duration::from_secs(2)).expect("publisher gave up");
        assert_eq!(message.payload, "ok");
        assert!(calls.load(Ordering::SeqCst) >= 2);
        drop(handle);
    }

    #[test]
    fn publishing_without_subscribers_keeps_running() {
        let (tx, rx) = broadcast::channel::<TelemetryMessage>(4);
        drop(rx);
        let handle = TelemetryPublisher::new("lonely", "t", Duration::from_millis(5), || Ok("x".into()))
            .start(tx)
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(handle.is_running());
        handle.stop();
    }
}

//! Record Dispatcher
//!
//! Delivers each record to every registered consumer, synchronously and in
//! registration order. A consumer that fails or panics is logged and
//! skipped for that record only.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{error, trace};
use serde::Serialize;

use crate::error::ConsumerError;
use crate::record::{DecodedRecord, MessageId};

/// Receiver of decoded records
pub trait Consumer: Send {
    fn name(&self) -> &str;

    /// Messages this consumer wants; empty means every message
    fn interests(&self) -> &[MessageId] {
        &[]
    }

    /// Handle one record. Must be a bounded, fast update.
    fn consume(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError>;
}

/// Outcome of dispatching one record
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct RecordDispatcher {
    consumers: Vec<Box<dyn Consumer>>,
}

impl RecordDispatcher {
    pub fn new() -> Self {
        RecordDispatcher::default()
    }

    pub fn register(&mut self, consumer: Box<dyn Consumer>) {
        log::debug!("Registered consumer '{}'", consumer.name());
        self.consumers.push(consumer);
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Union of all consumer interests, `None` if any consumer wants everything
    pub fn interests(&self) -> Option<BTreeSet<MessageId>> {
        let mut all = BTreeSet::new();
        for consumer in &self.consumers {
            let wanted = consumer.interests();
            if wanted.is_empty() {
                return None;
            }
            all.extend(wanted.iter().copied());
        }
        Some(all)
    }

    pub fn dispatch(&mut self, record: &DecodedRecord) -> DispatchReport {
        let mut report = DispatchReport::default();

        for consumer in self.consumers.iter_mut() {
            let wanted = consumer.interests();
            if !wanted.is_empty() && !wanted.contains(&record.id) {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| consumer.consume(record)))
                .unwrap_or_else(|panic| Err(ConsumerError::Panicked(panic_message(&*panic))));

            match result {
                Ok(()) => {
                    trace!("{} #{} -> {}", record.id, record.seq, consumer.name());
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(
                        "Consumer '{}' failed on {} #{}: {}",
                        consumer.name(),
                        record.id,
                        record.seq,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPayload;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    type Log = Arc<Mutex<Vec<(String, u64)>>>;

    struct Recorder {
        name: String,
        log: Log,
        interests: Vec<MessageId>,
    }

    impl Consumer for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn interests(&self) -> &[MessageId] {
            &self.interests
        }

        fn consume(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError> {
            self.log.lock().unwrap().push((self.name.clone(), record.seq));
            Ok(())
        }
    }

    struct AlwaysFails;

    impl Consumer for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn consume(&mut self, _record: &DecodedRecord) -> Result<(), ConsumerError> {
            Err(ConsumerError::Failed("nope".into()))
        }
    }

    struct Panics;

    impl Consumer for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        fn consume(&mut self, _record: &DecodedRecord) -> Result<(), ConsumerError> {
            panic!("boom");
        }
    }

    fn record(seq: u64, id: MessageId) -> DecodedRecord {
        DecodedRecord {
            seq,
            id,
            received_at: Instant::now(),
            payload: RecordPayload::Other,
        }
    }

    fn recorder(name: &str, log: &Log, interests: Vec<MessageId>) -> Box<dyn Consumer> {
        Box::new(Recorder {
            name: name.to_string(),
            log: log.clone(),
            interests,
        })
    }

    #[test]
    fn test_registration_and_arrival_order() {
        let log: Log = Default::default();
        let mut dispatcher = RecordDispatcher::new();
        dispatcher.register(recorder("a", &log, vec![]));
        dispatcher.register(recorder("b", &log, vec![]));

        for seq in 0..3 {
            dispatcher.dispatch(&record(seq, MessageId::NAV_PVT));
        }

        let expected: Vec<(String, u64)> = (0..3)
            .flat_map(|seq| [("a".to_string(), seq), ("b".to_string(), seq)])
            .collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn test_failing_consumer_is_isolated() {
        let log: Log = Default::default();
        let mut dispatcher = RecordDispatcher::new();
        dispatcher.register(Box::new(AlwaysFails));
        dispatcher.register(recorder("b", &log, vec![]));

        let n = 25;
        for seq in 0..n {
            let report = dispatcher.dispatch(&record(seq, MessageId::NAV_SAT));
            assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        }
        assert_eq!(log.lock().unwrap().len(), n as usize);
    }

    #[test]
    fn test_panicking_consumer_is_isolated() {
        let log: Log = Default::default();
        let mut dispatcher = RecordDispatcher::new();
        dispatcher.register(Box::new(Panics));
        dispatcher.register(recorder("b", &log, vec![]));

        let report = dispatcher.dispatch(&record(0, MessageId::NAV_PVT));
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec![("b".to_string(), 0)]);
    }

    #[test]
    fn test_interests_filter_delivery() {
        let log: Log = Default::default();
        let mut dispatcher = RecordDispatcher::new();
        dispatcher.register(recorder("pvt", &log, vec![MessageId::NAV_PVT]));
        dispatcher.register(recorder("sat", &log, vec![MessageId::NAV_SAT]));

        dispatcher.dispatch(&record(0, MessageId::NAV_SAT));
        dispatcher.dispatch(&record(1, MessageId::NAV_PVT));

        assert_eq!(
            *log.lock().unwrap(),
            vec![("sat".to_string(), 0), ("pvt".to_string(), 1)]
        );
        let interests = dispatcher.interests().unwrap();
        assert_eq!(interests.len(), 2);
    }

    #[test]
    fn test_catch_all_consumer_disables_filter() {
        let log: Log = Default::default();
        let mut dispatcher = RecordDispatcher::new();
        dispatcher.register(recorder("pvt", &log, vec![MessageId::NAV_PVT]));
        dispatcher.register(recorder("all", &log, vec![]));
        assert_eq!(dispatcher.interests(), None);
    }
}

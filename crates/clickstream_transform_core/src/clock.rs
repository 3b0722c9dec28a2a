use chrono::{DateTime, SecondsFormat, Utc};

/// Source of wall-clock time for record enrichment.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// ISO-8601 with an explicit `+00:00` offset. The fraction is written with
/// microsecond precision and left out entirely when it is zero.
pub fn format_processed_ts(timestamp: DateTime<Utc>) -> String {
    let precision = if timestamp.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    timestamp.to_rfc3339_opts(precision, false)
}

#[cfg(any(test, feature = "test-helpers"))]
pub use helpers::{FixedClock, SteppingClock};

#[cfg(any(test, feature = "test-helpers"))]
mod helpers {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, Utc};

    use super::Clock;

    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Advances by `step` after every reading, so each call is observable.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
        readings: Mutex<usize>,
    }

    impl SteppingClock {
        pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
                readings: Mutex::new(0),
            }
        }

        pub fn readings(&self) -> usize {
            *self.readings.lock().expect("poisoned mutex")
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().expect("poisoned mutex");
            let current = *next;
            *next = current + self.step;
            *self.readings.lock().expect("poisoned mutex") += 1;
            current
        }
    }
}

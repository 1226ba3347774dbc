use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp the way it is attached to published events,
/// e.g. `2023-01-31T21:24:55.123+00:00`.
pub fn format_event_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, false)
}

#[cfg(not(test))]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
pub use mock_time::now_utc;

/// Testing utilities for mocking wall-clock timestamps.
/// Use the `now_utc` function if you want to be able to mock the time in tests.
#[cfg(test)]
pub mod mock_time {
    use chrono::{DateTime, Utc};
    use std::cell::RefCell;

    thread_local! {
        static MOCK_TIME: RefCell<Option<DateTime<Utc>>> = const { RefCell::new(None) };
    }

    pub struct MockTime;

    impl MockTime {
        pub fn mock(time: DateTime<Utc>) -> Self {
            MOCK_TIME.with(|cell| {
                assert!(cell.borrow().is_none());
                *cell.borrow_mut() = Some(time);
            });
            MockTime
        }
    }

    impl Drop for MockTime {
        fn drop(&mut self) {
            MOCK_TIME.with(|cell| *cell.borrow_mut() = None);
        }
    }

    pub fn now_utc() -> DateTime<Utc> {
        MOCK_TIME.with(|cell| cell.borrow().unwrap_or_else(Utc::now))
    }
}

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use idp_types::jose::jws::SigningAlgorithm;

use crate::configuration::clock::{ClockProvider, MockClock};
use crate::configuration::{ProviderConfiguration, ProviderConfigurationBuilder};

pub(crate) const START: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

/// Shared handle onto the time returned by a mocked clock.
#[derive(Clone)]
pub(crate) struct ClockHandle(Arc<AtomicI64>);

impl ClockHandle {
    pub(crate) fn now(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.0.load(Ordering::SeqCst))
            .expect("valid timestamp")
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.0.fetch_add(by.whole_seconds(), Ordering::SeqCst);
    }

    pub(crate) fn set(&self, at: OffsetDateTime) {
        self.0.store(at.unix_timestamp(), Ordering::SeqCst);
    }
}

pub(crate) fn mock_clock(start: OffsetDateTime) -> (ClockProvider, ClockHandle) {
    let handle = ClockHandle(Arc::new(AtomicI64::new(start.unix_timestamp())));
    let reader = handle.clone();
    let mut clock = MockClock::new();
    clock.expect_now().returning(move || reader.now());
    (ClockProvider::Boxed(Box::new(clock)), handle)
}

pub(crate) fn provider(
    algorithm: SigningAlgorithm,
) -> (Arc<ProviderConfiguration>, ClockHandle) {
    let (clock, handle) = mock_clock(START);
    let provider = ProviderConfigurationBuilder::default()
        .issuer("https://id.example.com")
        .signing_algorithm(algorithm)
        .clock(clock)
        .build()
        .expect("valid test configuration");
    (Arc::new(provider), handle)
}

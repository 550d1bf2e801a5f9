//! Ordered provider fallback.
//!
//! A fallback chain is a list of named, not-yet-started futures. They are
//! awaited one at a time; the first `Ok` value passing `accept` wins. Later
//! providers are never polled once one succeeds.

use futures::future::BoxFuture;
use tracing::debug;

use kinko_common::error::KinkoResult;

/// One provider in a fallback chain.
pub struct Attempt<'a, T> {
    pub name: String,
    pub run: BoxFuture<'a, KinkoResult<T>>,
}

impl<'a, T> Attempt<'a, T> {
    pub fn new(name: impl Into<String>, run: BoxFuture<'a, KinkoResult<T>>) -> Self {
        Self { name: name.into(), run }
    }
}

/// First accepted value and the name of the provider that produced it.
pub async fn first_valid<T, F>(attempts: Vec<Attempt<'_, T>>, accept: F) -> Option<(String, T)>
where
    T: std::fmt::Debug,
    F: Fn(&T) -> bool,
{
    for attempt in attempts {
        match attempt.run.await {
            Ok(value) if accept(&value) => return Some((attempt.name, value)),
            Ok(value) => debug!(provider = %attempt.name, ?value, "rejected by validation"),
            Err(e) => debug!(provider = %attempt.name, error = %e, "provider failed"),
        }
    }
    None
}

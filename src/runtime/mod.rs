//! Async runtime seam.
//!
//! Discovery, pairing and the state caches only ever touch the runtime through
//! this module: a UDP socket trait for the SSDP scan, `sleep` and `timeout` for
//! the bounded windows, and a monotonic [`Instant`] for cache ages.
//!
//! The clock is tokio's, so tests running with a paused runtime
//! (`#[tokio::test(start_paused = true)]`) can move time forward
//! deterministically with `tokio::time::advance`.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

mod tokio_impl;

pub use tokio_impl::*;

/// Trait for async UDP socket operations.
pub trait AsyncUdpSocket: Send + Sync + Sized {
    /// Bind to the specified address.
    fn bind(addr: &str) -> impl Future<Output = io::Result<Self>> + Send;

    /// Send data to a specific address.
    fn send_to(&self, buf: &[u8], addr: &str) -> impl Future<Output = io::Result<usize>> + Send;

    /// Receive data and the source address.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    /// Set the time-to-live of outgoing IPv4 multicast packets.
    fn set_multicast_ttl_v4(&self, ttl: u32) -> io::Result<()>;
}

/// Sleep for the specified duration.
pub async fn sleep(duration: Duration) {
    sleep_impl(duration).await
}

/// Run a future with a timeout.
///
/// Returns `Err(TimedOut)` if the timeout expires before the future completes.
pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    timeout_impl(duration, future).await
}

/// Error returned when a timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimedOut {}

/// A measurement of monotonically increasing time.
#[derive(Debug, Clone, Copy)]
pub struct Instant(InstantInner);

impl Instant {
    /// Returns the current instant.
    pub fn now() -> Self {
        Instant(InstantInner::now())
    }

    /// Returns the duration elapsed since this instant was created.
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

pub use tokio::sync::Mutex;

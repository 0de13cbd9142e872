//! The application-facing link layer.
//!
//! [`LinkLayer::new`] takes ownership of a physical medium and spawns the
//! driver thread; [`send`](LinkLayer::send) and
//! [`receive`](LinkLayer::receive) are non-blocking and may be called from
//! any thread. Dropping the instance stops and joins the driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use link_lab_abstract::{LinkConfig, LinkError, MAX_PAYLOAD, PhysicalLayer};
use tracing::debug;

use crate::state::LinkState;

pub struct LinkLayer {
    shared: Arc<Mutex<LinkState>>,
    stop: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
}

impl LinkLayer {
    /// Construct a link layer over `medium` and start its driver thread.
    ///
    /// Fails with [`LinkError::InvalidArgument`] for an unusable
    /// configuration and [`LinkError::ConstructionFailure`] when the driver
    /// thread cannot be spawned.
    pub fn new(
        medium: Box<dyn PhysicalLayer>,
        config: LinkConfig,
    ) -> Result<Self, LinkError> {
        config.validate()?;

        let shared = Arc::new(Mutex::new(LinkState::new(medium, config)));
        let stop = Arc::new(AtomicBool::new(false));

        let driver_shared = Arc::clone(&shared);
        let driver_stop = Arc::clone(&stop);
        let poll_interval = config.poll_interval();
        let driver = thread::Builder::new()
            .name("link-driver".into())
            .spawn(move || {
                while !driver_stop.load(Ordering::Relaxed) {
                    {
                        let mut state = driver_shared
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        state.step(Instant::now());
                    }
                    thread::sleep(poll_interval);
                }
                debug!("link driver stopped");
            })
            .map_err(|_| LinkError::ConstructionFailure)?;

        Ok(Self {
            shared,
            stop,
            driver: Some(driver),
        })
    }

    /// Enqueue up to [`MAX_PAYLOAD`] bytes for reliable in-order delivery.
    ///
    /// Returns the number of bytes accepted, or `Ok(0)` when the send
    /// window is full (non-blocking; retry later). Fails with
    /// [`LinkError::InvalidArgument`] for an empty or oversized buffer.
    pub fn send(&self, buf: &[u8]) -> Result<usize, LinkError> {
        if buf.is_empty() {
            return Err(LinkError::InvalidArgument("send of zero bytes"));
        }
        if buf.len() > MAX_PAYLOAD {
            return Err(LinkError::InvalidArgument("send exceeds MAX_PAYLOAD"));
        }
        let mut state = self.lock();
        state.enqueue_send(buf, Instant::now())
    }

    /// Copy the pending in-order payload into `buf`, clearing the internal
    /// slot. Returns `Ok(0)` when nothing has been delivered yet.
    pub fn receive(&self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let mut state = self.lock();
        state.take_delivery(buf)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LinkState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LinkLayer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
    }
}

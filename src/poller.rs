//! Background polling of one device
//!
//! Each [`Poller`] owns one driver and one task. The task connects, asks for a measurement once per update
//! interval and publishes the result, until it is stopped or the link goes away. Pollers share nothing with each
//! other.
//!
//! # Cancel Safety
//! Stopping is cooperative. The inter-poll sleep races the cancellation token so a stop request takes effect
//! immediately between polls, and a query already in flight resolves within the transport's read timeout.

use std::{
    sync::{ Arc, Mutex },
    time::Duration,
};
use chrono::Utc;
use tokio::{
    sync::{ broadcast, watch },
    task::JoinHandle,
};
use tokio_util::sync::{ CancellationToken, DropGuard };
use tracing::{ info, info_span, warn, Instrument };
use crate::{
    devices::Driver,
    measurement::Measurement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState
{
    Disconnected,
    Connecting,
    Connected,
}

/// One poll cycle's outcome for one device
#[derive(Debug, Clone)]
pub struct MeasurementUpdate
{
    pub device: Arc<str>,
    /// The latest fresh measurement. `None` when nothing recent enough is available.
    pub measurement: Option<Measurement>,
}

/// Latest measurement, shared between the polling task and its handle
#[derive(Clone)]
struct LatestMeasurement
{
    inner: Arc<Mutex<Option<Measurement>>>,
    update_interval: Duration,
}

impl LatestMeasurement
{
    fn store(&self, measurement: Measurement)
    {
        let mut latest = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *latest = Some(measurement);
    }

    fn fresh(&self) -> Option<Measurement>
    {
        let latest = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Utc::now();

        latest
            .as_ref()
            .filter(|measurement| measurement.is_fresh(now, self.update_interval))
            .cloned()
    }
}

/// Handle to a running polling task
///
/// Dropping the handle stops the task the same way [`Poller::stop`] does.
pub struct Poller
{
    name: Arc<str>,
    driver: Arc<dyn Driver>,
    update_interval: Duration,
    state: watch::Receiver<ConnectionState>,
    latest: LatestMeasurement,
    cancel: CancellationToken,
    _stop_on_drop: DropGuard,
    task: JoinHandle<()>,
}

impl Poller
{
    /// Starts polling `driver` in the background
    ///
    /// Without an explicit `update_interval` the driver's declared interval is used. Every cycle publishes one
    /// [`MeasurementUpdate`] on `updates`, and one last update without a measurement once polling ends.
    pub fn spawn<N>(
        name: N,
        driver: Box<dyn Driver>,
        update_interval: Option<Duration>,
        updates: broadcast::Sender<MeasurementUpdate>,
    )
        -> Self

        where N: Into<Arc<str>>
    {
        let name = name.into();
        let driver: Arc<dyn Driver> = Arc::from(driver);
        let update_interval = update_interval.unwrap_or(driver.capabilities().update_interval);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let latest = LatestMeasurement {
            inner: Arc::new(Mutex::new(None)),
            update_interval: update_interval,
        };
        let cancel = CancellationToken::new();

        let worker = Worker {
            name: name.clone(),
            driver: driver.clone(),
            update_interval: update_interval,
            state: state_tx,
            latest: latest.clone(),
            updates: updates,
            cancel: cancel.clone(),
        };
        let span = info_span!("poller", device = %name);
        let task = tokio::spawn(worker.run().instrument(span));

        Self {
            name: name,
            driver: driver,
            update_interval: update_interval,
            state: state_rx,
            latest: latest,
            _stop_on_drop: cancel.clone().drop_guard(),
            cancel: cancel,
            task: task,
        }
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn driver(&self) -> &Arc<dyn Driver>
    {
        &self.driver
    }

    pub fn update_interval(&self) -> Duration
    {
        self.update_interval
    }

    pub fn state(&self) -> ConnectionState
    {
        *self.state.borrow()
    }

    /// Receiver notified on every connection state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState>
    {
        self.state.clone()
    }

    /// The last measurement, if it is recent enough to show
    pub fn current_measurement(&self) -> Option<Measurement>
    {
        self.latest.fresh()
    }

    /// Asks the task to stop after the current poll
    pub fn stop(&self)
    {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool
    {
        self.task.is_finished()
    }

    /// Waits for the task to disconnect and exit
    pub async fn join(self)
    {
        if let Err(err) = self.task.await {
            warn!(device = %self.name, error = %err, "polling task failed");
        }
    }
}

struct Worker
{
    name: Arc<str>,
    driver: Arc<dyn Driver>,
    update_interval: Duration,
    state: watch::Sender<ConnectionState>,
    latest: LatestMeasurement,
    updates: broadcast::Sender<MeasurementUpdate>,
    cancel: CancellationToken,
}

impl Worker
{
    async fn run(self)
    {
        self.state.send_replace(ConnectionState::Connecting);

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => false,
            connected = self.driver.connect() => connected,
        };

        if connected {
            self.state.send_replace(ConnectionState::Connected);
            info!(interval_ms = self.update_interval.as_millis() as u64, "polling");
        }
        else {
            info!("not connected");
        }

        while self.driver.is_connected() && !self.cancel.is_cancelled() {
            if let Some(measurement) = self.driver.current_measurement().await {
                self.latest.store(measurement);
            }
            self.publish(self.latest.fresh());

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.update_interval) => {}
            }
        }

        self.driver.disconnect().await;
        self.state.send_replace(ConnectionState::Disconnected);
        self.publish(None);
        info!("stopped");
    }

    fn publish(&self, measurement: Option<Measurement>)
    {
        // no subscribers is fine
        let _ = self.updates.send(MeasurementUpdate {
            device: self.name.clone(),
            measurement: measurement,
        });
    }
}

//! Scan session driver
//!
//! Runs a [`ScanController`] on a single task: camera events, user commands,
//! gate timers and lookup completions are handled one at a time in arrival
//! order. The only suspension point is the catalog lookup, which runs on its
//! own task so the camera keeps draining while it is in flight.
//!
//! ## Usage
//!
//! ```ignore
//! let (camera, decodes) = decode_channel(32);
//! let mut session = ScanSession::new(catalog, GateOptions::default());
//! let handle = session.handle();
//! let mut events = session.take_events().unwrap();
//! tokio::spawn(session.run(decodes));
//!
//! handle.arm();
//! camera.try_send(event)?;
//! ```
//!
//! Closing the session (or dropping every [`SessionHandle`]) aborts a pending
//! lookup, discards its result, cancels timers and unsubscribes from the
//! camera.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::controller::{LookupTicket, ScanController, ScanEvent, ScreenState};
use super::decode::DecodeSubscription;
use super::gate::GateOptions;
use crate::catalog::{BookCatalog, LookupError, LookupOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    Arm,
    ScanAgain,
    Close,
}

type LookupResult = (LookupTicket, Result<LookupOutcome, LookupError>);

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Camera events processed
    pub decoded: u64,
    /// Lookups started
    pub lookups: u64,
}

/// Control and observation handle for a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state_rx: watch::Receiver<ScreenState>,
    processed_rx: watch::Receiver<u64>,
}

impl SessionHandle {
    /// User tapped "scan"
    pub fn arm(&self) -> bool {
        self.commands.send(SessionCommand::Arm).is_ok()
    }

    /// User dismissed a result
    pub fn scan_again(&self) -> bool {
        self.commands.send(SessionCommand::ScanAgain).is_ok()
    }

    /// Tear the session down
    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close);
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Current screen state
    pub fn state(&self) -> ScreenState {
        self.state_rx.borrow().clone()
    }

    /// Wait until at least `count` camera events have been processed
    ///
    /// Returns early if the session ends.
    pub async fn wait_processed(&self, count: u64) {
        let mut rx = self.processed_rx.clone();
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    /// Wait for a state matching `predicate`
    ///
    /// If the session ends first, the final state is returned.
    pub async fn wait_for_state<F>(&self, predicate: F) -> ScreenState
    where
        F: FnMut(&ScreenState) -> bool,
    {
        let mut rx = self.state_rx.clone();
        let result = rx.wait_for(predicate).await.map(|state| state.clone());
        match result {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }
}

/// A scan screen's lifetime
pub struct ScanSession {
    id: String,
    controller: ScanController,
    catalog: Arc<dyn BookCatalog>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    state_tx: watch::Sender<ScreenState>,
    processed_tx: watch::Sender<u64>,
    event_tx: mpsc::UnboundedSender<ScanEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<ScanEvent>>,
}

impl ScanSession {
    /// Create a new session
    pub fn new(catalog: Arc<dyn BookCatalog>, options: GateOptions) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ScreenState::Idle);
        let (processed_tx, _) = watch::channel(0);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let id = format!("scan-{}", &uuid::Uuid::new_v4().to_string()[..8]);

        Self {
            id,
            controller: ScanController::new(options),
            catalog,
            command_tx,
            command_rx,
            state_tx,
            processed_tx,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get a handle; take at least one before calling `run`
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            commands: self.command_tx.clone(),
            state_rx: self.state_tx.subscribe(),
            processed_rx: self.processed_tx.subscribe(),
        }
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ScanEvent>> {
        self.event_rx.take()
    }

    /// Run on a new task
    pub fn spawn(self, decodes: DecodeSubscription) -> JoinHandle<SessionSummary> {
        tokio::spawn(self.run(decodes))
    }

    /// Run until closed or every handle is dropped
    pub async fn run(self, mut decodes: DecodeSubscription) -> SessionSummary {
        let ScanSession {
            id,
            mut controller,
            catalog,
            command_tx,
            mut command_rx,
            state_tx,
            processed_tx,
            event_tx,
            ..
        } = self;
        // Only handles keep the session alive
        drop(command_tx);

        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<LookupResult>();
        let mut lookup: Option<JoinHandle<()>> = None;
        let mut decodes_open = true;
        let mut summary = SessionSummary::default();

        info!(session = %id, "Scan session started");

        loop {
            let deadline = controller.next_deadline();
            let mut decoded = false;

            tokio::select! {
                biased;

                command = command_rx.recv() => match command {
                    Some(SessionCommand::Arm) => {
                        controller.arm(now());
                    }
                    Some(SessionCommand::ScanAgain) => {
                        controller.scan_again();
                    }
                    Some(SessionCommand::Close) | None => break,
                },

                Some((ticket, result)) = result_rx.recv() => {
                    lookup = None;
                    controller.settle(ticket, result);
                }

                event = decodes.next_event(), if decodes_open => match event {
                    Some(event) => {
                        decoded = true;
                        summary.decoded += 1;
                        if let Some(ticket) = controller.on_decode(&event, now()) {
                            summary.lookups += 1;
                            lookup = Some(spawn_lookup(
                                Arc::clone(&catalog),
                                ticket,
                                result_tx.clone(),
                            ));
                        }
                    }
                    None => {
                        debug!(session = %id, "Camera stream ended");
                        decodes_open = false;
                    }
                },

                _ = sleep_until(deadline) => {
                    controller.tick(now());
                }
            }

            publish(&mut controller, &state_tx, &event_tx);
            if decoded {
                processed_tx.send_modify(|n| *n += 1);
            }
        }

        if let Some(task) = lookup.take() {
            debug!(session = %id, "Cancelling in-flight lookup");
            task.abort();
        }
        decodes.unsubscribe();
        controller.teardown();
        publish(&mut controller, &state_tx, &event_tx);

        info!(
            session = %id,
            decoded = summary.decoded,
            lookups = summary.lookups,
            "Scan session closed"
        );
        summary
    }
}

fn spawn_lookup(
    catalog: Arc<dyn BookCatalog>,
    ticket: LookupTicket,
    results: mpsc::UnboundedSender<LookupResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = catalog.lookup(ticket.isbn()).await;
        let _ = results.send((ticket, result));
    })
}

fn publish(
    controller: &mut ScanController,
    state_tx: &watch::Sender<ScreenState>,
    event_tx: &mpsc::UnboundedSender<ScanEvent>,
) {
    if *state_tx.borrow() != *controller.state() {
        state_tx.send_replace(controller.state().clone());
    }
    for event in controller.drain_events() {
        let _ = event_tx.send(event);
    }
}

/// Current time on the tokio clock
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

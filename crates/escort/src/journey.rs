use std::env;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use indexmap::IndexMap;
use model::{
    checkpoint::Checkpoint,
    coordinate::Coordinate,
    event::JourneyEvent,
    journey::Journey,
    route::Route,
    simulation::SimulationPhase,
    sos::{SosOutcome, SosStatus},
    zone::Zone,
};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use utility::id::{Id, IdSequence};

use crate::{
    contacts::ContactStore,
    engine::{self, SimulationEngine},
    geofence,
    messaging::MessagingTransport,
    permissions::PermissionGate,
    planner,
    routing::RouteProvider,
    sos::{self, SosSession},
    EscortError, EscortResult, ValidationError,
};

const MAILBOX_SIZE: usize = 32;
const EVENT_CHANNEL_SIZE: usize = 128;

/// Runtime configuration. Only the SOS countdown is tunable; one duration
/// covers every entry path into the confirmation flow.
#[derive(Debug, Clone)]
pub struct EscortConfig {
    pub sos_countdown_seconds: u64,
}

impl EscortConfig {
    pub fn from_env() -> Self {
        let sos_countdown_seconds = env::var("SOS_COUNTDOWN_SECONDS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(sos::DEFAULT_COUNTDOWN_SECONDS);
        Self {
            sos_countdown_seconds,
        }
    }
}

impl Default for EscortConfig {
    fn default() -> Self {
        Self {
            sos_countdown_seconds: sos::DEFAULT_COUNTDOWN_SECONDS,
        }
    }
}

/// Requests processed by a journey task, one at a time, between ticks.
#[derive(Debug)]
pub enum Command {
    Start {
        responder: oneshot::Sender<EscortResult<()>>,
    },
    Stop {
        responder: oneshot::Sender<EscortResult<()>>,
    },
    Pause {
        responder: oneshot::Sender<EscortResult<()>>,
    },
    Resume {
        responder: oneshot::Sender<EscortResult<()>>,
    },
    SpeedUp {
        responder: oneshot::Sender<EscortResult<u64>>,
    },
    SlowDown {
        responder: oneshot::Sender<EscortResult<u64>>,
    },
    AddCheckpoint {
        position: Coordinate,
        planned_minutes: u32,
        responder: oneshot::Sender<EscortResult<Checkpoint>>,
    },
    RemoveCheckpoint {
        checkpoint: Id<Checkpoint>,
        responder: oneshot::Sender<EscortResult<()>>,
    },
    EditCheckpoint {
        checkpoint: Id<Checkpoint>,
        planned_minutes: u32,
        responder: oneshot::Sender<EscortResult<Checkpoint>>,
    },
    ReplaceRoute {
        route: Route,
        responder: oneshot::Sender<EscortResult<Journey>>,
    },
    OpenSos {
        responder: oneshot::Sender<EscortResult<SosStatus>>,
    },
    ConfirmSafe {
        responder: oneshot::Sender<EscortResult<SosOutcome>>,
    },
    ConfirmUnsafe {
        responder: oneshot::Sender<EscortResult<SosOutcome>>,
    },
    Snapshot {
        responder: oneshot::Sender<Journey>,
    },
    Zones {
        responder: oneshot::Sender<Vec<Zone>>,
    },
}

/// Client side of one journey task. Cloneable; every clone talks to the
/// same task.
#[derive(Debug, Clone)]
pub struct JourneyHandle {
    id: Id<Journey>,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<JourneyEvent>,
    cancel: CancellationToken,
}

impl JourneyHandle {
    pub fn id(&self) -> Id<Journey> {
        self.id
    }

    /// Subscribes to the live event feed. A slow consumer can lag behind
    /// and miss events; snapshots stay authoritative.
    pub fn subscribe(&self) -> broadcast::Receiver<JourneyEvent> {
        self.events.subscribe()
    }

    /// Stops the journey task outright. Pending commands are dropped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub async fn start(&self) -> EscortResult<()> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Start { responder }).await?;
        response.await?
    }

    pub async fn stop(&self) -> EscortResult<()> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Stop { responder }).await?;
        response.await?
    }

    pub async fn pause(&self) -> EscortResult<()> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Pause { responder }).await?;
        response.await?
    }

    pub async fn resume(&self) -> EscortResult<()> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Resume { responder }).await?;
        response.await?
    }

    /// Returns the step period in milliseconds after the change.
    pub async fn speed_up(&self) -> EscortResult<u64> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::SpeedUp { responder }).await?;
        response.await?
    }

    /// Returns the step period in milliseconds after the change.
    pub async fn slow_down(&self) -> EscortResult<u64> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::SlowDown { responder }).await?;
        response.await?
    }

    pub async fn add_checkpoint(
        &self,
        position: Coordinate,
        planned_minutes: u32,
    ) -> EscortResult<Checkpoint> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::AddCheckpoint {
                position,
                planned_minutes,
                responder,
            })
            .await?;
        response.await?
    }

    pub async fn remove_checkpoint(&self, checkpoint: Id<Checkpoint>) -> EscortResult<()> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::RemoveCheckpoint {
                checkpoint,
                responder,
            })
            .await?;
        response.await?
    }

    pub async fn edit_checkpoint(
        &self,
        checkpoint: Id<Checkpoint>,
        planned_minutes: u32,
    ) -> EscortResult<Checkpoint> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::EditCheckpoint {
                checkpoint,
                planned_minutes,
                responder,
            })
            .await?;
        response.await?
    }

    pub async fn replace_route(&self, route: Route) -> EscortResult<Journey> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::ReplaceRoute { route, responder })
            .await?;
        response.await?
    }

    pub async fn open_sos(&self) -> EscortResult<SosStatus> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::OpenSos { responder }).await?;
        response.await?
    }

    pub async fn confirm_safe(&self) -> EscortResult<SosOutcome> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::ConfirmSafe { responder })
            .await?;
        response.await?
    }

    pub async fn confirm_unsafe(&self) -> EscortResult<SosOutcome> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::ConfirmUnsafe { responder })
            .await?;
        response.await?
    }

    pub async fn snapshot(&self) -> EscortResult<Journey> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Snapshot { responder }).await?;
        Ok(response.await?)
    }

    pub async fn zones(&self) -> EscortResult<Vec<Zone>> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Zones { responder }).await?;
        Ok(response.await?)
    }
}

#[derive(Default)]
struct TimerResets {
    step: bool,
    deadline: bool,
    countdown: bool,
}

/// The task owning one journey: engine state, checkpoint list, zones and
/// the SOS session all live here exclusively. External edits arrive as
/// commands and are applied between ticks, so no tick ever observes a
/// half-updated plan.
struct JourneyTask {
    id: Id<Journey>,
    engine: SimulationEngine,
    zones: Vec<Zone>,
    current_zone: Option<Id<Zone>>,
    checkpoint_ids: IdSequence,
    zone_ids: IdSequence,
    sos: Option<SosSession>,
    countdown_seconds: u64,
    contacts: Arc<dyn ContactStore>,
    transport: Arc<dyn MessagingTransport>,
    events: broadcast::Sender<JourneyEvent>,
}

pub(crate) fn spawn_journey(
    id: Id<Journey>,
    engine: SimulationEngine,
    zones: Vec<Zone>,
    checkpoint_ids: IdSequence,
    zone_ids: IdSequence,
    contacts: Arc<dyn ContactStore>,
    transport: Arc<dyn MessagingTransport>,
    countdown_seconds: u64,
) -> JourneyHandle {
    let (commands, mailbox) = mpsc::channel(MAILBOX_SIZE);
    let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
    let cancel = CancellationToken::new();
    let task = JourneyTask {
        id,
        engine,
        zones,
        current_zone: None,
        checkpoint_ids,
        zone_ids,
        sos: None,
        countdown_seconds,
        contacts,
        transport,
        events: events.clone(),
    };
    tokio::spawn(task.run(mailbox, cancel.clone()));
    JourneyHandle {
        id,
        commands,
        events,
        cancel,
    }
}

fn restarted_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl JourneyTask {
    /// The single event loop. At most three timers are live at a time;
    /// all of them and every command share this task, which serializes a
    /// checkpoint reach against the next deadline evaluation.
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
        let mut step = restarted_interval(self.engine.step_period());
        let mut deadline = restarted_interval(engine::DEADLINE_PERIOD);
        let mut countdown = restarted_interval(sos::COUNTDOWN_PERIOD);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    // one panicking handler must not take the journey down
                    let result = AssertUnwindSafe(self.handle(command)).catch_unwind().await;
                    match result {
                        Ok(resets) => {
                            if resets.step {
                                step = restarted_interval(self.engine.step_period());
                            }
                            if resets.deadline {
                                deadline = restarted_interval(engine::DEADLINE_PERIOD);
                            }
                            if resets.countdown {
                                countdown = restarted_interval(sos::COUNTDOWN_PERIOD);
                            }
                        }
                        Err(why) => {
                            log::error!("journey {}: command handler panicked: {:?}", self.id, why);
                        }
                    }
                }
                _ = step.tick(), if self.engine.phase() == SimulationPhase::Running => {
                    let mut events = self.engine.step(Instant::now());
                    // a position update, when present, leads the step's events
                    if let Some(&JourneyEvent::PositionUpdate { position }) = events.first() {
                        if let Some(entered) = self.enter_zone(&position) {
                            events.insert(1, entered);
                        }
                    }
                    self.publish(events);
                }
                _ = deadline.tick(), if self.deadline_armed() => {
                    let events = self.engine.deadline_tick(Instant::now());
                    let missed_number = events.iter().find_map(|event| match event {
                        JourneyEvent::CheckpointMissed { number, .. } => Some(*number),
                        _ => None,
                    });
                    self.publish(events);
                    if let Some(number) = missed_number {
                        if self.open_sos_session(Some(number)).await {
                            countdown = restarted_interval(sos::COUNTDOWN_PERIOD);
                        }
                    }
                }
                _ = countdown.tick(), if self.sos.is_some() => {
                    self.countdown_tick();
                }
            }
        }
    }

    fn deadline_armed(&self) -> bool {
        matches!(
            self.engine.phase(),
            SimulationPhase::Running | SimulationPhase::Paused
        )
    }

    async fn handle(&mut self, command: Command) -> TimerResets {
        match command {
            Command::Start { responder } => {
                let result = self.start();
                let started = result.is_ok();
                let _ = responder.send(result);
                TimerResets {
                    step: started,
                    deadline: started,
                    countdown: false,
                }
            }
            Command::Stop { responder } => {
                // an open session dies with its simulation
                self.sos = None;
                self.engine.stop();
                let _ = responder.send(Ok(()));
                TimerResets::default()
            }
            Command::Pause { responder } => {
                self.engine.pause();
                let _ = responder.send(Ok(()));
                TimerResets::default()
            }
            Command::Resume { responder } => {
                let was_paused = self.engine.phase() == SimulationPhase::Paused;
                self.engine.resume();
                let _ = responder.send(Ok(()));
                TimerResets {
                    step: was_paused,
                    ..TimerResets::default()
                }
            }
            Command::SpeedUp { responder } => {
                let changed = self.engine.speed_up().is_some();
                let _ = responder.send(Ok(self.engine.step_millis()));
                TimerResets {
                    step: changed,
                    ..TimerResets::default()
                }
            }
            Command::SlowDown { responder } => {
                let changed = self.engine.slow_down().is_some();
                let _ = responder.send(Ok(self.engine.step_millis()));
                TimerResets {
                    step: changed,
                    ..TimerResets::default()
                }
            }
            Command::AddCheckpoint {
                position,
                planned_minutes,
                responder,
            } => {
                let _ = responder.send(self.add_checkpoint(position, planned_minutes));
                TimerResets::default()
            }
            Command::RemoveCheckpoint {
                checkpoint,
                responder,
            } => {
                let _ = responder.send(self.remove_checkpoint(checkpoint));
                TimerResets::default()
            }
            Command::EditCheckpoint {
                checkpoint,
                planned_minutes,
                responder,
            } => {
                let _ = responder.send(self.edit_checkpoint(checkpoint, planned_minutes));
                TimerResets::default()
            }
            Command::ReplaceRoute { route, responder } => {
                let _ = responder.send(self.replace_route(route));
                TimerResets::default()
            }
            Command::OpenSos { responder } => {
                let opened = self.open_sos_session(None).await;
                let result = self
                    .sos
                    .as_ref()
                    .map(SosSession::status)
                    .ok_or(EscortError::SosNotOpen);
                let _ = responder.send(result);
                TimerResets {
                    countdown: opened,
                    ..TimerResets::default()
                }
            }
            Command::ConfirmSafe { responder } => {
                let _ = responder.send(self.confirm_safe());
                TimerResets::default()
            }
            Command::ConfirmUnsafe { responder } => {
                let _ = responder.send(self.confirm_unsafe());
                TimerResets::default()
            }
            Command::Snapshot { responder } => {
                let _ = responder.send(self.snapshot());
                TimerResets::default()
            }
            Command::Zones { responder } => {
                let _ = responder.send(self.zones.clone());
                TimerResets::default()
            }
        }
    }

    fn start(&mut self) -> EscortResult<()> {
        if self.sos.is_some() {
            return Err(ValidationError::SosSessionOpen.into());
        }
        Ok(self.engine.start(Instant::now())?)
    }

    fn add_checkpoint(
        &mut self,
        position: Coordinate,
        planned_minutes: u32,
    ) -> EscortResult<Checkpoint> {
        if self.engine.phase().is_active() {
            return Err(ValidationError::SimulationActive.into());
        }
        planner::validate_placement(self.engine.route(), &position)?;
        let checkpoint = Checkpoint::new(
            self.checkpoint_ids.next(),
            position,
            "Checkpoint",
            planned_minutes,
        )
        .with_description(format!("Expected Time: {planned_minutes} min"));
        let id = checkpoint.id;
        let mut checkpoints = self.engine.checkpoints().to_vec();
        checkpoints.push(checkpoint);
        let destination = self.engine.route().destination;
        planner::sort_and_relabel(&mut checkpoints, &destination);
        self.engine.update_checkpoints(checkpoints);
        self.engine
            .checkpoints()
            .iter()
            .find(|checkpoint| checkpoint.id == id)
            .cloned()
            .ok_or(EscortError::CheckpointNotFound)
    }

    fn remove_checkpoint(&mut self, id: Id<Checkpoint>) -> EscortResult<()> {
        if self.engine.phase().is_active() {
            return Err(ValidationError::SimulationActive.into());
        }
        let mut checkpoints = self.engine.checkpoints().to_vec();
        let index = checkpoints
            .iter()
            .position(|checkpoint| checkpoint.id == id)
            .ok_or(EscortError::CheckpointNotFound)?;
        if !checkpoints[index].is_pending() {
            return Err(ValidationError::CheckpointNotPending.into());
        }
        checkpoints.remove(index);
        let destination = self.engine.route().destination;
        planner::sort_and_relabel(&mut checkpoints, &destination);
        self.engine.update_checkpoints(checkpoints);
        Ok(())
    }

    fn edit_checkpoint(
        &mut self,
        id: Id<Checkpoint>,
        planned_minutes: u32,
    ) -> EscortResult<Checkpoint> {
        if self.engine.phase().is_active() {
            return Err(ValidationError::SimulationActive.into());
        }
        let mut checkpoints = self.engine.checkpoints().to_vec();
        let checkpoint = checkpoints
            .iter_mut()
            .find(|checkpoint| checkpoint.id == id)
            .ok_or(EscortError::CheckpointNotFound)?;
        if !checkpoint.is_pending() {
            return Err(ValidationError::CheckpointNotPending.into());
        }
        checkpoint.planned_minutes = planned_minutes;
        let updated = checkpoint.clone();
        self.engine.update_checkpoints(checkpoints);
        Ok(updated)
    }

    fn replace_route(&mut self, route: Route) -> EscortResult<Journey> {
        if self.engine.phase().is_active() {
            return Err(ValidationError::SimulationActive.into());
        }
        if route.is_empty() {
            return Err(ValidationError::EmptyRoute.into());
        }
        let checkpoints = planner::derive_checkpoints(&route, &self.checkpoint_ids);
        self.zones = geofence::route_zones(&route, &self.zone_ids);
        self.current_zone = None;
        self.engine.replace_route(route, checkpoints);
        Ok(self.snapshot())
    }

    /// Opens the confirmation session and halts the simulation. Opening
    /// an already open session changes nothing; returns whether a new
    /// session was created.
    async fn open_sos_session(&mut self, triggering_checkpoint: Option<u32>) -> bool {
        if self.sos.is_some() {
            return false;
        }
        self.engine.suspend();
        let contacts = match self.contacts.list().await {
            Ok(contacts) => contacts,
            Err(why) => {
                log::error!(
                    "journey {}: contact list unavailable for sos dispatch: {:?}",
                    self.id,
                    why
                );
                vec![]
            }
        };
        let zone = self.last_zone_name();
        self.sos = Some(SosSession::open(
            self.countdown_seconds,
            triggering_checkpoint,
            contacts,
        ));
        self.publish(vec![JourneyEvent::SosOpened {
            countdown_seconds: self.countdown_seconds,
            triggering_checkpoint,
            zone,
        }]);
        true
    }

    fn countdown_tick(&mut self) {
        let Some(session) = self.sos.as_mut() else {
            return;
        };
        if session.tick() {
            self.send_alert_and_stop();
        } else {
            let remaining_seconds = session.remaining_seconds();
            self.publish(vec![JourneyEvent::SosCountdown { remaining_seconds }]);
        }
    }

    fn confirm_safe(&mut self) -> EscortResult<SosOutcome> {
        if self.sos.take().is_none() {
            return Err(EscortError::SosNotOpen);
        }
        // the journey stays halted; the traveler decides whether to
        // start again or stop
        self.publish(vec![JourneyEvent::SosResolved {
            outcome: SosOutcome::Safe,
        }]);
        Ok(SosOutcome::Safe)
    }

    fn confirm_unsafe(&mut self) -> EscortResult<SosOutcome> {
        if self.sos.is_none() {
            return Err(EscortError::SosNotOpen);
        }
        self.send_alert_and_stop();
        Ok(SosOutcome::AlertSent)
    }

    /// The not-safe path: fan the alert out to the snapshot taken at
    /// trigger time, then end the journey. Dispatch runs detached so a
    /// slow transport never stalls the event loop.
    fn send_alert_and_stop(&mut self) {
        let Some(session) = self.sos.take() else {
            return;
        };
        match self.last_known_position() {
            Some(position) => {
                let message = sos::alert_message(&position);
                tokio::spawn(sos::dispatch_alert(
                    Arc::clone(&self.transport),
                    session.into_contacts(),
                    message,
                ));
            }
            None => {
                log::error!("journey {}: no known position for the sos alert", self.id);
            }
        }
        self.engine.stop();
        self.publish(vec![JourneyEvent::SosResolved {
            outcome: SosOutcome::AlertSent,
        }]);
    }

    /// Tracks zone occupancy across position updates. Fires once per
    /// entry; leaving the zone re-arms it.
    fn enter_zone(&mut self, position: &Coordinate) -> Option<JourneyEvent> {
        match geofence::containing(&self.zones, position) {
            Some(zone) => {
                if self.current_zone == Some(zone.id) {
                    return None;
                }
                self.current_zone = Some(zone.id);
                Some(JourneyEvent::ZoneEntered {
                    zone_id: zone.id,
                    name: zone.name.clone(),
                })
            }
            None => {
                self.current_zone = None;
                None
            }
        }
    }

    fn last_known_position(&self) -> Option<Coordinate> {
        self.engine
            .current_position()
            .or_else(|| self.engine.route().points.first().copied())
    }

    fn last_zone_name(&self) -> Option<String> {
        let position = self.last_known_position()?;
        geofence::nearest(&self.zones, &position).map(|zone| zone.name.clone())
    }

    fn snapshot(&self) -> Journey {
        Journey {
            id: self.id,
            route: self.engine.route().clone(),
            checkpoints: self.engine.checkpoints().to_vec(),
            simulation: self.engine.status(Instant::now()),
            sos: self.sos.as_ref().map(SosSession::status),
        }
    }

    fn publish(&self, events: Vec<JourneyEvent>) {
        for event in events {
            // no subscribers is not an error
            let _ = self.events.send(event);
        }
    }
}

/// Plans and owns journeys. Every journey runs as its own task; the
/// service keeps the handles.
#[derive(Clone)]
pub struct JourneyService {
    journeys: Arc<RwLock<IndexMap<Id<Journey>, JourneyHandle>>>,
    journey_ids: Arc<IdSequence>,
    provider: Arc<dyn RouteProvider>,
    transport: Arc<dyn MessagingTransport>,
    contacts: Arc<dyn ContactStore>,
    permissions: Arc<dyn PermissionGate>,
    config: EscortConfig,
}

impl JourneyService {
    pub fn new(
        provider: Arc<dyn RouteProvider>,
        transport: Arc<dyn MessagingTransport>,
        contacts: Arc<dyn ContactStore>,
        permissions: Arc<dyn PermissionGate>,
        config: EscortConfig,
    ) -> Self {
        Self {
            journeys: Arc::new(RwLock::new(IndexMap::new())),
            journey_ids: Arc::new(IdSequence::new()),
            provider,
            transport,
            contacts,
            permissions,
            config,
        }
    }

    /// Plans a journey: fetches the route, derives checkpoints and
    /// protective zones and spawns the journey task. An unavailable
    /// provider means no journey.
    pub async fn plan(&self, start: Coordinate, destination: Coordinate) -> EscortResult<Journey> {
        if !start.is_valid() || !destination.is_valid() {
            return Err(ValidationError::InvalidCoordinate.into());
        }
        if !self.permissions.granted() {
            return Err(EscortError::PermissionDenied);
        }
        let route = self.provider.fetch_route(start, destination).await?;
        if route.is_empty() {
            return Err(ValidationError::EmptyRoute.into());
        }
        let checkpoint_ids = IdSequence::new();
        let zone_ids = IdSequence::new();
        let checkpoints = planner::derive_checkpoints(&route, &checkpoint_ids);
        let zones = geofence::route_zones(&route, &zone_ids);
        let id = self.journey_ids.next();
        let engine = SimulationEngine::new(route, checkpoints);
        let handle = spawn_journey(
            id,
            engine,
            zones,
            checkpoint_ids,
            zone_ids,
            Arc::clone(&self.contacts),
            Arc::clone(&self.transport),
            self.config.sos_countdown_seconds,
        );
        let journey = handle.snapshot().await?;
        self.journeys.write().await.insert(id, handle);
        Ok(journey)
    }

    pub async fn handle(&self, id: Id<Journey>) -> EscortResult<JourneyHandle> {
        self.journeys
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EscortError::JourneyNotFound)
    }

    pub async fn journey(&self, id: Id<Journey>) -> EscortResult<Journey> {
        self.handle(id).await?.snapshot().await
    }

    pub async fn journeys(&self) -> EscortResult<Vec<Journey>> {
        let handles: Vec<JourneyHandle> =
            self.journeys.read().await.values().cloned().collect();
        let mut journeys = Vec::with_capacity(handles.len());
        for handle in handles {
            journeys.push(handle.snapshot().await?);
        }
        Ok(journeys)
    }

    /// Replaces the journey's destination. The old plan is discarded and
    /// checkpoints are derived again; refused while the simulation is
    /// active.
    pub async fn set_destination(
        &self,
        id: Id<Journey>,
        destination: Coordinate,
    ) -> EscortResult<Journey> {
        if !destination.is_valid() {
            return Err(ValidationError::InvalidCoordinate.into());
        }
        let handle = self.handle(id).await?;
        let current = handle.snapshot().await?;
        if current.simulation.phase.is_active() {
            return Err(ValidationError::SimulationActive.into());
        }
        let start = if current.simulation.current_index == 0 {
            current.route.points.first().copied()
        } else {
            current
                .route
                .point_at(current.simulation.current_index - 1)
                .copied()
        }
        .unwrap_or(current.route.destination);
        let route = self.provider.fetch_route(start, destination).await?;
        if route.is_empty() {
            return Err(ValidationError::EmptyRoute.into());
        }
        handle.replace_route(route).await
    }

    /// Removes a journey and shuts its task down.
    pub async fn remove(&self, id: Id<Journey>) -> EscortResult<()> {
        match self.journeys.write().await.shift_remove(&id) {
            Some(handle) => {
                handle.shutdown();
                Ok(())
            }
            None => Err(EscortError::JourneyNotFound),
        }
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use model::{
    checkpoint::{Checkpoint, CheckpointStatus},
    coordinate::Coordinate,
    event::JourneyEvent,
    route::Route,
    simulation::{SimulationPhase, SimulationStatus},
};
use tokio::time::Instant;

use crate::ValidationError;

/// Arrival test radius around the active checkpoint, in meters.
pub const REACHED_RADIUS_M: f64 = 50.0;
/// Budget granted to a missed checkpoint for a retried journey.
pub const GRACE_MINUTES: u32 = 2;

pub const DEFAULT_STEP_MILLIS: u64 = 1000;
pub const MIN_STEP_MILLIS: u64 = 300;
pub const MAX_STEP_MILLIS: u64 = 3000;
pub const STEP_ADJUST_MILLIS: u64 = 200;

/// Period of the deadline clock. Fixed; only the step period is tunable.
pub const DEADLINE_PERIOD: Duration = Duration::from_secs(1);

pub const END_MESSAGE: &str = "You have reached your destination.";

/// Walks a synthetic traveler along a route and checks progress against
/// checkpoint deadlines.
///
/// The engine is a plain state machine: callers feed it step and deadline
/// ticks and publish the events it returns. All timing comes in through
/// the `now` arguments, which keeps every transition testable without a
/// clock.
///
/// Phases follow `Idle -> Running <-> Paused -> Ended`, with the side
/// path `Running/Paused -> SosPending -> (Ended | Running)` taken when a
/// deadline is missed or an SOS session opens.
pub struct SimulationEngine {
    route: Route,
    checkpoints: Vec<Checkpoint>,
    phase: SimulationPhase,
    current_index: usize,
    active_checkpoint: usize,
    checkpoint_started: Option<Instant>,
    checkpoint_started_wall: Option<DateTime<Utc>>,
    step_millis: u64,
}

impl SimulationEngine {
    pub fn new(route: Route, checkpoints: Vec<Checkpoint>) -> Self {
        Self {
            route,
            checkpoints,
            phase: SimulationPhase::Idle,
            current_index: 0,
            active_checkpoint: 0,
            checkpoint_started: None,
            checkpoint_started_wall: None,
            step_millis: DEFAULT_STEP_MILLIS,
        }
    }

    /// Validates the plan and arms the deadline clock.
    ///
    /// Restarting after an SOS halt keeps the position cursor, so the
    /// journey continues where it stopped with the missed checkpoint's
    /// grace budget in effect.
    pub fn start(&mut self, now: Instant) -> Result<(), ValidationError> {
        if self.checkpoints.is_empty() {
            return Err(ValidationError::NoCheckpoints);
        }
        if self.route.is_empty() {
            return Err(ValidationError::EmptyRoute);
        }
        self.phase = SimulationPhase::Running;
        self.checkpoint_started = Some(now);
        self.checkpoint_started_wall = Some(Utc::now());
        Ok(())
    }

    /// One movement tick: visit the next route point, test it against the
    /// active checkpoint, end the route when the last point is consumed.
    ///
    /// A malformed point is logged and skipped; the cursor still advances.
    pub fn step(&mut self, now: Instant) -> Vec<JourneyEvent> {
        if self.phase != SimulationPhase::Running {
            return vec![];
        }
        let mut events = Vec::new();
        match self.route.point_at(self.current_index) {
            Some(point) if point.is_valid() => {
                let position = *point;
                events.push(JourneyEvent::PositionUpdate { position });
                if let Some(checkpoint) = self.checkpoints.get_mut(self.active_checkpoint) {
                    if position.distance_to(&checkpoint.position) <= REACHED_RADIUS_M {
                        checkpoint.status = CheckpointStatus::Reached;
                        events.push(JourneyEvent::CheckpointReached {
                            checkpoint_id: checkpoint.id,
                            number: self.active_checkpoint as u32 + 1,
                        });
                        self.active_checkpoint += 1;
                        self.checkpoint_started = Some(now);
                        self.checkpoint_started_wall = Some(Utc::now());
                    }
                }
            }
            Some(point) => {
                log::error!(
                    "skipping invalid route point {:?} at index {}",
                    point,
                    self.current_index
                );
            }
            None => {}
        }
        self.current_index += 1;
        if self.current_index >= self.route.len() {
            self.phase = SimulationPhase::Ended;
            self.checkpoint_started = None;
            self.checkpoint_started_wall = None;
            events.push(JourneyEvent::SimulationEnded {
                message: END_MESSAGE.to_string(),
            });
        }
        events
    }

    /// One deadline-clock tick. Emits a timer update on every tick while
    /// the clock is armed and flags the active checkpoint as missed once
    /// its budget is exceeded.
    ///
    /// The clock keeps counting while paused: a paused traveler is still
    /// expected at the next checkpoint.
    pub fn deadline_tick(&mut self, now: Instant) -> Vec<JourneyEvent> {
        if !matches!(
            self.phase,
            SimulationPhase::Running | SimulationPhase::Paused
        ) {
            return vec![];
        }
        let Some(started) = self.checkpoint_started else {
            return vec![];
        };
        let elapsed = now.duration_since(started);
        let mut events = vec![JourneyEvent::TimerUpdate {
            elapsed_seconds: elapsed.as_secs(),
        }];
        if let Some(checkpoint) = self.checkpoints.get_mut(self.active_checkpoint) {
            let allowed = Duration::from_secs(u64::from(checkpoint.allowed_minutes()) * 60);
            if elapsed > allowed {
                checkpoint.status = CheckpointStatus::Missed {
                    grace_minutes: GRACE_MINUTES,
                };
                events.push(JourneyEvent::CheckpointMissed {
                    checkpoint_id: checkpoint.id,
                    number: self.active_checkpoint as u32 + 1,
                });
                self.phase = SimulationPhase::SosPending;
            }
        }
        events
    }

    /// Halts movement only. The deadline clock keeps running.
    pub fn pause(&mut self) {
        if self.phase == SimulationPhase::Running {
            self.phase = SimulationPhase::Paused;
        }
    }

    /// Restarts movement at the current speed. Deadline timing is untouched.
    pub fn resume(&mut self) {
        if self.phase == SimulationPhase::Paused {
            self.phase = SimulationPhase::Running;
        }
    }

    /// Shortens the step period by one increment. Returns the new period
    /// in milliseconds when it changed; no-op unless running.
    pub fn speed_up(&mut self) -> Option<u64> {
        self.adjust_step(|millis| millis.saturating_sub(STEP_ADJUST_MILLIS))
    }

    /// Stretches the step period by one increment. Returns the new period
    /// in milliseconds when it changed; no-op unless running.
    pub fn slow_down(&mut self) -> Option<u64> {
        self.adjust_step(|millis| millis + STEP_ADJUST_MILLIS)
    }

    fn adjust_step(&mut self, change: impl FnOnce(u64) -> u64) -> Option<u64> {
        if self.phase != SimulationPhase::Running {
            return None;
        }
        let adjusted = change(self.step_millis).clamp(MIN_STEP_MILLIS, MAX_STEP_MILLIS);
        if adjusted == self.step_millis {
            return None;
        }
        self.step_millis = adjusted;
        Some(adjusted)
    }

    /// Ends this simulator instance and disarms the clock. Idempotent.
    pub fn stop(&mut self) {
        self.phase = SimulationPhase::Ended;
        self.checkpoint_started = None;
        self.checkpoint_started_wall = None;
    }

    /// Halts both processes while an SOS session is open.
    pub fn suspend(&mut self) {
        if self.phase.is_active() {
            self.phase = SimulationPhase::SosPending;
        }
    }

    /// Swaps in an edited checkpoint list. The active pointer re-derives
    /// to the first pending entry, so a deadline can never target a
    /// removed checkpoint.
    pub fn update_checkpoints(&mut self, checkpoints: Vec<Checkpoint>) {
        self.checkpoints = checkpoints;
        self.active_checkpoint = self
            .checkpoints
            .iter()
            .position(Checkpoint::is_pending)
            .unwrap_or(self.checkpoints.len());
    }

    /// Installs a freshly planned route, discarding all progress.
    pub fn replace_route(&mut self, route: Route, checkpoints: Vec<Checkpoint>) {
        self.route = route;
        self.checkpoints = checkpoints;
        self.phase = SimulationPhase::Idle;
        self.current_index = 0;
        self.active_checkpoint = 0;
        self.checkpoint_started = None;
        self.checkpoint_started_wall = None;
        self.step_millis = DEFAULT_STEP_MILLIS;
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn active_checkpoint_index(&self) -> usize {
        self.active_checkpoint
    }

    pub fn step_millis(&self) -> u64 {
        self.step_millis
    }

    pub fn step_period(&self) -> Duration {
        Duration::from_millis(self.step_millis)
    }

    /// The last position visited, if any step has run.
    pub fn current_position(&self) -> Option<Coordinate> {
        if self.current_index == 0 {
            return None;
        }
        self.route.point_at(self.current_index - 1).copied()
    }

    pub fn status(&self, now: Instant) -> SimulationStatus {
        let elapsed_seconds = match (self.phase, self.checkpoint_started) {
            (SimulationPhase::Running | SimulationPhase::Paused, Some(started)) => {
                now.duration_since(started).as_secs()
            }
            _ => 0,
        };
        SimulationStatus {
            phase: self.phase,
            current_index: self.current_index,
            active_checkpoint_index: self.active_checkpoint,
            checkpoint_started_at: self.checkpoint_started_wall,
            elapsed_seconds,
            speed_millis_per_step: self.step_millis,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use model::checkpoint::{Checkpoint, CheckpointStatus};
    use model::coordinate::Coordinate;
    use model::event::JourneyEvent;
    use model::route::Route;
    use model::simulation::SimulationPhase;
    use tokio::time::Instant;
    use utility::id::Id;

    use super::*;

    /// Points roughly 100 m apart along the equator.
    fn straight_route(points: usize) -> Route {
        let coordinates: Vec<Coordinate> = (0..points)
            .map(|index| Coordinate::new(0.0, index as f64 * 0.0009))
            .collect();
        let destination = coordinates[points - 1];
        Route::new(coordinates, destination)
    }

    fn checkpoint_at(id: u64, position: Coordinate, minutes: u32) -> Checkpoint {
        Checkpoint::new(Id::new(id), position, format!("Checkpoint {id}"), minutes)
    }

    /// Engine for a route whose only checkpoint sits on the last point.
    fn engine_with_destination_checkpoint(points: usize, minutes: u32) -> SimulationEngine {
        let route = straight_route(points);
        let checkpoint = checkpoint_at(1, route.destination, minutes);
        SimulationEngine::new(route, vec![checkpoint])
    }

    fn positions(events: &[JourneyEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, JourneyEvent::PositionUpdate { .. }))
            .count()
    }

    #[test]
    fn start_requires_checkpoints_before_route() {
        let mut engine = SimulationEngine::new(straight_route(3), vec![]);
        assert!(matches!(
            engine.start(Instant::now()),
            Err(ValidationError::NoCheckpoints)
        ));

        let mut engine = SimulationEngine::new(
            Route::new(vec![], Coordinate::new(0.0, 0.0)),
            vec![checkpoint_at(1, Coordinate::new(0.0, 0.0), 5)],
        );
        assert!(matches!(
            engine.start(Instant::now()),
            Err(ValidationError::EmptyRoute)
        ));
    }

    #[test]
    fn runs_the_whole_route_in_one_tick_per_point() {
        let points = 5;
        let mut engine = engine_with_destination_checkpoint(points, 60);
        let t0 = Instant::now();
        engine.start(t0).unwrap();

        let mut all_events = Vec::new();
        for tick in 1..=points {
            let now = t0 + Duration::from_secs(tick as u64);
            all_events.extend(engine.step(now));
        }

        assert_eq!(positions(&all_events), points);
        assert_eq!(engine.phase(), SimulationPhase::Ended);
        assert!(matches!(
            all_events.last(),
            Some(JourneyEvent::SimulationEnded { message }) if message == END_MESSAGE
        ));
        // Walking onto the destination also reaches its checkpoint.
        assert!(all_events
            .iter()
            .any(|event| matches!(event, JourneyEvent::CheckpointReached { number: 1, .. })));
    }

    #[test]
    fn steps_after_the_end_do_nothing() {
        let mut engine = engine_with_destination_checkpoint(2, 60);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        engine.step(t0 + Duration::from_secs(1));
        engine.step(t0 + Duration::from_secs(2));
        assert_eq!(engine.phase(), SimulationPhase::Ended);

        assert!(engine.step(t0 + Duration::from_secs(3)).is_empty());
        assert!(engine.deadline_tick(t0 + Duration::from_secs(3)).is_empty());
    }

    #[test]
    fn active_checkpoint_index_never_decreases() {
        let route = straight_route(6);
        let checkpoints = vec![
            checkpoint_at(1, route.points[2], 60),
            checkpoint_at(2, route.points[5], 60),
        ];
        let mut engine = SimulationEngine::new(route, checkpoints);
        let t0 = Instant::now();
        engine.start(t0).unwrap();

        let mut previous = 0;
        for tick in 1..=6u64 {
            engine.step(t0 + Duration::from_secs(tick));
            assert!(engine.active_checkpoint_index() >= previous);
            previous = engine.active_checkpoint_index();
        }
        assert_eq!(previous, 2);
    }

    #[test]
    fn reaching_a_checkpoint_resets_the_deadline_clock() {
        let route = straight_route(6);
        let checkpoints = vec![
            checkpoint_at(1, route.points[1], 60),
            checkpoint_at(2, route.points[5], 60),
        ];
        let mut engine = SimulationEngine::new(route, checkpoints);
        let t0 = Instant::now();
        engine.start(t0).unwrap();

        engine.step(t0 + Duration::from_secs(1));
        let events = engine.step(t0 + Duration::from_secs(2));
        assert!(events
            .iter()
            .any(|event| matches!(event, JourneyEvent::CheckpointReached { number: 1, .. })));

        // Ten seconds after the reach the clock reports ten seconds, not twelve.
        let events = engine.deadline_tick(t0 + Duration::from_secs(12));
        assert!(matches!(
            events.first(),
            Some(JourneyEvent::TimerUpdate { elapsed_seconds: 10 })
        ));
    }

    #[test]
    fn invalid_points_are_skipped_without_losing_the_cursor() {
        let mut points: Vec<Coordinate> =
            (0..4).map(|index| Coordinate::new(0.0, index as f64 * 0.0009)).collect();
        points[1] = Coordinate::new(f64::NAN, 200.0);
        let destination = points[3];
        let route = Route::new(points, destination);
        let checkpoint = checkpoint_at(1, destination, 60);
        let mut engine = SimulationEngine::new(route, vec![checkpoint]);

        let t0 = Instant::now();
        engine.start(t0).unwrap();
        let mut all_events = Vec::new();
        for tick in 1..=4u64 {
            all_events.extend(engine.step(t0 + Duration::from_secs(tick)));
        }

        // Three valid points emitted, the broken one silently dropped.
        assert_eq!(positions(&all_events), 3);
        assert_eq!(engine.phase(), SimulationPhase::Ended);
    }

    #[test]
    fn deadline_strictly_after_the_budget_misses_the_checkpoint() {
        let mut engine = engine_with_destination_checkpoint(5, 1);
        let t0 = Instant::now();
        engine.start(t0).unwrap();

        // At exactly the budget nothing happens yet.
        let events = engine.deadline_tick(t0 + Duration::from_secs(60));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            JourneyEvent::TimerUpdate { elapsed_seconds: 60 }
        ));

        let events = engine.deadline_tick(t0 + Duration::from_secs(61));
        assert!(events
            .iter()
            .any(|event| matches!(event, JourneyEvent::CheckpointMissed { number: 1, .. })));
        assert_eq!(engine.phase(), SimulationPhase::SosPending);
        assert!(matches!(
            engine.checkpoints()[0].status,
            CheckpointStatus::Missed { grace_minutes: 2 }
        ));
        // The original plan survives the miss.
        assert_eq!(engine.checkpoints()[0].planned_minutes, 1);
    }

    #[test]
    fn a_missed_checkpoint_fires_exactly_once() {
        let mut engine = engine_with_destination_checkpoint(5, 1);
        let t0 = Instant::now();
        engine.start(t0).unwrap();

        let events = engine.deadline_tick(t0 + Duration::from_secs(61));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, JourneyEvent::CheckpointMissed { .. }))
                .count(),
            1
        );
        // Halted; further ticks are inert.
        assert!(engine.deadline_tick(t0 + Duration::from_secs(62)).is_empty());
        assert!(engine.step(t0 + Duration::from_secs(62)).is_empty());
    }

    #[test]
    fn the_clock_keeps_running_while_paused() {
        let mut engine = engine_with_destination_checkpoint(5, 60);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        engine.step(t0 + Duration::from_secs(1));

        engine.pause();
        assert_eq!(engine.phase(), SimulationPhase::Paused);
        assert!(engine.step(t0 + Duration::from_secs(5)).is_empty());

        // Paused at 10s elapsed, resumed 5s later: the clock reports 15s.
        let events = engine.deadline_tick(t0 + Duration::from_secs(15));
        assert!(matches!(
            events.first(),
            Some(JourneyEvent::TimerUpdate { elapsed_seconds: 15 })
        ));

        engine.resume();
        assert_eq!(engine.phase(), SimulationPhase::Running);
        let status = engine.status(t0 + Duration::from_secs(15));
        assert_eq!(status.current_index, 1);
        assert_eq!(status.elapsed_seconds, 15);
    }

    #[test]
    fn a_deadline_can_expire_while_paused() {
        let mut engine = engine_with_destination_checkpoint(5, 1);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        engine.pause();

        let events = engine.deadline_tick(t0 + Duration::from_secs(61));
        assert!(events
            .iter()
            .any(|event| matches!(event, JourneyEvent::CheckpointMissed { .. })));
        assert_eq!(engine.phase(), SimulationPhase::SosPending);
    }

    #[test]
    fn speed_changes_preserve_the_cursor_and_respect_the_bounds() {
        let mut engine = engine_with_destination_checkpoint(10, 60);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        for tick in 1..=5u64 {
            engine.step(t0 + Duration::from_secs(tick));
        }
        let before = engine.status(t0 + Duration::from_secs(5)).current_index;

        assert_eq!(engine.speed_up(), Some(800));
        assert_eq!(engine.status(t0 + Duration::from_secs(5)).current_index, before);

        for _ in 0..10 {
            engine.speed_up();
        }
        assert_eq!(engine.step_millis(), MIN_STEP_MILLIS);
        assert_eq!(engine.speed_up(), None);

        for _ in 0..20 {
            engine.slow_down();
        }
        assert_eq!(engine.step_millis(), MAX_STEP_MILLIS);
        assert_eq!(engine.slow_down(), None);
    }

    #[test]
    fn speed_changes_are_rejected_unless_running() {
        let mut engine = engine_with_destination_checkpoint(5, 60);
        assert_eq!(engine.speed_up(), None);

        engine.start(Instant::now()).unwrap();
        engine.pause();
        assert_eq!(engine.speed_up(), None);
        assert_eq!(engine.step_millis(), DEFAULT_STEP_MILLIS);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut engine = engine_with_destination_checkpoint(5, 60);
        engine.start(Instant::now()).unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(engine.phase(), SimulationPhase::Ended);
        assert!(engine.deadline_tick(Instant::now()).is_empty());
    }

    #[test]
    fn restart_after_a_miss_keeps_the_cursor_and_grants_the_grace_budget() {
        let route = straight_route(8);
        let checkpoints = vec![checkpoint_at(1, route.points[7], 1)];
        let mut engine = SimulationEngine::new(route, checkpoints);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        for tick in 1..=3u64 {
            engine.step(t0 + Duration::from_secs(tick));
        }
        engine.deadline_tick(t0 + Duration::from_secs(61));
        assert_eq!(engine.phase(), SimulationPhase::SosPending);

        // The traveler reports safe and continues.
        let t1 = t0 + Duration::from_secs(90);
        engine.start(t1).unwrap();
        assert_eq!(engine.status(t1).current_index, 3);

        // Two minutes of grace: fine at 120s, missed again one second later.
        let events = engine.deadline_tick(t1 + Duration::from_secs(120));
        assert!(!events
            .iter()
            .any(|event| matches!(event, JourneyEvent::CheckpointMissed { .. })));
        let events = engine.deadline_tick(t1 + Duration::from_secs(121));
        assert!(events
            .iter()
            .any(|event| matches!(event, JourneyEvent::CheckpointMissed { .. })));
    }

    #[test]
    fn the_timer_keeps_reporting_after_the_last_checkpoint_was_reached() {
        let route = straight_route(10);
        let checkpoints = vec![checkpoint_at(1, route.points[1], 60)];
        let mut engine = SimulationEngine::new(route, checkpoints);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        engine.step(t0 + Duration::from_secs(1));
        engine.step(t0 + Duration::from_secs(2));
        assert_eq!(engine.active_checkpoint_index(), 1);

        // No checkpoint left to miss, the elapsed display still updates.
        let events = engine.deadline_tick(t0 + Duration::from_secs(9));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            JourneyEvent::TimerUpdate { elapsed_seconds: 7 }
        ));
    }

    #[test]
    fn updating_checkpoints_retargets_the_first_pending_entry() {
        let route = straight_route(5);
        let mut engine = SimulationEngine::new(route.clone(), vec![]);
        let mut reached = checkpoint_at(1, route.points[1], 5);
        reached.status = CheckpointStatus::Reached;
        let pending = checkpoint_at(2, route.points[4], 5);
        engine.update_checkpoints(vec![reached, pending]);
        assert_eq!(engine.active_checkpoint_index(), 1);

        engine.update_checkpoints(vec![]);
        assert_eq!(engine.active_checkpoint_index(), 0);
    }

    #[test]
    fn replacing_the_route_discards_all_progress() {
        let mut engine = engine_with_destination_checkpoint(5, 60);
        let t0 = Instant::now();
        engine.start(t0).unwrap();
        engine.step(t0 + Duration::from_secs(1));
        engine.speed_up();

        let replacement = straight_route(3);
        let checkpoint = checkpoint_at(9, replacement.destination, 4);
        engine.replace_route(replacement, vec![checkpoint]);

        let status = engine.status(t0 + Duration::from_secs(2));
        assert_eq!(status.phase, SimulationPhase::Idle);
        assert_eq!(status.current_index, 0);
        assert_eq!(status.active_checkpoint_index, 0);
        assert_eq!(status.speed_millis_per_step, DEFAULT_STEP_MILLIS);
    }

    #[test]
    fn one_missed_checkpoint_then_ended_for_an_unattended_journey() {
        // Five points, one checkpoint on the last, one minute of budget.
        let mut engine = engine_with_destination_checkpoint(5, 1);
        let t0 = Instant::now();
        engine.start(t0).unwrap();

        let mut missed = 0;
        for tick in 1..=70u64 {
            for event in engine.deadline_tick(t0 + Duration::from_secs(tick)) {
                if let JourneyEvent::CheckpointMissed { number, .. } = event {
                    missed += 1;
                    assert_eq!(number, 1);
                }
            }
        }
        assert_eq!(missed, 1);
        assert_eq!(engine.phase(), SimulationPhase::SosPending);

        // Gives up entirely.
        engine.stop();
        assert_eq!(engine.phase(), SimulationPhase::Ended);
    }
}

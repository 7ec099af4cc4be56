use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ExampleData;

/// Lifecycle of one simulator instance. Exactly one phase holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SimulationPhase {
    Idle,
    Running,
    Paused,
    SosPending,
    Ended,
}

impl SimulationPhase {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SimulationPhase::Running
                | SimulationPhase::Paused
                | SimulationPhase::SosPending
        )
    }
}

/// Observable simulator state at one point in time.
///
/// `active_checkpoint_index` can equal the checkpoint count once every
/// checkpoint has been reached.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatus {
    pub phase: SimulationPhase,
    pub current_index: usize,
    pub active_checkpoint_index: usize,
    pub checkpoint_started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub speed_millis_per_step: u64,
}

impl ExampleData for SimulationStatus {
    fn example_data() -> Self {
        SimulationStatus {
            phase: SimulationPhase::Running,
            current_index: 12,
            active_checkpoint_index: 1,
            checkpoint_started_at: Some(Utc::now()),
            elapsed_seconds: 42,
            speed_millis_per_step: 1000,
        }
    }
}

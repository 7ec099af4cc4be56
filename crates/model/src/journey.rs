use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    checkpoint::Checkpoint,
    route::Route,
    simulation::{SimulationPhase, SimulationStatus},
    sos::SosStatus,
    ExampleData,
};

/// Snapshot of one escorted journey: the planned route and checkpoints
/// plus the current simulation and SOS state.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: Id<Journey>,
    pub route: Route,
    pub checkpoints: Vec<Checkpoint>,
    pub simulation: SimulationStatus,
    pub sos: Option<SosStatus>,
}

impl HasId for Journey {
    type IdType = u64;
}

impl ExampleData for Journey {
    fn example_data() -> Self {
        Journey {
            id: Id::new(1),
            route: Route::example_data(),
            checkpoints: vec![Checkpoint::example_data()],
            simulation: SimulationStatus {
                phase: SimulationPhase::Idle,
                current_index: 0,
                active_checkpoint_index: 0,
                checkpoint_started_at: None,
                elapsed_seconds: 0,
                speed_millis_per_step: 1000,
            },
            sos: None,
        }
    }
}

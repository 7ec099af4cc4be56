use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{checkpoint::Checkpoint, coordinate::Coordinate, sos::SosOutcome, zone::Zone};

/// Everything a journey reports to its observers. The UI subscribes to a
/// stream of these instead of being called back from inside timer code.
///
/// Checkpoint numbers are 1-based display numbers; the id is the stable
/// identity.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum JourneyEvent {
    #[serde(rename_all = "camelCase")]
    PositionUpdate { position: Coordinate },
    #[serde(rename_all = "camelCase")]
    CheckpointReached {
        checkpoint_id: Id<Checkpoint>,
        number: u32,
    },
    #[serde(rename_all = "camelCase")]
    CheckpointMissed {
        checkpoint_id: Id<Checkpoint>,
        number: u32,
    },
    #[serde(rename_all = "camelCase")]
    TimerUpdate { elapsed_seconds: u64 },
    /// Fired once on walking into a zone; leaving re-arms it.
    #[serde(rename_all = "camelCase")]
    ZoneEntered { zone_id: Id<Zone>, name: String },
    #[serde(rename_all = "camelCase")]
    SimulationEnded { message: String },
    #[serde(rename_all = "camelCase")]
    SosOpened {
        countdown_seconds: u64,
        triggering_checkpoint: Option<u32>,
        /// Name of the geofence zone closest to the last known position.
        zone: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SosCountdown { remaining_seconds: u64 },
    #[serde(rename_all = "camelCase")]
    SosResolved { outcome: SosOutcome },
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{coordinate::Coordinate, ExampleData};

/// A waypoint with a deadline. The traveler is expected to arrive within
/// `planned_minutes` of the checkpoint becoming active.
///
/// Identity is the `id`, never the list position: display labels get
/// renumbered when the list is resorted, running deadlines do not.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: Id<Checkpoint>,
    pub position: Coordinate,
    pub label: String,
    pub description: Option<String>,
    pub planned_minutes: u32,
    pub status: CheckpointStatus,
}

impl Checkpoint {
    pub fn new(
        id: Id<Checkpoint>,
        position: Coordinate,
        label: impl Into<String>,
        planned_minutes: u32,
    ) -> Self {
        Self {
            id,
            position,
            label: label.into(),
            description: None,
            planned_minutes,
            status: CheckpointStatus::Pending,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The budget currently in effect. After a miss the grace window
    /// replaces the planned value; the planned value itself stays intact.
    pub fn allowed_minutes(&self) -> u32 {
        match self.status {
            CheckpointStatus::Missed { grace_minutes } => grace_minutes,
            _ => self.planned_minutes,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, CheckpointStatus::Pending)
    }
}

impl HasId for Checkpoint {
    type IdType = u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointStatus {
    Pending,
    Reached,
    Missed { grace_minutes: u32 },
}

impl ExampleData for Checkpoint {
    fn example_data() -> Self {
        Checkpoint::new(
            Id::new(1),
            Coordinate::new(54.3150, 10.1340),
            "Checkpoint 1",
            5,
        )
        .with_description("Old town bridge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_window_replaces_the_planned_budget() {
        let mut checkpoint =
            Checkpoint::new(Id::new(1), Coordinate::new(0.0, 0.0), "Checkpoint 1", 15);
        assert_eq!(checkpoint.allowed_minutes(), 15);

        checkpoint.status = CheckpointStatus::Missed { grace_minutes: 2 };
        assert_eq!(checkpoint.allowed_minutes(), 2);
        // The original plan stays readable for auditing.
        assert_eq!(checkpoint.planned_minutes, 15);
    }

    #[test]
    fn reached_checkpoints_keep_their_planned_budget() {
        let mut checkpoint =
            Checkpoint::new(Id::new(1), Coordinate::new(0.0, 0.0), "Checkpoint 1", 15);
        checkpoint.status = CheckpointStatus::Reached;
        assert_eq!(checkpoint.allowed_minutes(), 15);
        assert!(!checkpoint.is_pending());
    }
}

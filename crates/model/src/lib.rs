pub use serde_with;

pub mod checkpoint;
pub mod contact;
pub mod coordinate;
pub mod event;
pub mod journey;
pub mod route;
pub mod simulation;
pub mod sos;
pub mod zone;

pub trait ExampleData {
    fn example_data() -> Self;
}

use std::sync::Arc;

use escort::{
    contacts::ContactBook,
    journey::{EscortConfig, JourneyService},
    permissions::StaticPermissionGate,
};
use messaging::LogTransport;
use model::{contact::EmergencyContact, coordinate::Coordinate, event::JourneyEvent};
use routing::SyntheticRouteProvider;
use storage::MemoryContactStore;

#[tokio::main]
async fn main() {
    env_logger::init();

    let store = Arc::new(MemoryContactStore::default());
    let contacts = ContactBook::new(store.clone());
    contacts
        .add(EmergencyContact::new("+491701234567"))
        .await
        .unwrap();

    let service = JourneyService::new(
        Arc::new(SyntheticRouteProvider::new(8)),
        Arc::new(LogTransport),
        store,
        Arc::new(StaticPermissionGate::allowed()),
        EscortConfig::default(),
    );

    // Kiel main station to Laboe, roughly
    let journey = service
        .plan(
            Coordinate::new(54.3146, 10.1344),
            Coordinate::new(54.4097, 10.2317),
        )
        .await
        .unwrap();
    println!(
        "planned journey {} with {} route points and {} checkpoints",
        journey.id,
        journey.route.len(),
        journey.checkpoints.len()
    );

    let handle = service.handle(journey.id).await.unwrap();
    let mut events = handle.subscribe();

    // full speed, the walk itself is not the point here
    for _ in 0..3 {
        handle.speed_up().await.unwrap();
    }
    handle.start().await.unwrap();

    loop {
        let event = events.recv().await.unwrap();
        println!("{}", serde_json::to_string(&event).unwrap());
        if matches!(event, JourneyEvent::SimulationEnded { .. }) {
            break;
        }
    }

    let journey = handle.snapshot().await.unwrap();
    println!(
        "final state: {}",
        serde_json::to_string_pretty(&journey).unwrap()
    );
}

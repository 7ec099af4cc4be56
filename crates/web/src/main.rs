use std::sync::Arc;

use escort::{
    contacts::ContactBook,
    journey::{EscortConfig, JourneyService},
    messaging::MessagingTransport,
    permissions::StaticPermissionGate,
};
use messaging::{HttpSmsGateway, LogTransport};
use routing::HttpRouteProvider;
use storage::JsonContactStore;
use web::{start_web_server, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    // routing backend
    let provider = HttpRouteProvider::from_env().expect("expected ROUTING_API_URL in env.");

    // sms gateway
    let transport: Arc<dyn MessagingTransport> = match HttpSmsGateway::from_env() {
        Some(gateway) => Arc::new(gateway),
        None => {
            log::warn!("SMS_GATEWAY_URL not set, sos alerts go to the log only.");
            Arc::new(LogTransport)
        }
    };

    // contact storage
    let store = Arc::new(
        JsonContactStore::from_env().unwrap_or_else(|| JsonContactStore::new("./contacts.json")),
    );

    // journeys
    let journeys = JourneyService::new(
        Arc::new(provider),
        transport,
        store.clone(),
        Arc::new(StaticPermissionGate::allowed()),
        EscortConfig::from_env(),
    );
    let contacts = ContactBook::new(store);

    // web server
    let web_future = start_web_server(WebState { journeys, contacts });

    let _ = web_future.await;
}

//! Maps incoming chat messages to lookups and replies.

use anyhow::Result;
use tracing::{error, info};

use super::{Message, ReplySink, Update};
use crate::models::Coordinate;
use crate::service::{LookupOutcome, NearbyService};

/// Fixed reply texts.
pub mod replies {
    pub const HELP: &str = "Send /start to receive a greeting";
    pub const NO_RESULTS: &str = "No Recommendations Found For your Requested Location!";
    pub const NO_ADDRESS_MATCH: &str = "Please input a location such as \"Tan Kah Kee MRT\" or \"Singapore 123456\" or \"31 Ocean Way\"";
    pub const FAILURE: &str = "Sorry, something went wrong looking that up. Please try again later.";

    pub fn greeting(first_name: &str) -> String {
        format!(
            "Hello {}!\n\nTo use this Bot, send your location and you will receive a list of places to eat!",
            first_name
        )
    }
}

/// Handle one update. Lookup failures are logged and answered with an
/// apology; only delivery failures are returned.
pub async fn handle_update(
    update: &Update,
    service: &NearbyService,
    sink: &dyn ReplySink,
) -> Result<()> {
    let Some(message) = &update.message else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let first_name = message
        .from
        .as_ref()
        .map(|u| u.first_name.as_str())
        .unwrap_or("there");

    if let Some(location) = message.location {
        info!(
            "Location request from {} at ({}, {})",
            first_name, location.latitude, location.longitude
        );
        return handle_location(chat_id, location.latitude, location.longitude, service, sink)
            .await;
    }

    match command(message) {
        Some("/start") => sink.send_text(chat_id, &replies::greeting(first_name)).await,
        Some("/help") => sink.send_text(chat_id, replies::HELP).await,
        // Anything else, unknown commands included, is treated as an address.
        _ => match message.text.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                info!("Address request from {}: {:?}", first_name, text);
                handle_address(chat_id, text, service, sink).await
            }
            _ => Ok(()),
        },
    }
}

/// Leading `/command`, with any `@botname` suffix removed.
fn command(message: &Message) -> Option<&str> {
    let text = message.text.as_deref()?.trim();
    if !text.starts_with('/') {
        return None;
    }
    let word = text.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

async fn handle_location(
    chat_id: i64,
    latitude: f64,
    longitude: f64,
    service: &NearbyService,
    sink: &dyn ReplySink,
) -> Result<()> {
    let outcome = match Coordinate::new(latitude, longitude) {
        Ok(coordinate) => service.lookup_by_coordinate(coordinate).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(outcome) => deliver(chat_id, outcome, sink).await,
        Err(e) => {
            error!("Coordinate lookup failed: {}", e);
            sink.send_text(chat_id, replies::FAILURE).await
        }
    }
}

async fn handle_address(
    chat_id: i64,
    text: &str,
    service: &NearbyService,
    sink: &dyn ReplySink,
) -> Result<()> {
    let lookup = match service.lookup_by_address_text(text).await {
        Ok(lookup) => lookup,
        Err(e) => {
            error!("Address lookup for {:?} failed: {}", text, e);
            return sink.send_text(chat_id, replies::FAILURE).await;
        }
    };

    deliver(chat_id, lookup.outcome, sink).await?;

    // Tell the user which address their text was resolved to.
    if let Some(resolved) = lookup.resolved {
        sink.send_text(chat_id, &resolved.formatted_address).await?;
    }
    Ok(())
}

async fn deliver(chat_id: i64, outcome: LookupOutcome, sink: &dyn ReplySink) -> Result<()> {
    match outcome {
        LookupOutcome::Found(message) => {
            for chunk in message.chunks() {
                sink.send_text(chat_id, chunk).await?;
            }
            Ok(())
        }
        LookupOutcome::NoResults => sink.send_text(chat_id, replies::NO_RESULTS).await,
        LookupOutcome::NoAddressMatch => sink.send_text(chat_id, replies::NO_ADDRESS_MATCH).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::format::MessageFormatter;
    use crate::models::record::test_record;
    use crate::service::tests::{candidate, FakeGeocoder};
    use crate::telegram::{Chat, Location, User};
    use async_trait::async_trait;
    use std::num::NonZeroUsize;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingSink {
        fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn update(text: Option<&str>, location: Option<Location>) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                chat: Chat { id: 42 },
                from: Some(User {
                    first_name: "Ada".to_string(),
                }),
                text: text.map(String::from),
                location,
            }),
        }
    }

    fn service(geocoder: FakeGeocoder) -> NearbyService {
        NearbyService::new(
            Arc::new(MemoryCatalog::new(vec![test_record(1, "w21z6h8v5")])),
            Arc::new(geocoder),
            MessageFormatter::default(),
        )
    }

    fn singapore() -> Option<Location> {
        Some(Location {
            latitude: 1.3,
            longitude: 103.8,
        })
    }

    #[tokio::test]
    async fn test_start_greets_by_name() {
        let sink = RecordingSink::default();
        handle_update(&update(Some("/start"), None), &service(FakeGeocoder::default()), &sink)
            .await
            .unwrap();
        assert_eq!(sink.texts(), vec![replies::greeting("Ada")]);
        assert_eq!(sink.sent.lock().unwrap()[0].0, 42);
    }

    #[tokio::test]
    async fn test_help() {
        let sink = RecordingSink::default();
        handle_update(
            &update(Some("/help@nearby_bot"), None),
            &service(FakeGeocoder::default()),
            &sink,
        )
        .await
        .unwrap();
        assert_eq!(sink.texts(), vec![replies::HELP]);
    }

    #[tokio::test]
    async fn test_location_sends_results() {
        let sink = RecordingSink::default();
        handle_update(&update(None, singapore()), &service(FakeGeocoder::default()), &sink)
            .await
            .unwrap();

        let texts = sink.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("1. Place 1\nLink: https://example.com/1\n"));
    }

    #[tokio::test]
    async fn test_location_without_results() {
        let sink = RecordingSink::default();
        let far = Some(Location {
            latitude: 51.5,
            longitude: -0.12,
        });
        handle_update(&update(None, far), &service(FakeGeocoder::default()), &sink)
            .await
            .unwrap();
        assert_eq!(sink.texts(), vec![replies::NO_RESULTS]);
    }

    #[tokio::test]
    async fn test_long_results_sent_in_chunks() {
        let records = (0..100).map(|i| test_record(i, "w21z6h8v5")).collect();
        let svc = NearbyService::new(
            Arc::new(MemoryCatalog::new(records)),
            Arc::new(FakeGeocoder::default()),
            MessageFormatter::new(NonZeroUsize::new(500).unwrap()),
        );
        let sink = RecordingSink::default();

        handle_update(&update(None, singapore()), &svc, &sink)
            .await
            .unwrap();

        let texts = sink.texts();
        assert!(texts.len() > 1);
        assert!(texts.iter().all(|t| t.encode_utf16().count() <= 500));
    }

    #[tokio::test]
    async fn test_address_results_followed_by_resolved_address() {
        let geocoder = FakeGeocoder {
            candidates: vec![candidate(1.3, 103.8)],
            ..Default::default()
        };
        let sink = RecordingSink::default();
        handle_update(&update(Some("Tan Kah Kee MRT"), None), &service(geocoder), &sink)
            .await
            .unwrap();

        let texts = sink.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("1. Place 1"));
        assert_eq!(texts[1], "TAN KAH KEE MRT STATION (DT8)");
    }

    #[tokio::test]
    async fn test_unknown_address_prompts_for_location() {
        let sink = RecordingSink::default();
        handle_update(&update(Some("Atlantis"), None), &service(FakeGeocoder::default()), &sink)
            .await
            .unwrap();
        assert_eq!(sink.texts(), vec![replies::NO_ADDRESS_MATCH]);
    }

    #[tokio::test]
    async fn test_geocoder_failure_apologizes() {
        let geocoder = FakeGeocoder {
            fail: true,
            ..Default::default()
        };
        let sink = RecordingSink::default();
        handle_update(&update(Some("Tan Kah Kee MRT"), None), &service(geocoder), &sink)
            .await
            .unwrap();
        assert_eq!(sink.texts(), vec![replies::FAILURE]);
    }

    #[tokio::test]
    async fn test_unknown_command_goes_through_address_lookup() {
        let geocoder = Arc::new(FakeGeocoder::default());
        let svc = NearbyService::new(
            Arc::new(MemoryCatalog::default()),
            geocoder.clone(),
            MessageFormatter::default(),
        );
        let sink = RecordingSink::default();

        handle_update(&update(Some("/menu"), None), &svc, &sink)
            .await
            .unwrap();

        assert_eq!(geocoder.queries.lock().unwrap().as_slice(), ["/menu"]);
        assert_eq!(sink.texts(), vec![replies::NO_ADDRESS_MATCH]);
    }

    #[tokio::test]
    async fn test_update_without_message_ignored() {
        let sink = RecordingSink::default();
        let update = Update {
            update_id: 3,
            message: None,
        };
        handle_update(&update, &service(FakeGeocoder::default()), &sink)
            .await
            .unwrap();
        assert!(sink.texts().is_empty());
    }
}

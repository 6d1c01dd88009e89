// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Wallbox Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use async_trait::async_trait;
use mockito::{Matcher, Server, ServerGuard};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use wallbox_api::WallboxClient;
use wallbox_core::{WallboxCoordinator, WallboxEntities};
use wallbox_ha::publisher::{UNAVAILABLE, render_state};
use wallbox_ha::{EntityPublisher, HaResult, HomeAssistantClient, StatePayload, StateSink};

const STATION: &str = "12345";

#[derive(Debug, Default)]
struct RecordingSink {
    states: Mutex<BTreeMap<String, StatePayload>>,
}

impl RecordingSink {
    fn get(&self, entity_id: &str) -> StatePayload {
        self.states
            .lock()
            .get(entity_id)
            .cloned()
            .unwrap_or_else(|| panic!("{entity_id} was not published"))
    }
}

#[async_trait]
impl StateSink for RecordingSink {
    async fn publish(&self, entity_id: &str, payload: &StatePayload) -> HaResult<()> {
        self.states
            .lock()
            .insert(entity_id.to_string(), payload.clone());
        Ok(())
    }
}

async fn wallbox_server(status_id: i64) -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/auth/token/user")
        .with_status(200)
        .with_body(r#"{"jwt":"token","ttl":4102444800000}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/chargers/status/12345")
        .with_status(200)
        .with_body(
            json!({
                "name": "Garage",
                "status_id": status_id,
                "charging_power": 7.456,
                "max_available_power": 32,
                "added_energy": 3.1,
                "charging_time": "5400",
                "user_name": "Jana",
                "car_plate": null,
                "state_of_charge": null,
                "config_data": {
                    "max_charging_current": 16,
                    "locked": 1,
                    "serial_number": "20000",
                    "part_number": "PLP1",
                    "software": { "currentVersion": "5.5.10" }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
}

async fn coordinator(server: &ServerGuard) -> Arc<WallboxCoordinator> {
    let client = WallboxClient::new("user", "secret")
        .unwrap()
        .with_base_url(server.url())
        .with_retry_config(1, Duration::from_millis(10));
    let coordinator = Arc::new(WallboxCoordinator::new(STATION, Arc::new(client)));
    coordinator.refresh_now().await.unwrap();
    coordinator
}

#[tokio::test]
async fn test_publish_all_renders_entities() {
    let server = wallbox_server(182).await;
    let coordinator = coordinator(&server).await;
    let entities = WallboxEntities::new(&coordinator).unwrap();
    let sink = Arc::new(RecordingSink::default());
    let publisher = EntityPublisher::new(
        Arc::clone(&sink) as Arc<dyn StateSink>,
        Arc::clone(&coordinator),
        Arc::new(entities),
        "Wallbox",
    );

    // seven sensors are reported, plus the number, lock and switch
    assert_eq!(publisher.publish_all().await.unwrap(), 10);

    let power = sink.get("sensor.wallbox_charging_power");
    assert_eq!(power.state, "7.46");
    assert_eq!(power.attributes["friendly_name"], "Garage Charging Power");
    assert_eq!(power.attributes["unit_of_measurement"], "kW");
    assert_eq!(power.attributes["device_class"], "power");
    assert_eq!(power.attributes["unique_id"], "charging_power-20000");
    assert_eq!(power.attributes["device"]["name"], "Wallbox - Garage");
    assert_eq!(power.attributes["device"]["sw_version"], "5.5.10");

    assert_eq!(sink.get("sensor.wallbox_added_energy").state, "3.10");
    assert_eq!(sink.get("sensor.wallbox_state_of_charge").state, UNAVAILABLE);
    let status = sink.get("sensor.wallbox_status_description");
    assert_eq!(status.state, "Paused");
    assert_eq!(status.attributes["user_name"], "Jana");
    assert!(!status.attributes.contains_key("car_plate"));

    let charging_time = sink.get("sensor.wallbox_charging_time");
    assert_eq!(charging_time.state, "5400");
    assert_eq!(charging_time.attributes["unit_of_measurement"], "s");
    assert_eq!(charging_time.attributes["device_class"], "duration");
    assert!(!charging_time.attributes.contains_key("user_name"));

    let lock = sink.get("lock.wallbox_locked_unlocked");
    assert_eq!(lock.state, "locked");
    assert_eq!(lock.attributes["icon"], "mdi:lock");

    let switch = sink.get("switch.wallbox_pause_resume");
    assert_eq!(switch.state, "on");
    assert_eq!(switch.attributes["icon"], "mdi:motion-play-outline");

    let number = sink.get("number.wallbox_max_charging_current");
    assert_eq!(number.state, "16");
    assert_eq!(number.attributes["min"], 6.0);
    assert_eq!(number.attributes["max"], 32.0);
    assert_eq!(number.attributes["step"], 1.0);
}

#[tokio::test]
async fn test_entity_ids_use_prefix() {
    let server = wallbox_server(194).await;
    let coordinator = coordinator(&server).await;
    let entities = WallboxEntities::new(&coordinator).unwrap();
    let sink = Arc::new(RecordingSink::default());
    let publisher = EntityPublisher::new(
        Arc::clone(&sink) as Arc<dyn StateSink>,
        Arc::clone(&coordinator),
        Arc::new(entities),
        "Wallbox",
    )
    .with_prefix("garage");

    publisher.publish_all().await.unwrap();

    assert_eq!(sink.get("switch.garage_pause_resume").state, "off");
    assert_eq!(sink.get("lock.garage_locked_unlocked").state, "locked");
}

#[tokio::test]
async fn test_render_state_unavailable() {
    let server = wallbox_server(194).await;
    let coordinator = coordinator(&server).await;
    let entities = WallboxEntities::new(&coordinator).unwrap();

    assert_eq!(
        render_state(&entities.lock, &wallbox_core::EntityState::Unavailable),
        UNAVAILABLE
    );
}

#[tokio::test]
async fn test_publish_to_home_assistant() {
    let wallbox = wallbox_server(194).await;
    let coordinator = coordinator(&wallbox).await;
    let entities = WallboxEntities::new(&coordinator).unwrap();

    let mut ha = Server::new_async().await;
    let lock_mock = ha
        .mock("POST", "/api/states/lock.wallbox_locked_unlocked")
        .match_header("authorization", "Bearer ha_token")
        .match_body(Matcher::PartialJson(json!({
            "state": "locked",
            "attributes": { "friendly_name": "Garage Lock" }
        })))
        .with_status(200)
        .with_body(
            json!({
                "entity_id": "lock.wallbox_locked_unlocked",
                "state": "locked",
                "attributes": {},
                "last_changed": "2025-10-02T10:00:00Z",
                "last_updated": "2025-10-02T10:00:00Z"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let _others = ha
        .mock("POST", Matcher::Regex(r"^/api/states/(sensor|number|switch)\.".to_string()))
        .with_status(500)
        .create_async()
        .await;

    let client = HomeAssistantClient::new(ha.url(), "ha_token")
        .unwrap()
        .with_retry_config(1, Duration::from_millis(10));
    let publisher = EntityPublisher::new(
        Arc::new(client) as Arc<dyn StateSink>,
        Arc::clone(&coordinator),
        Arc::new(entities),
        "Wallbox",
    );

    // Failed entities are skipped, the rest still go out
    assert_eq!(publisher.publish_all().await.unwrap(), 1);
    lock_mock.assert_async().await;
}

#[tokio::test]
async fn test_spawned_publisher_follows_updates() {
    let server = wallbox_server(194).await;
    let coordinator = coordinator(&server).await;
    let entities = WallboxEntities::new(&coordinator).unwrap();
    let sink = Arc::new(RecordingSink::default());
    let publisher = Arc::new(EntityPublisher::new(
        Arc::clone(&sink) as Arc<dyn StateSink>,
        Arc::clone(&coordinator),
        Arc::new(entities),
        "Wallbox",
    ));

    let handle = publisher.spawn(coordinator.subscribe());
    assert_eq!(coordinator.subscriber_count(), 1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.states.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(sink.get("sensor.wallbox_charging_power").state, "7.46");

    handle.abort();
}

//! Integration tests for the HTTP transport using wiremock.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use hue_bridge_rs::{
    Bridge, BridgeConfig, CachedEntity, Candidate, Color, DiscoverySession, Error, HttpConnector,
    HttpTransport, Operation, Scanner, SessionRecord, Transport,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DESCRIPTION: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
<device>
<modelName>Philips hue bridge 2015</modelName>
<modelNumber>BSB002</modelNumber>
<serialNumber>001788fffe100491</serialNumber>
</device>
</root>"#;

fn address(server: &MockServer) -> String {
    server.uri().replace("http://", "")
}

fn transport(server: &MockServer, credential: &str) -> HttpTransport {
    HttpTransport::new(&address(server), credential, Duration::from_secs(2)).unwrap()
}

/// A scan that never finds anything.
struct NoScan;

impl Scanner for NoScan {
    fn scan(&self, _window: Duration) -> BoxFuture<'_, hue_bridge_rs::Result<Vec<Candidate>>> {
        async { Ok(Vec::new()) }.boxed()
    }
}

async fn mount_lights(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/abc/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": {
                "name": "Lamp",
                "type": "Dimmable light",
                "modelid": "LWB004",
                "state": {"on": false, "bri": 120, "alert": "none", "reachable": true}
            },
            "2": {
                "name": "Ceiling",
                "type": "Extended color light",
                "modelid": "LCT014",
                "state": {"on": true, "bri": 254, "alert": "none", "reachable": true,
                          "hue": 8402, "sat": 140, "effect": "none", "xy": [0.4573, 0.41],
                          "ct": 366, "colormode": "ct"}
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/abc/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": {
                "name": "Living room",
                "lights": ["1", "2"],
                "type": "Room",
                "class": "Living room",
                "state": {"all_on": false, "any_on": true}
            }
        })))
        .mount(server)
        .await;
}

mod transport {
    use super::*;

    #[tokio::test]
    async fn get_uses_credential_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/abc/lights/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Lamp"})))
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport(&server, "abc").get("lights/1").await.unwrap();
        assert_eq!(reply["name"], "Lamp");
    }

    #[tokio::test]
    async fn put_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/abc/lights/1/state"))
            .and(body_json(json!({"on": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"success": {"/lights/1/state/on": true}}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport(&server, "abc")
            .put("lights/1/state", json!({"on": true}))
            .await
            .unwrap();
        assert!(reply.is_array());
    }

    #[tokio::test]
    async fn create_user_is_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/"))
            .and(body_json(json!({"devicetype": "hue-bridge-rs#user"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"success": {"username": "new"}}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport(&server, "")
            .create_user(BridgeConfig::DEFAULT_DEVICE_TYPE)
            .await
            .unwrap();
        assert_eq!(reply[0]["success"]["username"], "new");
    }

    #[tokio::test]
    async fn description_is_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/description.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DESCRIPTION))
            .mount(&server)
            .await;

        let xml = transport(&server, "").description("/description.xml").await.unwrap();
        assert!(xml.contains("BSB002"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport(&server, "abc").get("lights").await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = transport(&server, "abc").get("config").await.unwrap_err();
        assert!(matches!(err, Error::JsonLoad(_)));
    }
}

mod bridge {
    use super::*;

    #[tokio::test]
    async fn stored_session_connects_without_scan() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/description.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DESCRIPTION))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/abc/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"lights": {}, "config": {}})),
            )
            .mount(&server)
            .await;
        mount_lights(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default().with_session_path(dir.path().join("bridge.cfg"));
        let discovery = DiscoverySession::new(config)
            .with_connector(Arc::new(HttpConnector::new(Duration::from_secs(2))))
            .with_scanner(Arc::new(NoScan));

        let record = SessionRecord::new(address(&server), "abc");
        let established = discovery.establish(Some(record.clone())).await.unwrap();
        assert_eq!(established.record, record);
        assert_eq!(
            established.descriptor.serial_number.as_deref(),
            Some("001788fffe100491")
        );

        let bridge = Bridge::open(established, discovery.config().clone()).await.unwrap();
        assert_eq!(
            bridge.lights().names().collect::<Vec<_>>(),
            ["Ceiling", "Lamp"]
        );
        let room = bridge.groups().try_get("Living room").unwrap();
        assert_eq!(room.lights().len(), 2);
        assert!(room.any_on().await.unwrap());
    }

    #[tokio::test]
    async fn color_reaches_only_color_lights() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/description.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DESCRIPTION))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/abc/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lights": {}})))
            .mount(&server)
            .await;
        mount_lights(&server).await;
        Mock::given(method("PUT"))
            .and(path("/api/abc/lights/2/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"success": {}}])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/abc/lights/1/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"success": {}}])))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default().with_session_path(dir.path().join("bridge.cfg"));
        let discovery = DiscoverySession::new(config).with_scanner(Arc::new(NoScan));
        let established = discovery
            .establish(Some(SessionRecord::new(address(&server), "abc")))
            .await
            .unwrap();
        let bridge = Bridge::open(established, discovery.config().clone()).await.unwrap();

        let called = bridge
            .lights()
            .apply(&Operation::SetColor(Color::rgb(255, 0, 0)))
            .await
            .unwrap();
        assert_eq!(called, 1);

        let ceiling = bridge.lights().get("Ceiling").unwrap();
        assert_eq!(ceiling.color_temperature().await.unwrap(), Some(366));
        assert!(ceiling.refresh(false).await.unwrap().on);
    }
}

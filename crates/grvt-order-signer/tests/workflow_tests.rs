/*
[INPUT]:  Mock exchange endpoints and temporary order/instrument files
[OUTPUT]: End-to-end results for the sign and submit workflow
[POS]:    Integration test layer - binary workflow verification
[UPDATE]: When adding workflow steps or changing the report format
*/

use std::io::Write;

use grvt_order_adapter::{ClientConfig, Environment, EnvironmentRegistry, GrvtClient};
use grvt_order_signer::workflow::{self, InstrumentSource};
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

const ORDER_JSON: &str = r#"{
  "order": {
    "sub_account_id": "42",
    "is_market": false,
    "time_in_force": "GOOD_TILL_TIME",
    "legs": [{"instrument": "BTC_USDT_Perp", "size": "1.5", "limit_price": "115038.01", "is_buying_asset": true}],
    "signature": {"expiration": "1697788800000000000", "nonce": 1234567890}
  }
}"#;

fn client_for(server: &MockServer) -> GrvtClient {
    let mut endpoints = EnvironmentRegistry::resolve(Environment::Prod);
    endpoints.edge_url = server.uri();
    endpoints.trade_data_url = server.uri();
    endpoints.market_data_url = server.uri();
    GrvtClient::new(ClientConfig::for_env(Environment::Prod).with_endpoints(endpoints)).unwrap()
}

async fn mount_instruments(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/full/v1/all_instruments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{"instrument": "BTC_USDT_Perp", "instrument_hash": "0x030501", "base_decimals": 9}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetched_instruments_are_saved_and_reloadable() {
    let server = MockServer::start().await;
    mount_instruments(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("instruments.json");

    let client = client_for(&server);
    let fetched = assert_ok!(
        workflow::load_catalog(
            &client,
            &InstrumentSource::Fetch {
                save_to: Some(saved.clone())
            }
        )
        .await
    );
    let reloaded = assert_ok!(workflow::load_catalog(&client, &InstrumentSource::File(saved)).await);

    assert_eq!(fetched.records(), reloaded.records());
    assert_eq!(reloaded.require("BTC_USDT_Perp").unwrap().instrument_hash, "0x030501");
}

#[tokio::test]
async fn test_missing_instrument_file_names_the_path() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let err = workflow::load_catalog(&client, &InstrumentSource::File("/nonexistent/instruments.json".into()))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/instruments.json"));
}

#[tokio::test]
async fn test_sign_from_files_matches_golden_vector() {
    let server = MockServer::start().await;
    mount_instruments(&server).await;

    let mut order_file = tempfile::NamedTempFile::new().unwrap();
    order_file.write_all(ORDER_JSON.as_bytes()).unwrap();

    let client = client_for(&server);
    let catalog = workflow::load_catalog(&client, &InstrumentSource::Fetch { save_to: None })
        .await
        .unwrap();
    let order = assert_ok!(workflow::load_order(order_file.path()));
    // Keys read from files usually carry a trailing newline
    let key = assert_ok!(workflow::parse_signing_key(&format!("{}\n", &TEST_KEY[2..])));

    let signed = assert_ok!(workflow::sign(&client, catalog, &order, &key));
    let report = workflow::report(&signed);

    assert_eq!(
        report["r"],
        "0x229d3428598b22372588682881f18bbeb21944bdc28c42571c38207ccb732f11"
    );
    assert_eq!(report["v"], 28);
    assert_eq!(report["signer"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    assert_eq!(report["payload_to_sign"]["domain"]["chainId"], 325);
    assert_eq!(
        report["complete_order_payload"]["order"]["signature"]["s"],
        "0x4f231cf6b371e4265b2c262b33dc40b4c0b323e233ea1b33db7c8a3041255a7f"
    );
}

#[tokio::test]
async fn test_malformed_order_file_is_reported() {
    let mut order_file = tempfile::NamedTempFile::new().unwrap();
    order_file.write_all(br#"{"order": {"legs": []}}"#).unwrap();

    let err = workflow::load_order(order_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("parse order file"));
}

#[tokio::test]
async fn test_submit_uses_account_session() {
    let server = MockServer::start().await;
    mount_instruments(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/api_key/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "gravity=cli-token; Max-Age=3600")
                .insert_header("x-grvt-account-id", "acc-9"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/full/v1/create_order"))
        .and(header("cookie", "gravity=cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"order_id": "0xabc"}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_api_key("trader-1", "api-key");
    let catalog = workflow::load_catalog(&client, &InstrumentSource::Fetch { save_to: None })
        .await
        .unwrap();
    let order = grvt_order_adapter::Order::from_json(ORDER_JSON).unwrap();
    let key = workflow::parse_signing_key(TEST_KEY).unwrap();
    let signed = workflow::sign(&client, catalog, &order, &key).unwrap();

    let response = assert_ok!(workflow::submit(&client, "trader-1", &signed).await);
    assert_eq!(response["order_id"], "0xabc");
}

//! Tests against public servers. Run with `cargo test -- --ignored`.

use chrono::Duration;
use hapi_client::Server;

const LIVE_SERVER: &str = "https://cdaweb.gsfc.nasa.gov/hapi";

#[test]
#[ignore = "needs network access"]
fn a_valid_server_should_provide_a_catalog() {
    let server = Server::new(LIVE_SERVER).unwrap();
    let catalog = server.fetch_catalog().unwrap().expect("catalog");
    assert!(!catalog.is_empty());
    assert_ne!(catalog[0].id, "");

    let caps = server.fetch_capabilities().unwrap().expect("capabilities");
    assert!(caps.supports("csv"));
}

#[test]
#[ignore = "needs network access"]
fn a_dataset_can_be_described_and_sampled() {
    let server = Server::new(LIVE_SERVER).unwrap();
    let catalog = server.fetch_catalog().unwrap().expect("catalog");
    let dataset = &catalog[0];

    let info = dataset.description().unwrap().expect("info");
    assert!(!info.start_date.is_empty());
    assert!(info.parameters.values().any(|p| !p.name.is_empty()));

    let start = info.start().unwrap();
    let mid = start + (info.stop().unwrap() - start) / 2;
    let table = server
        .fetch_data(&dataset.id, mid, mid + Duration::minutes(10), None)
        .unwrap();
    assert!(table.is_some());
}

#[test]
#[ignore = "needs network access"]
fn a_wrong_server_should_return_none() {
    let server = Server::new("http://sciqlop.lpp.polytechnique.fr/").unwrap();
    assert!(server.fetch_catalog().unwrap().is_none());
}

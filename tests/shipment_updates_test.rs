mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::watch;

use common::TestApp;
use warehouse_bridge::events::PrintHandoff;
use warehouse_bridge::printing::TextLabelRenderer;
use warehouse_bridge::repositories::shipment_repository::SHIPMENT_LAYOUT;
use warehouse_bridge::services::label_printing::PreparationLabelWorker;
use warehouse_bridge::services::shipment_updates::ShipmentUpdatePoller;

fn seed(app: &TestApp) {
    for (code, status) in [("SPN1", 1), ("SPN2", 2)] {
        app.store.insert(
            SHIPMENT_LAYOUT,
            json!({
                "code": code,
                "ShipmentStatus_number": status,
                "Departure_Warehouse": "GZWH2",
                "has_unsent_update": 1,
            }),
        );
    }
}

fn poller(app: &TestApp) -> ShipmentUpdatePoller {
    ShipmentUpdatePoller::new(
        app.state.shipments.clone(),
        app.state.broadcaster.clone(),
        Duration::from_millis(20),
    )
}

#[tokio::test]
async fn tick_broadcasts_pending_shipments_as_json_array() {
    let app = TestApp::new().await;
    seed(&app);
    let mut subscriber = app.state.broadcaster.subscribe();

    let size = poller(&app).tick().await.unwrap();
    assert_eq!(size, 2);

    let message = subscriber.recv().await.unwrap();
    let batch: Value = serde_json::from_str(&message).unwrap();
    let codes: Vec<_> = batch
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["SPN1", "SPN2"]);
}

#[tokio::test]
async fn every_subscriber_receives_the_batch() {
    let app = TestApp::new().await;
    seed(&app);
    let mut first = app.state.broadcaster.subscribe();
    let mut second = app.state.broadcaster.subscribe();

    poller(&app).tick().await.unwrap();

    assert_eq!(first.recv().await.unwrap(), second.recv().await.unwrap());
}

#[tokio::test]
async fn poll_loop_stops_on_shutdown() {
    let app = TestApp::new().await;
    seed(&app);
    let mut subscriber = app.state.broadcaster.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(poller(&app).run(shutdown_rx));
    let message = tokio::time::timeout(Duration::from_secs(2), subscriber.recv())
        .await
        .expect("a tick within the timeout")
        .unwrap();
    assert!(message.starts_with('['));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("poller stops after shutdown")
        .unwrap();
}

#[tokio::test]
async fn preparation_labels_are_printed_once_across_ticks() {
    let app = TestApp::new().await;
    seed(&app);

    let (handoff, batches) = PrintHandoff::channel();
    let poller = poller(&app).with_print_handoff(handoff);
    let worker = PreparationLabelWorker::new(
        app.state.shipments.clone(),
        app.ledger.clone(),
        Arc::new(TextLabelRenderer::new(app.labels.path())),
        Arc::new(app.printer.clone()),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn(worker.run(batches, shutdown_rx.clone()));

    for _ in 0..3 {
        poller.tick().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown_tx.send(true).unwrap();
    worker_task.await.unwrap();

    // SPN2 is packed, only SPN1 is in preparation
    let jobs = app.printer.jobs();
    assert_eq!(jobs.len(), 1);
    assert!(app.ledger.is_printed("SPN1").await.unwrap());
    assert!(!app.ledger.is_printed("SPN2").await.unwrap());
}

mod common;

use common::{FakeController, frame, ok, push};
use serde_json::json;
use solstis_client::{
    AutoOutputSettings, AutoOutputStatus, ScanController, ScanRate, ScanSession, ScanState,
    ScanType,
};
use std::time::Duration;

#[tokio::test]
async fn test_polled_medium_scan() {
    let positions = [775.5, 776.4, 777.9, 779.2, 780.5];
    let mut polls = 0;
    let controller = FakeController::spawn(move |op, params| match op {
        "scan_stitch_initialise" => {
            assert_eq!(params["scan"], "medium");
            assert_eq!(params["rate"], json!([100]));
            assert_eq!(params["units"], "GHz/s");
            vec![ok(op)]
        }
        "scan_stitch_status" => {
            let reply = match positions.get(polls) {
                Some(nm) => json!({"status": [1], "current": [nm], "start": [775.5],
                    "stop": [780.5], "operation": [1]}),
                None => json!({"status": [0]}),
            };
            polls += 1;
            vec![frame("scan_stitch_status_reply", reply)]
        }
        _ => vec![ok(op)],
    })
    .await;
    let mut client = controller.client().await;

    let session = ScanSession::new(ScanType::Medium, 775.5, 780.5, ScanRate::Ghz100).unwrap();
    let mut scan = ScanController::new(&mut client, session);
    scan.initialise().await.unwrap();
    scan.start().await.unwrap();

    let mut samples = Vec::new();
    scan.run_polling(Duration::from_millis(1), |p| samples.push(*p))
        .await
        .unwrap();
    assert_eq!(scan.state(), ScanState::Completed);

    let (active, last) = samples.split_at(samples.len() - 1);
    assert!(!last[0].in_progress);
    assert_eq!(active.len(), positions.len());
    let coverage: Vec<f64> = active.iter().map(|p| p.coverage.unwrap()).collect();
    assert!(active.iter().all(|p| p.in_progress));
    assert!(coverage.windows(2).all(|w| w[0] <= w[1]));
    assert!(active
        .iter()
        .all(|p| (775.5..=780.5).contains(&p.current.unwrap())));

    client.close().await.unwrap();
    let requests = controller.requests().await;
    assert_eq!(requests[2], ("scan_stitch_op".to_string(), json!({"scan": "medium", "operation": "start"})));
}

#[tokio::test]
async fn test_paused_automatic_output() {
    let mut continues = 0;
    let controller = FakeController::spawn(move |op, params| match op {
        "terascan_output" => {
            assert_eq!(params["pause"], "on");
            vec![ok(op)]
        }
        "scan_stitch_op" => vec![ok(op), push("start", 775.5)],
        "terascan_continue" => {
            continues += 1;
            match continues {
                1 => vec![ok(op), push("scan", 776.0), push("scan", 777.5), push("repeat", 777.5)],
                _ => vec![ok(op), push("scan", 779.0), push("end", 780.5)],
            }
        }
        _ => vec![ok(op)],
    })
    .await;
    let mut client = controller.client().await;

    let session = ScanSession::new(ScanType::Medium, 775.5, 780.5, ScanRate::Ghz100).unwrap();
    let mut scan = ScanController::new(&mut client, session);
    scan.initialise().await.unwrap();
    scan.enable_automatic_output(AutoOutputSettings::paused())
        .await
        .unwrap();
    scan.start().await.unwrap();

    let mut statuses = Vec::new();
    let summary = scan
        .observe(Some(Duration::from_millis(500)), |e| statuses.push(e.status))
        .await;
    assert!(summary.completed, "{:?}", summary.ended_by);
    assert_eq!(summary.continues_sent, 2);
    use AutoOutputStatus::*;
    assert_eq!(statuses, vec![Start, Scan, Scan, Repeat, Scan, End]);

    client.close().await.unwrap();
    let continues = controller
        .requests()
        .await
        .iter()
        .filter(|(op, _)| op == "terascan_continue")
        .count();
    assert_eq!(continues, 2);
}

#[tokio::test]
async fn test_observation_ends_on_silence() {
    let controller = FakeController::spawn(|op, params| match op {
        "scan_stitch_op" if params["operation"] == "start" => {
            vec![ok(op), push("start", 775.5), push("scan", 776.0)]
        }
        _ => vec![ok(op)],
    })
    .await;
    let mut client = controller.client().await;

    let session = ScanSession::new(ScanType::Fine, 775.5, 780.5, ScanRate::Mhz500).unwrap();
    let mut scan = ScanController::new(&mut client, session);
    scan.initialise().await.unwrap();
    scan.enable_automatic_output(AutoOutputSettings::default())
        .await
        .unwrap();
    scan.start().await.unwrap();

    let summary = scan.observe(Some(Duration::from_millis(100)), |_| {}).await;
    assert_eq!(summary.events, 2);
    assert!(!summary.completed);
    assert_eq!(summary.continues_sent, 0);
    assert!(summary.ended_by.unwrap().is_timeout());

    scan.stop().await.unwrap();
    assert_eq!(scan.state(), ScanState::Stopped);
    client.close().await.unwrap();
}

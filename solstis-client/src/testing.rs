//! Scripted fake controller for unit tests

use crate::client::SolstisClient;
use serde_json::{Value, json};
use solstis_session::{AUTOMATIC_OUTPUT_OP, Session};
use solstis_transport::{MockTransport, WriteLog};
use std::time::Duration;

/// Reply frame without a transmission ID; [`fake_device`] fills in the request's
pub(crate) fn frame(op: &str, parameters: Value) -> Value {
    json!({"message": {"op": op, "parameters": parameters}})
}

/// `automatic_output` push
pub(crate) fn push(status: &str, wavelength: f64) -> Value {
    json!({"message": {"transmission_id": [0], "op": AUTOMATIC_OUTPUT_OP,
        "parameters": {"wavelength": [wavelength], "status": status}}})
}

/// Client whose transport answers each request with `handler(op, parameters)`
pub(crate) fn fake_device<F>(mut handler: F) -> (SolstisClient<MockTransport>, WriteLog)
where
    F: FnMut(&str, &Value) -> Vec<Value> + Send + Sync + 'static,
{
    let transport = MockTransport::new().with_responder(move |bytes| {
        let request: Value = serde_json::from_slice(bytes).unwrap();
        let message = &request["message"];
        let id = message["transmission_id"].clone();
        let op = message["op"].as_str().unwrap().to_string();
        let parameters = message.get("parameters").cloned().unwrap_or(json!({}));
        handler(&op, &parameters)
            .into_iter()
            .map(|mut frame| {
                if frame["message"].get("transmission_id").is_none() {
                    frame["message"]["transmission_id"] = id.clone();
                }
                serde_json::to_vec(&frame).unwrap()
            })
            .collect()
    });
    let log = transport.write_log();
    let session = Session::from_open(transport, Duration::from_millis(100));
    (SolstisClient::new(session, 1).unwrap(), log)
}

/// Decoded `(op, parameters)` of every request written so far
pub(crate) fn requests(log: &WriteLog) -> Vec<(String, Value)> {
    log.writes()
        .iter()
        .map(|bytes| {
            let value: Value = serde_json::from_slice(bytes).unwrap();
            let message = &value["message"];
            (
                message["op"].as_str().unwrap().to_string(),
                message.get("parameters").cloned().unwrap_or(json!({})),
            )
        })
        .collect()
}

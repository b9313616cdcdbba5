//! Test fixtures for webserver integration tests

use serde_json::{json, Value};

/// Minimal valid creation body
pub fn new_client_body(name: &str) -> Value {
    json!({
        "client_name": name,
        "version": 1,
        "image": "registry.local/algo:1.0",
        "cpu": "500m",
        "memory": "256Mi",
        "priority": 0.5,
        "needRestart": false
    })
}

/// Full update body for an existing client
pub fn update_client_body(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "client_name": name,
        "version": 2,
        "image": "registry.local/algo:2.0",
        "cpu": "1",
        "memory": "512Mi",
        "priority": 0.9,
        "needRestart": true
    })
}

pub fn flags_body(client_id: i64, vwap: bool, twap: bool, hft: bool) -> Value {
    json!({ "client_id": client_id, "vwap": vwap, "twap": twap, "hft": hft })
}

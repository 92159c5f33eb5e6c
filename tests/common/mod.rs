//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::Router;

/// The worked example from the scenario tool: one value per registered parameter
pub fn example_inputs() -> HashMap<String, f64> {
    [
        ("cellVoltage", 3.5),
        ("cellImpedance", 0.9),
        ("cellCapacity", 3000.0),
        ("compressionForce", 1000.0),
        ("weldingCurrent", 150.0),
        ("weldingTime", 0.5),
        ("torque", 10.0),
        ("assemblyTime", 20.0),
        ("leakageRate", 0.02),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Serve `router` on an ephemeral local port and return its address
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// Copyright (c) 2026 Originchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Minimal /metrics endpoint.

use axum::{http::StatusCode, routing::get, Router};
use prometheus::TextEncoder;
use std::sync::Arc;
use tracing::warn;

use crate::monitoring::metrics::Metrics;

/// Serve `GET /metrics` on `listen_addr` until the task is dropped.
pub fn spawn_metrics_http(listen_addr: String, metrics: Arc<Metrics>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = metrics.clone();
                async move {
                    let families = metrics.registry.gather();
                    match TextEncoder::new().encode_to_string(&families) {
                        Ok(body) => (StatusCode::OK, body),
                        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
                    }
                }
            }),
        );

        match tokio::net::TcpListener::bind(&listen_addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    warn!(error = %e, "metrics server stopped");
                }
            }
            Err(e) => {
                warn!(error = %e, addr = %listen_addr, "metrics server failed to bind");
            }
        }
    })
}

//! Query API
//!
//! GraphQL schema over the current snapshot. Each request is resolved against
//! one snapshot, so every field of a response comes from the same refresh
//! cycle. Rates are bytes/sec.

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Schema, SimpleObject};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state::AppState;
use crate::service::{InterfaceStats, Snapshot};

/// Executable query schema
pub type QuerySchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Build the query schema
pub fn build_schema() -> QuerySchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription).finish()
}

/// Interface configuration as exposed by the query endpoint
#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct NetInterfaceConfig {
    /// Hardware (MAC) address, empty if none
    pub hardware_addr: String,
    /// Maximum Transmission Unit
    pub mtu: u32,
    /// Flag names, e.g. "up", "loopback"
    pub flags: Vec<String>,
    /// Addresses in `ip/prefix` form
    pub addrs: Vec<String>,
}

/// One interface as exposed by the query endpoint
#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct NetInterface {
    /// Interface name
    pub name: String,
    /// Static configuration
    pub config: NetInterfaceConfig,
    /// Interface is up
    pub link_up: bool,
    /// Packets transmitted
    pub packets_sent: u64,
    /// Packets received
    pub packets_received: u64,
    /// Bytes transmitted
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Transmit rate (bytes/sec)
    pub speed_sent: f64,
    /// Receive rate (bytes/sec)
    pub speed_received: f64,
}

impl From<InterfaceStats> for NetInterface {
    fn from(stats: InterfaceStats) -> Self {
        Self {
            name: stats.name,
            config: NetInterfaceConfig {
                hardware_addr: stats.config.hardware_addr,
                mtu: stats.config.mtu,
                flags: stats
                    .config
                    .flags
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect(),
                addrs: stats.config.addrs,
            },
            link_up: stats.link_up,
            packets_sent: stats.packets_sent,
            packets_received: stats.packets_received,
            bytes_sent: stats.bytes_sent,
            bytes_received: stats.bytes_received,
            speed_sent: stats.speed_sent,
            speed_received: stats.speed_received,
        }
    }
}

/// Root query object
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Interfaces in the current snapshot, optionally only the one named `name`
    async fn network_interfaces(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
    ) -> async_graphql::Result<Vec<NetInterface>> {
        let snapshot = ctx.data::<Arc<Snapshot>>()?;
        Ok(resolve(snapshot, name.as_deref()))
    }

    /// When the served snapshot was sampled
    async fn sampled_at(&self, ctx: &Context<'_>) -> async_graphql::Result<DateTime<Utc>> {
        Ok(ctx.data::<Arc<Snapshot>>()?.taken_at)
    }
}

/// Project a snapshot, sorted by name; an unknown `name` yields an empty list
pub fn resolve(snapshot: &Snapshot, name: Option<&str>) -> Vec<NetInterface> {
    let mut interfaces: Vec<NetInterface> = snapshot
        .interfaces
        .values()
        .filter(|iface| name.map_or(true, |n| iface.name == n))
        .cloned()
        .map(NetInterface::from)
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    interfaces
}

/// `GET|POST /query`
pub async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    let request = req.into_inner().data(state.stats.snapshot());
    state.schema.execute(request).await.into()
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" while the server answers
    pub status: String,
    /// Interfaces in the current snapshot
    pub interfaces: usize,
    /// Refresh thread is still running
    pub refreshing: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        interfaces: state.stats.snapshot().len(),
        refreshing: state.stats.is_running(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatsConfig;
    use crate::error::Result;
    use crate::service::StatsService;
    use crate::source::{InterfaceConfig, InterfaceCounters, InterfaceFlag, InterfaceSource};
    use async_graphql::Request;
    use serde_json::Value;

    struct StaticSource;

    impl InterfaceSource for StaticSource {
        fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
            Ok(vec![
                InterfaceCounters {
                    name: "lo".to_string(),
                    bytes_sent: 10,
                    bytes_recv: 10,
                    packets_sent: 1,
                    packets_recv: 1,
                },
                InterfaceCounters {
                    name: "eth0".to_string(),
                    bytes_sent: 1000,
                    bytes_recv: 2000,
                    packets_sent: 10,
                    packets_recv: 20,
                },
            ])
        }

        fn config(&self, name: &str) -> Result<InterfaceConfig> {
            let flags = if name == "lo" {
                vec![InterfaceFlag::Up, InterfaceFlag::Loopback]
            } else {
                vec![InterfaceFlag::Up, InterfaceFlag::PointToPoint]
            };
            Ok(InterfaceConfig {
                hardware_addr: String::new(),
                mtu: 1500,
                flags,
                addrs: vec!["127.0.0.1/8".to_string()],
            })
        }

        fn is_link_up(&self, _name: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn app_state() -> AppState {
        let config = StatsConfig {
            refresh_interval_ms: 60_000,
            log_interfaces: false,
        };
        AppState::new(Arc::new(StatsService::new(StaticSource, &config).unwrap()))
    }

    async fn run(state: &AppState, query: &str) -> Value {
        let request = Request::new(query).data(state.stats.snapshot());
        let response = state.schema.execute(request).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.into_json().unwrap()
    }

    #[tokio::test]
    async fn test_selection_returns_only_requested_fields() {
        let state = app_state();
        let data = run(
            &state,
            "{ networkInterfaces { name speedSent config { mtu } } }",
        )
        .await;

        let list = data["networkInterfaces"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "eth0");
        assert_eq!(list[0]["speedSent"], 0.0);
        assert_eq!(list[0]["config"]["mtu"], 1500);
        assert_eq!(list[0].as_object().unwrap().len(), 3);
        assert_eq!(list[0]["config"].as_object().unwrap().len(), 1);
        assert_eq!(list[1]["name"], "lo");
    }

    #[tokio::test]
    async fn test_filter_by_name() {
        let state = app_state();
        let data = run(
            &state,
            r#"{ networkInterfaces(name: "lo") { name linkUp config { flags hardwareAddr addrs } } }"#,
        )
        .await;
        let list = data["networkInterfaces"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["linkUp"], true);
        assert_eq!(list[0]["config"]["flags"][0], "up");
        assert_eq!(list[0]["config"]["flags"][1], "loopback");
        assert_eq!(list[0]["config"]["hardwareAddr"], "");
        assert_eq!(list[0]["config"]["addrs"][0], "127.0.0.1/8");

        let data = run(&state, r#"{ networkInterfaces(name: "missing0") { name } }"#).await;
        assert!(data["networkInterfaces"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_counter_fields() {
        let state = app_state();
        let data = run(
            &state,
            r#"{ sampledAt networkInterfaces(name: "eth0") {
                packetsSent packetsReceived bytesSent bytesReceived speedReceived
            } }"#,
        )
        .await;

        assert!(data["sampledAt"].is_string());
        let eth0 = &data["networkInterfaces"][0];
        assert_eq!(eth0["packetsSent"], 10);
        assert_eq!(eth0["packetsReceived"], 20);
        assert_eq!(eth0["bytesSent"], 1000);
        assert_eq!(eth0["bytesReceived"], 2000);
        assert_eq!(eth0["speedReceived"], 0.0);
    }

    #[tokio::test]
    async fn test_unknown_field_is_an_error() {
        let state = app_state();
        let request = Request::new("{ networkInterfaces { bogus } }").data(state.stats.snapshot());
        let response = state.schema.execute(request).await;
        assert!(!response.errors.is_empty());
    }

    #[test]
    fn test_resolve_sorts_and_filters() {
        let state = app_state();
        let snapshot = state.stats.snapshot();
        let names: Vec<String> = resolve(&snapshot, None)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["eth0", "lo"]);
        assert_eq!(resolve(&snapshot, Some("eth0"))[0].bytes_received, 2000);
        assert!(resolve(&snapshot, Some("nope")).is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health_check(State(app_state())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.interfaces, 2);
        assert!(health.refreshing);
    }
}

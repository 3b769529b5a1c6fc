//! In-memory stand-in for a ROS graph reachable through the parameter
//! services.
//!
//! Each node answers `list_parameters`, `get_parameters` and
//! `set_parameters`. Tests can make services fail, hold replies back until a
//! gate is opened, and mark parameters the node refuses to change.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use ros_z_param::parameter::wire_types::{
    GetParametersRequest, SetParametersRequest, WireParameterValue,
};
use ros_z_param::{
    ClientConfig, ParameterClient, ParameterValue, ServiceTransport, TransportError,
};
use serde_json::{Value, json};
use tokio::sync::Notify;

pub const NODES_SERVICE: &str = "/rosapi/nodes";

pub type TestClient = ParameterClient<Arc<FakeGraph>>;

#[derive(Default)]
pub struct FakeGraph {
    state: Mutex<GraphState>,
}

#[derive(Default)]
struct GraphState {
    nodes: Vec<String>,
    parameters: HashMap<String, Vec<(String, ParameterValue)>>,
    failing: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    read_only: HashSet<String>,
    short_values: bool,
    calls: Vec<(String, Value)>,
}

impl FakeGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_node(&self, node: &str, parameters: &[(&str, ParameterValue)]) {
        let mut state = self.state.lock();
        state.nodes.push(node.to_string());
        state.parameters.insert(
            node.to_string(),
            parameters
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        );
    }

    /// Make every call to `service` fail until [`Self::recover`].
    pub fn fail(&self, service: &str) {
        self.state.lock().failing.insert(service.to_string());
    }

    pub fn recover(&self, service: &str) {
        self.state.lock().failing.remove(service);
    }

    /// Hold replies of `service` until the returned gate is notified.
    pub fn gate(&self, service: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .gates
            .insert(service.to_string(), gate.clone());
        gate
    }

    pub fn ungate(&self, service: &str) {
        self.state.lock().gates.remove(service);
    }

    /// The node keeps its value for `name` whatever is sent.
    pub fn read_only(&self, name: &str) {
        self.state.lock().read_only.insert(name.to_string());
    }

    /// Reply to `get_parameters` with one value fewer than requested.
    pub fn short_values(&self, on: bool) {
        self.state.lock().short_values = on;
    }

    /// Change a value on the node side, as another client would.
    pub fn set_value(&self, node: &str, name: &str, value: ParameterValue) {
        let mut state = self.state.lock();
        if let Some(slot) = state
            .parameters
            .get_mut(node)
            .and_then(|parameters| parameters.iter_mut().find(|(n, _)| n == name))
        {
            slot.1 = value;
        }
    }

    pub fn value(&self, node: &str, name: &str) -> Option<ParameterValue> {
        self.state
            .lock()
            .parameters
            .get(node)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, service: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(s, _)| s == service)
            .count()
    }

    /// Wait until `service` has been called at least `count` times.
    pub async fn wait_for_calls(&self, service: &str, count: usize) {
        for _ in 0..500 {
            if self.call_count(service) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("{service} was not called {count} times");
    }

    fn respond(&self, service: &str, request: Value) -> Result<Value, TransportError> {
        let mut state = self.state.lock();
        if state.failing.contains(service) {
            return Err(TransportError::Remote(format!("{service} unavailable")));
        }
        if service == NODES_SERVICE {
            return Ok(json!({ "nodes": state.nodes }));
        }

        let (node, method) = service
            .rsplit_once('/')
            .ok_or_else(|| TransportError::InvalidService(service.to_string()))?;
        let short_values = state.short_values;
        let read_only = state.read_only.clone();
        let parameters = state
            .parameters
            .get_mut(node)
            .ok_or_else(|| TransportError::NoReply(service.to_string()))?;

        match method {
            "list_parameters" => {
                let names: Vec<&str> = parameters.iter().map(|(n, _)| n.as_str()).collect();
                Ok(json!({ "result": { "names": names, "prefixes": [] } }))
            }
            "get_parameters" => {
                let request: GetParametersRequest = serde_json::from_value(request)?;
                let mut values: Vec<WireParameterValue> = request
                    .names
                    .iter()
                    .map(|name| {
                        parameters
                            .iter()
                            .find(|(n, _)| n == name)
                            .map(|(_, v)| v.to_wire())
                            .unwrap_or_default()
                    })
                    .collect();
                if short_values {
                    values.pop();
                }
                Ok(json!({ "values": values }))
            }
            "set_parameters" => {
                let request: SetParametersRequest = serde_json::from_value(request)?;
                let mut results = Vec::new();
                for wire in &request.parameters {
                    let accepted = !read_only.contains(&wire.name);
                    if accepted
                        && let Some(slot) = parameters.iter_mut().find(|(n, _)| *n == wire.name)
                    {
                        slot.1 = ParameterValue::from_wire(&wire.value);
                    }
                    results.push(json!({ "successful": accepted, "reason": "" }));
                }
                Ok(json!({ "results": results }))
            }
            _ => Err(TransportError::InvalidService(service.to_string())),
        }
    }
}

impl ServiceTransport for FakeGraph {
    async fn call(&self, service: &str, request: Value) -> Result<Value, TransportError> {
        let gate = {
            let mut state = self.state.lock();
            state.calls.push((service.to_string(), request.clone()));
            state.gates.get(service).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.respond(service, request)
    }
}

/// Graph with a single node `/robot_node` carrying one parameter of each
/// common kind.
pub fn robot_graph() -> Arc<FakeGraph> {
    let graph = FakeGraph::new();
    graph.add_node(
        "/robot_node",
        &[
            ("use_sim_time", ParameterValue::Bool(false)),
            ("max_speed", ParameterValue::Double(1.5)),
            ("retries", ParameterValue::Integer(3)),
            ("frame_id", ParameterValue::String("base_link".into())),
            ("waypoints", ParameterValue::StringArray(vec!["home".into()])),
        ],
    );
    graph
}

pub fn client(graph: &Arc<FakeGraph>) -> TestClient {
    client_with(graph, ClientConfig::default())
}

pub fn client_with(graph: &Arc<FakeGraph>, config: ClientConfig) -> TestClient {
    init_tracing();
    ParameterClient::new(graph.clone(), config)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

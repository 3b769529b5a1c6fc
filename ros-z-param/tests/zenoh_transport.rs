//! Parameter client over a real zenoh session.
//!
//! A queryable on the same session plays the remote node, answering every
//! parameter service with JSON.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use ros_z_param::parameter::wire_types::{GetParametersRequest, SetParametersRequest};
use ros_z_param::{
    ClientConfig, ClientError, ParameterClient, ParameterValue, ServiceTransport, TransportError,
    ZenohTransport, ZenohTransportBuilder,
};
use serde_json::{Value, json};
use zenoh::Wait;

fn isolated_transport() -> ZenohTransport {
    ZenohTransportBuilder::default()
        .disable_multicast_scouting()
        .with_json("connect/endpoints", json!([]))
        .with_query_timeout(Duration::from_millis(500))
        .build()
        .expect("Failed to open session")
}

fn serve(query: &zenoh::query::Query, values: &Mutex<Vec<(String, ParameterValue)>>) {
    let request: Value = query
        .payload()
        .and_then(|p| serde_json::from_slice(&p.to_bytes()).ok())
        .unwrap_or(Value::Null);

    let response = match query.key_expr().as_str() {
        "rosapi/nodes" => json!({ "nodes": ["/robot_node"] }),
        "robot_node/list_parameters" => {
            let names: Vec<String> = values.lock().iter().map(|(n, _)| n.clone()).collect();
            json!({ "result": { "names": names } })
        }
        "robot_node/get_parameters" => {
            let request: GetParametersRequest = serde_json::from_value(request).unwrap();
            let values = values.lock();
            let wire: Vec<_> = request
                .names
                .iter()
                .map(|name| {
                    values
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, v)| v.to_wire())
                        .unwrap_or_default()
                })
                .collect();
            json!({ "values": wire })
        }
        "robot_node/set_parameters" => {
            let request: SetParametersRequest = serde_json::from_value(request).unwrap();
            let mut values = values.lock();
            for parameter in request.parameters {
                if let Some(slot) = values.iter_mut().find(|(n, _)| *n == parameter.name) {
                    slot.1 = ParameterValue::from_wire(&parameter.value);
                }
            }
            json!({ "results": [] })
        }
        "broken/list_parameters" => {
            let _ = query.reply_err("parameter service crashed").wait();
            return;
        }
        _ => return,
    };

    let bytes = serde_json::to_vec(&response).unwrap();
    let _ = query.reply(query.key_expr().clone(), bytes).wait();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_client_over_zenoh() {
    let transport = isolated_transport();
    let values = Arc::new(Mutex::new(vec![
        ("max_speed".to_string(), ParameterValue::Double(1.0)),
        ("retries".to_string(), ParameterValue::Integer(3)),
    ]));

    let _queryable = transport
        .session()
        .declare_queryable("**")
        .callback({
            let values = values.clone();
            move |query| serve(&query, &values)
        })
        .wait()
        .expect("Failed to declare queryable");

    let client = ParameterClient::new(transport, ClientConfig::default());

    assert_eq!(client.list_nodes().await.unwrap(), vec!["/robot_node"]);
    client.select_node("/robot_node").await.unwrap();
    assert_eq!(client.display_value("max_speed"), "1");

    client.stage_text("max_speed", "2.5").unwrap();
    let report = client.commit().await.unwrap();
    assert!(report.acknowledged());
    assert!(report.divergent().is_empty());
    assert_eq!(
        client.parameters().value("max_speed"),
        Some(&ParameterValue::Double(2.5))
    );

    client.transport().shutdown().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_reply_and_missing_service() {
    let transport = isolated_transport();
    let _queryable = transport
        .session()
        .declare_queryable("**")
        .callback(|query| serve(&query, &Mutex::new(Vec::new())))
        .wait()
        .expect("Failed to declare queryable");

    let err = transport
        .call("/broken/list_parameters", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Remote(message) if message.contains("crashed")));

    let err = transport
        .call("/nobody/list_parameters", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NoReply(_)));

    let client = ParameterClient::new(transport, ClientConfig::default());
    let err = client.select_node("/nobody").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport {
            source: TransportError::NoReply(_),
            ..
        }
    ));
}

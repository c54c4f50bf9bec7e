use std::time::Duration;

use edgeplug_client::channel::{ChannelBroker, OutboundMessage};
use edgeplug_client::Event;
use edgeplug_eon::NodeHandle;
use edgeplug_types::constants::{BDSEQ, NODE_CONTROL_REBIRTH};
use edgeplug_types::payload::{metric, DataType, Payload};
use edgeplug_types::topic::{
    DeviceTopic, FilterTopic, MessageType, NodeTopic, QoS, TopicFilter,
};
use tokio::time::timeout;

pub async fn recv_outbound(broker: &mut ChannelBroker) -> OutboundMessage {
    timeout(Duration::from_secs(1), broker.rx_outbound.recv())
        .await
        .expect("timed out waiting for an outbound message")
        .expect("outbound channel closed")
}

pub fn verify_nbirth_payload(payload: Payload, expected_bdseq: u64) {
    /* The NBIRTH must carry seq 0 and lead with the bdSeq metric pairing it
    with the armed will */
    assert_eq!(payload.seq, Some(0));
    assert_ne!(payload.timestamp, None);
    assert!(!payload.metrics.is_empty());

    let bdseq_metric = &payload.metrics[0];
    assert_eq!(bdseq_metric.name.as_deref(), Some(BDSEQ));
    assert_eq!(bdseq_metric.alias, None);
    assert_eq!(bdseq_metric.datatype, Some(DataType::UInt64 as u32));
    assert_eq!(
        bdseq_metric.value,
        Some(metric::Value::LongValue(expected_bdseq))
    );

    for metric in &payload.metrics {
        assert_ne!(metric.datatype, None);
        assert!(
            metric.name.is_some(),
            "Metric name is required in birth payload"
        );
        if metric.value.is_some() {
            assert_eq!(metric.is_null, None)
        }
        if let Some(true) = metric.is_null {
            assert_eq!(metric.value, None)
        }
    }
}

pub fn verify_dbirth_payload(payload: Payload, expected_seq: u64) {
    assert_eq!(payload.seq, Some(expected_seq));
    assert_ne!(payload.timestamp, None);
}

pub fn verify_ndeath_payload(payload: Payload, expected_bdseq: u64) {
    assert_eq!(payload.seq, None);
    assert_eq!(payload.metrics.len(), 1);
    let bdseq_metric = &payload.metrics[0];
    assert_eq!(bdseq_metric.name.as_deref(), Some(BDSEQ));
    assert_eq!(
        bdseq_metric.value,
        Some(metric::Value::LongValue(expected_bdseq))
    );
}

pub fn verify_ddeath_payload(payload: Payload, expected_seq: u64) {
    assert_ne!(payload.timestamp, None);
    assert_eq!(payload.seq, Some(expected_seq));
    assert_eq!(payload.metrics.len(), 0);
    assert_eq!(payload.body, None);
    assert_eq!(payload.uuid, None);
}

/// Drive the node online and verify the subscriptions and NBIRTH of session
/// establishment.
pub async fn test_node_online(
    broker: &mut ChannelBroker,
    group_id: &str,
    node_id: &str,
    expected_bdseq: u64,
) {
    broker.tx_event.send(Event::Online).unwrap();

    let subscription = recv_outbound(broker).await;
    let filters = match subscription {
        OutboundMessage::Subscribe(filters) => filters,
        message => panic!("got {message:?}"),
    };

    let expected_filters = vec![
        TopicFilter::new_with_qos(
            FilterTopic::Node(NodeTopic::new(group_id, MessageType::NCmd, node_id)),
            QoS::AtLeastOnce,
        ),
        TopicFilter::new_with_qos(
            FilterTopic::Device(DeviceTopic::new(group_id, MessageType::DCmd, node_id, "+")),
            QoS::AtLeastOnce,
        ),
        TopicFilter::new_with_qos(FilterTopic::State, QoS::AtLeastOnce),
    ];
    assert_eq!(filters.len(), expected_filters.len());
    for filter in expected_filters {
        assert!(
            filters.contains(&filter),
            "Sub filters did not contain expected filter: {filter:?}"
        )
    }

    let birth = recv_outbound(broker).await;
    let (topic, payload) = match birth {
        OutboundMessage::NodeMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    };
    assert_eq!(topic, NodeTopic::new(group_id, MessageType::NBirth, node_id));
    verify_nbirth_payload(payload, expected_bdseq);
}

pub async fn verify_device_birth(
    broker: &mut ChannelBroker,
    group_id: &str,
    node_id: &str,
    device_name: &str,
    expected_seq: u64,
) {
    let device_birth = recv_outbound(broker).await;
    let (topic, payload) = match device_birth {
        OutboundMessage::DeviceMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    };
    assert_eq!(
        topic,
        DeviceTopic::new(group_id, MessageType::DBirth, node_id, device_name)
    );
    verify_dbirth_payload(payload, expected_seq);
}

/// Verify the graceful shutdown path: DDEATH for every device, NDEATH with
/// the session's bdSeq, then a clean disconnect.
pub async fn test_graceful_shutdown(
    broker: &mut ChannelBroker,
    handle: &NodeHandle,
    group_id: &str,
    node_id: &str,
    expected_bdseq: u64,
    expected_device_deaths: &[(&str, u64)],
) {
    handle.cancel().await;

    for (device_name, expected_seq) in expected_device_deaths {
        let device_death = recv_outbound(broker).await;
        let (topic, payload) = match device_death {
            OutboundMessage::DeviceMessage { topic, payload } => (topic, payload),
            message => panic!("got {message:?}"),
        };
        assert_eq!(
            topic,
            DeviceTopic::new(group_id, MessageType::DDeath, node_id, device_name)
        );
        verify_ddeath_payload(payload, *expected_seq);
    }

    let node_death = recv_outbound(broker).await;
    let (topic, payload) = match node_death {
        OutboundMessage::NodeMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    };
    assert_eq!(topic, NodeTopic::new(group_id, MessageType::NDeath, node_id));
    verify_ndeath_payload(payload, expected_bdseq);

    assert_eq!(recv_outbound(broker).await, OutboundMessage::Disconnect);
}

pub fn rebirth_cmd_event(group_id: &str, node_id: &str) -> Event {
    use edgeplug_types::kinds::{Cmd, PayloadKind};
    use edgeplug_types::Metric;

    Event::Node(edgeplug_client::NodeMessage {
        group_id: group_id.to_string(),
        node_id: node_id.to_string(),
        payload: PayloadKind::NCmd(Cmd {
            timestamp: edgeplug_types::utils::timestamp(),
            metrics: vec![Metric::new(NODE_CONTROL_REBIRTH, DataType::Boolean, true)],
        }),
    })
}

use edgeplug_types::kinds::{PayloadKind, State};
use edgeplug_types::topic::Topic;

use crate::{DeviceMessage, Event, MessageError, NodeMessage};

/// Decode a raw MQTT publish into a typed [Event].
///
/// The topic's message type dictates which payload variant is decoded.
pub fn topic_and_payload_to_event(topic: &[u8], payload: &[u8]) -> Result<Event, MessageError> {
    let topic = std::str::from_utf8(topic)?;
    match topic.parse::<Topic>()? {
        Topic::State(state_topic) => Ok(Event::State {
            host_id: state_topic.host_id,
            payload: State::decode(payload)?,
        }),
        Topic::Node(node_topic) => Ok(Event::Node(NodeMessage {
            payload: PayloadKind::decode(node_topic.message_type, payload)?,
            group_id: node_topic.group_id,
            node_id: node_topic.edge_node_id,
        })),
        Topic::Device(device_topic) => Ok(Event::Device(DeviceMessage {
            payload: PayloadKind::decode(device_topic.message_type, payload)?,
            group_id: device_topic.group_id,
            node_id: device_topic.edge_node_id,
            device_id: device_topic.device_id,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeplug_types::kinds::{Birth, Data};
    use edgeplug_types::payload::DataType;
    use edgeplug_types::Metric;

    #[test]
    fn nbirth_publish_decodes_to_node_event() {
        let birth = Birth {
            timestamp: 1,
            seq: 0,
            metrics: vec![Metric::new("m", DataType::UInt8, 1u8).with_timestamp(1)],
        };
        let raw = PayloadKind::NBirth(birth.clone()).encode().unwrap();
        let event = topic_and_payload_to_event(b"spBv1.0/g/NBIRTH/n", &raw).unwrap();
        assert_eq!(
            event,
            Event::Node(NodeMessage {
                group_id: "g".into(),
                node_id: "n".into(),
                payload: PayloadKind::NBirth(birth),
            })
        );
    }

    #[test]
    fn ddata_publish_decodes_to_device_event() {
        let data = Data {
            timestamp: 2,
            seq: 3,
            metrics: vec![Metric::new("x", DataType::Int16, -4i16).with_timestamp(2)],
        };
        let raw = PayloadKind::DData(data.clone()).encode().unwrap();
        let event = topic_and_payload_to_event(b"spBv1.0/g/DDATA/n/dev1", &raw).unwrap();
        assert_eq!(
            event,
            Event::Device(DeviceMessage {
                group_id: "g".into(),
                node_id: "n".into(),
                device_id: "dev1".into(),
                payload: PayloadKind::DData(data),
            })
        );
    }

    #[test]
    fn state_publish_decodes_json() {
        let event =
            topic_and_payload_to_event(b"spBv1.0/STATE/scada", br#"{"online": true, "timestamp": 5}"#)
                .unwrap();
        assert_eq!(
            event,
            Event::State {
                host_id: "scada".into(),
                payload: State {
                    online: true,
                    timestamp: 5
                },
            }
        );
    }

    #[test]
    fn invalid_topic_is_an_error() {
        assert!(matches!(
            topic_and_payload_to_event(b"spBv1.0/g/NOPE/n", &[]),
            Err(MessageError::InvalidTopic(_))
        ));
        assert!(matches!(
            topic_and_payload_to_event(b"other/g/NBIRTH/n", &[]),
            Err(MessageError::InvalidTopic(_))
        ));
    }

    #[test]
    fn undecodable_payload_is_an_error() {
        assert!(matches!(
            topic_and_payload_to_event(b"spBv1.0/g/NDATA/n", &[0xFF, 0xFF, 0xFF]),
            Err(MessageError::Payload(_))
        ));
    }
}

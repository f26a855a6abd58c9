//! Topic names and the colon-delimited payload codec shared by every node.
//!
//! Payloads carry no escaping; a literal colon inside a field is unsupported.

use thiserror::Error;

use crate::identity::NodeId;

pub const ELECTION_TOPIC: &str = "election";
pub const MASTER_TOPIC: &str = "master";
pub const NODES_TOPIC: &str = "nodes";
pub const HEARTBEAT_TOPIC: &str = "heartbeat";
pub const RESPONSE_TOPIC: &str = "master/response";
pub const COMMAND_TOPIC_PREFIX: &str = "node/";

/// The per-node topic on which directed commands arrive.
pub fn command_topic(id: &NodeId) -> String {
    format!("{COMMAND_TOPIC_PREFIX}{id}")
}

#[derive(Error, Debug)]
pub enum WireError {
    #[error("message on unknown topic {0:?}")]
    UnknownTopic(String),

    #[error("malformed payload on {topic:?}: {payload:?}")]
    Malformed { topic: String, payload: String },
}

/// A decoded broadcast unit. Every subscribed topic maps onto exactly one
/// message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Presence registration on `nodes`; status is optional on the wire.
    Register {
        node_id: NodeId,
        status: Option<String>,
    },
    /// Candidacy announcement on `election`.
    Candidacy { node_id: NodeId },
    /// Authoritative leader announcement on `master`.
    MasterAnnouncement { node_id: NodeId },
    /// Liveness pulse on `heartbeat`.
    Heartbeat { node_id: NodeId },
    /// Directed command on `node/<id>`.
    CommandRequest { command: String },
    /// Command result on `master/response`.
    CommandResponse {
        node_id: NodeId,
        kind: String,
        data: String,
    },
}

pub fn decode(topic: &str, payload: &str) -> Result<Message, WireError> {
    let malformed = || WireError::Malformed {
        topic: topic.to_string(),
        payload: payload.to_string(),
    };

    match topic {
        ELECTION_TOPIC => {
            let id = payload.strip_prefix("ELECTION:").ok_or_else(malformed)?;
            if id.is_empty() {
                return Err(malformed());
            }
            Ok(Message::Candidacy {
                node_id: NodeId::from(id),
            })
        }
        MASTER_TOPIC => {
            if payload.is_empty() {
                return Err(malformed());
            }
            Ok(Message::MasterAnnouncement {
                node_id: NodeId::from(payload),
            })
        }
        NODES_TOPIC => {
            let rest = payload.strip_prefix("REGISTER:").ok_or_else(malformed)?;
            let (id, status) = match rest.split_once(':') {
                Some((id, status)) => (id, Some(status.to_string())),
                None => (rest, None),
            };
            if id.is_empty() {
                return Err(malformed());
            }
            Ok(Message::Register {
                node_id: NodeId::from(id),
                status,
            })
        }
        HEARTBEAT_TOPIC => {
            if payload.is_empty() {
                return Err(malformed());
            }
            Ok(Message::Heartbeat {
                node_id: NodeId::from(payload),
            })
        }
        RESPONSE_TOPIC => {
            let mut parts = payload.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(kind), Some(data)) if !id.is_empty() && !kind.is_empty() => {
                    Ok(Message::CommandResponse {
                        node_id: NodeId::from(id),
                        kind: kind.to_string(),
                        data: data.to_string(),
                    })
                }
                _ => Err(malformed()),
            }
        }
        _ if topic.starts_with(COMMAND_TOPIC_PREFIX) => Ok(Message::CommandRequest {
            command: payload.to_string(),
        }),
        _ => Err(WireError::UnknownTopic(topic.to_string())),
    }
}

pub fn encode_candidacy(id: &NodeId) -> String {
    format!("ELECTION:{id}")
}

pub fn encode_register(id: &NodeId, status: &str) -> String {
    format!("REGISTER:{id}:{status}")
}

pub fn encode_response(id: &NodeId, kind: &str, data: &str) -> String {
    format!("{id}:{kind}:{data}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_candidacy() {
        let msg = decode(ELECTION_TOPIC, "ELECTION:9").expect("decode");
        assert_eq!(
            msg,
            Message::Candidacy {
                node_id: NodeId::from("9")
            }
        );
    }

    #[test]
    fn decodes_master_announcement() {
        let msg = decode(MASTER_TOPIC, "9").expect("decode");
        assert_eq!(
            msg,
            Message::MasterAnnouncement {
                node_id: NodeId::from("9")
            }
        );
    }

    #[test]
    fn decodes_register_with_and_without_status() {
        let with = decode(NODES_TOPIC, "REGISTER:7:FOLLOWER").expect("decode");
        assert_eq!(
            with,
            Message::Register {
                node_id: NodeId::from("7"),
                status: Some("FOLLOWER".to_string()),
            }
        );

        let without = decode(NODES_TOPIC, "REGISTER:7").expect("decode");
        assert_eq!(
            without,
            Message::Register {
                node_id: NodeId::from("7"),
                status: None,
            }
        );
    }

    #[test]
    fn decodes_command_on_node_topic() {
        let msg = decode("node/7", "GET_CPU_INFO").expect("decode");
        assert_eq!(
            msg,
            Message::CommandRequest {
                command: "GET_CPU_INFO".to_string()
            }
        );
    }

    #[test]
    fn decodes_response_keeping_colons_in_data() {
        let msg = decode(RESPONSE_TOPIC, "7:CPU_INFO:CORES:8,LOAD:0.42").expect("decode");
        assert_eq!(
            msg,
            Message::CommandResponse {
                node_id: NodeId::from("7"),
                kind: "CPU_INFO".to_string(),
                data: "CORES:8,LOAD:0.42".to_string(),
            }
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            decode(ELECTION_TOPIC, "9"),
            Err(WireError::Malformed { .. })
        ));
        assert!(matches!(
            decode(ELECTION_TOPIC, "ELECTION:"),
            Err(WireError::Malformed { .. })
        ));
        assert!(matches!(
            decode(MASTER_TOPIC, ""),
            Err(WireError::Malformed { .. })
        ));
        assert!(matches!(
            decode(NODES_TOPIC, "HELLO:7"),
            Err(WireError::Malformed { .. })
        ));
        assert!(matches!(
            decode(RESPONSE_TOPIC, "7:CPU_INFO"),
            Err(WireError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_unknown_topics() {
        assert!(matches!(
            decode("weather", "sunny"),
            Err(WireError::UnknownTopic(_))
        ));
    }

    #[test]
    fn encode_matches_decode() {
        let id = NodeId::from("7");
        assert_eq!(
            decode(ELECTION_TOPIC, &encode_candidacy(&id)).expect("decode"),
            Message::Candidacy {
                node_id: id.clone()
            }
        );
        assert_eq!(
            decode(NODES_TOPIC, &encode_register(&id, "FOLLOWER")).expect("decode"),
            Message::Register {
                node_id: id.clone(),
                status: Some("FOLLOWER".to_string()),
            }
        );
        assert_eq!(
            decode(RESPONSE_TOPIC, &encode_response(&id, "CPU_INFO", "x")).expect("decode"),
            Message::CommandResponse {
                node_id: id,
                kind: "CPU_INFO".to_string(),
                data: "x".to_string(),
            }
        );
    }
}

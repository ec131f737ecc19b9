//! Typed view of decoded control frames

use std::collections::BTreeMap;

use serde::Serialize;

use super::Fields;

/// Per-node field maps, keyed by node number
pub type NodeMap = BTreeMap<u32, Fields>;

/// A classified control-channel event
///
/// Frames whose `PRM` is not recognized are kept as [`DoorEvent::Raw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DoorEvent {
    Raw {
        kind: char,
        fields: Fields,
    },
    /// New mail announced; `mailbox` is absent when empty, `count` when unparsable
    NewMessage {
        #[serde(rename = "box")]
        mailbox: Option<String>,
        count: Option<u32>,
    },
    Message {
        fields: Fields,
    },
    NodeInfo {
        fields: Fields,
    },
    NodesInfo {
        nodes: NodeMap,
        fields: Fields,
    },
}

impl DoorEvent {
    /// Classify a frame by its `PRM` field
    ///
    /// `MSG` frames flagged `ERR=EMPTY` are classified as `Message` here;
    /// the event loop consumes them instead of emitting them.
    pub fn classify(kind: char, fields: Fields) -> Self {
        let prm = fields.get("PRM").map(String::as_str).unwrap_or("");
        match prm {
            "NEW_MSG" => {
                let mailbox = fields.get("BOX").filter(|b| !b.is_empty()).cloned();
                let count = fields.get("COUNT").and_then(|c| c.trim().parse().ok());
                DoorEvent::NewMessage { mailbox, count }
            }
            "MSG" => DoorEvent::Message { fields },
            "INFO" => match fields.get("VAL").map(String::as_str) {
                Some("NODES_INFO") => DoorEvent::NodesInfo {
                    nodes: parse_nodes_info(&fields),
                    fields,
                },
                Some("NODE_INFO") => DoorEvent::NodeInfo { fields },
                _ => DoorEvent::Raw { kind, fields },
            },
            _ => DoorEvent::Raw { kind, fields },
        }
    }

    /// Whether this is the end-of-inbox marker
    pub fn is_empty_inbox(&self) -> bool {
        matches!(self, DoorEvent::Message { fields } if fields.get("ERR").map(String::as_str) == Some("EMPTY"))
    }
}

/// Group `N<id>_<KEY>` fields by node
///
/// Every id listed in the comma-separated `IDS` field gets an entry, even
/// when it has no fields of its own. Entries that are not numbers are skipped.
pub fn parse_nodes_info(fields: &Fields) -> NodeMap {
    let mut nodes = NodeMap::new();

    if let Some(ids) = fields.get("IDS") {
        for id in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Ok(id) = id.parse::<u32>() {
                nodes.entry(id).or_default();
            }
        }
    }

    for (key, value) in fields {
        if let Some((id, name)) = split_node_key(key) {
            nodes
                .entry(id)
                .or_default()
                .insert(name.to_uppercase(), value.clone());
        }
    }
    nodes
}

/// `N12_STATUS` -> `(12, "STATUS")`
fn split_node_key(key: &str) -> Option<(u32, &str)> {
    let rest = key.strip_prefix('N')?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let name = rest[digits..].strip_prefix('_')?;
    if name.is_empty() {
        return None;
    }
    let id = rest[..digits].parse().ok()?;
    Some((id, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lnwp::parse_payload;

    fn classify(payload: &str) -> DoorEvent {
        DoorEvent::classify('N', parse_payload(payload))
    }

    #[test]
    fn test_new_message() {
        assert_eq!(
            classify(r#"LNWP V1 PRM=NEW_MSG BOX="TEMP" COUNT="2""#),
            DoorEvent::NewMessage {
                mailbox: Some("TEMP".to_string()),
                count: Some(2),
            }
        );
        assert_eq!(
            classify(r#"LNWP V1 PRM=NEW_MSG BOX="" COUNT="lots""#),
            DoorEvent::NewMessage {
                mailbox: None,
                count: None,
            }
        );
    }

    #[test]
    fn test_message_and_empty_marker() {
        let ev = classify(r#"LNWP V1 PRM=MSG VAL="hi" FROM_NODE="3""#);
        assert!(matches!(&ev, DoorEvent::Message { fields } if fields["VAL"] == "hi"));
        assert!(!ev.is_empty_inbox());

        assert!(classify(r#"LNWP V1 PRM=MSG ERR="EMPTY""#).is_empty_inbox());
    }

    #[test]
    fn test_info_topics() {
        assert!(matches!(
            classify(r#"LNWP V1 PRM=INFO VAL="NODE_INFO" STATUS="idle""#),
            DoorEvent::NodeInfo { .. }
        ));
        assert!(matches!(
            classify(r#"LNWP V1 PRM=INFO VAL="WEATHER""#),
            DoorEvent::Raw { kind: 'N', .. }
        ));
    }

    #[test]
    fn test_unknown_prm_is_raw() {
        let ev = DoorEvent::classify('X', parse_payload("LNWP V1 PRM=FUTURE_THING A=1"));
        match ev {
            DoorEvent::Raw { kind, fields } => {
                assert_eq!(kind, 'X');
                assert_eq!(fields["A"], "1");
            }
            other => panic!("expected raw event, got {other:?}"),
        }
        assert!(matches!(
            DoorEvent::classify('N', Fields::new()),
            DoorEvent::Raw { .. }
        ));
    }

    #[test]
    fn test_nodes_info() {
        let ev = classify(
            r#"LNWP V1 PRM=INFO VAL="NODES_INFO" IDS="1, 2,x,7" N1_USER="bob" N2_activity="chat" N9_USER="eve" NX_USER="no" N3_="no""#,
        );
        let DoorEvent::NodesInfo { nodes, .. } = ev else {
            panic!("expected nodes info");
        };
        assert_eq!(nodes.keys().copied().collect::<Vec<_>>(), vec![1, 2, 7, 9]);
        assert_eq!(nodes[&1]["USER"], "bob");
        // keys are uppercased by the payload codec already
        assert_eq!(nodes[&2]["ACTIVITY"], "chat");
        assert!(nodes[&7].is_empty());
        assert_eq!(nodes[&9]["USER"], "eve");
    }

    #[test]
    fn test_event_json() {
        let ev = DoorEvent::NewMessage {
            mailbox: Some("TEMP".to_string()),
            count: Some(1),
        };
        let json = serde_json::to_string(&ev).expect("serialize");
        assert_eq!(json, r#"{"type":"new_message","box":"TEMP","count":1}"#);
    }
}

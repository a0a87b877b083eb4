use crate::common::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    pub enum EventId {
        None = 0 => "none",
        VmPageFault = 1 => "vm-page-fault",
        ThermalThrottle = 2 => "thermal-throttle",
        GpuPreReset = 3 => "gpu-pre-reset",
        GpuPostReset = 4 => "gpu-post-reset",
        RingHang = 5 => "ring-hang",
    }
}

wire_enum! {
    pub enum EventSeverity {
        None = 0 => "none",
        Debug = 1 => "debug",
        Info = 2 => "info",
        Warn = 3 => "warn",
        Critical = 4 => "critical",
    }
}

wire_enum! {
    pub enum EventCategory {
        None = 0 => "none",
        Xgmi = 1 => "xgmi",
        Other = 255 => "other",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventMatchAttrs {
    pub severity: EventSeverity,
    pub category: EventCategory,
}

/// The one active selection mode of an [`EventFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSelector {
    Events(Vec<EventId>),
    MatchAttrs(EventMatchAttrs),
}

/// Event selection plus an optional list of GPUs to scope it to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventFilter {
    pub filter: Option<EventSelector>,
    pub gpu: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRequest {
    pub filter: EventFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSubscribeRequest {
    pub filter: EventFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventGenRequest {
    pub id: Vec<EventId>,
    pub gpu: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub id: EventId,
    pub gpu: Uuid,
    pub severity: EventSeverity,
    pub category: EventCategory,
    pub time: Timestamp,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_follows_wire_numbering() {
        for (raw, id) in [(1, EventId::VmPageFault), (5, EventId::RingHang)] {
            assert_eq!(EventId::try_from(raw).unwrap(), id);
        }
        assert!(EventId::try_from(6).is_err());
        assert_eq!(EventCategory::try_from(255).unwrap(), EventCategory::Other);
    }

    #[test]
    fn filter_encodes_one_selector() {
        let filter = EventFilter {
            filter: Some(EventSelector::Events(vec![EventId::RingHang])),
            gpu: vec![],
        };
        let text = serde_json::to_string(&filter).unwrap();
        assert_eq!(text, r#"{"filter":{"events":[5]},"gpu":[]}"#);

        let decoded: EventFilter =
            serde_json::from_str(r#"{"filter":{"matchAttrs":{"severity":4}}}"#).unwrap();
        assert_eq!(
            decoded.filter,
            Some(EventSelector::MatchAttrs(EventMatchAttrs {
                severity: EventSeverity::Critical,
                category: EventCategory::None,
            }))
        );
    }

    #[test]
    fn severity_names_round_trip() {
        for s in EventSeverity::ALL {
            assert_eq!(EventSeverity::from_name(s.name()), Some(*s));
        }
    }
}

//! Builders turning validated command arguments into agent requests.
//!
//! Everything here is a pure function of its inputs. Argument checks, such
//! as the exclusivity of event ids and match attributes, happen in the
//! command layer before a builder is called.

use model::event::{
    EventFilter, EventGenRequest, EventId, EventMatchAttrs, EventRequest, EventSelector,
    EventSubscribeRequest,
};
use model::gpu::{
    GpuAdminState, GpuClockFrequencyRange, GpuComputePartitionType, GpuGetRequest,
    GpuMemoryPartitionType, GpuPerformanceLevel, GpuResetKind, GpuResetRequest, GpuSpec,
    GpuUpdateRequest,
};
use model::gpu_watch::{GpuWatchAttrId, GpuWatchIdRequest, GpuWatchRequest, GpuWatchSpec};
use model::trace::{TraceLevel, TraceRequest, TraceSpec};
use uuid::Uuid;

/// Attribute groups accepted by `create gpu-watch`, each naming an inclusive
/// range of attribute identifiers.
pub const WATCH_ATTR_GROUPS: &[(&str, GpuWatchAttrId, GpuWatchAttrId)] = &[
    ("gpu-clock", GpuWatchAttrId::GpuClock, GpuWatchAttrId::GpuClock),
    ("memory-clock", GpuWatchAttrId::MemClock, GpuWatchAttrId::MemClock),
    ("memory-temp", GpuWatchAttrId::MemoryTemp, GpuWatchAttrId::MemoryTemp),
    ("gpu-temp", GpuWatchAttrId::GpuTemp, GpuWatchAttrId::GpuTemp),
    ("power-usage", GpuWatchAttrId::PowerUsage, GpuWatchAttrId::PowerUsage),
    ("ecc-total", GpuWatchAttrId::EccCorrectTotal, GpuWatchAttrId::EccUncorrectTotal),
    ("pcie-bandwidth", GpuWatchAttrId::PcieBandwidth, GpuWatchAttrId::PcieBandwidth),
    ("gpu-util", GpuWatchAttrId::GpuUtil, GpuWatchAttrId::GpuUtil),
    ("memory-usage", GpuWatchAttrId::GpuMemoryUsage, GpuWatchAttrId::GpuMemoryUsage),
    ("ecc-count", GpuWatchAttrId::EccSdmaCe, GpuWatchAttrId::EccMpioUe),
    ("xgmi-tx", GpuWatchAttrId::Xgmi0NopTx, GpuWatchAttrId::Xgmi1BeatsTx),
    ("xgmi-throughput", GpuWatchAttrId::Xgmi0Thrput, GpuWatchAttrId::Xgmi5Thrput),
];

/// Attribute identifiers of one group, `None` for an unknown group name.
pub fn watch_attr_group(name: &str) -> Option<Vec<GpuWatchAttrId>> {
    let (_, first, last) = WATCH_ATTR_GROUPS
        .iter()
        .find(|(group, _, _)| group.eq_ignore_ascii_case(name.trim()))?;
    let (first, last) = (i32::from(*first), i32::from(*last));
    Some(
        GpuWatchAttrId::ALL
            .iter()
            .copied()
            .filter(|attr| (first..=last).contains(&i32::from(*attr)))
            .collect(),
    )
}

pub fn gpu_get(ids: Vec<Uuid>) -> GpuGetRequest {
    GpuGetRequest { id: ids }
}

fn event_filter(ids: Option<Vec<EventId>>, attrs: Option<EventMatchAttrs>, gpus: Vec<Uuid>) -> EventFilter {
    let filter = match (ids, attrs) {
        (Some(ids), _) => Some(EventSelector::Events(ids)),
        (None, Some(attrs)) => Some(EventSelector::MatchAttrs(attrs)),
        (None, None) => None,
    };
    EventFilter { filter, gpu: gpus }
}

/// Explicit ids win over match attributes; the caller guarantees that at
/// most one of them is set.
pub fn event_get(ids: Option<Vec<EventId>>, attrs: Option<EventMatchAttrs>, gpus: Vec<Uuid>) -> EventRequest {
    EventRequest {
        filter: event_filter(ids, attrs, gpus),
    }
}

pub fn event_subscribe(ids: Vec<EventId>, gpus: Vec<Uuid>) -> EventSubscribeRequest {
    EventSubscribeRequest {
        filter: event_filter(Some(ids), None, gpus),
    }
}

pub fn event_gen(ids: Vec<EventId>, gpus: Vec<Uuid>) -> EventGenRequest {
    EventGenRequest { id: ids, gpu: gpus }
}

/// Watch creation for `gpus`, sampling the union of `attributes` in table
/// order without duplicates.
pub fn gpu_watch_create(id: Uuid, gpus: Vec<Uuid>, attributes: &[GpuWatchAttrId]) -> GpuWatchRequest {
    let mut attribute: Vec<GpuWatchAttrId> = vec![];
    for attr in GpuWatchAttrId::ALL {
        if attributes.contains(attr) {
            attribute.push(*attr);
        }
    }
    GpuWatchRequest {
        spec: vec![GpuWatchSpec { id, gpu: gpus, attribute }],
    }
}

pub fn gpu_watch_ids(ids: Vec<Uuid>) -> GpuWatchIdRequest {
    GpuWatchIdRequest { id: ids }
}

/// Changes requested by `debug update gpu`. Unset fields keep the value the
/// agent currently reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuSpecChanges {
    pub admin_state: Option<GpuAdminState>,
    pub over_drive_level: Option<u32>,
    pub power_cap: Option<u64>,
    pub performance_level: Option<GpuPerformanceLevel>,
    pub clock_frequency: Option<GpuClockFrequencyRange>,
    pub memory_partition: Option<GpuMemoryPartitionType>,
    pub compute_partition: Option<GpuComputePartitionType>,
    pub fan_speed: Option<u64>,
}

impl GpuSpecChanges {
    pub fn is_empty(&self) -> bool {
        *self == GpuSpecChanges::default()
    }
}

/// Applies `changes` on top of the spec the agent returned for the GPU.
pub fn gpu_update(current: &GpuSpec, changes: &GpuSpecChanges) -> GpuUpdateRequest {
    let mut spec = current.clone();
    if let Some(v) = changes.admin_state {
        spec.admin_state = v;
    }
    if let Some(v) = changes.over_drive_level {
        spec.over_drive_level = v;
    }
    if let Some(v) = changes.power_cap {
        spec.gpu_power_cap = v;
    }
    if let Some(v) = changes.performance_level {
        spec.performance_level = v;
    }
    if let Some(range) = changes.clock_frequency {
        match spec
            .clock_frequency
            .iter_mut()
            .find(|r| r.clock_type == range.clock_type)
        {
            Some(existing) => *existing = range,
            None => spec.clock_frequency.push(range),
        }
    }
    if let Some(v) = changes.memory_partition {
        spec.memory_partition_type = v;
    }
    if let Some(v) = changes.compute_partition {
        spec.compute_partition_type = v;
    }
    if let Some(v) = changes.fan_speed {
        spec.fan_speed = v;
    }
    GpuUpdateRequest { spec: vec![spec] }
}

pub fn gpu_reset(id: Uuid, reset: GpuResetKind) -> GpuResetRequest {
    GpuResetRequest { id: vec![id], reset }
}

pub fn trace_update(level: TraceLevel, api_trace: bool) -> TraceRequest {
    TraceRequest {
        spec: TraceSpec {
            trace_level: level,
            api_trace_en: api_trace,
        },
    }
}

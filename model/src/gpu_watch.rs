use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    /// Attribute a GPU watch samples on every watched GPU.
    pub enum GpuWatchAttrId {
        GpuClock = 0 => "gpu-clock",
        MemClock = 1 => "mem-clock",
        MemoryTemp = 2 => "memory-temp",
        GpuTemp = 3 => "gpu-temp",
        PowerUsage = 4 => "power-usage",
        EccCorrectTotal = 5 => "ecc-correct-total",
        EccUncorrectTotal = 6 => "ecc-uncorrect-total",
        PcieBandwidth = 7 => "pcie-bandwidth",
        GpuUtil = 8 => "gpu-util",
        GpuMemoryUsage = 9 => "gpu-memory-usage",
        EccSdmaCe = 10 => "ecc-sdma-ce",
        EccSdmaUe = 11 => "ecc-sdma-ue",
        EccGfxCe = 12 => "ecc-gfx-ce",
        EccGfxUe = 13 => "ecc-gfx-ue",
        EccMmhubCe = 14 => "ecc-mmhub-ce",
        EccMmhubUe = 15 => "ecc-mmhub-ue",
        EccAthubCe = 16 => "ecc-athub-ce",
        EccAthubUe = 17 => "ecc-athub-ue",
        EccPcieBifCe = 18 => "ecc-pcie-bif-ce",
        EccPcieBifUe = 19 => "ecc-pcie-bif-ue",
        EccHdpCe = 20 => "ecc-hdp-ce",
        EccHdpUe = 21 => "ecc-hdp-ue",
        EccXgmiWaflCe = 22 => "ecc-xgmi-wafl-ce",
        EccXgmiWaflUe = 23 => "ecc-xgmi-wafl-ue",
        EccDfCe = 24 => "ecc-df-ce",
        EccDfUe = 25 => "ecc-df-ue",
        EccSmnCe = 26 => "ecc-smn-ce",
        EccSmnUe = 27 => "ecc-smn-ue",
        EccSemCe = 28 => "ecc-sem-ce",
        EccSemUe = 29 => "ecc-sem-ue",
        EccMp0Ce = 30 => "ecc-mp0-ce",
        EccMp0Ue = 31 => "ecc-mp0-ue",
        EccMp1Ce = 32 => "ecc-mp1-ce",
        EccMp1Ue = 33 => "ecc-mp1-ue",
        EccFuseCe = 34 => "ecc-fuse-ce",
        EccFuseUe = 35 => "ecc-fuse-ue",
        EccUmcCe = 36 => "ecc-umc-ce",
        EccUmcUe = 37 => "ecc-umc-ue",
        EccMcaCe = 38 => "ecc-mca-ce",
        EccMcaUe = 39 => "ecc-mca-ue",
        EccVcnCe = 40 => "ecc-vcn-ce",
        EccVcnUe = 41 => "ecc-vcn-ue",
        EccJpegCe = 42 => "ecc-jpeg-ce",
        EccJpegUe = 43 => "ecc-jpeg-ue",
        EccIhCe = 44 => "ecc-ih-ce",
        EccIhUe = 45 => "ecc-ih-ue",
        EccMpioCe = 46 => "ecc-mpio-ce",
        EccMpioUe = 47 => "ecc-mpio-ue",
        Xgmi0NopTx = 48 => "xgmi-0-nop-tx",
        Xgmi1NopTx = 49 => "xgmi-1-nop-tx",
        Xgmi0ReqTx = 50 => "xgmi-0-req-tx",
        Xgmi1ReqTx = 51 => "xgmi-1-req-tx",
        Xgmi0RespTx = 52 => "xgmi-0-resp-tx",
        Xgmi1RespTx = 53 => "xgmi-1-resp-tx",
        Xgmi0BeatsTx = 54 => "xgmi-0-beats-tx",
        Xgmi1BeatsTx = 55 => "xgmi-1-beats-tx",
        Xgmi0Thrput = 56 => "xgmi-0-thrput",
        Xgmi1Thrput = 57 => "xgmi-1-thrput",
        Xgmi2Thrput = 58 => "xgmi-2-thrput",
        Xgmi3Thrput = 59 => "xgmi-3-thrput",
        Xgmi4Thrput = 60 => "xgmi-4-thrput",
        Xgmi5Thrput = 61 => "xgmi-5-thrput",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatchSpec {
    pub id: Uuid,
    pub gpu: Vec<Uuid>,
    pub attribute: Vec<GpuWatchAttrId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatchStatus {
    pub num_subscribers: u32,
}

/// Sampled value of one watched attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchAttrValue {
    LongVal(u64),
    FloatVal(f64),
    StringVal(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuWatchAttrVal {
    pub value: WatchAttrValue,
    #[serde(default)]
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuWatchAttr {
    pub id: GpuWatchAttrId,
    pub value: GpuWatchAttrVal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatchAttrs {
    pub gpu: Uuid,
    pub attr: Vec<GpuWatchAttr>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatchStats {
    pub gpu_watch_attr: Vec<GpuWatchAttrs>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatch {
    pub spec: GpuWatchSpec,
    pub status: GpuWatchStatus,
    pub stats: GpuWatchStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatchRequest {
    pub spec: Vec<GpuWatchSpec>,
}

/// Shared by get, delete and subscribe; an empty get selects every watch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuWatchIdRequest {
    pub id: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_names_round_trip() {
        assert_eq!(GpuWatchAttrId::ALL.len(), 62);
        for attr in GpuWatchAttrId::ALL {
            assert_eq!(GpuWatchAttrId::from_name(attr.name()), Some(*attr));
            assert_eq!(GpuWatchAttrId::try_from(i32::from(*attr)).unwrap(), *attr);
        }
    }

    #[test]
    fn attr_value_variants_decode() {
        let attr: GpuWatchAttr =
            serde_json::from_str(r#"{"id":4,"value":{"value":{"longVal":120},"units":"W"}}"#)
                .unwrap();
        assert_eq!(attr.id, GpuWatchAttrId::PowerUsage);
        assert_eq!(attr.value.value, WatchAttrValue::LongVal(120));
        assert_eq!(attr.value.units, "W");
    }
}

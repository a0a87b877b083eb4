use crate::common::{ApiReply, ApiStatus, ErrorCode};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum IoLinkType {
        None = 0 => "NONE",
        Pcie = 1 => "PCIE",
        Xgmi = 2 => "XGMI",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub name: String,
}

impl Device {
    /// Numeric suffix of a `GPU<n>` device name, 0 when there is none.
    pub fn gpu_index(&self) -> u32 {
        self.name
            .strip_prefix("GPU")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IoLink {
    #[serde(rename = "type")]
    pub link_type: IoLinkType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerDevice {
    pub peer_device: Device,
    pub connection: IoLink,
    pub weight: u64,
    pub num_hops: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceTopology {
    pub device: Device,
    pub peer_device: Vec<PeerDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceTopologyGetResponse {
    pub api_status: ApiStatus,
    pub error_code: ErrorCode,
    pub device_topology: Vec<DeviceTopology>,
}

impl ApiReply for DeviceTopologyGetResponse {
    fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }
}

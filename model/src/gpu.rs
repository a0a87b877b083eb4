use crate::common::{ApiReply, ApiStatus, ErrorCode};
use crate::readings::{AnalogReading, Reading16, Reading32, Reading64};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    pub enum GpuAdminState {
        None = 0 => "none",
        Up = 1 => "up",
        Down = 2 => "down",
    }
}

wire_enum! {
    pub enum GpuPerformanceLevel {
        None = 0 => "none",
        Auto = 1 => "auto",
        Low = 2 => "low",
        High = 3 => "high",
        Deterministic = 4 => "deterministic",
        StableMinMclk = 5 => "memclock",
        StableMinSclk = 6 => "sysclock",
        Manual = 7 => "manual",
    }
}

wire_enum! {
    pub enum GpuClockType {
        None = 0 => "none",
        Fabric = 1 => "fabric",
        Memory = 2 => "memory",
        System = 3 => "system",
        SoC = 4 => "soc",
        Dce = 5 => "dce",
        Pcie = 6 => "pcie",
        Video = 7 => "video",
        Data = 8 => "data",
    }
}

wire_enum! {
    pub enum GpuComputePartitionType {
        None = 0 => "none",
        Spx = 1 => "spx",
        Dpx = 2 => "dpx",
        Tpx = 3 => "tpx",
        Qpx = 4 => "qpx",
        Cpx = 5 => "cpx",
    }
}

wire_enum! {
    pub enum GpuMemoryPartitionType {
        None = 0 => "none",
        Nps1 = 1 => "nps1",
        Nps2 = 2 => "nps2",
        Nps4 = 3 => "nps4",
        Nps8 = 4 => "nps8",
    }
}

wire_enum! {
    pub enum GpuOperStatus {
        None = 0 => "none",
        Up = 1 => "up",
        Down = 2 => "down",
    }
}

wire_enum! {
    pub enum GpuXgmiErrorStatus {
        None = 0 => "none",
        NoError = 1 => "no-error",
        OneError = 2 => "one-error",
        MultipleErrors = 3 => "multiple-errors",
    }
}

wire_enum! {
    pub enum GpuThrottlingStatus {
        None = 0 => "none",
        Off = 1 => "off",
        On = 2 => "on",
    }
}

wire_enum! {
    pub enum PcieSlotType {
        None = 0 => "none",
        Pcie = 1 => "pcie",
        Oam = 2 => "oam",
        Cem = 3 => "cem",
        Unknown = 4 => "unknown",
    }
}

wire_enum! {
    pub enum VramType {
        None = 0 => "none",
        Hbm = 1 => "hbm",
        Hbm2 = 2 => "hbm2",
        Hbm2e = 3 => "hbm2e",
        Hbm3 = 4 => "hbm3",
        Ddr2 = 5 => "ddr2",
        Ddr3 = 6 => "ddr3",
        Ddr4 = 7 => "ddr4",
        Gddr1 = 8 => "gddr1",
        Gddr2 = 9 => "gddr2",
        Gddr3 = 10 => "gddr3",
        Gddr4 = 11 => "gddr4",
        Gddr5 = 12 => "gddr5",
        Gddr6 = 13 => "gddr6",
        Gddr7 = 14 => "gddr7",
        Unknown = 15 => "unknown",
    }
}

wire_enum! {
    pub enum VramVendor {
        None = 0 => "none",
        Samsung = 1 => "samsung",
        Infineon = 2 => "infineon",
        Elpida = 3 => "elpida",
        Etron = 4 => "etron",
        Nanya = 5 => "nanya",
        Hynix = 6 => "hynix",
        Mosel = 7 => "mosel",
        Winbond = 8 => "winbond",
        Esmt = 9 => "esmt",
        Micron = 10 => "micron",
        Unknown = 11 => "unknown",
    }
}

wire_enum! {
    pub enum GpuPageStatus {
        None = 0 => "none",
        Reserved = 1 => "reserved",
        Pending = 2 => "pending",
        Unreservable = 3 => "unreservable",
    }
}

wire_enum! {
    /// Hardware blocks that keep their own ECC counters.
    pub enum EccBlock {
        Sdma = 0 => "SDMA",
        Gfx = 1 => "GFX",
        Mmhub = 2 => "MMHUB",
        Athub = 3 => "ATHUB",
        Bif = 4 => "BIF",
        Hdp = 5 => "HDP",
        XgmiWafl = 6 => "XGMI WAFL",
        Df = 7 => "DF",
        Smn = 8 => "SMN",
        Sem = 9 => "SEM",
        Mp0 = 10 => "MP0",
        Mp1 = 11 => "MP1",
        Fuse = 12 => "FUSE",
        Umc = 13 => "UMC",
        Mca = 14 => "MCA",
        Vcn = 15 => "VCN",
        Jpeg = 16 => "JPEG",
        Ih = 17 => "IH",
        Mpio = 18 => "MPIO",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuClockFrequencyRange {
    pub clock_type: GpuClockType,
    pub low_frequency: u32,
    pub high_frequency: u32,
}

/// Configurable part of a GPU.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuSpec {
    pub id: Uuid,
    pub admin_state: GpuAdminState,
    pub over_drive_level: u32,
    pub gpu_power_cap: u64,
    pub performance_level: GpuPerformanceLevel,
    pub clock_frequency: Vec<GpuClockFrequencyRange>,
    pub fan_speed: u64,
    pub compute_partition_type: GpuComputePartitionType,
    pub memory_partition_type: GpuMemoryPartitionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuFirmwareVersion {
    pub firmware: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuClockStatus {
    #[serde(rename = "type")]
    pub clock_type: GpuClockType,
    /// Sampled at 16 bits.
    pub frequency: Reading16,
    pub low_frequency: u32,
    pub high_frequency: u32,
    pub locked: bool,
    pub deep_sleep: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuXgmiStatus {
    pub error_status: GpuXgmiErrorStatus,
    pub width: Reading16,
    pub speed: Reading16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuPcieStatus {
    pub version: u32,
    pub slot_type: PcieSlotType,
    pub pcie_bus_id: String,
    pub width: u32,
    pub max_width: u32,
    pub speed: u32,
    pub max_speed: u32,
    pub bandwidth: Reading32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuVramStatus {
    #[serde(rename = "type")]
    pub vram_type: VramType,
    pub vendor: VramVendor,
    pub size: u64,
}

/// Operational state reported by the agent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuStatus {
    pub index: u32,
    pub kfd_id: u32,
    pub drm_render_id: u32,
    pub drm_card_id: u32,
    pub gpu_handle: u64,
    pub serial_num: String,
    pub card_series: String,
    pub card_model: String,
    pub card_vendor: String,
    pub card_sku: String,
    pub driver_version: String,
    pub vbios_part_number: String,
    pub vbios_version: String,
    pub partition_id: u32,
    pub firmware_version: Vec<GpuFirmwareVersion>,
    pub memory_vendor: String,
    pub oper_status: GpuOperStatus,
    pub clock_status: Vec<GpuClockStatus>,
    pub kfd_process_id: Vec<u32>,
    pub xgmi_status: Option<GpuXgmiStatus>,
    pub throttling_status: GpuThrottlingStatus,
    pub fw_timestamp: Reading64,
    pub pcie_status: Option<GpuPcieStatus>,
    pub vram_status: Option<GpuVramStatus>,
    /// Child partitions when this is a partitioned physical GPU.
    pub gpu_partition: Vec<Uuid>,
    pub physical_gpu: Uuid,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuTemperatureStats {
    pub edge_temperature: AnalogReading,
    pub junction_temperature: AnalogReading,
    pub memory_temperature: AnalogReading,
    pub hbm_temperature: Vec<AnalogReading>,
}

/// Activity counters. Percentages are sampled at 16 bits, except the
/// graphics activity which is a 32-bit counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuUsage {
    pub gfx_activity: Reading32,
    pub umc_activity: Reading16,
    pub mm_activity: Reading16,
    pub vcn_activity: Vec<Reading16>,
    pub jpeg_activity: Vec<Reading16>,
    pub gfx_busy_inst: Vec<Reading16>,
    pub vcn_busy_inst: Vec<Reading16>,
    pub jpeg_busy_inst: Vec<Reading16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuVoltage {
    pub voltage: Reading16,
    pub gfx_voltage: Reading16,
    pub memory_voltage: Reading16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuPcieStats {
    pub replay_count: Reading64,
    pub recovery_count: Reading64,
    pub replay_rollover_count: Reading64,
    pub nack_sent_count: Reading64,
    pub nack_received_count: Reading64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuVramUsage {
    pub total_vram: u64,
    pub used_vram: u64,
    pub free_vram: u64,
    pub total_visible_vram: u64,
    pub used_visible_vram: u64,
    pub free_visible_vram: u64,
    pub total_gtt: u64,
    pub used_gtt: u64,
    pub free_gtt: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuEccBlockCount {
    pub block: EccBlock,
    pub correctable: u64,
    pub uncorrectable: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuEccStats {
    pub total_correctable_errors: u64,
    pub total_uncorrectable_errors: u64,
    pub blocks: Vec<GpuEccBlockCount>,
}

/// Transmit counters towards one XGMI neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuXgmiNeighborStats {
    pub tx_nops: u64,
    pub tx_requests: u64,
    pub tx_responses: u64,
    pub tx_beats: u64,
    pub tx_throughput: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuXgmiLinkStats {
    pub data_read: Reading64,
    pub data_write: Reading64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuViolationStats {
    pub current_accumulated_counter: u64,
    pub processor_hot_residency_accumulated: u64,
    pub ppt_residency_accumulated: u64,
    pub socket_thermal_residency_accumulated: u64,
    pub vr_thermal_residency_accumulated: u64,
    pub hbm_thermal_residency_accumulated: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuStats {
    pub package_power: Reading16,
    pub avg_package_power: Reading16,
    pub temperature: Option<GpuTemperatureStats>,
    pub usage: Option<GpuUsage>,
    pub voltage: Option<GpuVoltage>,
    pub pcie_stats: Option<GpuPcieStats>,
    pub vram_usage: Option<GpuVramUsage>,
    pub energy_consumed: f64,
    pub ecc: GpuEccStats,
    pub xgmi_neighbor: Vec<GpuXgmiNeighborStats>,
    pub power_usage: u64,
    pub fan_speed: Reading16,
    pub gfx_activity_accumulated: Reading64,
    pub memory_activity_accumulated: Reading64,
    pub xgmi_link_stats: Vec<GpuXgmiLinkStats>,
    pub violation_stats: Option<GpuViolationStats>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gpu {
    pub spec: GpuSpec,
    pub status: GpuStatus,
    pub stats: GpuStats,
}

impl Gpu {
    pub fn is_partitioned(&self) -> bool {
        !self.status.gpu_partition.is_empty()
    }
}

/// Selects GPUs by id; an empty list selects all of them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuGetRequest {
    pub id: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuUpdateRequest {
    pub spec: Vec<GpuSpec>,
}

wire_enum! {
    /// Setting restored to its boot default by a reset request.
    pub enum GpuResetKind {
        Clocks = 0 => "clocks",
        Fans = 1 => "fans",
        PowerProfile = 2 => "power-profile",
        PowerOverDrive = 3 => "power-overdrive",
        XgmiError = 4 => "xgmi-error",
        PerfDeterminism = 5 => "perf-determinism",
        ComputePartition = 6 => "compute-partition",
        NpsMode = 7 => "nps-mode",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuResetRequest {
    pub id: Vec<Uuid>,
    pub reset: GpuResetKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuComputePartition {
    pub id: Uuid,
    pub partition_type: GpuComputePartitionType,
    pub gpu_partition: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuBadPageRecord {
    pub gpu: Uuid,
    pub page_address: u64,
    pub page_size: u64,
    pub page_status: GpuPageStatus,
}

/// One message of the bad-page stream. Every message carries its own status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuBadPageResponse {
    pub api_status: ApiStatus,
    pub error_code: ErrorCode,
    pub record: Vec<GpuBadPageRecord>,
}

impl ApiReply for GpuBadPageResponse {
    fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_level_uses_cli_names() {
        assert_eq!(
            GpuPerformanceLevel::from_name("memclock"),
            Some(GpuPerformanceLevel::StableMinMclk)
        );
        assert_eq!(GpuPerformanceLevel::StableMinSclk.name(), "sysclock");
    }

    #[test]
    fn every_gpu_enum_round_trips() {
        fn check<T: Copy + PartialEq + std::fmt::Debug + std::str::FromStr + ToString>(all: &[T])
        where
            T::Err: std::fmt::Debug,
        {
            for v in all {
                assert_eq!(v.to_string().parse::<T>().unwrap(), *v);
            }
        }
        check(GpuAdminState::ALL);
        check(GpuPerformanceLevel::ALL);
        check(GpuClockType::ALL);
        check(GpuComputePartitionType::ALL);
        check(GpuMemoryPartitionType::ALL);
        check(GpuOperStatus::ALL);
        check(GpuXgmiErrorStatus::ALL);
        check(GpuThrottlingStatus::ALL);
        check(PcieSlotType::ALL);
        check(VramType::ALL);
        check(VramVendor::ALL);
        check(GpuPageStatus::ALL);
        check(EccBlock::ALL);
        check(GpuResetKind::ALL);
    }

    #[test]
    fn gpu_decodes_from_sparse_payload() {
        let gpu: Gpu = serde_json::from_str(
            r#"{"spec":{"id":"6ba7b810-9dad-11d1-80b4-00c04fd430c8","adminState":1},
                "status":{"index":3,"gpuPartition":[]},
                "stats":{"packagePower":65535}}"#,
        )
        .unwrap();
        assert_eq!(gpu.spec.admin_state, GpuAdminState::Up);
        assert_eq!(gpu.status.index, 3);
        assert_eq!(gpu.stats.package_power.value(), None);
        assert!(!gpu.is_partitioned());
    }
}

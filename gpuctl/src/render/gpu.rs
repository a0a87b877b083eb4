use crate::error::CtlError;
use crate::render::{rule, separator, Block};
use crate::utils::id_to_str;
use model::gpu::{
    Gpu, GpuAdminState, GpuBadPageResponse, GpuClockType, GpuComputePartition,
    GpuComputePartitionType, GpuMemoryPartitionType, GpuOperStatus, GpuPerformanceLevel,
    GpuThrottlingStatus, GpuXgmiErrorStatus, PcieSlotType, VramType, VramVendor,
};
use model::Reading16;
use std::io::Write;
use tabled::builder::Builder;
use tabled::settings::style::Style;
use uuid::Uuid;

const ACTIVITY_PER_LINE: usize = 8;

pub fn summary(out: &mut dyn Write, count: usize) -> Result<(), CtlError> {
    writeln!(out, "\nNo. of gpus : {}\n", count)?;
    Ok(())
}

pub fn spec(out: &mut dyn Write, gpu: &Gpu, spec_only: bool) -> Result<(), CtlError> {
    let spec = &gpu.spec;
    {
        let mut block = Block::with_width(out, "", 40);
        block.line("Id", format!("{} ({})", id_to_str(&spec.id), gpu.status.index))?;
        if spec.admin_state != GpuAdminState::None {
            block.line("Admin state", spec.admin_state)?;
        }
        if spec.over_drive_level != 0 {
            block.line("Clock overdrive level", spec.over_drive_level)?;
        }
        if spec.gpu_power_cap != 0 {
            block.line("Power overdrive (in watts)", spec.gpu_power_cap)?;
        }
        if spec.performance_level != GpuPerformanceLevel::None {
            block.line("Performance level", spec.performance_level)?;
        }
        for range in &spec.clock_frequency {
            block.line("GPU clock type", range.clock_type.name().to_uppercase())?;
            block.sub(
                "Frequency range (in MHz)",
                format!("{} - {}", range.low_frequency, range.high_frequency),
            )?;
        }
        if spec.fan_speed != 0 {
            block.line("Fan speed", spec.fan_speed)?;
        }
        if spec.compute_partition_type != GpuComputePartitionType::None {
            block.line(
                "Compute partition type",
                spec.compute_partition_type.name().to_uppercase(),
            )?;
        }
        if spec.memory_partition_type != GpuMemoryPartitionType::None {
            block.line(
                "Memory partition type",
                spec.memory_partition_type.name().to_uppercase(),
            )?;
        }
    }
    if spec_only {
        separator(out)?;
    }
    Ok(())
}

pub fn status(out: &mut dyn Write, gpu: &Gpu, status_only: bool) -> Result<(), CtlError> {
    let spec = &gpu.spec;
    let status = &gpu.status;
    let indent = if status_only {
        writeln!(out, "\n{:<38} : {} ({})", "GPU id", id_to_str(&spec.id), status.index)?;
        ""
    } else {
        writeln!(out, "\nStatus :")?;
        "  "
    };

    {
        let mut block = Block::new(out, indent);
        block.line("Index", status.index)?;
        block.line("KFD id", status.kfd_id)?;
        block.line("DRM render id", status.drm_render_id)?;
        block.line("DRM card id", status.drm_card_id)?;
        block.line("GPU handle", format!("{:#x}", status.gpu_handle))?;
        for (label, value) in [
            ("Serial number", &status.serial_num),
            ("Card series", &status.card_series),
            ("Card model", &status.card_model),
            ("Card vendor", &status.card_vendor),
            ("Card SKU", &status.card_sku),
            ("Driver version", &status.driver_version),
            ("VBIOS part number", &status.vbios_part_number),
            ("VBIOS version", &status.vbios_version),
        ] {
            if !value.is_empty() {
                block.line(label, value)?;
            }
        }
        if spec.compute_partition_type != GpuComputePartitionType::None {
            block.line("Partition ID", status.partition_id)?;
        }

        let mut firmware = block.section("Firmware versions:");
        for fw in &status.firmware_version {
            firmware.line(&format!("{} firmware version", fw.firmware), &fw.version)?;
        }

        if !status.memory_vendor.is_empty() {
            block.line("Memory vendor", &status.memory_vendor)?;
        }
        if status.oper_status != GpuOperStatus::None {
            block.line("Operational status", status.oper_status)?;
        }

        // clocks of the same type are numbered in the order reported
        let mut current = GpuClockType::None;
        let mut index = 0;
        for clock in &status.clock_status {
            if clock.clock_type != current {
                current = clock.clock_type;
                index = 0;
            }
            let freq = match clock.frequency.shown() {
                Some(freq) if clock.clock_type != GpuClockType::None => freq,
                _ => {
                    index += 1;
                    continue;
                }
            };
            block.line(
                "GPU clock type",
                format!("{}_{}", clock.clock_type.name().to_uppercase(), index),
            )?;
            block.sub("Frequency (in MHz)", freq)?;
            block.sub(
                "Frequency range (in MHz)",
                format!("{} - {}", clock.low_frequency, clock.high_frequency),
            )?;
            if clock.locked {
                block.sub("Clock locked", true)?;
            }
            if clock.deep_sleep {
                block.sub("Deep sleep enabled", true)?;
            }
            index += 1;
        }

        for (i, pid) in status.kfd_process_id.iter().enumerate() {
            if i == 0 {
                block.line("KFD process id using GPU", pid)?;
            } else {
                block.text(format!("{:<41}{}", "", pid))?;
            }
        }

        if let Some(xgmi) = &status.xgmi_status {
            if xgmi.error_status != GpuXgmiErrorStatus::None {
                block.line("XGMI error status", xgmi.error_status)?;
            }
            if let Some(width) = xgmi.width.shown() {
                block.line("XGMI link width (in GB/s)", width)?;
            }
            if let Some(speed) = xgmi.speed.shown() {
                block.line("XGMI link speed (in GB/s)", speed)?;
            }
        }
        if status.throttling_status != GpuThrottlingStatus::None {
            block.line("GPU throttling", status.throttling_status)?;
        }
        if let Some(ts) = status.fw_timestamp.shown() {
            block.line("FW timestamp (in ns)", ts)?;
        }

        if let Some(pcie) = &status.pcie_status {
            let mut section = block.section("PCIe status :");
            section.opt("Version", nonzero(pcie.version))?;
            if pcie.slot_type != PcieSlotType::None {
                section.line("Card form factor", pcie.slot_type)?;
            }
            if !pcie.pcie_bus_id.is_empty() {
                section.line("Bus id", &pcie.pcie_bus_id)?;
            }
            section.opt("Current number of lanes", nonzero(pcie.width))?;
            section.opt("Maximum number of lanes", nonzero(pcie.max_width))?;
            section.opt("Current speed (in GT/s)", nonzero(pcie.speed))?;
            section.opt("Maximum speed (in GT/s)", nonzero(pcie.max_speed))?;
            section.opt("Current bandwidth (in MB/s)", pcie.bandwidth.shown())?;
        }

        if let Some(vram) = &status.vram_status {
            let mut section = block.section("VRAM status:");
            if vram.vram_type != VramType::None {
                section.line("VRAM type", vram.vram_type)?;
            }
            match vram.vendor {
                VramVendor::None => {}
                VramVendor::Unknown => section.line("VRAM vendor", "-")?,
                vendor => section.line("VRAM vendor", vendor)?,
            }
            section.opt("VRAM size (in MB)", nonzero(vram.size))?;
        }
    }

    if status_only {
        separator(out)?;
    }
    Ok(())
}

fn nonzero<T: Default + PartialEq>(value: T) -> Option<T> {
    if value == T::default() {
        None
    } else {
        Some(value)
    }
}

/// Percentages of one engine class, `N/A` for unavailable instances.
/// `None` when no instance has a value. Busy counters above 100 are not
/// valid percentages and read as unavailable too.
fn activity_row(values: &[Reading16], busy: bool, wrap: bool, indent: &str) -> Option<String> {
    let mut row = String::new();
    let mut valid = false;
    for (i, reading) in values.iter().enumerate() {
        match reading.value().filter(|v| !busy || *v <= 100) {
            Some(v) => {
                valid = true;
                row.push_str(&format!("{}% ", v));
            }
            None => row.push_str("N/A "),
        }
        if wrap && (i + 1) % ACTIVITY_PER_LINE == 0 && i + 1 < values.len() {
            row.push_str(&format!("\n{}{:<41}", indent, ""));
        }
    }
    if valid {
        Some(row.trim_end().to_string())
    } else {
        None
    }
}

pub fn stats(out: &mut dyn Write, gpu: &Gpu, stats_only: bool) -> Result<(), CtlError> {
    let stats = &gpu.stats;
    let indent = if stats_only {
        writeln!(
            out,
            "\n{:<38} : {} ({})",
            "GPU id",
            id_to_str(&gpu.spec.id),
            gpu.status.index
        )?;
        ""
    } else {
        writeln!(out, "\nStatistics :")?;
        "  "
    };

    {
        let mut block = Block::new(out, indent);
        if let Some(v) = stats.package_power.shown() {
            block.line("Current graphics power (in Watts)", v)?;
        }
        if let Some(v) = stats.avg_package_power.shown() {
            block.line("Average graphics power (in Watts)", v)?;
        }

        if let Some(temp) = &stats.temperature {
            let mut section = block.section("Temperature information:");
            let celsius = |r: model::AnalogReading| r.shown().map(|v| format!("{:.1}", v));
            section.opt("Edge temperature (in C)", celsius(temp.edge_temperature))?;
            section.opt("Junction temperature (in C)", celsius(temp.junction_temperature))?;
            section.opt("VRAM temperature (in C)", celsius(temp.memory_temperature))?;
            for (i, hbm) in temp.hbm_temperature.iter().enumerate() {
                section.opt(&format!("HBM {} temperature (in C)", i), celsius(*hbm))?;
            }
        }

        if let Some(usage) = &stats.usage {
            let mut section = block.section("Current GPU usage:");
            section.opt("GFX activity", usage.gfx_activity.shown())?;
            section.opt("UMC activity", usage.umc_activity.shown())?;
            section.opt("MM activity", usage.mm_activity.shown())?;
            section.opt("VCN activity", activity_row(&usage.vcn_activity, false, false, indent))?;
            section.opt("JPEG activity", activity_row(&usage.jpeg_activity, false, true, indent))?;
            section.opt("GFX utilization", activity_row(&usage.gfx_busy_inst, true, false, indent))?;
            section.opt("VCN utilization", activity_row(&usage.vcn_busy_inst, true, false, indent))?;
            section.opt("JPEG utilization", activity_row(&usage.jpeg_busy_inst, true, true, indent))?;
        }

        if let Some(v) = &stats.voltage {
            let mut section = block.section("GPU voltage statistics:");
            section.opt("Current voltage (in mV)", v.voltage.shown())?;
            section.opt("Current graphics voltage(in mV)", v.gfx_voltage.shown())?;
            section.opt("Current memory voltage(in mV)", v.memory_voltage.shown())?;
        }

        if let Some(p) = &stats.pcie_stats {
            let mut section = block.section("PCIe statistics:");
            section.opt("Replay count", p.replay_count.shown())?;
            section.opt("Recovery count", p.recovery_count.shown())?;
            section.opt("Replay rollover count", p.replay_rollover_count.shown())?;
            section.opt("NACKs sent", p.nack_sent_count.shown())?;
            section.opt("NACKs received", p.nack_received_count.shown())?;
        }

        if let Some(vram) = &stats.vram_usage {
            let mut section = block.section("VRAM usage:");
            section.opt("Total VRAM (in MB)", nonzero(vram.total_vram))?;
            section.opt("Used VRAM (in MB)", nonzero(vram.used_vram))?;
            section.opt("Free VRAM (in MB)", nonzero(vram.free_vram))?;
            section.opt("Total visible VRAM (in MB)", nonzero(vram.total_visible_vram))?;
            section.opt("Used visible VRAM (in MB)", nonzero(vram.used_visible_vram))?;
            section.opt("Free visible VRAM (in MB)", nonzero(vram.free_visible_vram))?;
            section.opt("Total GTT (in MB)", nonzero(vram.total_gtt))?;
            section.opt("Used GTT (in MB)", nonzero(vram.used_gtt))?;
            section.opt("Free GTT (in MB)", nonzero(vram.free_gtt))?;
        }

        if stats.energy_consumed != 0.0 {
            block.line(
                "Accumulated energy consumed (in uJ)",
                format!("{:.2}", stats.energy_consumed),
            )?;
        }
        if stats.ecc.total_correctable_errors != 0 {
            block.line("Total correctable errors", stats.ecc.total_correctable_errors)?;
        }
        if stats.ecc.total_uncorrectable_errors != 0 {
            block.line("Total uncorrectable errors", stats.ecc.total_uncorrectable_errors)?;
        }
        for count in &stats.ecc.blocks {
            if count.correctable != 0 {
                block.line(&format!("{} correctable errors", count.block), count.correctable)?;
            }
            if count.uncorrectable != 0 {
                block.line(&format!("{} uncorrectable errors", count.block), count.uncorrectable)?;
            }
        }

        for (i, n) in stats.xgmi_neighbor.iter().enumerate() {
            if n.tx_nops != 0 {
                block.line(&format!("Nops sent to XGMI neighbor{}", i), n.tx_nops)?;
            }
            if n.tx_requests != 0 {
                block.line(&format!("Outgoing requests to XGMI neighbor{}", i), n.tx_requests)?;
            }
            if n.tx_responses != 0 {
                block.line(&format!("Outgoing responses to XGMI neighbor{}", i), n.tx_responses)?;
            }
            if n.tx_beats != 0 {
                block.line(&format!("Data beats sent to neighbor{}", i), n.tx_beats)?;
            }
        }
        for (i, n) in stats.xgmi_neighbor.iter().enumerate() {
            if n.tx_throughput != 0 {
                block.line(
                    &format!("Tx throughput to XGMI neighbor{} (in BPS)", i),
                    n.tx_throughput,
                )?;
            }
        }

        if stats.power_usage != 0 {
            block.line("Power usage (in Watts)", stats.power_usage)?;
        }
        if let Some(v) = stats.fan_speed.shown() {
            block.line("Fan speed (in RPMs)", v)?;
        }
        if let Some(v) = stats.gfx_activity_accumulated.shown() {
            block.line("GFX activity accumulated", v)?;
        }
        if let Some(v) = stats.memory_activity_accumulated.shown() {
            block.line("Memory activity accumulated", v)?;
        }
        for (i, link) in stats.xgmi_link_stats.iter().enumerate() {
            if let Some(v) = link.data_read.shown() {
                block.line(&format!("Link {} data read (in KB)", i + 1), v)?;
            }
            if let Some(v) = link.data_write.shown() {
                block.line(&format!("Link {} data written (in KB)", i + 1), v)?;
            }
        }

        if let Some(v) = &stats.violation_stats {
            block.line("Current accumulated counter", v.current_accumulated_counter)?;
            block.line(
                "Processor hot residency accumulated",
                v.processor_hot_residency_accumulated,
            )?;
            block.line("PPT residency accumulated", v.ppt_residency_accumulated)?;
            block.line(
                "Socket thermal residency accumulated",
                v.socket_thermal_residency_accumulated,
            )?;
            block.line("VR thermal residency accumulated", v.vr_thermal_residency_accumulated)?;
            block.line("HBM thermal residency accumulated", v.hbm_thermal_residency_accumulated)?;
        }
    }

    separator(out)?;
    Ok(())
}

/// Spec, status and statistics of one GPU.
pub fn all(out: &mut dyn Write, gpu: &Gpu) -> Result<(), CtlError> {
    spec(out, gpu, false)?;
    status(out, gpu, false)?;
    stats(out, gpu, false)
}

pub fn partitions(out: &mut dyn Write, partitions: &[GpuComputePartition]) -> Result<(), CtlError> {
    let mut builder = Builder::new();
    builder.set_header(["Id", "PartitionType", "GpuPartition"]);
    for p in partitions {
        let children: Vec<String> = p.gpu_partition.iter().map(id_to_str).collect();
        builder.push_record([
            id_to_str(&p.id),
            p.partition_type.name().to_uppercase(),
            children.join("\n"),
        ]);
    }
    writeln!(out, "{}", builder.build().with(Style::ascii()))?;
    Ok(())
}

/// Bad-page table fed one streamed response at a time. The GPU column is
/// only filled when it changes from the previous row.
#[derive(Default)]
pub struct BadPagePrinter {
    header: bool,
    current: Option<Uuid>,
    rows: usize,
}

impl BadPagePrinter {
    pub fn print(&mut self, out: &mut dyn Write, resp: &GpuBadPageResponse) -> Result<(), CtlError> {
        if !self.header {
            self.header = true;
            writeln!(out, "{}", rule(80))?;
            writeln!(out, "{:<40}{:<16}{:<12}{:<12}", "GPU", "PageAddress", "PageSize", "Status")?;
            writeln!(out, "{}", rule(80))?;
        }
        for record in &resp.record {
            let gpu = if self.current == Some(record.gpu) {
                String::new()
            } else {
                self.current = Some(record.gpu);
                id_to_str(&record.gpu)
            };
            writeln!(
                out,
                "{:<40}{:<16x}{:<12}{:<12}",
                gpu, record.page_address, record.page_size, record.page_status
            )?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::gpu::{
        GpuBadPageRecord, GpuClockStatus, GpuPageStatus, GpuStats, GpuTemperatureStats, GpuUsage,
        GpuXgmiStatus,
    };
    use model::{AnalogReading, Reading32, Reading64};

    fn render<F: FnOnce(&mut dyn Write) -> Result<(), CtlError>>(f: F) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sentinel_gpu() -> Gpu {
        let mut gpu = Gpu::default();
        gpu.status.clock_status = vec![GpuClockStatus {
            clock_type: GpuClockType::System,
            frequency: Reading16::unavailable(),
            ..Default::default()
        }];
        gpu.status.xgmi_status = Some(GpuXgmiStatus {
            error_status: GpuXgmiErrorStatus::NoError,
            width: Reading16::unavailable(),
            speed: Reading16::unavailable(),
        });
        gpu.status.fw_timestamp = Reading64::unavailable();
        gpu.stats = GpuStats {
            package_power: Reading16::unavailable(),
            fan_speed: Reading16::unavailable(),
            temperature: Some(GpuTemperatureStats {
                edge_temperature: AnalogReading::unavailable(),
                junction_temperature: AnalogReading(41.0),
                ..Default::default()
            }),
            usage: Some(GpuUsage {
                gfx_activity: Reading32::unavailable(),
                umc_activity: Reading16::unavailable(),
                vcn_activity: vec![Reading16::unavailable(), Reading16(7)],
                ..Default::default()
            }),
            gfx_activity_accumulated: Reading64::unavailable(),
            ..Default::default()
        };
        gpu
    }

    #[test]
    fn sentinels_are_never_printed() {
        let gpu = sentinel_gpu();
        let text = render(|out| all(out, &gpu));
        for raw in ["65535", "4294967295", "18446744073709551615"] {
            assert!(!text.contains(raw), "{} leaked into\n{}", raw, text);
        }
        assert!(!text.contains("GPU clock type"));
        assert!(!text.contains("Edge temperature"));
        assert!(text.contains("Junction temperature (in C)"));
        assert!(text.contains("41.0"));
        assert!(text.contains("N/A 7%"));
        assert!(!text.contains("GFX activity "));
    }

    #[test]
    fn busy_counters_above_hundred_are_unavailable() {
        let row = activity_row(&[Reading16(101), Reading16(50)], true, false, "");
        assert_eq!(row.as_deref(), Some("N/A 50%"));
        assert_eq!(activity_row(&[Reading16::unavailable()], false, false, ""), None);
    }

    #[test]
    fn jpeg_activity_wraps_every_eight() {
        let values: Vec<Reading16> = (0..10).map(Reading16).collect();
        let row = activity_row(&values, false, true, "").unwrap();
        let lines: Vec<&str> = row.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].trim(), "8% 9%");
    }

    #[test]
    fn spec_block_per_gpu() {
        let mut gpu = Gpu::default();
        gpu.status.index = 3;
        gpu.spec.admin_state = GpuAdminState::Up;
        gpu.spec.compute_partition_type = GpuComputePartitionType::Cpx;
        let text = render(|out| spec(out, &gpu, true));
        assert!(text.starts_with(&format!("{:<40} : - (3)\n", "Id")));
        assert!(text.contains(&format!("{:<40} : up\n", "Admin state")));
        assert!(text.contains("CPX"));
        assert!(text.ends_with(&format!("\n{}\n", rule(80))));
    }

    #[test]
    fn clock_instances_are_numbered_per_type() {
        let mut gpu = Gpu::default();
        let clock = |t, f| GpuClockStatus {
            clock_type: t,
            frequency: Reading16(f),
            ..Default::default()
        };
        gpu.status.clock_status = vec![
            clock(GpuClockType::Video, 100),
            clock(GpuClockType::Video, 200),
            clock(GpuClockType::Memory, 900),
        ];
        let text = render(|out| status(out, &gpu, true));
        assert!(text.contains("VIDEO_0"));
        assert!(text.contains("VIDEO_1"));
        assert!(text.contains("MEMORY_0"));
    }

    #[test]
    fn bad_page_gpu_column_only_on_change() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let record = |gpu| GpuBadPageRecord {
            gpu,
            page_address: 0x1000,
            page_size: 4096,
            page_status: GpuPageStatus::Reserved,
        };
        let mut printer = BadPagePrinter::default();
        let text = render(|out| {
            printer.print(
                out,
                &GpuBadPageResponse {
                    record: vec![record(a), record(a)],
                    ..Default::default()
                },
            )?;
            printer.print(
                out,
                &GpuBadPageResponse {
                    record: vec![record(b)],
                    ..Default::default()
                },
            )
        });
        assert_eq!(text.matches("PageAddress").count(), 1);
        assert_eq!(text.matches(&a.to_string()).count(), 1);
        assert_eq!(text.matches(&b.to_string()).count(), 1);
        assert_eq!(text.matches("1000            4096").count(), 3);
        assert_eq!(printer.rows(), 3);
    }

    #[test]
    fn partition_table_lists_children() {
        let text = render(|out| {
            partitions(
                out,
                &[GpuComputePartition {
                    id: Uuid::from_u128(9),
                    partition_type: GpuComputePartitionType::Dpx,
                    gpu_partition: vec![Uuid::from_u128(10), Uuid::from_u128(11)],
                }],
            )
        });
        assert!(text.contains("DPX"));
        assert!(text.contains(&Uuid::from_u128(11).to_string()));
    }
}

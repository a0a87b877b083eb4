use crate::agent_rpc::check_status;
use crate::cli::utils::{flag, id_filter, opt_str, opt_value, parse_choice, parse_clock_range, parse_uuid};
use crate::cli::{id_arg, json_arg, switch, yaml_arg, CmdContext};
use crate::error::CtlError;
use crate::render::gpu::{self as view, BadPagePrinter};
use crate::render::{write_encoded, OutputFormat};
use crate::request::{self, GpuSpecChanges};
use clap::{value_parser, Arg, ArgMatches, Command};
use log::debug;
use model::gpu::{
    Gpu, GpuAdminState, GpuComputePartitionType, GpuMemoryPartitionType, GpuPerformanceLevel,
    GpuResetKind,
};
use std::io::Write;
use uuid::Uuid;

const GET_GPU: &str = "getting GPU";
const UPDATE_GPU: &str = "updating GPU";
const RESET_GPU: &str = "resetting GPU";
const GET_PARTITIONS: &str = "getting compute partitions";
const GET_BAD_PAGES: &str = "getting bad pages";

pub fn gpu_show_cmd<'a>() -> Command<'a> {
    Command::new("gpu")
        .about("Show GPU information")
        .args(&[
            id_arg("Specify GPU id"),
            yaml_arg(),
            json_arg(),
            switch("status", "Show GPU status").short('s'),
            switch("summary", "Display number of objects"),
            switch("partitioned", "Show only partitioned GPUs").short('p'),
        ])
        .subcommand(
            Command::new("all")
                .about("Show GPU spec, status and statistics")
                .arg(id_arg("Specify GPU id")),
        )
        .subcommand(
            Command::new("statistics")
                .about("Show GPU statistics")
                .arg(id_arg("Specify GPU id")),
        )
        .subcommand(
            Command::new("compute-partition")
                .about("Show GPU compute partitions")
                .args(&[id_arg("Specify partitioned GPU's id"), yaml_arg(), json_arg()]),
        )
        .subcommand(
            Command::new("bad-page")
                .about("Show GPU bad pages")
                .arg(id_arg("Specify GPU id")),
        )
}

pub fn gpu_update_cmd<'a>() -> Command<'a> {
    Command::new("gpu")
        .about("Update GPU configuration")
        .subcommand_negates_reqs(true)
        .args(&[
            id_arg("Specify GPU id").required(true),
            Arg::new("admin-state")
                .short('a')
                .long("admin-state")
                .takes_value(true)
                .help("Specify admin state (up/down)"),
            Arg::new("overdrive-level")
                .short('o')
                .long("overdrive-level")
                .takes_value(true)
                .value_parser(value_parser!(u32))
                .help("Specify clock overdrive level in percentage"),
            Arg::new("power-cap")
                .short('p')
                .long("power-cap")
                .takes_value(true)
                .value_parser(value_parser!(u64))
                .help("Specify power cap in watts"),
            Arg::new("perf-level")
                .short('l')
                .long("perf-level")
                .takes_value(true)
                .help("Specify performance level (none, auto, low, high, deterministic, memclock, sysclock, manual)"),
            Arg::new("clock-type")
                .short('t')
                .long("clock-type")
                .takes_value(true)
                .help("Specify clock type (memory, system, video, data)"),
            Arg::new("clock-frequency")
                .short('c')
                .long("clock-frequency")
                .takes_value(true)
                .help("Specify clock frequency range in MHz (lo-hi)"),
            Arg::new("memory-partition")
                .short('m')
                .long("memory-partition")
                .takes_value(true)
                .help("Specify memory partition type (NPS1, NPS2, NPS4, NPS8)"),
            Arg::new("compute-partition")
                .long("compute-partition")
                .takes_value(true)
                .help("Specify compute partition type (SPX, DPX, TPX, QPX, CPX)"),
            Arg::new("fan-speed")
                .short('s')
                .long("fan-speed")
                .takes_value(true)
                .value_parser(value_parser!(u64))
                .help("Specify fan speed in RPM"),
        ])
        .subcommand(gpu_reset_cmd())
}

fn reset_help(kind: GpuResetKind) -> &'static str {
    match kind {
        GpuResetKind::Clocks => "Reset clocks and overdrive to default",
        GpuResetKind::Fans => "Reset fans to automatic control",
        GpuResetKind::PowerProfile => "Reset power profile to default",
        GpuResetKind::PowerOverDrive => "Set the maximum GPU power back to the device default",
        GpuResetKind::XgmiError => "Reset XGMI error count",
        GpuResetKind::PerfDeterminism => "Reset performance determinism",
        GpuResetKind::ComputePartition => "Reset to boot compute partition state",
        GpuResetKind::NpsMode => "Reset to boot NPS mode state",
    }
}

fn gpu_reset_cmd<'a>() -> Command<'a> {
    let mut cmd = Command::new("reset")
        .about("Reset GPU settings to their defaults")
        .arg(id_arg("Specify GPU id").required(true));
    for kind in GpuResetKind::ALL {
        cmd = cmd.arg(switch(kind.name(), reset_help(*kind)));
    }
    cmd
}

pub async fn gpu_show_command(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    match m.subcommand() {
        Some(("all", sub_m)) => show_gpu_all(ctx, sub_m).await,
        Some(("statistics", sub_m)) => show_gpu_stats(ctx, sub_m).await,
        Some(("compute-partition", sub_m)) => show_compute_partitions(ctx, sub_m).await,
        Some(("bad-page", sub_m)) => show_bad_pages(ctx, sub_m).await,
        _ => show_gpu(ctx, m).await,
    }
}

async fn get_gpus(ctx: &CmdContext<'_>, ids: Vec<Uuid>) -> Result<Vec<Gpu>, CtlError> {
    let req = request::gpu_get(ids);
    let conn = ctx.connect().await?;
    let resp = conn.call(GET_GPU, conn.api().gpu_get(req)).await?;
    Ok(resp.response)
}

async fn show_gpu(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let ids = id_filter(m, "id")?;
    let partitioned = flag(m, "partitioned");
    let format = OutputFormat::from_flags(flag(m, "json"), flag(m, "yaml"));

    let gpus: Vec<Gpu> = get_gpus(ctx, ids)
        .await?
        .into_iter()
        .filter(|gpu| gpu.is_partitioned() == partitioned)
        .collect();

    if write_encoded(ctx.out, format, &gpus)? {
        return Ok(());
    }
    if !flag(m, "summary") {
        let status_only = flag(m, "status");
        for gpu in &gpus {
            if status_only {
                view::status(ctx.out, gpu, true)?;
            } else {
                view::spec(ctx.out, gpu, true)?;
            }
        }
    }
    view::summary(ctx.out, gpus.len())
}

async fn show_gpu_all(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let gpus = get_gpus(ctx, id_filter(m, "id")?).await?;
    for gpu in &gpus {
        view::all(ctx.out, gpu)?;
    }
    view::summary(ctx.out, gpus.len())
}

async fn show_gpu_stats(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let gpus = get_gpus(ctx, id_filter(m, "id")?).await?;
    for gpu in &gpus {
        view::stats(ctx.out, gpu, true)?;
    }
    view::summary(ctx.out, gpus.len())
}

async fn show_compute_partitions(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let req = request::gpu_get(id_filter(m, "id")?);
    let format = OutputFormat::from_flags(flag(m, "json"), flag(m, "yaml"));

    let conn = ctx.connect().await?;
    let resp = conn
        .call(GET_PARTITIONS, conn.api().gpu_compute_partition_get(req))
        .await?;

    if write_encoded(ctx.out, format, &resp.response)? {
        return Ok(());
    }
    view::partitions(ctx.out, &resp.response)
}

async fn show_bad_pages(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let req = request::gpu_get(id_filter(m, "id")?);

    let conn = ctx.connect().await?;
    let mut printer = BadPagePrinter::default();
    let out = &mut *ctx.out;
    conn.stream(GET_BAD_PAGES)
        .run(conn.api().gpu_bad_page_get(req), |resp| {
            check_status(GET_BAD_PAGES, &resp)?;
            printer.print(out, &resp)
        })
        .await?;
    debug!("{} bad page(s) listed", printer.rows());
    Ok(())
}

fn spec_changes(m: &ArgMatches) -> Result<GpuSpecChanges, CtlError> {
    const ADMIN_STATES: &[GpuAdminState] = &[GpuAdminState::Up, GpuAdminState::Down];
    const COMPUTE_PARTITIONS: &[GpuComputePartitionType] = &[
        GpuComputePartitionType::Spx,
        GpuComputePartitionType::Dpx,
        GpuComputePartitionType::Tpx,
        GpuComputePartitionType::Qpx,
        GpuComputePartitionType::Cpx,
    ];
    const MEMORY_PARTITIONS: &[GpuMemoryPartitionType] = &[
        GpuMemoryPartitionType::Nps1,
        GpuMemoryPartitionType::Nps2,
        GpuMemoryPartitionType::Nps4,
        GpuMemoryPartitionType::Nps8,
    ];

    let clock_frequency = match (opt_str(m, "clock-type"), opt_str(m, "clock-frequency")) {
        (Some(clock_type), Some(range)) => Some(parse_clock_range(clock_type, range)?),
        (None, None) => None,
        _ => {
            return Err(CtlError::validation(
                "Both \"clock-type\" and \"clock-frequency\" need to be specified",
            ))
        }
    };

    Ok(GpuSpecChanges {
        admin_state: opt_str(m, "admin-state")
            .map(|v| parse_choice("admin-state", v, ADMIN_STATES))
            .transpose()?,
        over_drive_level: opt_value::<u32>(m, "overdrive-level").copied(),
        power_cap: opt_value::<u64>(m, "power-cap").copied(),
        performance_level: opt_str(m, "perf-level")
            .map(|v| parse_choice("perf-level", v, GpuPerformanceLevel::ALL))
            .transpose()?,
        clock_frequency,
        memory_partition: opt_str(m, "memory-partition")
            .map(|v| parse_choice("memory-partition", v, MEMORY_PARTITIONS))
            .transpose()?,
        compute_partition: opt_str(m, "compute-partition")
            .map(|v| parse_choice("compute-partition", v, COMPUTE_PARTITIONS))
            .transpose()?,
        fan_speed: opt_value::<u64>(m, "fan-speed").copied(),
    })
}

pub async fn gpu_update_command(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    if let Some(("reset", sub_m)) = m.subcommand() {
        return reset_gpu(ctx, sub_m).await;
    }

    let changes = spec_changes(m)?;
    if changes.is_empty() {
        return Err(CtlError::validation("Nothing to update"));
    }
    let id = parse_uuid(opt_str(m, "id").unwrap_or_default())?;

    let conn = ctx.connect().await?;
    let current = conn
        .call(GET_GPU, conn.api().gpu_get(request::gpu_get(vec![id])))
        .await?;
    let gpu = current
        .response
        .first()
        .ok_or_else(|| CtlError::rejected(GET_GPU, "GPU object not found"))?;

    let req = request::gpu_update(&gpu.spec, &changes);
    conn.call(UPDATE_GPU, conn.api().gpu_update(req)).await?;
    writeln!(ctx.out, "Updating GPU succeeded")?;
    Ok(())
}

async fn reset_gpu(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let chosen: Vec<GpuResetKind> = GpuResetKind::ALL
        .iter()
        .copied()
        .filter(|kind| flag(m, kind.name()))
        .collect();
    let names: Vec<String> = GpuResetKind::ALL
        .iter()
        .map(|kind| format!("\"{}\"", kind.name()))
        .collect();
    let kind = match chosen.as_slice() {
        [kind] => *kind,
        [] => {
            return Err(CtlError::validation(format!(
                "Invalid arguments, one of {} must be specified",
                names.join(", ")
            )))
        }
        _ => {
            return Err(CtlError::validation(format!(
                "Invalid arguments, {} are mutually exclusive, specify only one",
                names.join(", ")
            )))
        }
    };
    let id = parse_uuid(opt_str(m, "id").unwrap_or_default())?;

    let conn = ctx.connect().await?;
    conn.call(RESET_GPU, conn.api().gpu_reset(request::gpu_reset(id, kind)))
        .await?;
    writeln!(ctx.out, "Resetting GPU succeeded")?;
    Ok(())
}

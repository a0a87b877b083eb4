use crate::cli::utils::{flag, id_filter, opt_str, parse_uuid, parse_uuid_list};
use crate::cli::{gpu_list_arg, id_arg, switch, CmdContext};
use crate::error::CtlError;
use crate::render::gpu_watch as view;
use crate::render::{write_encoded, OutputFormat};
use crate::request::{self, watch_attr_group, WATCH_ATTR_GROUPS};
use clap::{Arg, ArgMatches, Command};
use model::gpu_watch::{GpuWatch, GpuWatchAttrId};
use std::io::Write;
use uuid::Uuid;

const CREATE_WATCH: &str = "creating GPU watch";
const DELETE_WATCH: &str = "deleting GPU watch";
const GET_WATCH: &str = "getting GPU watch";
const SUBSCRIBE_WATCH: &str = "subscribing to GPU watch";

pub fn gpu_watch_create_cmd<'a>() -> Command<'a> {
    Command::new("gpu-watch").about("Create GPU watch").args(&[
        id_arg("Specify GPU watch id").required(true),
        gpu_list_arg().required(true),
        Arg::new("attr")
            .short('a')
            .long("attr")
            .takes_value(true)
            .required(true)
            .help(
                "Specify comma separated list of attributes to watch (gpu-clock, memory-clock, \
                 memory-temp, gpu-temp, power-usage, ecc-total, pcie-bandwidth, gpu-util, \
                 memory-usage, ecc-count, xgmi-tx, xgmi-throughput)",
            ),
    ])
}

pub fn gpu_watch_delete_cmd<'a>() -> Command<'a> {
    Command::new("gpu-watch")
        .about("Delete GPU watch")
        .arg(id_arg("Specify GPU watch id").required(true))
}

pub fn gpu_watch_show_cmd<'a>() -> Command<'a> {
    Command::new("gpu-watch")
        .about("Show GPU watch information")
        .args(&[
            id_arg("Specify GPU watch id"),
            switch("status", "Show GPU watch status"),
            switch("yaml", "Output in yaml"),
            switch("json", "Output in json"),
        ])
        .subcommand(
            Command::new("all")
                .about("Show GPU watch spec, status and statistics")
                .arg(id_arg("Specify GPU watch id")),
        )
        .subcommand(
            Command::new("statistics")
                .about("Show GPU watch statistics")
                .arg(id_arg("Specify GPU watch id")),
        )
}

pub fn gpu_watch_subscribe_cmd<'a>() -> Command<'a> {
    Command::new("subscribe")
        .about("Subscribe to GPU watch statistics")
        .arg(id_arg("Specify comma separated list of GPU watch ids").required(true))
}

/// Expands the comma separated attribute groups given on the command line.
fn parse_watch_attrs(value: &str) -> Result<Vec<GpuWatchAttrId>, CtlError> {
    let mut attrs = vec![];
    for name in value.split(',') {
        let group = watch_attr_group(name).ok_or_else(|| {
            let known: Vec<&str> = WATCH_ATTR_GROUPS.iter().map(|(group, _, _)| *group).collect();
            CtlError::validation(format!(
                "Invalid GPU watch attribute {} specified, expected one of {}",
                name,
                known.join(", ")
            ))
        })?;
        attrs.extend(group);
    }
    Ok(attrs)
}

pub async fn create_gpu_watch(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let id = parse_uuid(opt_str(m, "id").unwrap_or_default())?;
    let gpus = parse_uuid_list(opt_str(m, "gpu").unwrap_or_default())?;
    let attrs = parse_watch_attrs(opt_str(m, "attr").unwrap_or_default())?;
    let req = request::gpu_watch_create(id, gpus, &attrs);

    let conn = ctx.connect().await?;
    conn.call(CREATE_WATCH, conn.api().gpu_watch_create(req)).await?;
    writeln!(ctx.out, "GPU watch {} created successfully", id)?;
    Ok(())
}

pub async fn delete_gpu_watch(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let id = parse_uuid(opt_str(m, "id").unwrap_or_default())?;
    let req = request::gpu_watch_ids(vec![id]);

    let conn = ctx.connect().await?;
    conn.call(DELETE_WATCH, conn.api().gpu_watch_delete(req)).await?;
    writeln!(ctx.out, "GPU watch {} deleted successfully", id)?;
    Ok(())
}

async fn get_watches(ctx: &CmdContext<'_>, ids: Vec<Uuid>) -> Result<Vec<GpuWatch>, CtlError> {
    let req = request::gpu_watch_ids(ids);
    let conn = ctx.connect().await?;
    let resp = conn.call(GET_WATCH, conn.api().gpu_watch_get(req)).await?;
    Ok(resp.response)
}

#[derive(Clone, Copy)]
enum WatchView {
    Spec,
    Status,
    Stats,
    All,
}

pub async fn gpu_watch_show_command(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    // Output format flags live on `gpu-watch` only, not on its subcommands.
    let format = OutputFormat::from_flags(flag(m, "json"), flag(m, "yaml"));
    let (m, selected) = match m.subcommand() {
        Some(("all", sub_m)) => (sub_m, WatchView::All),
        Some(("statistics", sub_m)) => (sub_m, WatchView::Stats),
        _ if flag(m, "status") => (m, WatchView::Status),
        _ => (m, WatchView::Spec),
    };

    let watches = get_watches(ctx, id_filter(m, "id")?).await?;
    if write_encoded(ctx.out, format, &watches)? {
        return Ok(());
    }
    for watch in &watches {
        match selected {
            WatchView::Spec => view::spec(ctx.out, watch, true)?,
            WatchView::Status => view::status(ctx.out, watch, true)?,
            WatchView::Stats => view::stats(ctx.out, watch, true)?,
            WatchView::All => view::all(ctx.out, watch)?,
        }
    }
    view::summary(ctx.out, watches.len())
}

pub async fn subscribe_gpu_watch(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let ids = parse_uuid_list(opt_str(m, "id").unwrap_or_default())?;
    let req = request::gpu_watch_ids(ids);

    let conn = ctx.connect().await?;
    let out = &mut *ctx.out;
    conn.stream(SUBSCRIBE_WATCH)
        .run(conn.api().gpu_watch_subscribe(req), |watch| {
            view::stats(out, &watch, true)
        })
        .await?;
    Ok(())
}

use crate::cli::utils::{flag, opt_str, opt_value, parse_category, parse_event_ids, parse_severity, parse_uuid_list};
use crate::cli::{gpu_list_arg, json_arg, yaml_arg, CmdContext};
use crate::error::CtlError;
use crate::render::event as view;
use crate::render::{write_encoded, OutputFormat};
use crate::request;
use clap::{value_parser, Arg, ArgMatches, Command};
use log::info;
use model::event::EventMatchAttrs;
use std::io::Write;
use uuid::Uuid;

const GET_EVENTS: &str = "getting events";
const SUBSCRIBE_EVENTS: &str = "subscribing to events";
const GENERATE_EVENTS: &str = "generating events";

fn event_id_arg<'a>() -> Arg<'a> {
    Arg::new("event-id")
        .long("event-id")
        .takes_value(true)
        .help("Specify comma separated list of events of interest (1-5)")
}

pub fn events_show_cmd<'a>() -> Command<'a> {
    Command::new("events")
        .about("Show events")
        .args(&[
            event_id_arg().conflicts_with_all(&["severity", "category"]),
            gpu_list_arg(),
            Arg::new("severity")
                .long("severity")
                .takes_value(true)
                .help("Specify severity of events of interest (debug, info, warn, critical)"),
            Arg::new("category")
                .long("category")
                .takes_value(true)
                .value_parser(value_parser!(u32))
                .help("Specify category of events of interest"),
            json_arg(),
            yaml_arg(),
        ])
}

pub fn events_subscribe_cmd<'a>() -> Command<'a> {
    Command::new("subscribe")
        .about("Subscribe to events")
        .args(&[event_id_arg(), gpu_list_arg()])
}

pub fn event_gen_cmd<'a>() -> Command<'a> {
    Command::new("event")
        .about("Generate events")
        .args(&[
            event_id_arg()
                .short('i')
                .required(true)
                .help("Specify comma separated list of events (1-5)"),
            gpu_list_arg().required(true),
        ])
}

fn gpu_list(m: &ArgMatches) -> Result<Vec<Uuid>, CtlError> {
    Ok(opt_str(m, "gpu").map(parse_uuid_list).transpose()?.unwrap_or_default())
}

pub async fn show_events(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let ids = opt_str(m, "event-id").map(parse_event_ids).transpose()?;
    let severity = opt_str(m, "severity").map(parse_severity).transpose()?;
    let category = opt_value::<u32>(m, "category").copied().map(parse_category).transpose()?;
    let attrs = if severity.is_some() || category.is_some() {
        Some(EventMatchAttrs {
            severity: severity.unwrap_or_default(),
            category: category.unwrap_or_default(),
        })
    } else {
        None
    };
    let req = request::event_get(ids, attrs, gpu_list(m)?);
    let format = OutputFormat::from_flags(flag(m, "json"), flag(m, "yaml"));

    let conn = ctx.connect().await?;
    let resp = conn.call(GET_EVENTS, conn.api().event_get(req)).await?;

    if write_encoded(ctx.out, format, &resp.response)? {
        return Ok(());
    }
    for event in &resp.response {
        view::event(ctx.out, event)?;
    }
    view::summary(ctx.out, resp.response.len())
}

pub async fn subscribe_events(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let ids = opt_str(m, "event-id").map(parse_event_ids).transpose()?.unwrap_or_default();
    let req = request::event_subscribe(ids, gpu_list(m)?);

    let conn = ctx.connect().await?;
    let out = &mut *ctx.out;
    let count = conn
        .stream(SUBSCRIBE_EVENTS)
        .run(conn.api().event_subscribe(req), |event| view::event(out, &event))
        .await?;
    info!("event stream from {} ended after {} event(s)", conn.address(), count);
    Ok(())
}

pub async fn generate_events(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let ids = parse_event_ids(opt_str(m, "event-id").unwrap_or_default())?;
    let req = request::event_gen(ids, gpu_list(m)?);

    let conn = ctx.connect().await?;
    conn.call(GENERATE_EVENTS, conn.api().event_gen(req)).await?;
    writeln!(ctx.out, "Generated events")?;
    Ok(())
}

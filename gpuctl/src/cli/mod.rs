mod events;
mod gpu;
mod gpu_watch;
mod topo;
mod trace;
mod utils;

use crate::agent_rpc::{connect, Connection, Connector};
use crate::config::{ClientConfig, DEFAULT_CONN_TIMEOUT, DEFAULT_HOST, DEFAULT_LOG_LEVEL, DEFAULT_PORT};
use crate::error::CtlError;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::io::Write;

/// What a command needs besides its own flags: the resolved settings, a
/// way to reach the agent and the output sink.
pub struct CmdContext<'a> {
    pub cfg: &'a ClientConfig,
    pub connector: &'a dyn Connector,
    pub out: &'a mut dyn Write,
}

impl<'a> CmdContext<'a> {
    /// Opens the one connection of this invocation.
    pub async fn connect(&self) -> Result<Connection, CtlError> {
        connect(self.connector, self.cfg).await
    }
}

fn global_args<'a>() -> Vec<Arg<'a>> {
    vec![
        Arg::new("node-svc-ip")
            .long("node-svc-ip")
            .env("AGA_GRPC_HOST")
            .global(true)
            .takes_value(true)
            .default_value(DEFAULT_HOST)
            .help("GPU agent host"),
        Arg::new("node-svc-port")
            .long("node-svc-port")
            .env("AGA_GRPC_PORT")
            .global(true)
            .takes_value(true)
            .default_value(DEFAULT_PORT)
            .help("GPU agent port"),
        Arg::new("conn-timeout")
            .long("conn-timeout")
            .env("GRPC_CONN_TIMEOUT")
            .global(true)
            .takes_value(true)
            .default_value(DEFAULT_CONN_TIMEOUT)
            .help("seconds to wait for the agent connection"),
        Arg::new("timeout")
            .long("timeout")
            .env("GRPC_TIMEOUT")
            .global(true)
            .takes_value(true)
            .help("seconds allowed for each request, 0 or unset waits forever"),
        Arg::new("log-level")
            .long("log-level")
            .env("GPUCTL_LOG_LEVEL")
            .global(true)
            .takes_value(true)
            .default_value(DEFAULT_LOG_LEVEL)
            .help("set log level for application"),
    ]
}

pub(crate) fn id_arg<'a>(help: &'a str) -> Arg<'a> {
    Arg::new("id").short('i').long("id").takes_value(true).help(help)
}

pub(crate) fn gpu_list_arg<'a>() -> Arg<'a> {
    Arg::new("gpu")
        .short('g')
        .long("gpu")
        .takes_value(true)
        .help("Specify comma separated list of GPU ids")
}

pub(crate) fn switch<'a>(name: &'a str, help: &'a str) -> Arg<'a> {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

pub(crate) fn json_arg<'a>() -> Arg<'a> {
    switch("json", "Output in json").short('j')
}

pub(crate) fn yaml_arg<'a>() -> Arg<'a> {
    switch("yaml", "Output in yaml").short('y')
}

pub fn build_cli() -> Command<'static> {
    Command::new("gpuctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("GPU agent CLI")
        .args(global_args())
        .arg_required_else_help(true)
        .subcommand(
            Command::new("show")
                .about("Show object information")
                .arg_required_else_help(true)
                .subcommand(gpu::gpu_show_cmd())
                .subcommand(gpu_watch::gpu_watch_show_cmd())
                .subcommand(events::events_show_cmd())
                .subcommand(topo::device_show_cmd())
                .subcommand(trace::trace_level_show_cmd()),
        )
        .subcommand(
            Command::new("debug")
                .about("Debug and configuration commands")
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("create")
                        .about("Create objects")
                        .arg_required_else_help(true)
                        .subcommand(gpu_watch::gpu_watch_create_cmd())
                        .subcommand(events::event_gen_cmd()),
                )
                .subcommand(
                    Command::new("update")
                        .about("Update objects")
                        .arg_required_else_help(true)
                        .subcommand(gpu::gpu_update_cmd()),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete objects")
                        .arg_required_else_help(true)
                        .subcommand(gpu_watch::gpu_watch_delete_cmd()),
                )
                .subcommand(
                    Command::new("events")
                        .about("Event commands")
                        .arg_required_else_help(true)
                        .subcommand(events::events_subscribe_cmd()),
                )
                .subcommand(
                    Command::new("gpu-watch")
                        .about("GPU watch commands")
                        .arg_required_else_help(true)
                        .subcommand(gpu_watch::gpu_watch_subscribe_cmd()),
                )
                .subcommand(trace::trace_debug_cmd()),
        )
}

fn not_found() -> CtlError {
    CtlError::validation("command not found")
}

/// Dispatches the parsed command line.
pub async fn execute(
    cfg: &ClientConfig,
    m: &ArgMatches,
    connector: &dyn Connector,
    out: &mut dyn Write,
) -> Result<(), CtlError> {
    let mut ctx = CmdContext { cfg, connector, out };
    match m.subcommand() {
        Some(("show", sub_m)) => show_command(&mut ctx, sub_m).await,
        Some(("debug", sub_m)) => debug_command(&mut ctx, sub_m).await,
        _ => Err(not_found()),
    }
}

async fn show_command(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    match m.subcommand() {
        Some(("gpu", sub_m)) => gpu::gpu_show_command(ctx, sub_m).await,
        Some(("gpu-watch", sub_m)) => gpu_watch::gpu_watch_show_command(ctx, sub_m).await,
        Some(("events", sub_m)) => events::show_events(ctx, sub_m).await,
        Some(("device", sub_m)) => match sub_m.subcommand() {
            Some(("topology", topo_m)) => topo::show_device_topology(ctx, topo_m).await,
            _ => Err(not_found()),
        },
        Some(("trace-level", _)) => trace::show_trace_level(ctx).await,
        _ => Err(not_found()),
    }
}

async fn debug_command(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    match m.subcommand() {
        Some(("create", sub_m)) => match sub_m.subcommand() {
            Some(("gpu-watch", create_m)) => gpu_watch::create_gpu_watch(ctx, create_m).await,
            Some(("event", create_m)) => events::generate_events(ctx, create_m).await,
            _ => Err(not_found()),
        },
        Some(("update", sub_m)) => match sub_m.subcommand() {
            Some(("gpu", update_m)) => gpu::gpu_update_command(ctx, update_m).await,
            _ => Err(not_found()),
        },
        Some(("delete", sub_m)) => match sub_m.subcommand() {
            Some(("gpu-watch", delete_m)) => gpu_watch::delete_gpu_watch(ctx, delete_m).await,
            _ => Err(not_found()),
        },
        Some(("events", sub_m)) => match sub_m.subcommand() {
            Some(("subscribe", subscribe_m)) => events::subscribe_events(ctx, subscribe_m).await,
            _ => Err(not_found()),
        },
        Some(("gpu-watch", sub_m)) => match sub_m.subcommand() {
            Some(("subscribe", subscribe_m)) => gpu_watch::subscribe_gpu_watch(ctx, subscribe_m).await,
            _ => Err(not_found()),
        },
        Some(("trace", sub_m)) => trace::debug_trace(ctx, sub_m).await,
        _ => Err(not_found()),
    }
}

/// Parses `args` and runs the command they name. Parse failures come back
/// as validation errors instead of terminating the process.
pub async fn run<I, T>(args: I, connector: &dyn Connector, out: &mut dyn Write) -> Result<(), CtlError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let m = build_cli()
        .try_get_matches_from(args)
        .map_err(|e| CtlError::validation(e.to_string()))?;
    let cfg = ClientConfig::from_matches(&m)?;
    execute(&cfg, &m, connector, out).await
}

#[cfg(test)]
pub(crate) async fn run_fake(connector: &dyn Connector, args: &[&str]) -> (Result<(), CtlError>, String) {
    let mut out = Vec::new();
    let mut argv = vec!["gpuctl"];
    argv.extend_from_slice(args);
    let res = run(argv, connector, &mut out).await;
    (res, String::from_utf8(out).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_rpc::fake::{FakeAgent, FakeConnector, Probe, Tail};
    use crate::error::{exit_code, RequestFailure};
    use model::event::Event;
    use model::gpu::Gpu;
    use model::{ApiStatus, ListResponse};
    use std::time::{Duration, Instant};

    #[test]
    fn command_tree_is_consistent() {
        build_cli().debug_assert();
    }

    #[tokio::test]
    async fn zero_gpus_prints_zero_summary() {
        let probe = Probe::default();
        let connector = FakeConnector::ready(FakeAgent::new(&probe));
        let (res, out) = run_fake(&connector, &["show", "gpu"]).await;
        assert!(res.is_ok(), "{:?}", res);
        assert_eq!(exit_code(&res), 0);
        assert_eq!(out, "\nNo. of gpus : 0\n\n");
        assert_eq!(probe.methods(), vec!["Gpu.Get"]);
        assert_eq!(probe.released(), 1);
    }

    #[tokio::test]
    async fn hanging_agent_fails_within_connect_timeout() {
        let started = Instant::now();
        let (res, out) = run_fake(&FakeConnector::Hang, &["--conn-timeout", "1", "show", "gpu"]).await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(res, Err(CtlError::Connection { .. })), "{:?}", res);
        assert_eq!(exit_code(&res), 1);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn streamed_events_render_one_block_each() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.event_stream = (0..3)
            .map(|i| Event {
                description: format!("event {}", i),
                ..Default::default()
            })
            .collect();
        let connector = FakeConnector::ready(agent);
        let (res, out) = run_fake(&connector, &["debug", "events", "subscribe"]).await;
        assert!(res.is_ok(), "{:?}", res);
        assert_eq!(out.matches("Event Id").count(), 3);
        let first = out.find("event 0").unwrap();
        let last = out.find("event 2").unwrap();
        assert!(first < last);
        assert_eq!(probe.streams_closed(), 1);
        assert_eq!(probe.released(), 1);
    }

    #[tokio::test]
    async fn non_ok_status_renders_nothing() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.gpus = ListResponse::<Gpu>::failed(ApiStatus::NotFound);
        let connector = FakeConnector::ready(agent);
        let (res, out) = run_fake(&connector, &["show", "gpu", "all"]).await;
        match res {
            Err(CtlError::Request {
                reason: RequestFailure::Status { status, .. },
                ..
            }) => assert_eq!(status, ApiStatus::NotFound),
            other => panic!("unexpected {:?}", other),
        }
        assert!(out.is_empty());
        assert_eq!(probe.released(), 1);
    }

    #[tokio::test]
    async fn stream_error_keeps_rendered_records() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.event_stream = vec![Event::default(), Event::default()];
        agent.tail = Tail::Error("connection reset".to_string());
        let connector = FakeConnector::ready(agent);
        let (res, out) = run_fake(&connector, &["debug", "events", "subscribe"]).await;
        assert!(matches!(res, Err(CtlError::Stream { .. })), "{:?}", res);
        assert_eq!(out.matches("Event Id").count(), 2);
        assert_eq!(probe.streams_closed(), 1);
        assert_eq!(probe.released(), 1);
    }

    #[tokio::test]
    async fn rejected_call_releases_connection() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.reject = Some("transport is closing".to_string());
        let connector = FakeConnector::ready(agent);
        let (res, _) = run_fake(&connector, &["show", "trace-level"]).await;
        let err = res.unwrap_err();
        assert_eq!(err.to_string(), "getting trace level failed, transport is closing");
        assert_eq!(probe.released(), 1);
    }

    #[tokio::test]
    async fn bad_config_fails_before_connecting() {
        let probe = Probe::default();
        let connector = FakeConnector::ready(FakeAgent::new(&probe));
        let (res, _) = run_fake(&connector, &["--timeout", "soon", "show", "gpu"]).await;
        assert!(matches!(res, Err(CtlError::Config { name: "GRPC_TIMEOUT", .. })), "{:?}", res);
        assert!(probe.methods().is_empty());
        assert_eq!(probe.released(), 0);
    }

    #[tokio::test]
    async fn unknown_flag_is_a_validation_error() {
        let (res, _) = run_fake(&FakeConnector::Hang, &["show", "gpu", "--bogus"]).await;
        assert!(matches!(res, Err(CtlError::Validation(_))), "{:?}", res);
    }
}

use crate::cli::utils::{enable_disable_to_bool, flag, opt_str, parse_choice};
use crate::cli::{switch, CmdContext};
use crate::error::CtlError;
use crate::render::trace::trace_level;
use crate::request;
use clap::{Arg, ArgMatches, Command};
use log::warn;
use model::trace::TraceLevel;
use std::io::Write;

const GET_TRACE: &str = "getting trace level";
const UPDATE_TRACE: &str = "updating trace level";
const FLUSH_LOGS: &str = "flushing logs";

pub fn trace_level_show_cmd<'a>() -> Command<'a> {
    Command::new("trace-level").about("Show agent trace level")
}

pub fn trace_debug_cmd<'a>() -> Command<'a> {
    Command::new("trace").about("Agent trace settings").args(&[
        Arg::new("level")
            .long("level")
            .takes_value(true)
            .help("Specify trace level (none, error, warn, info, debug, verbose)"),
        Arg::new("api-trace")
            .long("api-trace")
            .takes_value(true)
            .help("Enable or disable API trace (enable, disable)"),
        switch("flush", "Flush logs"),
    ])
}

pub async fn show_trace_level(ctx: &mut CmdContext<'_>) -> Result<(), CtlError> {
    let conn = ctx.connect().await?;
    let resp = conn.call(GET_TRACE, conn.api().trace_get()).await?;
    trace_level(ctx.out, &resp)
}

pub async fn debug_trace(ctx: &mut CmdContext<'_>, m: &ArgMatches) -> Result<(), CtlError> {
    let flush = flag(m, "flush");
    let level = opt_str(m, "level");
    let api_trace = opt_str(m, "api-trace");
    if level.is_none() && api_trace.is_none() && !flush {
        return Err(CtlError::validation(
            "Required argument(s) missing, refer to help string",
        ));
    }
    let level = level
        .map(|v| {
            parse_choice("level", v, TraceLevel::ALL)
                .map_err(|_| CtlError::validation("Invalid argument for \"level\", refer to help string"))
        })
        .transpose()?;
    let api_trace = api_trace
        .map(|v| {
            enable_disable_to_bool(v)
                .ok_or_else(|| CtlError::validation("Invalid argument specified for api-trace"))
        })
        .transpose()?;

    let conn = ctx.connect().await?;
    if level.is_some() || api_trace.is_some() {
        // The agent takes both settings at once; fill in the one not given.
        let (new_level, new_api_trace) = match (level, api_trace) {
            (Some(l), Some(a)) => (l, a),
            _ => {
                let current = conn.call(GET_TRACE, conn.api().trace_get()).await?;
                (
                    level.unwrap_or(current.trace_level),
                    api_trace.unwrap_or(current.api_trace_en),
                )
            }
        };
        if new_api_trace && new_level != TraceLevel::Verbose {
            warn!("api trace enabled with trace level {}", new_level);
            writeln!(
                ctx.out,
                "Warning: \"level\" should be verbose for api-trace to take effect"
            )?;
        }

        let req = request::trace_update(new_level, new_api_trace);
        conn.call(UPDATE_TRACE, conn.api().trace_update(req)).await?;
        if level.is_some() {
            writeln!(ctx.out, "Trace level set to {}", new_level)?;
        }
        if let Some(enabled) = api_trace {
            let state = if enabled { "enabled" } else { "disabled" };
            writeln!(ctx.out, "API trace is {}", state)?;
        }
    }

    if flush {
        conn.call(FLUSH_LOGS, conn.api().trace_flush()).await?;
        writeln!(ctx.out, "Flush logs succeeded")?;
    }
    Ok(())
}

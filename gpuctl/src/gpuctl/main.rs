use gpuctl::agent_rpc::WsConnector;
use gpuctl::cli;
use gpuctl::config::ClientConfig;
use gpuctl::error::{exit_code, CtlError};
use log::debug;
use simplelog::*;
use std::io::Write;
use tokio::signal::ctrl_c;

#[tokio::main()]
async fn main() {
    let app_m = cli::build_cli().get_matches();

    let cfg = match ClientConfig::from_matches(&app_m) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = TermLogger::init(
        cfg.log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("failed to init logger: {}", e);
    }
    debug!("agent address {}", cfg.address());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let exec_result = tokio::select! {
        res = cli::execute(&cfg, &app_m, &WsConnector, &mut out) => res,
        _ = ctrl_c() => Err(CtlError::Interrupted),
    };
    let _ = out.flush();

    if let Err(e) = &exec_result {
        eprintln!("{}", e);
    }
    std::process::exit(exit_code(&exec_result));
}

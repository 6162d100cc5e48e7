mod cli;

use chat_flux::logging::{self, info};
use chat_flux::ChatError;
use chat_net::ChatServer;
use clap::Parser;
use cli::Cli;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log = logging::init(cli.log_config());

    let ip: IpAddr = match cli.bind.parse().map_err(ChatError::from) {
        Ok(ip) => ip,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let addr = SocketAddr::new(ip, cli.port);

    let mut server = match ChatServer::bind(addr, log.clone()) {
        Ok(server) => server,
        Err(err) => {
            eprintln!("failed to start server: {err}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    let handler_log = log.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!(handler_log, "received interrupt signal");
        handler_flag.store(true, Ordering::Relaxed);
    }) {
        eprintln!("failed to install signal handler: {err}");
        return ExitCode::FAILURE;
    }

    if let Err(err) = server.run(&shutdown) {
        eprintln!("server loop failed: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

use std::sync::Arc;

use pagetools::config::Config;
use pagetools::logger;
use pagetools::server::{self, ServerSettings, ServerState};

mod app;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let routes = app::routes(&cfg)?;
    let listener = server::create_reusable_listener(addr)?;

    let state = Arc::new(ServerState::new(routes, ServerSettings::from(&cfg)));
    logger::log_server_start(&addr, &cfg);

    server::run(listener, state).await?;
    Ok(())
}

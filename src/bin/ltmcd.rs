//! Server entry point: a single executable with no subcommands. Reads
//! stdin, writes stdout, logs to stderr. Exit code 0 on clean shutdown;
//! non-zero on startup failure (§6).

use ltmc::{Config, LtmcEngine};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let engine = match LtmcEngine::start(config).await {
        Ok(e) => e,
        Err(e) => {
            log::error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    #[cfg(feature = "http")]
    {
        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            let engine_for_http = std::sync::Arc::new(engine);
            let http_engine = engine_for_http.clone();
            let http_handle = tokio::spawn(async move {
                if let Err(e) = ltmc::ltmc::http::serve(&addr, http_engine).await {
                    log::error!("http surface exited: {e}");
                }
            });
            if let Err(e) = engine_for_http.run_stdio().await {
                log::error!("stdio loop exited: {e}");
                std::process::exit(1);
            }
            http_handle.abort();
            return;
        }
    }

    if let Err(e) = engine.run_stdio().await {
        log::error!("stdio loop exited: {e}");
        std::process::exit(1);
    }
}

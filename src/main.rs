use pod_monitor::{api, config::Configuration, logging};

#[tokio::main]
async fn main() {
    let config = match Configuration::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = logging::init_logger(&config.log) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = api::start_server(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

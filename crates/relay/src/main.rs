use relay::{RelayConfig, RelayState};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid relay configuration");
            std::process::exit(2);
        }
    };

    let state = RelayState::from_config(&config);
    let routes = relay::routes(state);

    let (ip, port) = config.bind_address();
    tracing::info!(
        host = %std::net::Ipv4Addr::from(ip),
        port,
        listing_enabled = config.teacher_password.is_some(),
        "relay listening"
    );
    warp::serve(routes).run((ip, port)).await;
}

#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use critical_path::{AnalysisConfig, Schedule, http_api, logging};

    logging::init_tracing();

    let addr: SocketAddr = std::env::var("CRITICAL_PATH_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let config = AnalysisConfig::from_env()?;
    println!("critical-path HTTP API listening on http://{addr}");
    let schedule = Schedule::new().with_config(config);
    http_api::serve(addr, schedule).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}

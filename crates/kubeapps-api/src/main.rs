use kubeapps_api::setup;
use kubeapps_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let app = setup::initialize_app(&config).await?;

    setup::server::start_server(&config, app.router, app.consumer).await?;

    Ok(())
}

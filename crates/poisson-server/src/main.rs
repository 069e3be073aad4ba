use poisson::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let settings = Settings::load()?;
    tracing::info!(
        ldap_url = %settings.ldap_url,
        base_dn = %settings.ldap_base_dn,
        "starting poisson"
    );

    let directory = LdapDirectory::new(settings.directory_config());
    if directory.ping().await.is_err() {
        // Not fatal: each request opens its own connection.
        tracing::warn!("directory not reachable at startup");
    }

    let server = PoissonServerBuilder::new()
        .bind(&settings.listen_addr)
        .session_config(settings.session_config())
        .request_timeout(settings.request_timeout())
        .build(directory)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await?;
    Ok(())
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = fmt::layer().compact();
    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

use actix_web::{web, App, HttpServer};
use clap::Parser;

use server::config::Config;
use server::connection::ConnectionIdSource;
use server::handlers::root;
use server::server::spawn_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    config.validate()?;

    let bind = config.bind;
    let srv_tx = spawn_server(config.clone());
    let ids = web::Data::new(ConnectionIdSource::default());
    let config = web::Data::new(config);

    log::info!("Relay listening on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(srv_tx.clone()))
            .app_data(ids.clone())
            .app_data(config.clone())
            .configure(root)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

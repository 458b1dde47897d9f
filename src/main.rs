use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use mongodb::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use opensplit::config::Config;
use opensplit::routes;
use opensplit::store::GroupStore;

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header(),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env().map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(database = %config.database, "connecting to MongoDB");
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let store = web::Data::new(GroupStore::new(&client, &config.database));
    tracing::info!(bind_addr = %config.bind_addr, "connected, starting server");

    let allowed_origin = config.allowed_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(allowed_origin.as_deref()))
            .app_data(store.clone())
            .configure(routes::configure)
    })
    .bind(config.bind_addr)?
    .run()
    .await
}

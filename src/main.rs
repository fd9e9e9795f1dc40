use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenv::dotenv;
use log::info;

use storefront::catalog::CatalogService;
use storefront::config::AppConfig;
use storefront::db::connection::build_pool;
use storefront::handlers;
use storefront::uploads::FileStore;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().expect("Failed to load configuration");
    let pool = build_pool(&config.database).expect("Failed to create pool");
    {
        let mut conn = pool.get().expect("Failed to get connection from pool");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations");
    }

    let store = FileStore::open(
        &config.uploads.dir,
        config.uploads.max_file_bytes,
        config.uploads.max_gallery_files,
    )
    .expect("Failed to prepare upload directory");

    let catalog = web::Data::new(CatalogService::new(pool, store));
    let uploads_dir = config.uploads.dir.clone();
    let cors_origin = config.server.cors_origin.clone();
    let bind = (config.server.host.clone(), config.server.port);

    info!("Starting HTTP server on http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        let cors = if cors_origin == "*" {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        } else {
            Cors::default()
                .allowed_origin(&cors_origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600)
        };

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(catalog.clone())
            .service(Files::new("/uploads", &uploads_dir))
            .configure(handlers::routes)
    })
    .bind(bind)?
    .run()
    .await
}

use std::sync::Arc;

use actix_web::web::{self, Data, JsonConfig, PathConfig, QueryConfig};
use actix_web::{App, HttpResponse, HttpServer};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

pub mod cache;
pub mod campaign;
pub mod collection_point;
pub mod config;
pub mod datasource;
pub mod engagement;
pub mod error;
pub mod notification;
pub mod seed;
pub mod store;
pub mod typedid;
pub mod user;

use cache::{FileCache, LocalCache};
use config::{AppConfig, DataSourceKind};
use datasource::{DataSource, MemoryDataSource, MongoDataSource};
use error::Error;
use notification::{LocalScheduler, NotificationDispatcher, Outbox};
use seed::Fixtures;
use store::CampaignStore;

/// Registers the extractor error formats and every route. The app must also
/// provide `Data<dyn DataSource>`, `Data<CampaignStore>` and
/// `Data<LocalScheduler>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        // format json errors with custom format
        Error::InvalidJson(err).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        // format path errors with custom format
        Error::InvalidPath(err).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        // format query errors with custom format
        Error::InvalidQuery(err).into()
    }))
    .service(user::endpoints::login)
    .service(user::endpoints::quick_login)
    .service(campaign::endpoints::get_campaigns)
    .service(campaign::endpoints::set_campaign_filters)
    .service(campaign::endpoints::create_campaign)
    .service(campaign::endpoints::get_campaign_by_id)
    .service(campaign::endpoints::update_campaign)
    .service(campaign::endpoints::delete_campaign)
    .service(campaign::endpoints::add_campaign_update)
    .service(engagement::endpoints::create_engagement)
    .service(engagement::endpoints::get_user_engagements)
    .service(collection_point::endpoints::get_collection_points)
    .service(notification::endpoints::get_notifications)
    .service(notification::endpoints::mark_notification_as_read)
    .service(notification::endpoints::cancel_notification);
}

pub async fn path_does_not_exist() -> Result<HttpResponse, Error> {
    Err(Error::PathDoesNotExist)
}

async fn connect(config: &AppConfig) -> Result<Arc<dyn DataSource>, Error> {
    match config.data_source {
        DataSourceKind::Memory => {
            let fixtures = if config.seed {
                seed::fixtures()?
            } else {
                Fixtures::default()
            };
            info!("using the in-memory data source");

            Ok(Arc::new(
                MemoryDataSource::seeded(fixtures)
                    .with_latency(config.latency)
                    .with_failure_rate(config.failure_rate),
            ))
        }
        DataSourceKind::Mongo => {
            let db = MongoDataSource::connect(&config.mongo_uri, &config.mongo_database).await?;
            if config.seed {
                seed::seed(&db).await?;
            }

            Ok(Arc::new(db))
        }
    }
}

pub async fn run(config: AppConfig) -> Result<(), Error> {
    let db = connect(&config).await?;

    info!("caching to {}", config.cache_dir.display());
    let cache: Arc<dyn LocalCache> = Arc::new(FileCache::new(config.cache_dir.clone()));
    let outbox = Arc::new(Outbox::open(Arc::clone(&cache)).await);
    let scheduler = Arc::new(LocalScheduler::new(Arc::clone(&cache)));
    if let Err(err) = scheduler.rearm().await {
        warn!("failed to re-arm logged reminders: {}", err);
    }
    let store = Data::new(CampaignStore::new(
        Arc::clone(&db),
        Arc::clone(&cache),
        Arc::clone(&outbox),
    ));

    actix_web::rt::spawn(NotificationDispatcher::new(scheduler.clone()).run(outbox));

    let db = Data::from(db);
    let scheduler = Data::from(scheduler);

    info!("listening on {}", config.bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(store.clone())
            .app_data(scheduler.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
            .default_service(web::to(path_does_not_exist))
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    Ok(())
}

use crate::{
    api::{attendance, health, worker},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Malformed JSON or query strings get the same `{success, error, message}` body.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    extractor_config(cfg);

    // Public routes
    cfg.service(
        web::resource(format!("{}/login", config.api_prefix))
            .wrap(login_limiter.clone())
            .route(web::post().to(handlers::login)),
    )
    .service(
        web::resource(format!("{}/worker-login", config.api_prefix))
            .wrap(login_limiter)
            .route(web::post().to(handlers::worker_login)),
    )
    .service(
        web::resource(format!("{}/health", config.api_prefix)).route(web::get().to(health::health)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            // /check-in, /checkin
            .route("/check-in", web::post().to(attendance::check_in))
            .route("/checkin", web::post().to(attendance::check_in))
            // /check-out, /checkout
            .route("/check-out", web::post().to(attendance::check_out))
            .route("/checkout", web::post().to(attendance::check_out))
            .service(
                web::scope("/worker")
                    .route("/status", web::get().to(attendance::worker_status))
                    .route("/attendance", web::get().to(attendance::worker_attendance)),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .route("", web::get().to(attendance::list_attendance))
                    // /attendance/report
                    .route("/report", web::get().to(attendance::overview))
                    .route("/report/export", web::get().to(attendance::export_overview))
                    .route("/status/{id}", web::get().to(attendance::status_for))
                    .route("/worker/{id}", web::get().to(attendance::attendance_for_worker))
                    .route("/summary/{id}", web::get().to(attendance::summary))
                    .route("/detailed/{id}", web::get().to(attendance::detailed))
                    .route("/export/{id}", web::get().to(attendance::export)),
            )
            .service(
                web::scope("/workers")
                    // /workers
                    .service(
                        web::resource("")
                            .route(web::get().to(worker::list_workers))
                            .route(web::post().to(worker::create_worker)),
                    )
                    // /workers/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(worker::get_worker))
                            .route(web::put().to(worker::update_worker)),
                    ),
            ),
    );
}

//! Read-only HTTP API (spec.md §4.5, §6 "HTTP API") plus the static file
//! server for the device's local web UI.
//!
//! Grounded on the teacher's `ApiManager` (actix-web `App`/`HttpServer`
//! construction, utoipa `OpenApi` derive, `SwaggerUi` mount) generalized
//! from the teacher's MQTT/modbus config routes to the read-only snapshot,
//! history and static-file routes this spec names. The teacher serves its
//! `ui/` tree through `actix_files::Files`, which sniffs content type from
//! the OS mime database and falls back to `application/octet-stream`; §6's
//! explicit extension table is narrower, so the static handler here reads
//! files itself and dispatches content-type from the suffix by hand
//! instead of reusing `actix_files`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::HttpdConfig;
use crate::models::{BasicSnapshot, DemandPeak, LongTermEntry, ShortTermEntry};
use crate::predictor::alignment_index;
use crate::store::Store;

/// API version string returned by `/api/version` (spec.md §6).
const API_VERSION: &str = "1.0";
/// Firmware version string returned by `/api/system/info` (spec.md §6).
const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Root of the static file mount served at `/*` (spec.md §6).
const STATIC_ROOT: &str = "ui";

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    version: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SystemInfoResponse {
    version: String,
    cores: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct MeterDataResponse {
    #[serde(flatten)]
    basic: BasicSnapshot,
    max_demand_month: DemandPeak,
    predicted_peak: f64,
    predicted_peak_time: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct MeterDataHistoryResponse {
    max_demand_year: Vec<DemandPeak>,
    short_term_history: Vec<ShortTermEntry>,
    long_term_history: Vec<LongTermEntry>,
}

#[utoipa::path(get,
    path = "/api/version",
    summary = "API version string",
    responses((status = 200, description = "API version", body = VersionResponse)),
)]
async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(VersionResponse { version: API_VERSION.to_string() })
}

#[utoipa::path(get,
    path = "/api/system/info",
    summary = "Firmware version and CPU core count",
    responses((status = 200, description = "System info", body = SystemInfoResponse)),
)]
async fn get_system_info() -> impl Responder {
    HttpResponse::Ok().json(SystemInfoResponse {
        version: FIRMWARE_VERSION.to_string(),
        cores: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    })
}

#[utoipa::path(get,
    path = "/api/p1/data/basic",
    summary = "Basic snapshot fields",
    responses(
        (status = 200, description = "Basic snapshot"),
        (status = 500, description = "Lock acquisition timed out"),
    ),
)]
async fn get_basic(store: web::Data<Store>, w_max: web::Data<Duration>) -> impl Responder {
    match tokio::time::timeout(*w_max, store.get_snapshot_basic()).await {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(_) => {
            error!("get_basic: snapshot lock acquisition timed out");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(get,
    path = "/api/p1/data/complete",
    summary = "Full parsed telegram snapshot",
    responses(
        (status = 200, description = "Complete snapshot"),
        (status = 500, description = "Lock acquisition timed out"),
    ),
)]
async fn get_complete(store: web::Data<Store>, w_max: web::Data<Duration>) -> impl Responder {
    match tokio::time::timeout(*w_max, store.get_snapshot_complete()).await {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(_) => {
            error!("get_complete: snapshot lock acquisition timed out");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// `get_meter_data()` (spec.md §4.5): basic snapshot + `maxDemandMonth` +
/// the current predicted peak, taking both locks in order with a bounded
/// timeout (`W_max`); either acquisition timing out answers 5xx.
#[utoipa::path(get,
    path = "/api/meter-data",
    summary = "Basic snapshot, max demand this month, and predicted peak",
    responses(
        (status = 200, description = "Meter data", body = MeterDataResponse),
        (status = 500, description = "Lock acquisition timed out"),
    ),
)]
async fn get_meter_data(store: web::Data<Store>, w_max: web::Data<Duration>) -> impl Responder {
    let complete = match tokio::time::timeout(*w_max, store.get_snapshot_complete()).await {
        Ok(s) => s,
        Err(_) => {
            error!("get_meter_data: snapshot lock acquisition timed out");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let peak = match tokio::time::timeout(*w_max, store.get_predicted_peak()).await {
        Ok(p) => p,
        Err(_) => {
            error!("get_meter_data: predicted-peak lock acquisition timed out");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(MeterDataResponse {
        basic: BasicSnapshot::from(&complete),
        max_demand_month: complete.max_demand_month,
        predicted_peak: peak.value,
        predicted_peak_time: peak.end_of_quarter_timestamp,
    })
}

/// `get_meter_data_history()` (spec.md §4.5): `maxDemandYear` from the
/// snapshot, plus short- and long-term ring snapshots in chronological
/// order, the short-term one starting at the alignment index (§4.4 step 3).
#[utoipa::path(get,
    path = "/api/meter-data-history",
    summary = "Yearly max demand plus short- and long-term history logs",
    responses(
        (status = 200, description = "Meter data history", body = MeterDataHistoryResponse),
        (status = 500, description = "Lock acquisition timed out"),
    ),
)]
async fn get_meter_data_history(store: web::Data<Store>, w_max: web::Data<Duration>) -> impl Responder {
    let max_demand_year = match tokio::time::timeout(*w_max, store.get_snapshot_complete()).await {
        Ok(s) => s.max_demand_year,
        Err(_) => {
            error!("get_meter_data_history: snapshot lock acquisition timed out");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let short_term = match tokio::time::timeout(*w_max, store.snapshot_short_term(usize::MAX)).await {
        Ok(s) => s,
        Err(_) => {
            error!("get_meter_data_history: short-term log lock acquisition timed out");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let long_term = match tokio::time::timeout(*w_max, store.snapshot_long_term(usize::MAX)).await {
        Ok(l) => l,
        Err(_) => {
            error!("get_meter_data_history: long-term log lock acquisition timed out");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let k = if short_term.len() > 1 { alignment_index(&short_term) } else { 0 };

    HttpResponse::Ok().json(MeterDataHistoryResponse {
        max_demand_year,
        short_term_history: short_term[k..].to_vec(),
        long_term_history: long_term,
    })
}

/// Maps a file extension to the content-type table in spec.md §6; anything
/// else falls back to `text/plain`.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "json" => "application/json",
        "csv" => "text/csv",
        _ => "text/plain",
    }
}

/// Static file handler for `/*` (spec.md §6): `/` serves `index.html`,
/// unknown paths answer 404. Files are read in byte mode so binary assets
/// (png, ico) round-trip unmodified.
async fn serve_static(req: HttpRequest) -> impl Responder {
    let requested = req.match_info().query("tail");
    let relative = if requested.is_empty() { "index.html" } else { requested };

    let mut full_path = PathBuf::from(STATIC_ROOT);
    full_path.push(relative);

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => HttpResponse::Ok().content_type(content_type_for(&full_path)).body(bytes),
        Err(_) => HttpResponse::NotFound().finish(),
    }
}

#[derive(OpenApi)]
#[openapi(paths(
    get_version,
    get_system_info,
    get_basic,
    get_complete,
    get_meter_data,
    get_meter_data_history,
))]
struct ApiDoc;

/// Runs the HTTP server until it is shut down; binds `0.0.0.0:<config.port>`.
pub async fn run(store: Arc<Store>, config: HttpdConfig) -> std::io::Result<()> {
    if !config.enabled {
        error!("HTTP API cannot be disabled, ignoring config and starting anyway");
    }

    let w_max = Duration::from_millis(config.w_max_ms);
    let port = config.port;

    info!("HTTP API listening on 0.0.0.0:{port}");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::new(w_max))
            .route("/api/version", web::get().to(get_version))
            .route("/api/system/info", web::get().to(get_system_info))
            .route("/api/p1/data/basic", web::get().to(get_basic))
            .route("/api/p1/data/complete", web::get().to(get_complete))
            .route("/api/meter-data", web::get().to(get_meter_data))
            .route("/api/meter-data-history", web::get().to(get_meter_data_history))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api/openapi.json", ApiDoc::openapi()),
            )
            .route("/{tail:.*}", web::get().to(serve_static))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;

    fn test_app_config(
        cfg: &mut web::ServiceConfig,
        store: Arc<Store>,
    ) {
        cfg.app_data(web::Data::from(store))
            .app_data(web::Data::new(Duration::from_millis(50)))
            .route("/api/version", web::get().to(get_version))
            .route("/api/system/info", web::get().to(get_system_info))
            .route("/api/p1/data/basic", web::get().to(get_basic))
            .route("/api/meter-data", web::get().to(get_meter_data))
            .route("/api/meter-data-history", web::get().to(get_meter_data_history));
    }

    #[actix_rt::test]
    async fn version_endpoint_reports_api_version() {
        let store = Store::new();
        let app = actix_test::init_service(
            App::new().configure(|cfg| test_app_config(cfg, store.clone())),
        )
        .await;
        let req = actix_test::TestRequest::get().uri("/api/version").to_request();
        let resp: VersionResponse = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.version, API_VERSION);
    }

    #[actix_rt::test]
    async fn meter_data_reflects_committed_snapshot() {
        let store = Store::new();
        let mut snapshot = crate::models::TelegramSnapshot::default();
        snapshot.current_power_usage = 1.5;
        store.commit_snapshot(snapshot).await;

        let app = actix_test::init_service(
            App::new().configure(|cfg| test_app_config(cfg, store.clone())),
        )
        .await;
        let req = actix_test::TestRequest::get().uri("/api/meter-data").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn history_is_empty_right_after_startup() {
        let store = Store::new();
        let app = actix_test::init_service(
            App::new().configure(|cfg| test_app_config(cfg, store.clone())),
        )
        .await;
        let req = actix_test::TestRequest::get().uri("/api/meter-data-history").to_request();
        let resp: MeterDataHistoryResponse = actix_test::call_and_read_body_json(&app, req).await;
        assert!(resp.max_demand_year.is_empty());
        assert!(resp.short_term_history.is_empty());
        assert!(resp.long_term_history.is_empty());
    }

    #[test]
    fn content_type_falls_back_to_text_plain() {
        assert_eq!(content_type_for(Path::new("ui/index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("ui/app.js")), "application/javascript");
        assert_eq!(content_type_for(Path::new("ui/readme")), "text/plain");
    }
}

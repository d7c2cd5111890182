use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::figment::Figment;
use rocket::http::{ContentType, Header};
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Responder, Rocket, State};
use serde::Serialize;

use common::ServerConfig;

use crate::export::{self, ResultRow};
use crate::models::IssueDate;
use crate::pipeline::Pipeline;
use crate::views;

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            started_at: Utc::now(),
            pipeline,
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    today: String,
    site: String,
}

/// CSV attachment body plus its `Content-Disposition` header.
#[derive(Responder)]
pub struct CsvFile {
    inner: (ContentType, String),
    disposition: Header<'static>,
}

#[derive(Responder)]
pub enum CsvResponse {
    File(CsvFile),
    #[response(status = 400)]
    MissingQuery(&'static str),
    #[response(status = 500)]
    Failed(String),
}

/// Newsletter page. Defaults to today's issue; `?date=YYYY-MM-DD` picks another day.
#[get("/?<date>")]
async fn index(state: &State<AppState>, date: Option<String>) -> RawHtml<String> {
    let pipeline = &state.pipeline;

    let issue = match date.as_deref() {
        Some(raw) => raw
            .parse::<IssueDate>()
            .map_err(|e| format!("Invalid date '{}': {}", raw, e)),
        None => Ok(pipeline.today()),
    };

    let (date_key, outcome) = match issue {
        Ok(issue) => {
            let outcome = pipeline.newsletter_for(issue).await.map_err(|e| {
                tracing::error!(date = %issue, "newsletter failed: {}", e);
                e.to_string()
            });
            (Some(issue.key()), outcome)
        }
        Err(message) => (None, Err(message)),
    };

    RawHtml(views::newsletter_page(date_key.as_deref(), &outcome))
}

/// Keyword search over today's site results.
#[get("/search?<q>")]
async fn search(state: &State<AppState>, q: Option<String>) -> RawHtml<String> {
    let q = q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return RawHtml(views::search_page("", None));
    }

    let outcome = state
        .pipeline
        .search(q)
        .await
        .map(|results| results.iter().map(ResultRow::from).collect::<Vec<_>>())
        .map_err(|e| {
            tracing::error!(query = %q, "search failed: {}", e);
            e.to_string()
        });

    RawHtml(views::search_page(q, Some(&outcome)))
}

/// CSV export of the keyword search.
#[get("/download?<q>")]
async fn download_csv(state: &State<AppState>, q: Option<String>) -> CsvResponse {
    let q = q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return CsvResponse::MissingQuery("Missing ?q=...");
    }

    let results = match state.pipeline.search(q).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(query = %q, "csv export failed: {}", e);
            return CsvResponse::Failed(e.to_string());
        }
    };

    let rows: Vec<ResultRow> = results.iter().map(ResultRow::from).collect();
    let filename = export::export_filename(q, Utc::now());
    tracing::info!(query = %q, rows = rows.len(), filename = %filename, "csv export");

    CsvResponse::File(CsvFile {
        inner: (
            ContentType::new("text", "csv").with_params(("charset", "utf-8")),
            export::to_csv(q, &rows),
        ),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ),
    })
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and the current issue date.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let settings = state.pipeline.settings();

    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        today: state.pipeline.today().key(),
        site: settings.site.clone(),
    })
}

/// Rocket figment with `[server] bind/port` from the config file applied.
pub fn figment(server: &ServerConfig) -> Figment {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = server.port {
        fig = fig.merge(("port", port));
    }
    fig
}

pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![index, search, download_csv, health, status])
}

/// Launch Rocket - this will run until shutdown (SIGINT/SIGTERM etc.)
pub async fn launch_rocket(state: AppState, figment: Figment) -> Result<()> {
    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state, figment)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}

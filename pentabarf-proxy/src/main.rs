use std::{collections::HashMap, env, io, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use log::{debug, error, info};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock, task, time};

use pentabarf_parser::{parse_schedule, schedule_to_ics, DetailedEvent};

mod cli;

static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

type Cache = Arc<RwLock<HashMap<u16, Arc<Vec<DetailedEvent>>>>>;

#[derive(Clone)]
struct AppState {
    cache: Cache,
    args: Arc<cli::Args>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    setup_logging();

    let args = cli::parse(env::args().skip(1).collect());
    let address = args.address;

    let state = AppState {
        cache: Arc::new(RwLock::new(HashMap::new())),
        args: Arc::new(args),
    };

    let router = Router::new()
        .route("/schedule", get(handle_schedule))
        .fallback(|| async { Redirect::permanent(env!("CARGO_PKG_REPOSITORY")) })
        .with_state(state);

    let listener = TcpListener::bind(address).await?;
    info!("listening at http://{address}");
    axum::serve(listener, router).await
}

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "pentabarf_proxy=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

#[derive(Deserialize)]
struct ScheduleQuery {
    year: u16,
    #[serde(default)]
    json: bool,
}

async fn handle_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Response {
    let Some(events) = fetch_schedule(query.year, &state).await else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to proxy schedule").into_response();
    };

    if query.json {
        return Json(events.as_ref()).into_response();
    }

    (
        [("content-type", "text/calendar")],
        schedule_to_ics(format!("FOSDEM {}", query.year), &events).to_string(),
    )
        .into_response()
}

async fn fetch_schedule(year: u16, state: &AppState) -> Option<Arc<Vec<DetailedEvent>>> {
    if let Some(events) = state.cache.read().await.get(&year) {
        return Some(Arc::clone(events));
    }

    let url = format!("{}/{year}/schedule/xml", state.args.upstream);
    debug!("fetching {url}");

    let body = match CLIENT.get(&url).send().await {
        Ok(response) => match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                error!("reading {url}: {err}");
                return None;
            }
        },
        Err(err) => {
            error!("fetching {url}: {err}");
            return None;
        }
    };

    let parser = parse_schedule(body.as_ref(), state.args.timezone);
    let events = match parser.collect::<Result<Vec<_>, _>>() {
        Ok(events) => Arc::new(events),
        Err(err) => {
            error!("parsing schedule for {year}: {err}");
            return None;
        }
    };

    info!("parsed {} events for {year}", events.len());

    state
        .cache
        .write()
        .await
        .insert(year, Arc::clone(&events));

    let cache = Arc::clone(&state.cache);
    let ttl = state.args.cache_ttl;
    task::spawn(async move {
        time::sleep(ttl).await;
        cache.write().await.remove(&year);
    });

    Some(events)
}

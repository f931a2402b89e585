// Ledger Query - Web Server
// Read-only report API over a GnuCash ledger with Axum

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use ledger_query::{
    init_tracing, AccountCandidate, CancelToken, Config, LedgerDb, LedgerError, ReportEngine,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    engine: Arc<ReportEngine<LedgerDb>>,
    query_timeout: Duration,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    candidates: Vec<AccountCandidate>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            candidates: Vec::new(),
        }
    }

    fn failed(err: &LedgerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            candidates: err.candidates().to_vec(),
        }
    }
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::Ambiguous { .. } => StatusCode::CONFLICT,
        LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LedgerError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        LedgerError::StoreFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Deserialize)]
struct AccountsParams {
    #[serde(rename = "type")]
    account_type: Option<String>,
}

#[derive(Deserialize)]
struct BalanceParams {
    account: String,
    date: Option<String>,
}

#[derive(Deserialize)]
struct TransactionsParams {
    account: String,
    start: Option<String>,
    end: Option<String>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct SpendingParams {
    start: Option<String>,
    end: Option<String>,
    parent: Option<String>,
}

#[derive(Deserialize)]
struct IncomeParams {
    months: Option<i64>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    limit: Option<i64>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// Run one report on the blocking pool. The token expires after the query
/// timeout and is cancelled if the client goes away first.
async fn run_report<F>(state: &AppState, report: &'static str, op: F) -> Response
where
    F: FnOnce(&ReportEngine<LedgerDb>, &CancelToken) -> ledger_query::Result<String>
        + Send
        + 'static,
{
    let cancel = CancelToken::with_timeout(state.query_timeout);
    let guard = cancel.drop_guard();
    let engine = Arc::clone(&state.engine);
    let task_cancel = cancel.clone();

    let joined = tokio::task::spawn_blocking(move || op(&engine, &task_cancel)).await;
    guard.disarm();

    match joined {
        Ok(Ok(text)) => (StatusCode::OK, Json(ApiResponse::ok(text))).into_response(),
        Ok(Err(e)) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!(report, error = %e, "report failed");
            } else {
                warn!(report, error = %e, "report rejected");
            }
            (status, Json(ApiResponse::<String>::failed(&e))).into_response()
        }
        Err(e) => {
            error!(report, error = %e, "report task aborted");
            let body = ApiResponse::<String> {
                success: false,
                data: None,
                error: Some("report task aborted".to_string()),
                candidates: Vec::new(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/accounts?type=
async fn get_accounts(State(state): State<AppState>, Query(params): Query<AccountsParams>) -> Response {
    run_report(&state, "accounts", move |engine, cancel| {
        engine.list_accounts(cancel, params.account_type.as_deref())
    })
    .await
}

/// GET /api/balance?account=&date=
async fn get_balance(State(state): State<AppState>, Query(params): Query<BalanceParams>) -> Response {
    run_report(&state, "balance", move |engine, cancel| {
        engine.balance(cancel, &params.account, params.date.as_deref())
    })
    .await
}

/// GET /api/transactions?account=&start=&end=&limit=
async fn get_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionsParams>,
) -> Response {
    run_report(&state, "transactions", move |engine, cancel| {
        engine.transactions(
            cancel,
            &params.account,
            params.start.as_deref(),
            params.end.as_deref(),
            params.limit.unwrap_or(0),
        )
    })
    .await
}

/// GET /api/spending?start=&end=&parent=
async fn get_spending(State(state): State<AppState>, Query(params): Query<SpendingParams>) -> Response {
    run_report(&state, "spending", move |engine, cancel| {
        engine.spending_by_category(
            cancel,
            params.start.as_deref(),
            params.end.as_deref(),
            params.parent.as_deref(),
        )
    })
    .await
}

/// GET /api/income-expenses?months=
async fn get_income_expenses(
    State(state): State<AppState>,
    Query(params): Query<IncomeParams>,
) -> Response {
    run_report(&state, "income-expenses", move |engine, cancel| {
        engine.income_vs_expenses(cancel, params.months.unwrap_or(0))
    })
    .await
}

/// GET /api/search?q=&limit=
async fn get_search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    run_report(&state, "search", move |engine, cancel| {
        engine.search(cancel, &params.q, params.limit.unwrap_or(0))
    })
    .await
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(get_accounts))
        .route("/balance", get(get_balance))
        .route("/transactions", get(get_transactions))
        .route("/spending", get(get_spending))
        .route("/income-expenses", get(get_income_expenses))
        .route("/search", get(get_search))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// Main Server
// ============================================================================

#[derive(Parser)]
#[command(name = "ledger-server", version, about = "HTTP report API over a GnuCash ledger")]
struct ServerArgs {
    /// GnuCash SQLite file (overrides LEDGER_FILE / GNUCASH_FILE)
    #[arg(long, value_name = "PATH")]
    ledger: Option<PathBuf>,

    /// JSON config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:3000
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Display currency code
    #[arg(long, value_name = "CODE")]
    currency: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = ServerArgs::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(ledger) = args.ledger {
        config.ledger_path = Some(ledger);
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(currency) = args.currency {
        config.currency = currency;
    }

    let path = config.ledger_path()?.to_path_buf();
    let db = LedgerDb::open(&path)
        .with_context(|| format!("opening ledger {}", path.display()))?;

    let state = AppState {
        engine: Arc::new(ReportEngine::new(db, config.report_options())),
        query_timeout: config.query_timeout(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, ledger = %path.display(), "server running");

    axum::serve(listener, router(state))
        .await
        .context("server stopped")?;
    Ok(())
}

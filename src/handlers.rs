use crate::auth::SessionStore;
use crate::classification::QualificationRules;
use crate::config::{Config, MAX_LEADS_LIMIT, MAX_TREND_DAYS};
use crate::dashboard::{self, ContentPage, LeadDetail, LeadsPage, OverviewPage};
use crate::errors::{ApiQuery, AppError, ResultExt};
use crate::funnel::FunnelStats;
use crate::gated_content_client::{GatedContentClient, LeadsQuery};
use crate::lead_filter::{LeadFilter, LeadFilterParams, SortDirection, SortKey, SortState};
use crate::models::LabeledValue;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the gated content edge function.
    pub client: GatedContentClient,
    /// Dashboard sessions.
    pub sessions: SessionStore,
    /// Thresholds for Pre-MQL / MQL classification.
    pub rules: QualificationRules,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let client = GatedContentClient::new(&config)?;
        let sessions =
            SessionStore::new(config.dashboard_password_sha256.clone(), config.session_ttl_secs);
        Ok(Self {
            config,
            client,
            sessions,
            rules: QualificationRules::default(),
        })
    }

    fn leads_limit(&self, requested: Option<u32>) -> Result<u32, AppError> {
        match requested {
            None => Ok(self.config.leads_limit),
            Some(limit) if limit == 0 || limit > MAX_LEADS_LIMIT => Err(AppError::BadRequest(
                format!("'limit' must be between 1 and {}", MAX_LEADS_LIMIT),
            )),
            Some(limit) => Ok(limit),
        }
    }
}

/// Health check endpoint.
///
/// Returns the service status and version. Does not call upstream.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "gated-content-analytics",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct OverviewParams {
    pub days: Option<u32>,
}

/// GET /api/v1/overview?days=
///
/// Metric cards, download trend, quality distribution, top content and personas.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<OverviewParams>,
) -> Result<Json<OverviewPage>, AppError> {
    let days = params.days.unwrap_or(state.config.trend_days);
    if days == 0 || days > MAX_TREND_DAYS {
        return Err(AppError::BadRequest(format!(
            "'days' must be between 1 and {}",
            MAX_TREND_DAYS
        )));
    }
    tracing::info!("GET /overview - days: {}", days);

    let page = dashboard::load_overview(&state.client, days)
        .await
        .context("Failed to load overview page")?;
    Ok(Json(page))
}

/// GET /api/v1/content
///
/// Per-asset performance table with totals.
pub async fn content(State(state): State<Arc<AppState>>) -> Result<Json<ContentPage>, AppError> {
    tracing::info!("GET /content");

    let page = dashboard::load_content(&state.client)
        .await
        .context("Failed to load content page")?;
    Ok(Json(page))
}

/// View options of the leads page, read next to [`LeadFilterParams`].
#[derive(Debug, Default, Deserialize)]
pub struct LeadsViewParams {
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    /// Restricts the funnel widget to one content asset.
    pub funnel_content: Option<String>,
}

fn sort_state(params: &LeadsViewParams) -> Result<SortState, AppError> {
    let mut state = SortState::default();
    if let Some(raw) = params.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        state.key = SortKey::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown sort column '{}'", raw)))?;
    }
    if let Some(raw) = params.dir.as_deref().filter(|s| !s.trim().is_empty()) {
        state.direction = SortDirection::parse(raw)
            .ok_or_else(|| AppError::BadRequest("'dir' must be 'asc' or 'desc'".to_string()))?;
    }
    Ok(state)
}

/// GET /api/v1/leads
///
/// Upstream `leads` call narrowed by tier, status and signal type, then filtered,
/// sorted and classified locally.
///
/// # Query
///
/// * filters - `tier`, `status`, `signal_type`, `content`, `persona`, `stage`, `q`, `from`, `to`
/// * view - `limit`, `sort`, `dir`, `funnel_content`
pub async fn leads(
    State(state): State<Arc<AppState>>,
    ApiQuery(filters): ApiQuery<LeadFilterParams>,
    ApiQuery(view): ApiQuery<LeadsViewParams>,
) -> Result<Json<LeadsPage>, AppError> {
    tracing::info!("GET /leads - filters: {:?}, view: {:?}", filters, view);

    let filter = LeadFilter::from_params(&filters).map_err(AppError::BadRequest)?;
    let sort = sort_state(&view)?;
    let query = LeadsQuery {
        limit: state.leads_limit(view.limit)?,
        tier: filters.tier.clone(),
        status: filters.status.clone(),
        signal_type: filters.signal_type.clone(),
    };
    let funnel_content = view
        .funnel_content
        .as_deref()
        .or(filters.content.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));

    let page = dashboard::load_leads(
        &state.client,
        &query,
        &filter,
        sort,
        funnel_content,
        &state.rules,
    )
    .await
    .context("Failed to load leads page")?;

    tracing::debug!("Leads page: {} of {} leads match", page.matching, page.fetched);
    Ok(Json(page))
}

/// GET /api/v1/leads/:id
///
/// Detail panel for one lead.
pub async fn lead_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LeadDetail>, AppError> {
    tracing::info!("GET /leads/{}", id);

    let detail = dashboard::load_lead_detail(&state.client, &id, MAX_LEADS_LIMIT, &state.rules)
        .await
        .with_context(|| format!("Failed to load lead {}", id))?;
    Ok(Json(detail))
}

#[derive(Debug, Default, Deserialize)]
pub struct FunnelParams {
    pub content: Option<String>,
    pub tier: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u32>,
}

/// GET /api/v1/funnel?content=&tier=&status=
///
/// Lead → Pre-MQL → MQL counts, optionally for one content asset.
pub async fn funnel(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<FunnelParams>,
) -> Result<Json<FunnelStats>, AppError> {
    tracing::info!("GET /funnel - params: {:?}", params);

    let query = LeadsQuery {
        limit: state.leads_limit(params.limit)?,
        tier: params.tier.clone(),
        status: params.status.clone(),
        signal_type: None,
    };
    let content = params
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));

    let stats = dashboard::load_funnel(&state.client, &query, content, &state.rules)
        .await
        .context("Failed to compute funnel")?;
    Ok(Json(stats))
}

/// GET /api/v1/signal-types
pub async fn signal_types() -> Json<Vec<LabeledValue>> {
    Json(dashboard::signal_type_options())
}

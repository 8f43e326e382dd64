//! # Solr Search UI
//!
//! Backend of a faceted search UI in front of an Apache Solr server. End users
//! search a core and drill down through facets; administrators decide per core
//! which facets are shown, how they are labelled and ordered, how results are
//! rendered and highlighted and which sort options are offered.
//!
//! ## Features
//!
//! - **Search**: Validated search form forwarded to Solr's select handler
//! - **Facet Normalization**: Solr's three facet shapes merged into one list in admin-defined order
//! - **Suggestions**: Autocomplete through each core's suggest handler
//! - **Core Administration**: Per-core labels, facets, sorting, result template and highlighting
//! - **Persistence**: Core settings kept in memory, optionally written through to Azure CosmosDB
//!
//! ## Architecture
//!
//! - [`SolrApi`]: HTTP client for the Solr API
//! - [`StorageService`]: Per-core settings store
//! - [`augment_solr_response`]: Facet normalization applied to every search response
//! - [`Config`]: Application configuration management
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use solr_search_ui::{create_router, AppState, Config, SolrApi, StorageService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = Arc::new(Config::from_env()?);
//!
//!     // Initialize services
//!     let solr = Arc::new(SolrApi::new(config.clone())?);
//!     let storage = Arc::new(StorageService::new(config.clone()).await?);
//!
//!     // Create router and start server
//!     let app = create_router(AppState { config, solr, storage });
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap},
    response::{Json, Redirect},
    routing::get,
    Form, Router,
};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod config;
mod error;
mod facets;
mod forms;
mod fragments;
mod settings;
mod solr;
mod storage;

pub use config::Config;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use facets::{
    augment_solr_response, facet_field_label, facet_field_uuid, normalize_facets,
    AugmentedResponse, FacetDescriptor,
};
pub use forms::{CoreForm, FormErrors, QueryForm, SolrQuery};
pub use settings::{
    Core, CoreSummary, FacetEntry, FacetKind, FacetSettings, ResultSettings, SettingsError,
    SortingSettings,
};
pub use solr::SolrApi;
pub use storage::StorageService;

/// Command-line arguments for the Solr Search UI application.
#[derive(Parser)]
#[command(name = "solr-search-ui")]
#[command(about = "Faceted search UI backend for Apache Solr")]
pub struct Args {
    /// Port number to run the HTTP server on
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Solr base URL, overriding SOLR_URL
    #[arg(long)]
    pub solr_url: Option<String>,
}

/// Application state containing all service instances and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Client for the Solr HTTP API
    pub solr: Arc<SolrApi>,
    /// Per-core settings store
    pub storage: Arc<StorageService>,
}

/// The search form as submitted, with its field errors.
#[derive(Serialize)]
pub struct SearchFormContext {
    data: QueryForm,
    errors: FormErrors,
}

/// Everything the search page needs to render.
#[derive(Serialize)]
pub struct IndexContext {
    search_form: SearchFormContext,
    /// Solr's response with `normalized_facets` added
    response: AugmentedResponse,
    /// `{}` or `{"message": ...}`
    error: Value,
    solr_query: Option<SolrQuery>,
    hue_core: Option<Core>,
    hue_cores: Vec<CoreSummary>,
    current_cores: String,
}

#[derive(Serialize)]
pub struct AdminContext {
    /// Solr's core admin STATUS response
    cores: Value,
    hue_cores: Vec<CoreSummary>,
}

/// Context shared by the per-core admin pages.
#[derive(Serialize)]
pub struct CoreContext {
    solr_core: Value,
    hue_core: Core,
    hue_cores: Vec<CoreSummary>,
}

#[derive(Serialize)]
pub struct TemplateContext {
    #[serde(flatten)]
    core: CoreContext,
    /// Documents of a sample query, to preview the result template with
    sample_data: Value,
}

/// HTML fragment returned to AJAX calls of the admin pages.
#[derive(Serialize)]
pub struct FragmentResponse {
    content: String,
}

/// Outcome of a suggest call: status 0 with Solr's response, or -1 with the
/// error text.
#[derive(Serialize)]
pub struct SuggestResponse {
    status: i32,
    message: Value,
}

/// Validates admin authentication from request headers.
///
/// Checks the X-Admin-Key header against the configured admin API key. An
/// empty configured key never matches.
fn validate_admin_auth(headers: &HeaderMap, config: &Config) -> bool {
    let expected = &config.application.admin_api_key;
    if expected.is_empty() {
        return false;
    }
    if let Some(auth_header) = headers.get("X-Admin-Key") {
        if let Ok(provided_key) = auth_header.to_str() {
            return provided_key == expected.as_str();
        }
    }
    false
}

/// Proof that the request carries a valid admin key.
///
/// Taking this extractor as a handler argument restricts the route to
/// administrators; other requests are answered with `401 Unauthorized`.
pub struct AdminAccess;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if validate_admin_auth(&parts.headers, &state.config) {
            debug!("🔐 Admin request authenticated for {}", parts.uri.path());
            Ok(AdminAccess)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

async fn core_summaries(state: &AppState) -> Vec<CoreSummary> {
    state.storage.all().await.iter().map(CoreSummary::from).collect()
}

async fn stored_core(state: &AppState, name: &str) -> ApiResult<Core> {
    state
        .storage
        .get(name)
        .await
        .ok_or_else(|| ApiError::CoreNotFound(name.to_string()))
}

async fn save_core(state: &AppState, core: Core) -> ApiResult<Core> {
    state.storage.save(core).await.map_err(ApiError::Storage)
}

async fn core_context(state: &AppState, name: &str) -> ApiResult<CoreContext> {
    let hue_core = stored_core(state, name).await?;
    let solr_core = state
        .solr
        .core(name)
        .await
        .map_err(ApiError::SearchEngine)?;

    Ok(CoreContext {
        solr_core,
        hue_core,
        hue_cores: core_summaries(state).await,
    })
}

fn error_message(err: &anyhow::Error) -> Value {
    json!({ "message": format!("{:#}", err) })
}

/// HTTP handler for the search page.
///
/// Registers every core Solr reports, then validates the search form and, when
/// it is valid and names one of those cores, runs the query against it. Solr
/// failures do not fail the request: they are reported in the `error` field of
/// the context.
///
/// # Query Parameters
/// - `cores`: Core to search (required to run a query)
/// - `query`: Search text (empty searches everything)
/// - `fq`: Filter queries separated by `|`
/// - `sort`: Solr sort clause (default: `score desc`)
/// - `rows`, `start`: Paging (default: 15 rows from 0)
/// - `facets`: `1` to request facets (default), `0` to skip them
///
/// # Example
/// ```text
/// GET /?cores=collection1&query=solr&fq=cat:book
/// ```
pub async fn index_handler(
    State(state): State<AppState>,
    Query(form): Query<QueryForm>,
) -> ApiResult<Json<IndexContext>> {
    let mut error = json!({});

    // Searchable cores: those Solr lists, or the stored ones without a listing.
    let available = match state.solr.cores().await {
        Ok(cores) => {
            let names = SolrApi::core_names(&cores);
            for name in &names {
                state
                    .storage
                    .get_or_create(name)
                    .await
                    .map_err(ApiError::Storage)?;
            }
            names
        }
        Err(e) => {
            warn!("⚠️ SEARCH PAGE: Could not list Solr cores: {:#}", e);
            error = error_message(&e);
            state.storage.all().await.into_iter().map(|core| core.name).collect()
        }
    };

    let mut errors = FormErrors::new();
    let mut solr_query = None;
    let mut hue_core = None;
    let mut response = AugmentedResponse::default();

    if !form.is_empty() {
        match form.validate_against(&available) {
            Ok(query) => {
                let core = state
                    .storage
                    .get_or_create(&query.core)
                    .await
                    .map_err(ApiError::Storage)?;

                let raw = match state.solr.query(&query, &core).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("⚠️ SEARCH PAGE: Query on '{}' failed: {:#}", query.core, e);
                        error = error_message(&e);
                        json!({})
                    }
                };
                response = augment_solr_response(raw, &core.facets);
                solr_query = Some(query);
                hue_core = Some(core);
            }
            Err(form_errors) => {
                debug!("Search form rejected: {:?}", form_errors);
                errors = form_errors;
            }
        }
    }

    let current_cores = form.cores.clone().unwrap_or_default();
    Ok(Json(IndexContext {
        search_form: SearchFormContext { data: form, errors },
        response,
        error,
        solr_query,
        hue_core,
        hue_cores: core_summaries(&state).await,
        current_cores,
    }))
}

/// HTTP handler for health checks.
///
/// # Example
/// ```text
/// GET /health
/// ```
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "service": "solr-search-ui"
    }))
}

/// HTTP handler listing the cores known to Solr next to the stored ones, so
/// administrators can cross check both.
pub async fn admin_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
) -> ApiResult<Json<AdminContext>> {
    let cores = state.solr.cores().await.map_err(ApiError::SearchEngine)?;

    Ok(Json(AdminContext {
        cores,
        hue_cores: core_summaries(&state).await,
    }))
}

pub async fn admin_core_properties_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<CoreContext>> {
    Ok(Json(core_context(&state, &core).await?))
}

/// Saves the label and enabled flag of a core, then redirects back to its
/// properties page.
///
/// # Returns
/// - `303 See Other`: Properties saved
/// - `422 Unprocessable Entity`: Field errors of the form
pub async fn admin_core_properties_update_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
    Form(form): Form<CoreForm>,
) -> ApiResult<Redirect> {
    let mut hue_core = stored_core(&state, &core).await?;
    let properties = form.validate().map_err(ApiError::Validation)?;

    hue_core.label = properties.label;
    hue_core.enabled = properties.enabled;
    let hue_core = save_core(&state, hue_core).await?;
    info!(
        "✅ ADMIN: Core '{}' is now labelled '{}' (enabled: {})",
        hue_core.name, hue_core.label, hue_core.enabled
    );

    Ok(Redirect::to(&format!("/admin/{}/properties", hue_core.name)))
}

/// Solr's view of the core, as an HTML fragment.
pub async fn admin_core_solr_properties_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<FragmentResponse>> {
    let hue_core = stored_core(&state, &core).await?;
    let solr_core = state.solr.core(&core).await.map_err(ApiError::SearchEngine)?;

    Ok(Json(FragmentResponse {
        content: fragments::render_core_properties(&solr_core, &hue_core)?,
    }))
}

/// The core's schema, as an HTML fragment.
pub async fn admin_core_schema_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<FragmentResponse>> {
    let hue_core = stored_core(&state, &core).await?;
    let schema = state.solr.schema(&core).await.map_err(ApiError::SearchEngine)?;

    Ok(Json(FragmentResponse {
        content: fragments::render_schema(&schema, &hue_core)?,
    }))
}

/// Result template page, with a few documents of the core to preview it on.
pub async fn admin_core_template_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<TemplateContext>> {
    let context = core_context(&state, &core).await?;
    let response = state
        .solr
        .query(&SolrQuery::sample(&core), &context.hue_core)
        .await
        .map_err(ApiError::SearchEngine)?;
    let sample_data = response
        .pointer("/response/docs")
        .cloned()
        .unwrap_or_else(|| json!([]));

    Ok(Json(TemplateContext {
        core: context,
        sample_data,
    }))
}

/// Applies posted result settings. Shared by the template and highlighting
/// pages, which edit different parts of the same settings.
pub async fn admin_core_result_update_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
    Form(data): Form<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut hue_core = stored_core(&state, &core).await?;
    hue_core.result.update_from_post(&data)?;
    save_core(&state, hue_core).await?;

    info!("✅ ADMIN: Updated result settings of core '{}'", core);
    Ok(Json(json!({})))
}

pub async fn admin_core_facets_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<CoreContext>> {
    Ok(Json(core_context(&state, &core).await?))
}

pub async fn admin_core_facets_update_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
    Form(data): Form<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut hue_core = stored_core(&state, &core).await?;
    hue_core.facets.update_from_post(&data)?;
    let hue_core = save_core(&state, hue_core).await?;

    info!(
        "✅ ADMIN: Core '{}' now shows {} facets",
        core,
        hue_core.facets.order.len()
    );
    Ok(Json(json!({})))
}

pub async fn admin_core_sorting_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<CoreContext>> {
    Ok(Json(core_context(&state, &core).await?))
}

pub async fn admin_core_sorting_update_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
    Form(data): Form<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut hue_core = stored_core(&state, &core).await?;
    hue_core.sorting.update_from_post(&data)?;
    save_core(&state, hue_core).await?;

    info!("✅ ADMIN: Updated sorting settings of core '{}'", core);
    Ok(Json(json!({})))
}

pub async fn admin_core_highlighting_handler(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(core): Path<String>,
) -> ApiResult<Json<CoreContext>> {
    Ok(Json(core_context(&state, &core).await?))
}

/// HTTP handler for autocomplete suggestions.
///
/// Solr failures are reported in the body with status -1 rather than as an
/// HTTP error, so the search box can ignore them.
///
/// # Example
/// ```text
/// GET /suggest/collection1/sol
/// ```
pub async fn suggest_handler(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<Json<SuggestResponse>> {
    let core = params.get("core").map(String::as_str).unwrap_or_default();
    let text = params.get("query").map(String::as_str).unwrap_or_default();

    let hue_core = stored_core(&state, core).await?;
    let query = SolrQuery::suggestion(core, text);

    let result = match state.solr.suggest(&query, &hue_core).await {
        Ok(response) => SuggestResponse {
            status: 0,
            message: response,
        },
        Err(e) => {
            warn!("⚠️ SUGGEST: '{}' on core '{}' failed: {:#}", text, core, e);
            SuggestResponse {
                status: -1,
                message: Value::String(format!("{:#}", e)),
            }
        }
    };
    Ok(Json(result))
}

/// Creates the main application router with all endpoints configured.
///
/// # Routes
///
/// ## Public Endpoints
/// - `GET /`: Search page
/// - `GET /health`: Health check
/// - `GET /suggest/:core` and `GET /suggest/:core/:query`: Autocomplete
///
/// ## Admin Endpoints (require X-Admin-Key header)
/// - `GET /admin`: Solr cores next to stored cores
/// - `GET|POST /admin/:core/properties`: Label and enabled flag
/// - `GET /admin/:core/properties/solr`: Solr core status fragment
/// - `GET /admin/:core/schema`: Schema fragment
/// - `GET|POST /admin/:core/template`: Result template
/// - `GET|POST /admin/:core/facets`: Facet settings
/// - `GET|POST /admin/:core/sorting`: Sorting settings
/// - `GET|POST /admin/:core/highlighting`: Highlighting settings
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/suggest/:core", get(suggest_handler))
        .route("/suggest/:core/:query", get(suggest_handler))
        .route("/admin", get(admin_handler))
        .route(
            "/admin/:core/properties",
            get(admin_core_properties_handler).post(admin_core_properties_update_handler),
        )
        .route(
            "/admin/:core/properties/solr",
            get(admin_core_solr_properties_handler),
        )
        .route("/admin/:core/schema", get(admin_core_schema_handler))
        .route(
            "/admin/:core/template",
            get(admin_core_template_handler).post(admin_core_result_update_handler),
        )
        .route(
            "/admin/:core/facets",
            get(admin_core_facets_handler).post(admin_core_facets_update_handler),
        )
        .route(
            "/admin/:core/sorting",
            get(admin_core_sorting_handler).post(admin_core_sorting_update_handler),
        )
        .route(
            "/admin/:core/highlighting",
            get(admin_core_highlighting_handler).post(admin_core_result_update_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::create_test_config;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADMIN_KEY: &str = "test-admin-key";

    fn create_state(solr_url: &str) -> AppState {
        let config = Arc::new(create_test_config(solr_url));
        AppState {
            solr: Arc::new(SolrApi::new(config.clone()).unwrap()),
            storage: Arc::new(StorageService::in_memory()),
            config,
        }
    }

    async fn mount_cores(server: &MockServer, names: &[&str]) {
        let status: serde_json::Map<String, Value> = names
            .iter()
            .map(|name| (name.to_string(), json!({ "name": name })))
            .collect();
        Mock::given(method("GET"))
            .and(path("/solr/admin/cores"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
            .mount(server)
            .await;
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn admin_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-Admin-Key", ADMIN_KEY)
            .body(Body::empty())
            .unwrap()
    }

    fn admin_post(uri: &str, form: &[(&str, &str)]) -> Request<Body> {
        let body = form
            .iter()
            .map(|(k, v)| {
                let encoded: String = url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
                format!("{}={}", k, encoded)
            })
            .collect::<Vec<_>>()
            .join("&");
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("X-Admin-Key", ADMIN_KEY)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_validate_admin_auth() {
        let mut config = create_test_config("http://localhost:8983/solr/");
        let mut headers = HeaderMap::new();
        assert!(!validate_admin_auth(&headers, &config));

        headers.insert("X-Admin-Key", "wrong".parse().unwrap());
        assert!(!validate_admin_auth(&headers, &config));

        headers.insert("X-Admin-Key", ADMIN_KEY.parse().unwrap());
        assert!(validate_admin_auth(&headers, &config));

        config.application.admin_api_key = String::new();
        headers.insert("X-Admin-Key", "".parse().unwrap());
        assert!(!validate_admin_auth(&headers, &config));
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(create_state("http://localhost:8983/solr/"));
        let (status, body) = send(app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "solr-search-ui");
    }

    #[tokio::test]
    async fn test_index_without_form_registers_cores() {
        let server = MockServer::start().await;
        mount_cores(&server, &["books", "articles"]).await;
        let state = create_state(&format!("{}/solr/", server.uri()));
        let app = create_router(state.clone());

        let (status, body) = send(app, get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], json!({}));
        assert_eq!(body["response"], json!({ "normalized_facets": [] }));
        assert!(body["solr_query"].is_null());
        assert_eq!(body["current_cores"], "");
        assert!(body["search_form"]["errors"].as_object().unwrap().is_empty());

        let names: Vec<&str> = body["hue_cores"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["articles", "books"]);
        assert!(state.storage.get("books").await.is_some());
    }

    #[tokio::test]
    async fn test_index_runs_query_and_normalizes_facets() {
        let server = MockServer::start().await;
        mount_cores(&server, &["books"]).await;
        Mock::given(method("GET"))
            .and(path("/solr/books/select"))
            .and(query_param("q", "rust"))
            .and(query_param("facet.field", "color"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 1, "start": 0, "docs": [{"id": "1"}]},
                "facet_counts": {
                    "facet_fields": {"color": ["red", 3, "blue", 1]},
                    "facet_ranges": {},
                    "facet_dates": {}
                }
            })))
            .mount(&server)
            .await;

        let state = create_state(&format!("{}/solr/", server.uri()));
        let mut core = state.storage.get_or_create("books").await.unwrap();
        core.facets.fields = vec![FacetEntry {
            uuid: "c1".to_string(),
            field: "color".to_string(),
            label: "Colour".to_string(),
            start: None,
            end: None,
            gap: None,
        }];
        core.facets.order = vec!["c1".to_string()];
        state.storage.save(core).await.unwrap();

        let app = create_router(state);
        let (status, body) = send(app, get_request("/?cores=books&query=rust")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], json!({}));
        assert_eq!(body["solr_query"]["rows"], 15);
        assert_eq!(body["solr_query"]["sort"], "score desc");
        assert_eq!(body["hue_core"]["name"], "books");
        assert_eq!(body["current_cores"], "books");
        assert_eq!(body["response"]["response"]["numFound"], 1);
        assert_eq!(
            body["response"]["normalized_facets"],
            json!([{
                "field": "color",
                "type": "field",
                "label": "Colour",
                "counts": ["red", 3, "blue", 1]
            }])
        );
    }

    #[tokio::test]
    async fn test_index_reports_solr_failures() {
        let server = MockServer::start().await;
        mount_cores(&server, &["books"]).await;
        Mock::given(method("GET"))
            .and(path("/solr/books/select"))
            .respond_with(ResponseTemplate::new(500).set_body_string("undefined field"))
            .mount(&server)
            .await;

        let app = create_router(create_state(&format!("{}/solr/", server.uri())));
        let (status, body) = send(app, get_request("/?cores=books&query=title:x")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("undefined field"));
        assert_eq!(body["response"]["normalized_facets"], json!([]));
    }

    #[tokio::test]
    async fn test_index_renders_when_solr_is_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/admin/cores"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let app = create_router(create_state(&format!("{}/solr/", server.uri())));
        let (status, body) = send(app, get_request("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["error"]["message"].as_str().unwrap().contains("503"));
        assert!(body["hue_cores"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_returns_form_errors() {
        let server = MockServer::start().await;
        mount_cores(&server, &[]).await;

        let app = create_router(create_state(&format!("{}/solr/", server.uri())));
        let (status, body) = send(app, get_request("/?query=rust&rows=many")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["search_form"]["errors"]["cores"].is_array());
        assert!(body["search_form"]["errors"]["rows"].is_array());
        assert_eq!(body["search_form"]["data"]["query"], "rust");
        assert!(body["hue_core"].is_null());
    }

    #[tokio::test]
    async fn test_index_rejects_cores_solr_does_not_list() {
        let server = MockServer::start().await;
        mount_cores(&server, &["books"]).await;
        Mock::given(method("GET"))
            .and(path("/solr/books/select"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": {"docs": []}})),
            )
            .expect(0)
            .mount(&server)
            .await;

        let state = create_state(&format!("{}/solr/", server.uri()));
        for i in 0..3 {
            let uri = format!("/?cores=bogus{}", i);
            let (status, body) = send(create_router(state.clone()), get_request(&uri)).await;

            assert_eq!(status, StatusCode::OK);
            assert!(body["search_form"]["errors"]["cores"][0]
                .as_str()
                .unwrap()
                .contains(&format!("bogus{}", i)));
            assert!(body["solr_query"].is_null());
            assert!(body["hue_core"].is_null());
        }

        let names: Vec<String> = state.storage.all().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["books"]);
    }

    #[tokio::test]
    async fn test_index_without_listing_only_searches_stored_cores() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/admin/cores"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let state = create_state(&format!("{}/solr/", server.uri()));
        let (status, body) =
            send(create_router(state.clone()), get_request("/?cores=unknown")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["search_form"]["errors"]["cores"].is_array());
        assert!(body["error"]["message"].as_str().unwrap().contains("503"));
        assert!(state.storage.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_requires_key() {
        let app = create_router(create_state("http://localhost:8983/solr/"));
        let (status, body) = send(app, get_request("/admin")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_admin_lists_cores() {
        let server = MockServer::start().await;
        mount_cores(&server, &["books"]).await;
        let state = create_state(&format!("{}/solr/", server.uri()));
        state.storage.get_or_create("legacy").await.unwrap();

        let (status, body) = send(create_router(state), admin_get("/admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["cores"]["status"]["books"].is_object());
        assert_eq!(body["hue_cores"][0]["name"], "legacy");
    }

    #[tokio::test]
    async fn test_admin_unknown_core_is_not_found() {
        let app = create_router(create_state("http://localhost:8983/solr/"));
        let (status, body) = send(app, admin_get("/admin/missing/facets")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Core not found");
    }

    #[tokio::test]
    async fn test_facets_post_saves_settings() {
        let state = create_state("http://localhost:8983/solr/");
        state.storage.get_or_create("books").await.unwrap();

        let request = admin_post(
            "/admin/books/facets",
            &[
                ("fields", r#"[{"uuid": "c1", "field": "color", "label": "Colour"}]"#),
                ("order", r#"["c1"]"#),
                ("properties", r#"{"is_enabled": true, "limit": 5}"#),
            ],
        );
        let (status, body) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let core = state.storage.get("books").await.unwrap();
        assert_eq!(core.facets.order, vec!["c1"]);
        assert_eq!(core.facets.fields[0].label, "Colour");
        assert_eq!(core.facets.properties.limit, 5);
        assert_eq!(core.facets.properties.mincount, 1);
    }

    #[tokio::test]
    async fn test_malformed_settings_are_rejected() {
        let state = create_state("http://localhost:8983/solr/");
        state.storage.get_or_create("books").await.unwrap();

        let request = admin_post(
            "/admin/books/sorting",
            &[("properties", r#"{"is_enabled": true}"#), ("fields", "[oops")],
        );
        let (status, body) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("fields"));

        let core = state.storage.get("books").await.unwrap();
        assert!(!core.sorting.properties.is_enabled);
    }

    #[tokio::test]
    async fn test_highlighting_and_template_share_result_settings() {
        let state = create_state("http://localhost:8983/solr/");
        state.storage.get_or_create("books").await.unwrap();

        let request = admin_post(
            "/admin/books/highlighting",
            &[
                ("highlighting", r#"["title", "body"]"#),
                ("properties", r#"{"highlighting_enabled": true}"#),
            ],
        );
        let (status, _) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let request = admin_post("/admin/books/template", &[("template", "<h2>{{title}}</h2>")]);
        let (status, _) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let core = state.storage.get("books").await.unwrap();
        assert_eq!(core.result.template, "<h2>{{title}}</h2>");
        assert!(core.result.highlighting_active());
    }

    #[tokio::test]
    async fn test_properties_post_redirects_or_rejects() {
        let state = create_state("http://localhost:8983/solr/");
        state.storage.get_or_create("books").await.unwrap();

        let request = admin_post(
            "/admin/books/properties",
            &[("label", "Library"), ("enabled", "on")],
        );
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/admin/books/properties"
        );
        let core = state.storage.get("books").await.unwrap();
        assert_eq!(core.label, "Library");
        assert!(core.enabled);

        let request = admin_post("/admin/books/properties", &[("label", "")]);
        let (status, body) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["label"].is_array());
        assert_eq!(state.storage.get("books").await.unwrap().label, "Library");
    }

    #[tokio::test]
    async fn test_template_page_samples_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/admin/cores"))
            .and(query_param("core", "books"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": {"books": {"name": "books"}}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/books/select"))
            .and(query_param("rows", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 2, "docs": [{"id": "1"}, {"id": "2"}]}
            })))
            .mount(&server)
            .await;

        let state = create_state(&format!("{}/solr/", server.uri()));
        state.storage.get_or_create("books").await.unwrap();

        let (status, body) =
            send(create_router(state), admin_get("/admin/books/template")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sample_data"], json!([{"id": "1"}, {"id": "2"}]));
        assert_eq!(body["hue_core"]["name"], "books");
        assert_eq!(body["solr_core"]["status"]["books"]["name"], "books");
    }

    #[tokio::test]
    async fn test_fragments_are_wrapped_in_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/books/admin/file"))
            .and(query_param("file", "schema.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<schema name=\"books\"/>"))
            .mount(&server)
            .await;

        let state = create_state(&format!("{}/solr/", server.uri()));
        state.storage.get_or_create("books").await.unwrap();

        let (status, body) = send(create_router(state), admin_get("/admin/books/schema")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["content"]
            .as_str()
            .unwrap()
            .contains("&lt;schema name="));
    }

    #[tokio::test]
    async fn test_suggest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/books/suggest"))
            .and(query_param("q", "sol"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spellcheck": {"suggestions": ["sol", {"suggestion": ["solr"]}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/books/suggest"))
            .and(query_param("q", ""))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let state = create_state(&format!("{}/solr/", server.uri()));
        state.storage.get_or_create("books").await.unwrap();

        let (status, body) =
            send(create_router(state.clone()), get_request("/suggest/books/sol")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 0);
        assert!(body["message"]["spellcheck"].is_object());

        let (status, body) =
            send(create_router(state.clone()), get_request("/suggest/books")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], -1);
        assert!(body["message"].as_str().unwrap().contains("500"));

        let (status, _) = send(create_router(state), get_request("/suggest/missing/sol")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use taskhub_api::database::manager::DatabaseManager;
use taskhub_api::{config, handlers, middleware};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting TaskHub API in {:?} mode", config.environment);

    // Apply schema migrations when the database is reachable; otherwise the
    // server still boots and /health reports degraded.
    if let Err(e) = DatabaseManager::migrate().await {
        tracing::warn!("Migrations not applied, database unavailable: {}", e);
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("TASKHUB_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 TaskHub API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes (token acquisition)
        .merge(auth_public_routes())
        // Protected API
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    use axum::routing::post;
    use handlers::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
}

fn api_routes() -> Router {
    use axum::routing::put;
    use handlers::{auth, projects, reports, tasks, users};

    Router::new()
        // Profile self-service
        .route(
            "/api/auth/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        // User directory
        .route("/api/users", get(users::list))
        .route("/api/users/:id", get(users::get))
        // Projects
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:id",
            get(projects::get)
                .put(projects::update)
                .delete(projects::remove),
        )
        .route("/api/projects/:id/tasks", get(projects::tasks))
        .route("/api/projects/:id/stats", get(projects::stats))
        // Tasks (literal segments registered before :id)
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/dashboard-data", get(tasks::dashboard))
        .route("/api/tasks/user-dashboard-data", get(tasks::user_dashboard))
        .route(
            "/api/tasks/:id",
            get(tasks::get).put(tasks::update).delete(tasks::remove),
        )
        .route("/api/tasks/:id/status", put(tasks::update_status))
        .route("/api/tasks/:id/todo", put(tasks::update_checklist))
        // Reports
        .route("/api/reports/export/tasks", get(reports::export_tasks))
        .route("/api/reports/export/user", get(reports::export_user_tasks))
        // Every route above requires a valid bearer token
        .route_layer(axum::middleware::from_fn(middleware::auth::auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "TaskHub API",
            "version": version,
            "description": "Task and project management API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/api/auth/register, /api/auth/login (public - token acquisition)",
                "profile": "/api/auth/profile (protected)",
                "users": "/api/users[/:id] (protected)",
                "projects": "/api/projects[/:id[/tasks|/stats]] (protected)",
                "tasks": "/api/tasks[/:id[/status|/todo]] (protected)",
                "dashboards": "/api/tasks/dashboard-data, /api/tasks/user-dashboard-data (protected)",
                "reports": "/api/reports/export/{tasks,user} (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;

// Fotos de celular passam fácil do limite padrão de 2 MB
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não deve iniciar.
    let settings = Settings::from_env().expect("Falha ao carregar a configuração.");

    let app_state = AppState::new(settings)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let department_routes = Router::new()
        .route("/"
               ,post(handlers::departments::create_department)
               .get(handlers::departments::list_departments)
        )
        .route("/{id}", get(handlers::departments::get_department))
        .route("/{id}/float"
               ,get(handlers::departments::get_float)
               .put(handlers::departments::update_float)
        )
        .route("/{id}/staff"
               ,post(handlers::departments::register_staff)
               .get(handlers::departments::list_staff)
        )
        .route("/{id}/receipts", get(handlers::receipts::list_department_receipts))
        .route("/{id}/batches", get(handlers::batches::list_department_batches))
        .route("/{id}/batches/pending-hod", get(handlers::batches::list_pending_hod))
        .route("/{id}/activity", get(handlers::activity::list_department_activity));

    let receipt_routes = Router::new()
        .route("/", post(handlers::receipts::create_receipt))
        .route("/upload"
               ,post(handlers::receipts::upload_receipt)
               .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        )
        .route("/{id}"
               ,get(handlers::receipts::get_receipt)
               .patch(handlers::receipts::update_receipt)
        )
        .route("/{id}/approve", post(handlers::receipts::approve_receipt))
        .route("/{id}/reject", post(handlers::receipts::reject_receipt));

    let batch_routes = Router::new()
        .route("/", post(handlers::batches::create_batch))
        .route("/pending-finance", get(handlers::batches::list_pending_finance))
        .route("/{id}", get(handlers::batches::get_batch))
        .route("/{id}/receipts", get(handlers::receipts::list_batch_receipts))
        .route("/{id}/hod-approve", post(handlers::batches::hod_approve_batch))
        .route("/{id}/finance-approve", post(handlers::batches::finance_approve_batch))
        .route("/{id}/reject", post(handlers::batches::reject_batch))
        .route("/{id}/cancel", post(handlers::batches::cancel_batch))
        .route("/{id}/gl-coding", get(handlers::analytics::batch_gl_coding));

    let analytics_routes = Router::new()
        .route("/categories", get(handlers::analytics::spend_by_category))
        .route("/monthly", get(handlers::analytics::monthly_trend))
        .route("/departments", get(handlers::analytics::spend_by_department))
        .route("/flags", get(handlers::analytics::flag_summary));

    let bind_addr = app_state.settings.bind_addr.clone();
    let local_files = app_state
        .settings
        .storage
        .local_mount()
        .map(|(path, root)| (path, ServeDir::new(root)));

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/departments", department_routes)
        .nest("/api/receipts", receipt_routes)
        .nest("/api/batches", batch_routes)
        .nest("/api/analytics", analytics_routes)
        .route("/api/staff/{id}/receipts", get(handlers::receipts::list_staff_receipts))
        .route("/api/activity/{entity_type}/{id}", get(handlers::activity::list_entity_activity))
        .with_state(app_state);

    // Backend local: as URLs gravadas nos recibos apontam para cá
    if let Some((path, files)) = local_files {
        tracing::info!("📁 Imagens locais servidas em {}", path);
        app = app.nest_service(&path, files);
    }

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}

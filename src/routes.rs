// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::session_guard};

// Fotos de celular passam fácil do limite padrão de 2 MB
const IMAGE_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout));

    let customer_routes = Router::new()
        .route(
            "/",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        );

    let note_routes = Router::new()
        .route(
            "/",
            get(handlers::notes::list_notes).post(handlers::notes::create_note),
        )
        .route(
            "/importar-imagem",
            post(handlers::notes::import_image).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route(
            "/extrair-imagem",
            post(handlers::notes::extract_image).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route(
            "/{id}",
            get(handlers::notes::get_note)
                .put(handlers::notes::update_note)
                .delete(handlers::notes::delete_note),
        )
        .route("/{id}/formulario", get(handlers::notes::get_note_form))
        .route("/{id}/marcar-como-paga", post(handlers::notes::mark_paid))
        .route("/{id}/pagamento-parcial", post(handlers::notes::register_partial_payment))
        .route("/{id}/cancelar", post(handlers::notes::cancel_note));

    let mask_routes = Router::new()
        .route("/telefone", get(handlers::masks::phone))
        .route("/dinheiro", get(handlers::masks::money));

    // Tudo aqui exige sessão ativa
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .nest("/clientes", customer_routes)
        .nest("/promissorias", note_routes)
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .nest("/mascaras", mask_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            session_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        .with_state(app_state)
}

// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,

        // --- Clientes ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,

        // --- Promissórias ---
        handlers::notes::list_notes,
        handlers::notes::get_note,
        handlers::notes::get_note_form,
        handlers::notes::create_note,
        handlers::notes::update_note,
        handlers::notes::delete_note,
        handlers::notes::mark_paid,
        handlers::notes::register_partial_payment,
        handlers::notes::cancel_note,
        handlers::notes::import_image,
        handlers::notes::extract_image,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,

        // --- Máscaras ---
        handlers::masks::phone,
        handlers::masks::money,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::SessionUser,
            models::auth::LoginPayload,

            // --- Clientes ---
            models::customer::Address,
            models::customer::Customer,
            handlers::customers::CustomerPayload,

            // --- Promissórias ---
            models::note::CustomerRef,
            models::note::Note,
            models::note::Payment,
            models::note::NoteDetail,
            models::note::NoteFormPrefill,
            models::pagination::PageMeta,
            handlers::notes::NotePayload,
            handlers::notes::PartialPaymentPayload,
            handlers::notes::CancelPayload,
            handlers::notes::ImageForm,

            // --- Importação ---
            models::import::ExtractedData,
            models::import::CandidateCustomer,
            models::import::ImportOutcome,
            models::import::ExtractionPrefill,

            // --- Dashboard ---
            models::dashboard::PeriodKey,
            models::dashboard::Window,
            models::dashboard::Kpis,
            models::dashboard::SeriesPoint,
            models::dashboard::CustomerDebt,
            models::dashboard::DashboardView,

            // --- Máscaras ---
            handlers::masks::MaskResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Login e sessão do operador"),
        (name = "Clientes", description = "Cadastro de clientes"),
        (name = "Promissórias", description = "Cadastro, baixa, cancelamento e importação por foto"),
        (name = "Dashboard", description = "Indicadores e gráficos do período"),
        (name = "Máscaras", description = "Máscaras de telefone e dinheiro")
    )
)]
pub struct ApiDoc;

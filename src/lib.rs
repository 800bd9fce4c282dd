pub mod board;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod export;
pub mod ingest;
pub mod models;
pub mod view;

#[cfg(feature = "desktop")]
mod shell {
    use crate::board::BoardView;
    use crate::dashboard::Dashboard;
    use crate::models::{
        DashboardSettings, ExportResponse, FilterOptions, ImportReport, LeadFilters, LogoAsset, PipelineSummary,
        RemovalOutcome, Stage, StageChangeOutcome,
    };
    use std::path::Path;
    use std::sync::Arc;
    use tauri::Manager;
    use tracing_appender::non_blocking::WorkerGuard;

    static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

    #[derive(Clone)]
    struct AppState {
        dashboard: Arc<Dashboard>,
    }

    #[tauri::command]
    fn get_board(state: tauri::State<'_, AppState>) -> Result<BoardView, String> {
        state.dashboard.board().map_err(to_client_error)
    }

    #[tauri::command]
    fn get_filter_options(state: tauri::State<'_, AppState>) -> Result<FilterOptions, String> {
        state.dashboard.filter_options().map_err(to_client_error)
    }

    #[tauri::command]
    fn set_filters(state: tauri::State<'_, AppState>, filters: LeadFilters) -> Result<BoardView, String> {
        state.dashboard.set_filters(filters).map_err(to_client_error)
    }

    #[tauri::command]
    fn import_leads_csv(
        state: tauri::State<'_, AppState>,
        content_base64: String,
    ) -> Result<ImportReport, String> {
        state
            .dashboard
            .import_csv_base64(&content_base64)
            .map_err(to_client_error)
    }

    #[tauri::command]
    fn change_lead_stage(
        state: tauri::State<'_, AppState>,
        lead_id: i64,
        stage: Stage,
    ) -> Result<StageChangeOutcome, String> {
        state
            .dashboard
            .change_stage(lead_id, stage)
            .map_err(to_client_error)
    }

    #[tauri::command]
    fn clear_initial_leads(state: tauri::State<'_, AppState>) -> Result<RemovalOutcome, String> {
        state.dashboard.clear_initial_leads().map_err(to_client_error)
    }

    #[tauri::command]
    fn delete_lead(
        state: tauri::State<'_, AppState>,
        lead_id: i64,
        confirm: bool,
    ) -> Result<RemovalOutcome, String> {
        state
            .dashboard
            .delete_lead(lead_id, confirm)
            .map_err(to_client_error)
    }

    #[tauri::command]
    fn export_qualified(state: tauri::State<'_, AppState>) -> Result<ExportResponse, String> {
        state.dashboard.export_qualified().map_err(to_client_error)
    }

    #[tauri::command]
    fn get_summary(state: tauri::State<'_, AppState>) -> Result<PipelineSummary, String> {
        state.dashboard.summary().map_err(to_client_error)
    }

    #[tauri::command]
    fn get_settings(state: tauri::State<'_, AppState>) -> Result<DashboardSettings, String> {
        state.dashboard.settings().map_err(to_client_error)
    }

    #[tauri::command]
    fn update_settings(
        state: tauri::State<'_, AppState>,
        update: serde_json::Value,
    ) -> Result<DashboardSettings, String> {
        state.dashboard.update_settings(update).map_err(to_client_error)
    }

    #[tauri::command]
    fn get_logo(state: tauri::State<'_, AppState>) -> Result<Option<LogoAsset>, String> {
        state.dashboard.logo().map_err(to_client_error)
    }

    pub fn run() {
        tauri::Builder::default()
            .setup(|app| {
                let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
                std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
                init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

                let dashboard = Dashboard::new(app_data_dir).map_err(|error| error.to_string())?;
                app.manage(AppState {
                    dashboard: Arc::new(dashboard),
                });
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                get_board,
                get_filter_options,
                set_filters,
                import_leads_csv,
                change_lead_stage,
                clear_initial_leads,
                delete_lead,
                export_qualified,
                get_summary,
                get_settings,
                update_settings,
                get_logo
            ])
            .run(tauri::generate_context!())
            .expect("failed to run tauri app");
    }

    fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
        let log_dir = app_data_dir.join("logs");
        std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
        let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .json()
            .with_writer(non_blocking)
            .try_init()
            .map_err(|error| error.to_string())
    }

    fn to_client_error(error: impl std::fmt::Display) -> String {
        error.to_string()
    }
}

#[cfg(feature = "desktop")]
pub use shell::run;

use crate::board::{build_board, BoardView};
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::export::{leads_workbook, XLSX_MIME_TYPE};
use crate::ingest::parse_leads_csv;
use crate::models::{
    DashboardSettings, ExportResponse, FilterColumn, FilterOptions, ImportReport, Lead, LeadFilters, LogoAsset,
    PipelineSummary, RemovalOutcome, Stage, StageChangeOutcome,
};
use crate::view::LeadView;
use base64::Engine;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const DATABASE_FILE: &str = "leads.db";

/// Owns storage and the displayed view; every interaction runs to completion
/// under the view lock.
pub struct Dashboard {
    db: Database,
    view: Mutex<LeadView>,
    app_data_dir: PathBuf,
}

impl Dashboard {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Self> {
        let db = Database::new(&app_data_dir.join(DATABASE_FILE))?;
        tracing::info!(path = %db.path().display(), "lead store ready");

        let leads = db.list_leads(&LeadFilters::default())?;
        Ok(Self {
            db,
            view: Mutex::new(LeadView::new(LeadFilters::default(), leads)),
            app_data_dir,
        })
    }

    fn lock_view(&self) -> AppResult<MutexGuard<'_, LeadView>> {
        self.view
            .lock()
            .map_err(|_| AppError::Internal("view mutex poisoned".to_string()))
    }

    pub fn board(&self) -> AppResult<BoardView> {
        let view = self.lock_view()?;
        Ok(build_board(&view))
    }

    pub fn filter_options(&self) -> AppResult<FilterOptions> {
        Ok(FilterOptions {
            states: self.db.distinct_values(FilterColumn::State)?,
            crops: self.db.distinct_values(FilterColumn::Crop)?,
        })
    }

    pub fn set_filters(&self, filters: LeadFilters) -> AppResult<BoardView> {
        let mut view = self.lock_view()?;
        let leads = self.db.list_leads(&filters)?;
        view.replace(filters, leads);
        Ok(build_board(&view))
    }

    pub fn import_csv(&self, data: &[u8]) -> AppResult<ImportReport> {
        let leads = parse_leads_csv(data)?;
        let mut view = self.lock_view()?;
        let inserted = self.db.insert_leads(&leads)?;
        tracing::info!(inserted, "leads imported");

        let filters = view.filters().clone();
        let refreshed = self.db.list_leads(&filters)?;
        view.replace(filters, refreshed);
        Ok(ImportReport {
            inserted,
            imported_at: Utc::now(),
            board: build_board(&view),
        })
    }

    /// Upload as it crosses IPC: the file's raw bytes, base64-encoded.
    pub fn import_csv_base64(&self, content_base64: &str) -> AppResult<ImportReport> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(content_base64.trim())
            .map_err(|error| AppError::Csv(format!("upload is not valid base64: {}", error)))?;
        self.import_csv(&data)
    }

    pub fn change_stage(&self, lead_id: i64, stage: Stage) -> AppResult<StageChangeOutcome> {
        let mut view = self.lock_view()?;
        if view.stage_of(lead_id) == Some(stage) {
            return Ok(StageChangeOutcome {
                changed: false,
                board: build_board(&view),
            });
        }

        let changed = self.db.update_stage(lead_id, stage)?;
        if changed {
            tracing::info!(lead_id, stage = stage.as_str(), "lead stage changed");
        }
        view.apply_update(lead_id, stage);
        Ok(StageChangeOutcome {
            changed,
            board: build_board(&view),
        })
    }

    /// Deletes every lead still in the initial stage, including ones hidden by filters.
    pub fn clear_initial_leads(&self) -> AppResult<RemovalOutcome> {
        let mut view = self.lock_view()?;
        let removed = self.db.delete_leads_in_stage(Stage::INITIAL)?;
        view.apply_bulk_delete(|lead| lead.stage == Stage::INITIAL);
        tracing::info!(removed, "initial-stage leads cleared");
        Ok(RemovalOutcome {
            removed,
            board: build_board(&view),
        })
    }

    pub fn delete_lead(&self, lead_id: i64, confirm: bool) -> AppResult<RemovalOutcome> {
        if !confirm {
            return Err(AppError::Invalid(format!(
                "deleting lead {} requires confirmation",
                lead_id
            )));
        }
        let mut view = self.lock_view()?;
        if !self.db.delete_lead(lead_id)? {
            return Err(AppError::NotFound(format!("Lead {} not found", lead_id)));
        }
        view.apply_bulk_delete(|lead| lead.id == lead_id);
        tracing::info!(lead_id, "lead deleted");
        Ok(RemovalOutcome {
            removed: 1,
            board: build_board(&view),
        })
    }

    pub fn qualified_leads(&self) -> AppResult<Vec<Lead>> {
        let view = self.lock_view()?;
        Ok(view.in_stage(Stage::QUALIFIED).cloned().collect())
    }

    pub fn export_qualified(&self) -> AppResult<ExportResponse> {
        let leads = self.qualified_leads()?;
        if leads.is_empty() {
            return Err(AppError::Invalid("no qualified leads to export".to_string()));
        }
        let settings = self.db.get_settings()?;
        let bytes = leads_workbook(&leads)?;

        let export_dir = self.app_data_dir.join("exports");
        std::fs::create_dir_all(&export_dir).map_err(|error| AppError::Io(error.to_string()))?;
        let file_name = sanitize_file_name(&settings.export_file_name);
        let output_path = export_dir.join(&file_name);
        if !output_path.starts_with(&export_dir) {
            return Err(AppError::Io("Resolved export path escaped export directory".to_string()));
        }
        std::fs::write(&output_path, &bytes).map_err(|error| AppError::Io(error.to_string()))?;
        tracing::info!(rows = leads.len(), path = %output_path.display(), "qualified leads exported");

        Ok(ExportResponse {
            file_name,
            path: output_path.to_string_lossy().to_string(),
            mime_type: XLSX_MIME_TYPE.to_string(),
            row_count: leads.len(),
            content_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    pub fn summary(&self) -> AppResult<PipelineSummary> {
        let stages = self.db.stage_counts()?;
        Ok(PipelineSummary {
            total: stages.iter().map(|entry| entry.count).sum(),
            stages,
        })
    }

    pub fn settings(&self) -> AppResult<DashboardSettings> {
        self.db.get_settings()
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<DashboardSettings> {
        self.db.update_settings(update)
    }

    /// The configured logo, or `None` when unset or missing on disk.
    pub fn logo(&self) -> AppResult<Option<LogoAsset>> {
        let settings = self.db.get_settings()?;
        let Some(raw) = settings.logo_path.filter(|value| !value.trim().is_empty()) else {
            return Ok(None);
        };

        let configured = PathBuf::from(&raw);
        let path = if configured.is_absolute() {
            configured
        } else {
            self.app_data_dir.join(configured)
        };

        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(LogoAsset {
                mime_type: image_mime_type(&path).to_string(),
                data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            })),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "logo not found, omitting");
                Ok(None)
            }
            Err(error) => Err(AppError::Io(format!("{}: {}", path.display(), error))),
        }
    }
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn sanitize_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .take(120)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        DashboardSettings::default().export_file_name
    } else if cleaned.to_ascii_lowercase().ends_with(".xlsx") {
        cleaned
    } else {
        format!("{}.xlsx", cleaned)
    }
}

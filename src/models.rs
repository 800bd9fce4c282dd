use crate::board::BoardView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Leads,
    InProgress,
    QualifiedContact,
}

impl Stage {
    /// Board column order.
    pub const ALL: [Stage; 3] = [Stage::Leads, Stage::InProgress, Stage::QualifiedContact];
    pub const INITIAL: Stage = Stage::Leads;
    pub const QUALIFIED: Stage = Stage::QualifiedContact;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leads => "Leads",
            Self::InProgress => "InProgress",
            Self::QualifiedContact => "QualifiedContact",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Leads => "Leads",
            Self::InProgress => "In Progress",
            Self::QualifiedContact => "Qualified Contact",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == raw)
    }

    pub fn background_color(self) -> &'static str {
        match self {
            Self::Leads => "#FFF7CC",
            Self::InProgress => "#CCE5FF",
            Self::QualifiedContact => "#CCFFCC",
        }
    }

    pub fn border_color(self) -> &'static str {
        match self {
            Self::Leads => "#FFD700",
            Self::InProgress => "#3399FF",
            Self::QualifiedContact => "#33CC33",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub tax_id: String,
    pub name: String,
    pub state: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub social_handle: String,
    pub crop: String,
    pub stage: Stage,
}

/// One CSV row. Any `stage`/`etapa` column in the file is ignored; the
/// Portuguese aliases match the headers of the original lead sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewLead {
    #[serde(alias = "cnpj")]
    pub tax_id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "estado")]
    pub state: String,
    #[serde(alias = "cidade")]
    pub city: String,
    #[serde(alias = "telefone")]
    pub phone: String,
    pub email: String,
    #[serde(alias = "rede_social")]
    pub social_handle: String,
    #[serde(alias = "cultivo")]
    pub crop: String,
}

/// `None` means "all"; `Some("")` matches leads whose value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilters {
    pub state: Option<String>,
    pub crop: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterColumn {
    State,
    Crop,
}

impl FilterColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Crop => "crop",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub states: Vec<String>,
    pub crops: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub inserted: usize,
    pub imported_at: DateTime<Utc>,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChangeOutcome {
    pub changed: bool,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    pub removed: usize,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub file_name: String,
    pub path: String,
    pub mime_type: String,
    pub row_count: usize,
    pub content_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage: Stage,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total: usize,
    pub stages: Vec<StageCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub page_title: String,
    pub logo_path: Option<String>,
    pub export_file_name: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            page_title: "Agro MVP - Lead Management".to_string(),
            logo_path: None,
            export_file_name: "qualified_contacts.xlsx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoAsset {
    pub mime_type: String,
    pub data_base64: String,
}

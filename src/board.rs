use crate::models::{Lead, LeadFilters, Stage};
use crate::view::LeadView;
use serde::Serialize;

const CARD_TEXT_COLOR: &str = "#000000";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub filters: LeadFilters,
    pub total: usize,
    pub columns: Vec<BoardColumn>,
}

impl BoardView {
    pub fn column(&self, stage: Stage) -> Option<&BoardColumn> {
        self.columns.iter().find(|column| column.stage == stage)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: Stage,
    pub title: String,
    pub cards: Vec<LeadCard>,
    pub action: Option<ColumnAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnAction {
    ClearLeads { label: String },
    Export { label: String, enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStyle {
    pub background: &'static str,
    pub border: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOption {
    pub value: Stage,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCard {
    pub id: i64,
    pub stage: Stage,
    pub style: CardStyle,
    pub title: String,
    pub location: String,
    pub tax_id_line: String,
    pub crop_line: String,
    pub contact_line: String,
    pub stage_options: Vec<StageOption>,
}

pub fn build_board(view: &LeadView) -> BoardView {
    let columns = Stage::ALL
        .into_iter()
        .map(|stage| {
            let cards: Vec<LeadCard> = view.in_stage(stage).map(render_card).collect();
            let action = column_action(stage, cards.is_empty());
            BoardColumn {
                stage,
                title: stage.label().to_string(),
                cards,
                action,
            }
        })
        .collect();

    BoardView {
        filters: view.filters().clone(),
        total: view.leads().len(),
        columns,
    }
}

fn column_action(stage: Stage, empty: bool) -> Option<ColumnAction> {
    match stage {
        Stage::INITIAL if !empty => Some(ColumnAction::ClearLeads {
            label: "Clear Leads".to_string(),
        }),
        Stage::QUALIFIED if empty => Some(ColumnAction::Export {
            label: "Export (no leads)".to_string(),
            enabled: false,
        }),
        Stage::QUALIFIED => Some(ColumnAction::Export {
            label: "Export".to_string(),
            enabled: true,
        }),
        _ => None,
    }
}

pub fn render_card(lead: &Lead) -> LeadCard {
    LeadCard {
        id: lead.id,
        stage: lead.stage,
        style: CardStyle {
            background: lead.stage.background_color(),
            border: lead.stage.border_color(),
            text: CARD_TEXT_COLOR,
        },
        title: lead.name.clone(),
        location: format!("{} / {}", lead.city, lead.state),
        tax_id_line: format!("Tax ID: {}", lead.tax_id),
        crop_line: format!("Crop: {}", lead.crop),
        contact_line: format!("Contact: {} | {}", lead.phone, lead.email),
        stage_options: Stage::ALL
            .into_iter()
            .map(|stage| StageOption {
                value: stage,
                label: stage.label(),
                selected: stage == lead.stage,
            })
            .collect(),
    }
}

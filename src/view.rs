use crate::models::{Lead, LeadFilters, Stage};

/// In-memory copy of the rows the board is showing, patched in lockstep with
/// storage writes so a re-render does not need another query.
#[derive(Debug, Clone, Default)]
pub struct LeadView {
    filters: LeadFilters,
    leads: Vec<Lead>,
}

impl LeadView {
    pub fn new(filters: LeadFilters, leads: Vec<Lead>) -> Self {
        Self { filters, leads }
    }

    pub fn filters(&self) -> &LeadFilters {
        &self.filters
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn replace(&mut self, filters: LeadFilters, leads: Vec<Lead>) {
        self.filters = filters;
        self.leads = leads;
    }

    pub fn stage_of(&self, id: i64) -> Option<Stage> {
        self.leads.iter().find(|lead| lead.id == id).map(|lead| lead.stage)
    }

    /// Returns false when the lead is not part of the current view.
    pub fn apply_update(&mut self, id: i64, stage: Stage) -> bool {
        match self.leads.iter_mut().find(|lead| lead.id == id) {
            Some(lead) => {
                lead.stage = stage;
                true
            }
            None => false,
        }
    }

    pub fn apply_bulk_delete<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Lead) -> bool,
    {
        let before = self.leads.len();
        self.leads.retain(|lead| !predicate(lead));
        before - self.leads.len()
    }

    pub fn in_stage(&self, stage: Stage) -> impl Iterator<Item = &Lead> {
        self.leads.iter().filter(move |lead| lead.stage == stage)
    }
}

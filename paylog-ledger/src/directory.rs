//! Employee lookup behind the ledger.

use paylog_core::{EmployeeId, EmployeeProfile, Page, Paged};

use crate::error::LedgerResult;

/// Filter applied when listing the roster.
#[derive(Clone, Debug, Default)]
pub struct RosterFilter {
    pub search: Option<String>,
    pub department: Option<String>,
}

impl RosterFilter {
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// Source of employee identity for summaries and roster listings.
pub trait EmployeeDirectory: Send + Sync {
    /// Look up a single profile. `Ok(None)` means the id is unknown.
    fn profile(&self, id: &EmployeeId) -> LedgerResult<Option<EmployeeProfile>>;

    /// Page through profiles matching `filter`, ordered by employee id.
    fn roster(&self, filter: &RosterFilter, page: Page) -> LedgerResult<Paged<EmployeeProfile>>;
}

/// Directory backed by a fixed, in-memory profile list.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    profiles: Vec<EmployeeProfile>,
}

impl StaticDirectory {
    pub fn new(mut profiles: Vec<EmployeeProfile>) -> Self {
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles.dedup_by(|a, b| a.id == b.id);
        Self { profiles }
    }

    fn matches(profile: &EmployeeProfile, filter: &RosterFilter) -> bool {
        if let Some(term) = &filter.search {
            let term = term.to_lowercase();
            let hit = profile.display_name.to_lowercase().contains(&term)
                || profile.id.as_str().to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        if let Some(department) = &filter.department {
            match &profile.department {
                Some(have) if have.eq_ignore_ascii_case(department) => {}
                _ => return false,
            }
        }
        true
    }
}

impl EmployeeDirectory for StaticDirectory {
    fn profile(&self, id: &EmployeeId) -> LedgerResult<Option<EmployeeProfile>> {
        Ok(self.profiles.iter().find(|p| &p.id == id).cloned())
    }

    fn roster(&self, filter: &RosterFilter, page: Page) -> LedgerResult<Paged<EmployeeProfile>> {
        let matching: Vec<&EmployeeProfile> = self
            .profiles
            .iter()
            .filter(|p| Self::matches(p, filter))
            .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .cloned()
            .collect();
        Ok(Paged { items, page, total })
    }
}

use serde::{Deserialize, Serialize};

use crate::EmployeeId;

/// Employee identity data owned by the upstream directory.
///
/// The ledger joins against this read-only; it never stores or edits names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub id: EmployeeId,
    pub display_name: String,
    pub department: Option<String>,
}

impl EmployeeProfile {
    pub fn new(id: impl Into<EmployeeId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            department: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

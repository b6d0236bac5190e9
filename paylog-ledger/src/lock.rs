use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use paylog_core::EmployeeId;

/// Registry of per-employee write locks, created lazily.
///
/// Writes for the same employee serialize on one mutex; writes for different
/// employees proceed independently. Readers never touch the registry.
#[derive(Debug, Default)]
pub(crate) struct EmployeeLocks {
    cells: Mutex<HashMap<EmployeeId, Arc<Mutex<()>>>>,
}

impl EmployeeLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fetch the lock cell for an employee, creating it on first use.
    pub(crate) fn cell(&self, employee: &EmployeeId) -> Arc<Mutex<()>> {
        let mut cells = self.cells.lock();
        cells
            .entry(employee.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

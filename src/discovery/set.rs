use crate::classify::WorksheetRole;
use crate::spreadsheet::handle::WorksheetHandle;
use crate::spreadsheet::sheet::RawTable;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// A worksheet found during discovery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredWorksheet {
    /// Handle the table was fetched with
    pub handle: WorksheetHandle,
    pub table: RawTable,
}

/// Discovered worksheets keyed by role, at most one per role.
/// `Unknown` is never a key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedWorksheetSet {
    worksheets: BTreeMap<WorksheetRole, DiscoveredWorksheet>,
}

impl ClassifiedWorksheetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a worksheet under `role` unless the role is `Unknown` or already taken.
    /// Returns true if the worksheet was stored.
    pub fn insert(&mut self, role: WorksheetRole, handle: WorksheetHandle, table: RawTable) -> bool {
        if role == WorksheetRole::Unknown || self.worksheets.contains_key(&role) {
            return false;
        }
        self.worksheets.insert(role, DiscoveredWorksheet { handle, table });
        true
    }

    /// Adds every worksheet of `other` whose role is still free here.
    pub fn merge(&mut self, other: ClassifiedWorksheetSet) {
        for (role, worksheet) in other.worksheets {
            self.insert(role, worksheet.handle, worksheet.table);
        }
    }

    /// Moves the worksheet stored under `from` to `to`, provided `to` is free.
    pub(crate) fn relabel(&mut self, from: WorksheetRole, to: WorksheetRole) -> bool {
        if to == WorksheetRole::Unknown || self.worksheets.contains_key(&to) {
            return false;
        }
        match self.worksheets.remove(&from) {
            Some(worksheet) => {
                self.worksheets.insert(to, worksheet);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, role: WorksheetRole) -> Option<&DiscoveredWorksheet> {
        self.worksheets.get(&role)
    }

    pub fn contains(&self, role: WorksheetRole) -> bool {
        self.worksheets.contains_key(&role)
    }

    /// Worksheets in role order.
    pub fn iter(&self) -> impl Iterator<Item = (WorksheetRole, &DiscoveredWorksheet)> {
        self.worksheets.iter().map(|(role, worksheet)| (*role, worksheet))
    }

    pub fn roles(&self) -> Vec<WorksheetRole> {
        self.worksheets.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.worksheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Required roles with no worksheet yet.
    pub fn missing_required(&self) -> Vec<WorksheetRole> {
        WorksheetRole::REQUIRED
            .into_iter()
            .filter(|role| !self.contains(*role))
            .collect()
    }
}

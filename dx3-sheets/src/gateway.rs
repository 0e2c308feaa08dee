//! The seam between the bot and the spreadsheet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dx3_core::CharacterRecord;
use parking_lot::Mutex;

use crate::client::SheetsClient;
use crate::coord::CellRef;
use crate::decode::decode_character;
use crate::error::{Result, SheetsError};
use crate::layout::BATCH_RANGES;
use crate::snapshot::{SheetData, Snapshot};
use crate::write::CellWrite;

/// Read and write access to character spreadsheets.
#[async_trait]
pub trait SheetGateway: Send + Sync {
    /// Fetch every batched range of a spreadsheet.
    async fn fetch(&self, spreadsheet_id: &str) -> Result<SheetData>;

    /// Apply a single-cell update.
    async fn write(&self, spreadsheet_id: &str, write: &CellWrite) -> Result<()>;

    /// Fetch and decode a character.
    async fn read_character(&self, spreadsheet_id: &str) -> Result<CharacterRecord> {
        let data = self.fetch(spreadsheet_id).await?;
        decode_character(&data)
    }
}

#[async_trait]
impl SheetGateway for SheetsClient {
    async fn fetch(&self, spreadsheet_id: &str) -> Result<SheetData> {
        let snapshots = self.batch_get(spreadsheet_id, &BATCH_RANGES).await?;
        Ok(SheetData::new(snapshots))
    }

    async fn write(&self, spreadsheet_id: &str, write: &CellWrite) -> Result<()> {
        let cell = write
            .cell()
            .ok_or_else(|| SheetsError::NoCell(write.to_string()))?;
        self.update_cell(spreadsheet_id, cell, &write.value()).await
    }
}

/// In-process spreadsheet store used in tests and offline runs.
#[derive(Debug, Default)]
pub struct MemorySheet {
    sheets: Mutex<HashMap<String, SheetData>>,
    writes: Mutex<Vec<(String, CellWrite)>>,
    offline: AtomicBool,
}

impl MemorySheet {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blank template under `spreadsheet_id`.
    pub fn insert_blank(&self, spreadsheet_id: &str) {
        let blank = SheetData::new(BATCH_RANGES.iter().map(|r| Snapshot::empty(*r)).collect());
        self.sheets.lock().insert(spreadsheet_id.to_string(), blank);
    }

    /// Set a cell by A1 address, creating the sheet if needed.
    ///
    /// # Errors
    /// Returns [`SheetsError::InvalidCoordinate`] for a bad address and
    /// [`SheetsError::NoCell`] for one outside the template ranges.
    pub fn set(&self, spreadsheet_id: &str, a1: &str, value: &str) -> Result<()> {
        let cell: CellRef = a1.parse()?;
        if !self.sheets.lock().contains_key(spreadsheet_id) {
            self.insert_blank(spreadsheet_id);
        }
        let mut sheets = self.sheets.lock();
        let data = sheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| SheetsError::NoCell(a1.to_string()))?;
        let snapshot = data
            .snapshots
            .iter_mut()
            .zip(BATCH_RANGES)
            .find(|(_, range)| range.contains(cell))
            .map(|(snapshot, _)| snapshot)
            .ok_or_else(|| SheetsError::NoCell(a1.to_string()))?;
        snapshot.set(cell, value);
        Ok(())
    }

    /// Writes received so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, CellWrite)> {
        self.writes.lock().clone()
    }

    /// Make every call fail as if the API were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            Err(SheetsError::Unavailable("memory sheet is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SheetGateway for MemorySheet {
    async fn fetch(&self, spreadsheet_id: &str) -> Result<SheetData> {
        self.check_online()?;
        self.sheets
            .lock()
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| SheetsError::Http {
                status: 404,
                body: format!("spreadsheet {spreadsheet_id} not found"),
            })
    }

    async fn write(&self, spreadsheet_id: &str, write: &CellWrite) -> Result<()> {
        self.check_online()?;
        let cell = write
            .cell()
            .ok_or_else(|| SheetsError::NoCell(write.to_string()))?;
        self.set(spreadsheet_id, &cell.to_string(), &write.value())?;
        self.writes
            .lock()
            .push((spreadsheet_id.to_string(), write.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ScalarField;
    use crate::snapshot::CellSource;

    #[tokio::test]
    async fn unknown_sheet_is_404() {
        let sheet = MemorySheet::new();
        assert!(matches!(
            sheet.fetch("nope").await,
            Err(SheetsError::Http { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn write_then_fetch() {
        let sheet = MemorySheet::new();
        sheet.set("id", "E4", "카미야").expect("set");
        sheet.write("id", &CellWrite::Hp(17)).await.expect("write");
        let data = sheet.fetch("id").await.expect("fetch");
        assert_eq!(data.int(ScalarField::Hp.cell()), Some(17));
        assert_eq!(sheet.writes().len(), 1);
    }

    #[tokio::test]
    async fn offline_fails_everything() {
        let sheet = MemorySheet::new();
        sheet.insert_blank("id");
        sheet.set_offline(true);
        assert!(matches!(sheet.fetch("id").await, Err(SheetsError::Unavailable(_))));
        assert!(sheet.write("id", &CellWrite::Hp(1)).await.is_err());
        assert!(sheet.writes().is_empty());
    }

    #[test]
    fn set_rejects_cells_outside_template() {
        let sheet = MemorySheet::new();
        assert!(matches!(sheet.set("id", "Z200", "x"), Err(SheetsError::NoCell(_))));
        assert!(matches!(
            sheet.set("id", "??", "x"),
            Err(SheetsError::InvalidCoordinate(_))
        ));
    }
}

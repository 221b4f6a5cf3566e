//! Destination workbook: a shared, mutex-guarded writer that every task
//! appends into through its own sheet.
//!
//! The workbook's sheet directory is the only cross-task mutable state, so
//! sheet creation and saving happen under the per-file lock; row cursors
//! stay task-local in [`DestSheet`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};

use crate::error::{CollectError, Result};
use crate::transform::{CellStyle, CellValue, SheetAppend};

const PLACEHOLDER_SHEET: &str = "Sheet1";
const MONTH_NUM_FORMAT: &str = "yyyy\"年\"m\"月\"";
const SHORT_DATE_FORMAT_INDEX: u8 = 14;

struct Inner {
    workbook: Workbook,
    sheet_names: Vec<String>,
    month_format: Format,
    date_format: Format,
}

/// The destination workbook file, created fresh each run.
pub struct DestinationBook {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl DestinationBook {
    /// Creates the destination file inside `dir`, replacing any previous
    /// run's output. The previous file is not backed up.
    pub fn create(dir: &Path, file_name: &str) -> Result<DestinationBook> {
        if dir.exists() {
            if !dir.is_dir() {
                return Err(CollectError::InvalidDestination(dir.to_path_buf()));
            }
        } else {
            std::fs::create_dir_all(dir)?;
        }

        let path = dir.join(file_name);
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        workbook.save(&path)?;
        info!(path = %path.display(), "destination workbook created");

        Ok(DestinationBook {
            path,
            inner: Mutex::new(Inner {
                workbook,
                sheet_names: vec![PLACEHOLDER_SHEET.to_string()],
                month_format: Format::new().set_num_format(MONTH_NUM_FORMAT),
                date_format: Format::new().set_num_format_index(SHORT_DATE_FORMAT_INDEX),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens (creating on first use) the sheet whose name contains
    /// `display_name` and hands back a task-local append cursor.
    ///
    /// Creation activates the new sheet and hides the default blank one;
    /// the whole check-then-create runs under the workbook lock so
    /// concurrent tasks cannot race on the sheet directory.
    pub fn open_sheet(&self, display_name: &str) -> Result<DestSheet<'_>> {
        let mut inner = self.lock();

        let existing = inner
            .sheet_names
            .iter()
            .find(|name| name.contains(display_name))
            .cloned();
        let resolved = match existing {
            Some(name) => name,
            None => {
                let worksheet = inner.workbook.add_worksheet();
                worksheet.set_name(display_name)?;
                worksheet.set_active(true);
                inner
                    .workbook
                    .worksheet_from_name(PLACEHOLDER_SHEET)?
                    .set_hidden(true);
                inner.sheet_names.push(display_name.to_string());
                inner.workbook.save(&self.path)?;
                debug!(sheet = display_name, "destination sheet created");
                display_name.to_string()
            }
        };

        Ok(DestSheet {
            book: self,
            name: resolved,
            next_row: 0,
            data_rows: 0,
        })
    }

    /// Persists the workbook.
    pub fn save(&self) -> Result<()> {
        let mut inner = self.lock();
        let path = self.path.clone();
        inner.workbook.save(&path)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means another task panicked mid-write; the
        // workbook state is still structurally sound, so keep going.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Append cursor into one destination sheet. Owned by exactly one task.
pub struct DestSheet<'a> {
    book: &'a DestinationBook,
    name: String,
    next_row: u32,
    data_rows: u32,
}

impl DestSheet<'_> {
    /// Writes one extraction's payload at the cursor and saves the file.
    ///
    /// The header row is replicated only into a still-empty sheet.
    pub fn append(&mut self, payload: &SheetAppend) -> Result<()> {
        let mut inner = self.book.lock();
        let Inner {
            workbook,
            month_format,
            date_format,
            ..
        } = &mut *inner;
        let worksheet = workbook.worksheet_from_name(&self.name)?;

        // Row 0 is header space: replicated from the source for tasks that
        // carry one, left blank otherwise. Data always starts at row 1.
        if self.next_row == 0 {
            if let Some(header) = &payload.header {
                for (col_idx, cell) in header.iter().enumerate() {
                    worksheet.write_string(0, col_idx as u16, cell.as_str())?;
                }
            }
            self.next_row = 1;
        }

        for row in &payload.rows {
            for cell in &row.cells {
                match (&cell.value, cell.style) {
                    (CellValue::Text(text), CellStyle::Plain) => {
                        worksheet.write_string(self.next_row, cell.col, text.as_str())?;
                    }
                    (CellValue::Text(text), CellStyle::MonthDisplay) => {
                        worksheet.write_string_with_format(
                            self.next_row,
                            cell.col,
                            text.as_str(),
                            month_format,
                        )?;
                    }
                    (CellValue::Text(text), CellStyle::ShortDate) => {
                        worksheet.write_string_with_format(
                            self.next_row,
                            cell.col,
                            text.as_str(),
                            date_format,
                        )?;
                    }
                    (CellValue::Number(number), CellStyle::ShortDate) => {
                        worksheet.write_number_with_format(
                            self.next_row,
                            cell.col,
                            *number,
                            date_format,
                        )?;
                    }
                    (CellValue::Number(number), CellStyle::MonthDisplay) => {
                        worksheet.write_number_with_format(
                            self.next_row,
                            cell.col,
                            *number,
                            month_format,
                        )?;
                    }
                    (CellValue::Number(number), CellStyle::Plain) => {
                        worksheet.write_number(self.next_row, cell.col, *number)?;
                    }
                }
            }
            self.next_row += 1;
            self.data_rows += 1;
        }

        workbook.save(&self.book.path)?;
        Ok(())
    }

    /// Data rows written through this cursor, header excluded.
    pub fn rows_written(&self) -> u32 {
        self.data_rows
    }
}

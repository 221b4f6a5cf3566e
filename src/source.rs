//! Source-side loading: scans the input directory, snapshots every visible
//! sheet of every workbook into an in-memory string grid, and parses the
//! month tag out of source file names.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader, SheetVisible};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{CollectError, Result};

/// One sheet of a source workbook, snapshotted as text cells.
///
/// Rows are indexed from the top of the sheet; each row keeps absolute
/// column positions but drops trailing empty cells, so the ragged-row
/// end-of-data heuristics see the same shape the sheet has on screen.
#[derive(Debug, Clone)]
pub struct SourceSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// An opened source workbook. Hidden sheets are dropped at load time.
#[derive(Debug, Clone)]
pub struct SourceBook {
    pub file_name: String,
    pub sheets: Vec<SourceSheet>,
}

impl SourceBook {
    pub fn open(path: &Path) -> Result<SourceBook> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut workbook = open_workbook_auto(path)?;

        let visible_names: Vec<String> = workbook
            .sheets_metadata()
            .iter()
            .filter(|sheet| sheet.visible == SheetVisible::Visible)
            .map(|sheet| sheet.name.clone())
            .collect();

        let mut sheets = Vec::with_capacity(visible_names.len());
        for name in visible_names {
            let range = workbook.worksheet_range(&name)?;
            sheets.push(SourceSheet {
                rows: grid_from_range(&range),
                name,
            });
        }

        debug!(file = %file_name, sheets = sheets.len(), "source workbook loaded");
        Ok(SourceBook { file_name, sheets })
    }

    /// Month numeral from the file name, required by the tasks that tag
    /// destination rows with a month.
    pub fn month_tag(&self) -> Result<String> {
        month_from_file_name(&self.file_name)
    }
}

/// Everything found in the source directory: workbooks plus auxiliary
/// registry files. Workbook order is fixed at load time.
#[derive(Debug, Default)]
pub struct SourceSet {
    pub books: Vec<SourceBook>,
    pub registry_files: Vec<PathBuf>,
}

/// Enumerates the source directory, opening workbooks by their two
/// conventional extensions and collecting registry CSV paths.
pub fn load_sources(dir: &Path) -> Result<SourceSet> {
    let entries = fs::read_dir(dir).map_err(|_| CollectError::SourceDir(dir.to_path_buf()))?;

    let mut set = SourceSet::default();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.ends_with("xlsx") || name.ends_with("xls") {
            set.books.push(SourceBook::open(&path)?);
        } else if name.ends_with("csv") {
            set.registry_files.push(path);
        }
    }

    set.books.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    set.registry_files.sort();
    info!(
        workbooks = set.books.len(),
        registries = set.registry_files.len(),
        "source directory loaded"
    );
    Ok(set)
}

static MONTH_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d]\d+月").expect("valid month pattern"));
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Two-stage match: first the digit run ending in the month marker (itself
/// preceded by a non-digit), then the digits inside it.
pub fn month_from_file_name(file_name: &str) -> Result<String> {
    let marked = MONTH_MARKER
        .find(file_name)
        .ok_or_else(|| CollectError::MissingMonthTag(file_name.to_string()))?;
    let digits = DIGIT_RUN
        .find(marked.as_str())
        .ok_or_else(|| CollectError::MissingMonthTag(file_name.to_string()))?;
    Ok(digits.as_str().to_string())
}

fn grid_from_range(range: &Range<Data>) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let Some((first_row, first_col)) = range.start() else {
        return rows;
    };

    // Pad so cell indices stay absolute even when the used range does not
    // begin at A1.
    rows.resize(first_row as usize, Vec::new());
    for row in range.rows() {
        let mut cells: Vec<String> = Vec::with_capacity(first_col as usize + row.len());
        cells.resize(first_col as usize, String::new());
        cells.extend(row.iter().map(cell_to_string));
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }
        rows.push(cells);
    }
    rows
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

//! Region location, header role resolution, and row extraction.
//!
//! A region is the header row found by the task's anchor cell plus the data
//! rows below it. Extraction walks those rows with the end-of-data
//! heuristic, yielding one [`Extraction`] per (task, workbook, region).

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::source::SourceBook;
use crate::task::{Role, RowRule, TaskFamily, TaskSpec};

/// The rows captured from one region, ready for the transformer.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Sheet-name keyword that selected the region; doubles as the
    /// category label for the creator-fee task.
    pub keyword: String,
    pub sheet_name: String,
    pub file_name: String,
    /// Month numeral parsed from the source file name, when the task
    /// requires one.
    pub month: Option<String>,
    /// Resolved role → column index (anchor-relative when the task
    /// re-bases columns at the anchor).
    pub roles: HashMap<Role, usize>,
    /// Header row, kept for tasks that replicate it into an empty
    /// destination sheet.
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Extracts every region of every matching sheet in one workbook.
///
/// Sheets without the anchor yield nothing (not an error). A sheet whose
/// mandatory header markers are missing or ambiguous is reported and
/// skipped.
pub fn extract_book(spec: &TaskSpec, book: &SourceBook) -> Result<Vec<Extraction>> {
    let month = if spec.needs_month {
        Some(book.month_tag()?)
    } else {
        None
    };

    let mut extractions = Vec::new();
    for sheet in &book.sheets {
        for keyword in spec.sheet_keywords {
            if !sheet.name.contains(keyword) {
                continue;
            }
            if let Some(excluded) = spec.exclude_keyword {
                if sheet.name.contains(excluded) {
                    continue;
                }
            }

            let anchors = find_anchor_cells(&sheet.rows, spec.anchor);
            if anchors.is_empty() {
                continue;
            }
            let regions: &[(usize, usize)] = if spec.multi_region {
                &anchors
            } else {
                &anchors[..1]
            };

            for &(anchor_row, anchor_col) in regions {
                if let Some(extraction) = extract_region(
                    spec,
                    &sheet.rows,
                    anchor_row,
                    anchor_col,
                    keyword,
                    &sheet.name,
                    &book.file_name,
                    month.as_deref(),
                ) {
                    debug!(
                        task = %spec.kind,
                        file = %book.file_name,
                        sheet = %sheet.name,
                        rows = extraction.rows.len(),
                        "region extracted"
                    );
                    extractions.push(extraction);
                }
            }
        }
    }
    Ok(extractions)
}

/// Finds every cell whose text equals the anchor string, in row order.
fn find_anchor_cells(rows: &[Vec<String>], anchor: &str) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            if cell == anchor {
                found.push((row_idx, col_idx));
            }
        }
    }
    found
}

#[allow(clippy::too_many_arguments)]
fn extract_region(
    spec: &TaskSpec,
    rows: &[Vec<String>],
    anchor_row: usize,
    anchor_col: usize,
    keyword: &str,
    sheet_name: &str,
    file_name: &str,
    month: Option<&str>,
) -> Option<Extraction> {
    let base_col = if spec.relative_to_anchor {
        anchor_col
    } else {
        0
    };

    let header_cells = rebase(rows.get(anchor_row)?, base_col);
    let roles = resolve_roles(spec, &header_cells, sheet_name, file_name)?;

    let mut data = Vec::new();
    for row in rows.iter().skip(anchor_row + 1) {
        let mut cells = rebase(row, base_col);
        match classify_row(&spec.rule, &roles, &cells) {
            RowFate::End => break,
            RowFate::Skip => continue,
            RowFate::Accept => {
                if spec.family == TaskFamily::Mcn {
                    copy_settlement_type(&roles, &mut cells);
                }
                data.push(cells);
            }
        }
    }

    Some(Extraction {
        keyword: keyword.to_string(),
        sheet_name: sheet_name.to_string(),
        file_name: file_name.to_string(),
        month: month.map(str::to_string),
        roles,
        header: (spec.family == TaskFamily::Common).then(|| header_cells.clone()),
        rows: data,
    })
}

/// Scans the header row for the task's role markers.
///
/// Returns `None` when a required role resolves to zero or more than one
/// column; each such mismatch is reported as a diagnostic.
fn resolve_roles(
    spec: &TaskSpec,
    header: &[String],
    sheet_name: &str,
    file_name: &str,
) -> Option<HashMap<Role, usize>> {
    let mut roles = HashMap::new();
    let mut counts: HashMap<Role, usize> = HashMap::new();

    for (col_idx, cell) in header.iter().enumerate() {
        for marker in spec.markers {
            if !cell.contains(marker.contains) {
                continue;
            }
            if marker
                .excludes
                .is_some_and(|excluded| cell.contains(excluded))
            {
                continue;
            }
            roles.insert(marker.role, col_idx);
            *counts.entry(marker.role).or_default() += 1;
            break;
        }
    }

    let mut layout_ok = true;
    for marker in spec.markers.iter().filter(|marker| marker.required) {
        match counts.get(&marker.role).copied().unwrap_or(0) {
            0 => {
                warn!(
                    file = file_name,
                    sheet = sheet_name,
                    marker = marker.contains,
                    "mandatory header marker not found"
                );
                layout_ok = false;
            }
            1 => {}
            n => {
                warn!(
                    file = file_name,
                    sheet = sheet_name,
                    marker = marker.contains,
                    matches = n,
                    "mandatory header marker is ambiguous"
                );
                layout_ok = false;
            }
        }
    }

    layout_ok.then_some(roles)
}

/// Copies the resolved settlement-type cell into the fixed source column
/// the remap table reads it from.
fn copy_settlement_type(roles: &HashMap<Role, usize>, cells: &mut [String]) {
    const SETTLEMENT_SRC: usize = 4;
    if let Some(&idx) = roles.get(&Role::SettlementType) {
        let value = cells.get(idx).cloned().unwrap_or_default();
        if let Some(slot) = cells.get_mut(SETTLEMENT_SRC) {
            *slot = value;
        }
    }
}

enum RowFate {
    Accept,
    Skip,
    End,
}

/// End-of-data heuristic, first match wins:
/// no cells at all ends the region; a row too short to reach the rightmost
/// mandatory column ends it; all mandatory cells empty ends it; some
/// mandatory cells empty (or a task-specific skip signal) skips the row;
/// anything else is data.
fn classify_row(rule: &RowRule, roles: &HashMap<Role, usize>, cells: &[String]) -> RowFate {
    if cells.is_empty() {
        return RowFate::End;
    }

    match *rule {
        RowRule::Content {
            uid,
            nickname,
            right_edge,
        } => {
            if cells.len() <= right_edge {
                return RowFate::End;
            }
            let money = roles.get(&Role::Money).copied().unwrap_or(0);
            if is_empty_at(cells, uid) && is_empty_at(cells, nickname) && is_empty_at(cells, money)
            {
                return RowFate::End;
            }
            if is_empty_at(cells, uid)
                || is_empty_at(cells, nickname)
                || is_empty_at(cells, money)
                || (money > 0 && is_empty_at(cells, money - 1))
            {
                return RowFate::Skip;
            }
            RowFate::Accept
        }
        RowRule::Common {
            mandatory_end,
            helper_col,
            helper_marker,
        } => {
            if cells.len() <= mandatory_end {
                return RowFate::End;
            }
            if (0..=mandatory_end).all(|idx| is_empty_at(cells, idx)) {
                return RowFate::End;
            }
            if (0..=mandatory_end).any(|idx| is_empty_at(cells, idx)) {
                return RowFate::Skip;
            }
            if cells
                .get(helper_col)
                .is_some_and(|cell| cell.contains(helper_marker))
            {
                return RowFate::Skip;
            }
            RowFate::Accept
        }
        RowRule::Mcn {
            mandatory_end,
            accepted_types,
        } => {
            if cells.len() <= mandatory_end {
                return RowFate::End;
            }
            if (0..=mandatory_end).all(|idx| is_empty_at(cells, idx)) {
                return RowFate::End;
            }
            if let Some(&type_idx) = roles.get(&Role::SettlementType) {
                let settlement = cells.get(type_idx).map(String::as_str).unwrap_or("");
                if !accepted_types
                    .iter()
                    .any(|accepted| settlement.contains(accepted))
                {
                    return RowFate::Skip;
                }
            }
            if (0..=mandatory_end).any(|idx| is_empty_at(cells, idx)) {
                return RowFate::Skip;
            }
            RowFate::Accept
        }
    }
}

fn is_empty_at(cells: &[String], idx: usize) -> bool {
    cells.get(idx).map_or(true, |cell| cell.is_empty())
}

fn rebase(cells: &[String], base_col: usize) -> Vec<String> {
    if base_col >= cells.len() {
        return Vec::new();
    }
    cells[base_col..].to_vec()
}

//! Row transformation: maps extracted rows into destination row payloads.
//!
//! This stage is pure — it produces cell writes keyed by destination column
//! and leaves the workbook mutation to the destination writer, so the
//! business rules stay testable without touching files.

use crate::dates::normalize_date;
use crate::extract::Extraction;
use crate::registry::OrgRegistry;
use crate::task::{Role, TaskFamily, TaskSpec};

/// Org label used when a uid has no registry classification.
pub const FALLBACK_ORG: &str = "其他_付费kol";

/// Year prefix for the month tag written into month-tagged tasks.
const MONTH_YEAR: &str = "2021";

// Destination columns of the creator-fee sheet.
const CT_MONTH: u16 = 0;
const CT_ORG: u16 = 1;
const CT_VIDEO_MONEY: u16 = 6;
const CT_TEXT_MONEY: u16 = 7;
const CT_UNCLASSIFIED_MONEY: u16 = 8;
const CT_CATEGORY: u16 = 10;
const CT_READ_COUNT: u16 = 13;

// Destination column of the MCN sheet's month tag.
const MCN_MONTH: u16 = 0;

/// Value of a single destination cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

/// Named style applied to a destination cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    /// Year/month display pattern for the month tag.
    MonthDisplay,
    /// Short date number format for normalized start/end dates.
    ShortDate,
}

#[derive(Debug, Clone)]
pub struct CellWrite {
    pub col: u16,
    pub value: CellValue,
    pub style: CellStyle,
}

/// One destination row, as a sparse set of cell writes.
#[derive(Debug, Clone, Default)]
pub struct RowPayload {
    pub cells: Vec<CellWrite>,
}

impl RowPayload {
    fn text(&mut self, col: u16, value: impl Into<String>) {
        self.cells.push(CellWrite {
            col,
            value: CellValue::Text(value.into()),
            style: CellStyle::Plain,
        });
    }

    fn styled(&mut self, col: u16, value: CellValue, style: CellStyle) {
        self.cells.push(CellWrite { col, value, style });
    }
}

/// Everything one extraction contributes to its destination sheet.
#[derive(Debug, Clone)]
pub struct SheetAppend {
    /// Header row replicated once into an empty destination sheet.
    pub header: Option<Vec<String>>,
    pub rows: Vec<RowPayload>,
}

/// Applies the task's business rules to every extracted row.
pub fn transform(
    spec: &TaskSpec,
    extraction: &Extraction,
    registry: Option<&OrgRegistry>,
) -> SheetAppend {
    let rows = extraction
        .rows
        .iter()
        .map(|cells| match spec.family {
            TaskFamily::Content => content_row(spec, extraction, registry, cells),
            TaskFamily::Common => common_row(extraction, cells),
            TaskFamily::Mcn => mcn_row(spec, extraction, cells),
        })
        .collect();

    SheetAppend {
        header: extraction.header.clone(),
        rows,
    }
}

fn month_value(extraction: &Extraction) -> String {
    let month = extraction.month.as_deref().unwrap_or_default();
    format!("{MONTH_YEAR}/{month}/1")
}

fn remap_into(spec: &TaskSpec, cells: &[String], payload: &mut RowPayload) {
    for &(src, dst) in spec.remap {
        if let Some(value) = cells.get(src) {
            payload.text(dst, value.clone());
        }
    }
}

fn content_row(
    spec: &TaskSpec,
    extraction: &Extraction,
    registry: Option<&OrgRegistry>,
    cells: &[String],
) -> RowPayload {
    let mut payload = RowPayload::default();
    remap_into(spec, cells, &mut payload);

    payload.styled(
        CT_MONTH,
        CellValue::Text(month_value(extraction)),
        CellStyle::MonthDisplay,
    );

    let uid = cells.get(4).map(String::as_str).unwrap_or_default();
    let org = registry
        .and_then(|registry| registry.classification(uid))
        .unwrap_or(FALLBACK_ORG);
    payload.text(CT_ORG, org);

    // Money lands in one of three buckets depending on the dynamic type.
    let money_idx = extraction.roles.get(&Role::Money).copied().unwrap_or(0);
    let money = cells.get(money_idx).cloned().unwrap_or_default();
    let dyn_idx = extraction.roles.get(&Role::DynamicType).copied();
    let dynamic_type = dyn_idx
        .filter(|&idx| idx != 0)
        .and_then(|idx| cells.get(idx))
        .map(String::as_str)
        .unwrap_or_default();
    let bucket = if dynamic_type.is_empty() {
        CT_UNCLASSIFIED_MONEY
    } else if dynamic_type.contains("视频") {
        CT_VIDEO_MONEY
    } else {
        CT_TEXT_MONEY
    };
    payload.text(bucket, money);

    payload.text(CT_CATEGORY, extraction.keyword.clone());

    let read_idx = extraction.roles.get(&Role::ReadCount).copied().unwrap_or(0);
    if read_idx != 0 {
        let read_count = cells.get(read_idx).cloned().unwrap_or_default();
        payload.text(CT_READ_COUNT, read_count);
    }

    payload
}

fn common_row(extraction: &Extraction, cells: &[String]) -> RowPayload {
    let start = extraction.roles.get(&Role::StartDate).copied();
    let end = extraction.roles.get(&Role::EndDate).copied();

    let mut payload = RowPayload::default();
    for (idx, value) in cells.iter().enumerate() {
        let col = idx as u16;
        if Some(idx) == start || Some(idx) == end {
            match normalize_date(value) {
                Some(serial) => {
                    payload.styled(col, CellValue::Number(serial as f64), CellStyle::ShortDate)
                }
                None => payload.styled(col, CellValue::Text(value.clone()), CellStyle::ShortDate),
            }
        } else {
            payload.text(col, value.clone());
        }
    }
    payload
}

fn mcn_row(spec: &TaskSpec, extraction: &Extraction, cells: &[String]) -> RowPayload {
    let mut payload = RowPayload::default();
    remap_into(spec, cells, &mut payload);
    payload.styled(
        MCN_MONTH,
        CellValue::Text(month_value(extraction)),
        CellStyle::MonthDisplay,
    );
    payload
}

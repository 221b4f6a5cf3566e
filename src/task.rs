//! The five consolidation tasks and their static strategy records.
//!
//! Everything that varies between tasks — anchor text, sheet-name keywords,
//! header role markers, the column remap table, the row-completeness rule —
//! lives in one [`TaskSpec`] per task, selected once at orchestration time.

use crate::error::{CollectError, Result};

/// Identifies one consolidation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Content,
    Campaign,
    Cps,
    Newgame,
    Mcn,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Content,
        TaskKind::Campaign,
        TaskKind::Cps,
        TaskKind::Newgame,
        TaskKind::Mcn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Content => "content",
            TaskKind::Campaign => "campaign",
            TaskKind::Cps => "cps",
            TaskKind::Newgame => "newgame",
            TaskKind::Mcn => "mcn",
        }
    }

    pub fn from_name(name: &str) -> Result<TaskKind> {
        match name {
            "content" => Ok(TaskKind::Content),
            "campaign" => Ok(TaskKind::Campaign),
            "cps" => Ok(TaskKind::Cps),
            "newgame" => Ok(TaskKind::Newgame),
            "mcn" => Ok(TaskKind::Mcn),
            other => Err(CollectError::UnsupportedTask(other.to_string())),
        }
    }

    pub fn spec(self) -> &'static TaskSpec {
        match self {
            TaskKind::Content => &CONTENT,
            TaskKind::Campaign => &CAMPAIGN,
            TaskKind::Cps => &CPS,
            TaskKind::Newgame => &NEWGAME,
            TaskKind::Mcn => &MCN,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic role a header column can take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    DynamicType,
    ReadCount,
    Money,
    StartDate,
    EndDate,
    SettlementType,
}

/// Fuzzy marker used to resolve a [`Role`] from header cell text.
#[derive(Debug, Clone, Copy)]
pub struct RoleMarker {
    pub role: Role,
    /// Substring the header cell must contain.
    pub contains: &'static str,
    /// Substring that disqualifies a cell (aggregate columns etc.).
    pub excludes: Option<&'static str>,
    /// Required roles must resolve to exactly one column or the sheet's
    /// extraction is abandoned.
    pub required: bool,
}

/// Task-specific row-completeness rule applied below the header row.
#[derive(Debug, Clone, Copy)]
pub enum RowRule {
    /// Creator-fee sheets: uid, nickname, the money column, and the cell
    /// left of the money column must all be filled.
    Content {
        uid: usize,
        nickname: usize,
        right_edge: usize,
    },
    /// Campaign-style sheets: a fixed prefix of columns must be filled and
    /// a helper-column marker turns the row into a skip signal.
    Common {
        mandatory_end: usize,
        helper_col: usize,
        helper_marker: &'static str,
    },
    /// MCN sheets: columns up to the platform uid must be filled and the
    /// settlement type must match one of the accepted categories.
    Mcn {
        mandatory_end: usize,
        accepted_types: &'static [&'static str],
    },
}

/// Selects which transformer writes this task's destination rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFamily {
    Content,
    Common,
    Mcn,
}

/// Static description of one task's extraction and transformation behavior.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub family: TaskFamily,
    /// A source sheet participates when its name contains any of these.
    pub sheet_keywords: &'static [&'static str],
    /// A sheet whose name also contains this keyword is skipped.
    pub exclude_keyword: Option<&'static str>,
    /// Literal cell text locating the header row.
    pub anchor: &'static str,
    pub markers: &'static [RoleMarker],
    pub rule: RowRule,
    /// Source column → destination column copies.
    pub remap: &'static [(usize, u16)],
    /// Destination sheet display name.
    pub dest_sheet: &'static str,
    /// Whether the month tag must be parsed from the source file name.
    pub needs_month: bool,
    /// Whether every anchor occurrence in a sheet opens its own region.
    pub multi_region: bool,
    /// Whether row columns are re-based at the anchor column.
    pub relative_to_anchor: bool,
}

static CONTENT: TaskSpec = TaskSpec {
    kind: TaskKind::Content,
    family: TaskFamily::Content,
    sheet_keywords: &["内容创作者", "内容采购"],
    exclude_keyword: Some("论坛"),
    anchor: "运营部门",
    markers: &[
        RoleMarker {
            role: Role::DynamicType,
            contains: "动态类型",
            excludes: None,
            required: true,
        },
        RoleMarker {
            role: Role::ReadCount,
            contains: "阅读量",
            excludes: Some("求和"),
            required: true,
        },
        RoleMarker {
            role: Role::Money,
            contains: "税前金额（自动计算)",
            excludes: Some("求和"),
            required: true,
        },
    ],
    rule: RowRule::Content {
        uid: 4,
        nickname: 5,
        right_edge: 9,
    },
    remap: &[(0, 2), (1, 3), (2, 12), (4, 4), (5, 5)],
    dest_sheet: "大神内域作者费用明细",
    needs_month: true,
    multi_region: false,
    relative_to_anchor: false,
};

static CAMPAIGN: TaskSpec = common_spec(TaskKind::Campaign, &["活动"]);
static CPS: TaskSpec = common_spec(TaskKind::Cps, &["CPS分发"]);
static NEWGAME: TaskSpec = common_spec(TaskKind::Newgame, &["新游预约"]);

const fn common_spec(kind: TaskKind, keywords: &'static [&'static str]) -> TaskSpec {
    TaskSpec {
        kind,
        family: TaskFamily::Common,
        sheet_keywords: keywords,
        exclude_keyword: None,
        anchor: "运营部门",
        markers: &[
            RoleMarker {
                role: Role::StartDate,
                contains: "开始日期",
                excludes: None,
                required: false,
            },
            RoleMarker {
                role: Role::EndDate,
                contains: "结束日期",
                excludes: None,
                required: false,
            },
        ],
        rule: RowRule::Common {
            mandatory_end: 4,
            helper_col: 4,
            helper_marker: "辅助列",
        },
        remap: &[],
        dest_sheet: keywords[0],
        needs_month: false,
        multi_region: false,
        relative_to_anchor: false,
    }
}

static MCN: TaskSpec = TaskSpec {
    kind: TaskKind::Mcn,
    family: TaskFamily::Mcn,
    sheet_keywords: &["MCN"],
    exclude_keyword: None,
    anchor: "运营部门",
    markers: &[RoleMarker {
        role: Role::SettlementType,
        contains: "结算类型",
        excludes: None,
        required: false,
    }],
    rule: RowRule::Mcn {
        mandatory_end: 6,
        accepted_types: &["自孵化", "签约作者"],
    },
    remap: &[
        (1, 2),
        (2, 9),
        (4, 8),
        (5, 3),
        (6, 4),
        (7, 5),
        (11, 6),
        (12, 7),
    ],
    dest_sheet: "MCN外域作者费用明细",
    needs_month: true,
    multi_region: true,
    relative_to_anchor: true,
};

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, SheetVisible};
use costbook::collect::{Collector, DEST_FILE_NAME};
use costbook::config::Config;
use costbook::CollectError;
use rust_xlsxwriter::{Workbook, Worksheet};
use tempfile::tempdir;

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<&str>]) {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                worksheet
                    .write_string(row_idx as u32, col_idx as u16, *cell)
                    .expect("cell written");
            }
        }
    }
}

fn content_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec![
            "运营部门",
            "游戏产品",
            "出资方",
            "备注",
            "UID",
            "昵称",
            "动态类型",
            "链接",
            "阅读量",
            "结算标准",
            "税前金额（自动计算)",
        ],
        vec![
            "社区部",
            "游戏A",
            "甲方",
            "-",
            "1001",
            "小明",
            "视频解说",
            "url",
            "1000",
            "标准",
            "100",
        ],
        vec![
            "社区部", "游戏A", "甲方", "-", "1002", "小红", "", "url", "2000", "标准", "200",
        ],
        vec![
            "社区部", "游戏B", "乙方", "-", "9999", "小刚", "图文", "url", "3000", "标准", "300",
        ],
        // Incomplete: nickname missing, must be skipped.
        vec![
            "社区部", "游戏B", "乙方", "-", "1003", "", "图文", "url", "4000", "标准", "400",
        ],
    ]
}

fn common_rows(label: &'static str, data_rows: usize) -> Vec<Vec<&'static str>> {
    let mut rows = vec![vec!["运营部门", "项目", "开始日期", "结束日期", "费用合计"]];
    for _ in 0..data_rows {
        rows.push(vec!["社区部", label, "2021.9.1", "20210902", "1000"]);
    }
    rows
}

fn mcn_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec![
            "运营部门",
            "游戏产品",
            "出资方",
            "备注",
            "结算类型",
            "平台",
            "平台UID",
            "平台昵称",
            "链接",
            "备注2",
            "标准",
            "金额",
            "播放量",
        ],
        vec![
            "社区部",
            "游戏A",
            "甲方",
            "-",
            "自孵化",
            "平台X",
            "42",
            "作者甲",
            "url",
            "-",
            "标准",
            "500",
            "1000",
        ],
        vec![
            "社区部",
            "游戏A",
            "甲方",
            "-",
            "签约作者",
            "平台Y",
            "43",
            "作者乙",
            "url",
            "-",
            "标准",
            "600",
            "2000",
        ],
    ]
}

fn write_content_book(path: &Path, with_hidden_decoy: bool) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("内容创作者-月度").expect("sheet named");
    write_rows(sheet, &content_rows());

    if with_hidden_decoy {
        let hidden = workbook.add_worksheet();
        hidden.set_name("内容创作者备份").expect("sheet named");
        write_rows(hidden, &content_rows());
        hidden.set_hidden(true);
    }

    workbook.save(path).expect("source workbook saved");
}

fn write_full_book(path: &Path) {
    let mut workbook = Workbook::new();
    let content = workbook.add_worksheet();
    content.set_name("内容创作者-月度").expect("sheet named");
    write_rows(content, &content_rows());

    let campaign = workbook.add_worksheet();
    campaign.set_name("活动预算").expect("sheet named");
    write_rows(campaign, &common_rows("活动A", 2));

    let cps = workbook.add_worksheet();
    cps.set_name("CPS分发明细").expect("sheet named");
    write_rows(cps, &common_rows("分发B", 1));

    let newgame = workbook.add_worksheet();
    newgame.set_name("新游预约表").expect("sheet named");
    write_rows(newgame, &common_rows("预约C", 1));

    let mcn = workbook.add_worksheet();
    mcn.set_name("MCN结算").expect("sheet named");
    write_rows(mcn, &mcn_rows());

    workbook.save(path).expect("source workbook saved");
}

fn write_registry(path: &Path) {
    fs::write(
        path,
        "kol_type,uid,add_date\n游戏机构,1001,20210101\n其他_个人,1002,20210301\n内容机构,1002,20200101\n",
    )
    .expect("registry written");
}

fn read_dest_sheet(path: &Path, name: &str) -> Range<Data> {
    let mut workbook = open_workbook_auto(path).expect("destination opened");
    workbook.worksheet_range(name).expect("destination sheet")
}

fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    range
        .get_value((row, col))
        .map(|cell| cell.to_string())
        .unwrap_or_default()
}

// Date-formatted numbers come back as DateTime cells; fold both shapes
// into the raw serial number.
fn cell_serial(range: &Range<Data>, row: u32, col: u32) -> f64 {
    match range.get_value((row, col)) {
        Some(Data::Float(value)) => *value,
        Some(Data::Int(value)) => *value as f64,
        Some(Data::DateTime(value)) => value.as_f64(),
        other => panic!("expected numeric cell, got {other:?}"),
    }
}

#[test]
fn content_scenario_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("src");
    fs::create_dir_all(&src).expect("src dir");
    write_content_book(&src.join("源数据9月.xlsx"), true);
    write_registry(&src.join("kol.csv"));

    let mut config = Config::default();
    config.src_dir = src;
    config.dst_dir = dir.path().join("dst");
    config.concurrent = false;

    let dst_dir = config.dst_dir.clone();
    let report = Collector::new(config).run().expect("run completed");
    assert!(report.into_first_error().is_none());

    let dest_path = dst_dir.join(DEST_FILE_NAME);
    let range = read_dest_sheet(&dest_path, "大神内域作者费用明细");

    // 3 complete rows below the blank header row; the nickname-less row
    // and the hidden decoy sheet contribute nothing.
    assert_eq!(range.height(), 3);

    for row in 1..4 {
        assert_eq!(cell_text(&range, row, 0), "2021/9/1");
        assert_eq!(cell_text(&range, row, 10), "内容创作者");
    }

    // Org attribution from the registry, with the fold preferring the
    // non-fallback record and unknown uids falling back.
    assert_eq!(cell_text(&range, 1, 1), "游戏机构");
    assert_eq!(cell_text(&range, 2, 1), "内容机构");
    assert_eq!(cell_text(&range, 3, 1), "其他_付费kol");

    // Money bucketing: video / unclassified / text-graphic.
    assert_eq!(cell_text(&range, 1, 6), "100");
    assert_eq!(cell_text(&range, 2, 8), "200");
    assert_eq!(cell_text(&range, 3, 7), "300");

    // Remapped columns and read count.
    assert_eq!(cell_text(&range, 1, 2), "社区部");
    assert_eq!(cell_text(&range, 1, 4), "1001");
    assert_eq!(cell_text(&range, 1, 5), "小明");
    assert_eq!(cell_text(&range, 1, 12), "甲方");
    assert_eq!(cell_text(&range, 1, 13), "1000");
}

#[test]
fn concurrent_run_merges_all_tasks_without_losing_rows() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("src");
    fs::create_dir_all(&src).expect("src dir");
    write_full_book(&src.join("报表9月.xlsx"));
    write_full_book(&src.join("报表10月.xlsx"));
    write_registry(&src.join("kol.csv"));

    let mut config = Config::default();
    config.src_dir = src;
    config.dst_dir = dir.path().join("dst");
    config.concurrent = true;

    let dst_dir = config.dst_dir.clone();
    let report = Collector::new(config).run().expect("run completed");
    for outcome in &report.outcomes {
        assert!(outcome.succeeded(), "task {} failed", outcome.task);
    }

    let dest_path = dst_dir.join(DEST_FILE_NAME);

    // Every destination sheet exists exactly once and the default blank
    // sheet is hidden.
    let mut workbook = open_workbook_auto(&dest_path).expect("destination opened");
    let mut names = workbook.sheet_names().to_vec();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);
    assert_eq!(total, 6);
    let placeholder = workbook
        .sheets_metadata()
        .iter()
        .find(|sheet| sheet.name == "Sheet1")
        .expect("placeholder present");
    assert_eq!(placeholder.visible, SheetVisible::Hidden);

    // Row counts equal the sum of accepted rows across both source books.
    let content = workbook
        .worksheet_range("大神内域作者费用明细")
        .expect("content sheet");
    assert_eq!(content.height(), 6);

    // Common sheets carry their header once plus the data rows.
    let campaign = workbook.worksheet_range("活动").expect("campaign sheet");
    assert_eq!(campaign.height(), 5);
    assert_eq!(campaign.get_value((0, 0)).map(|c| c.to_string()), Some("运营部门".to_string()));
    // Start dates are normalized to serial numbers, both text shapes.
    assert_eq!(cell_serial(&campaign, 1, 2), 44440.0);
    assert_eq!(cell_serial(&campaign, 1, 3), 44441.0);

    let cps = workbook.worksheet_range("CPS分发").expect("cps sheet");
    assert_eq!(cps.height(), 3);
    let newgame = workbook.worksheet_range("新游预约").expect("newgame sheet");
    assert_eq!(newgame.height(), 3);

    let mcn = workbook
        .worksheet_range("MCN外域作者费用明细")
        .expect("mcn sheet");
    assert_eq!(mcn.height(), 4);
    let months: Vec<String> = (1..5).map(|row| cell_text(&mcn, row, 0)).collect();
    assert!(months.contains(&"2021/9/1".to_string()));
    assert!(months.contains(&"2021/10/1".to_string()));
    for row in 1..5 {
        assert!(!cell_text(&mcn, row, 4).is_empty(), "platform uid present");
    }
}

#[test]
fn sequential_run_produces_the_same_totals() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("src");
    fs::create_dir_all(&src).expect("src dir");
    write_full_book(&src.join("报表9月.xlsx"));
    write_registry(&src.join("kol.csv"));

    let mut config = Config::default();
    config.src_dir = src;
    config.dst_dir = dir.path().join("dst");
    config.concurrent = false;

    let dst_dir = config.dst_dir.clone();
    let report = Collector::new(config).run().expect("run completed");
    for outcome in &report.outcomes {
        assert!(outcome.succeeded(), "task {} failed", outcome.task);
    }

    let dest_path = dst_dir.join(DEST_FILE_NAME);
    assert_eq!(read_dest_sheet(&dest_path, "大神内域作者费用明细").height(), 3);
    assert_eq!(read_dest_sheet(&dest_path, "活动").height(), 3);
    assert_eq!(read_dest_sheet(&dest_path, "MCN外域作者费用明细").height(), 2);
}

#[test]
fn month_tag_failure_stays_inside_its_tasks() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("src");
    fs::create_dir_all(&src).expect("src dir");

    // No month marker in the file name: fatal for the month-tagged tasks,
    // invisible to the others.
    let mut workbook = Workbook::new();
    let campaign = workbook.add_worksheet();
    campaign.set_name("活动预算").expect("sheet named");
    write_rows(campaign, &common_rows("活动A", 1));
    workbook.save(src.join("report.xlsx")).expect("saved");

    let mut config = Config::default();
    config.src_dir = src;
    config.dst_dir = dir.path().join("dst");
    config.concurrent = false;

    let report = Collector::new(config).run().expect("run completed");
    for outcome in &report.outcomes {
        match outcome.task.name() {
            "content" | "mcn" => assert!(!outcome.succeeded()),
            _ => assert!(outcome.succeeded(), "task {} failed", outcome.task),
        }
    }
    assert!(matches!(
        report.into_first_error(),
        Some(CollectError::MissingMonthTag(_))
    ));
}

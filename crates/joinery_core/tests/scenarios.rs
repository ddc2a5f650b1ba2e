use joinery_core::scalar::DataType;
use joinery_core::testutil::{column_strings, date, int_table, table};
use joinery_core::{
    ComparisonOperator, Diagnostic, JoinCondition, JoinOptions, JoinType, RowStore, Table,
    full_join, inner_join, join, left_join, semi_join,
};

fn keyed(values: &[(i64, &str)]) -> Table {
    table(
        &[("key", DataType::Int64), ("val", DataType::Utf8)],
        values
            .iter()
            .map(|(k, v)| vec![(*k).into(), (*v).into()])
            .collect(),
    )
}

#[test]
fn equi_join_modes() {
    logutil::init_test();

    let x = keyed(&[(1, "x1"), (2, "x2"), (3, "x3")]);
    let y = keyed(&[(1, "y1"), (2, "y2"), (4, "y3")]);
    let on = JoinCondition::on(["key"]);
    let opts = JoinOptions::default();

    let inner = inner_join(&x, &y, &on, &opts).unwrap();
    assert_eq!(vec!["1", "2"], column_strings(&inner.table, "key"));

    let left = left_join(&x, &y, &on, &opts).unwrap();
    assert_eq!(vec!["1", "2", "3"], column_strings(&left.table, "key"));
    assert_eq!(vec!["y1", "y2", "NA"], column_strings(&left.table, "val.y"));

    let full = full_join(&x, &y, &on, &opts).unwrap();
    assert_eq!(vec!["1", "2", "3", "4"], column_strings(&full.table, "key"));
    assert_eq!(
        vec!["x1", "x2", "x3", "NA"],
        column_strings(&full.table, "val.x")
    );
    assert_eq!(
        vec!["y1", "y2", "NA", "y3"],
        column_strings(&full.table, "val.y")
    );
}

#[test]
fn duplicate_keys_fan_out() {
    logutil::init_test();

    let df1 = int_table("key", [Some(1), Some(2), Some(2)]);
    let df2 = int_table("key", [Some(1), Some(2), Some(2)]);

    let out = inner_join(&df1, &df2, &JoinCondition::on(["key"]), &JoinOptions::default())
        .unwrap();
    assert_eq!(5, out.table.num_rows());
    assert_eq!(
        vec!["1", "2", "2", "2", "2"],
        column_strings(&out.table, "key")
    );
    assert!(
        out.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ManyToMany { .. })),
        "{:?}",
        out.diagnostics
    );
}

#[test]
fn missing_keys_never_match() {
    let x = int_table("key", [Some(1), None]);
    let y = int_table("key", [None, Some(1)]);

    let out = inner_join(&x, &y, &JoinCondition::on(["key"]), &JoinOptions::default()).unwrap();
    assert_eq!(vec!["1"], column_strings(&out.table, "key"));

    let out = join(
        &x,
        &y,
        JoinType::Anti,
        &JoinCondition::on(["key"]),
        &JoinOptions::default(),
    )
    .unwrap();
    assert_eq!(vec!["NA"], column_strings(&out.table, "key"));
}

#[test]
fn strict_inequality_pairs() {
    let x = int_table("id", (1..=4).map(Some));
    let y = int_table("id", (1..=4).map(Some));

    let cond: JoinCondition = "id < id".parse().unwrap();
    let out = inner_join(&x, &y, &cond, &JoinOptions::default()).unwrap();

    assert_eq!(6, out.table.num_rows());
    assert_eq!(
        vec!["1", "1", "1", "2", "2", "3"],
        column_strings(&out.table, "id.x")
    );
    assert_eq!(
        vec!["2", "3", "4", "3", "4", "4"],
        column_strings(&out.table, "id.y")
    );
}

fn parties() -> Table {
    table(
        &[("q", DataType::Int64), ("party", DataType::Date)],
        vec![
            vec![1.into(), date(2022, 1, 10)],
            vec![2.into(), date(2022, 4, 4)],
            vec![3.into(), date(2022, 7, 11)],
            vec![4.into(), date(2022, 10, 3)],
        ],
    )
}

#[test]
fn rolling_join_closest_party() {
    logutil::init_test();

    let employees = table(
        &[("name", DataType::Utf8), ("birthday", DataType::Date)],
        vec![
            vec!["early".into(), date(2022, 1, 5)],
            vec!["feb".into(), date(2022, 2, 14)],
            vec!["on_party".into(), date(2022, 7, 11)],
            vec!["dec".into(), date(2022, 12, 25)],
        ],
    );
    let cond = JoinCondition::cross().closest("birthday", ComparisonOperator::GtEq, "party");

    let inner = inner_join(&employees, &parties(), &cond, &JoinOptions::default()).unwrap();
    assert_eq!(
        vec!["feb", "on_party", "dec"],
        column_strings(&inner.table, "name")
    );
    assert_eq!(vec!["1", "3", "4"], column_strings(&inner.table, "q"));

    // Early birthdays have no party on or before them.
    let left = left_join(&employees, &parties(), &cond, &JoinOptions::default()).unwrap();
    assert_eq!(
        vec!["NA", "1", "3", "4"],
        column_strings(&left.table, "q")
    );

    let parsed: JoinCondition = "closest(birthday >= party)".parse().unwrap();
    assert_eq!(cond, parsed);
}

#[test]
fn rolling_join_early_birthday_has_no_match() {
    let employees = table(
        &[("birthday", DataType::Date)],
        vec![vec![date(2022, 1, 5)]],
    );
    let cond: JoinCondition = "closest(birthday >= party)".parse().unwrap();
    let out = inner_join(&employees, &parties(), &cond, &JoinOptions::default()).unwrap();
    assert_eq!(0, out.table.num_rows());
}

fn quarters(overlapping: bool) -> Table {
    let q2_start = if overlapping {
        date(2022, 3, 15)
    } else {
        date(2022, 4, 1)
    };
    let q1_end = if overlapping {
        date(2022, 4, 15)
    } else {
        date(2022, 3, 31)
    };
    table(
        &[
            ("q", DataType::Int64),
            ("start", DataType::Date),
            ("end", DataType::Date),
        ],
        vec![
            vec![1.into(), date(2022, 1, 1), q1_end],
            vec![2.into(), q2_start, date(2022, 6, 30)],
            vec![3.into(), date(2022, 7, 1), date(2022, 9, 30)],
            vec![4.into(), date(2022, 10, 1), date(2022, 12, 31)],
        ],
    )
}

#[test]
fn between_assigns_each_party_once() {
    let cond: JoinCondition = "between(party, start, end)".parse().unwrap();
    let out = inner_join(&parties(), &quarters(false), &cond, &JoinOptions::default()).unwrap();
    assert_eq!(vec!["1", "2", "3", "4"], column_strings(&out.table, "q.x"));
    assert_eq!(vec!["1", "2", "3", "4"], column_strings(&out.table, "q.y"));
}

#[test]
fn overlap_self_join() {
    let cond: JoinCondition = "overlaps(start, end, start, end), q < q".parse().unwrap();

    let clean = quarters(false);
    let out = inner_join(&clean, &clean, &cond, &JoinOptions::default()).unwrap();
    assert_eq!(0, out.table.num_rows());

    let messy = quarters(true);
    let out = inner_join(&messy, &messy, &cond, &JoinOptions::default()).unwrap();
    assert_eq!(1, out.table.num_rows());
    assert_eq!(vec!["1"], column_strings(&out.table, "q.x"));
    assert_eq!(vec!["2"], column_strings(&out.table, "q.y"));
}

#[test]
fn shifted_window_join() {
    // Sales within a week after each party.
    let sales = table(
        &[("sold", DataType::Date), ("amount", DataType::Int64)],
        vec![
            vec![date(2022, 1, 12), 10.into()],
            vec![date(2022, 1, 20), 20.into()],
            vec![date(2022, 4, 4), 30.into()],
        ],
    );
    let cond: JoinCondition = "party <= sold, party + 7 >= sold".parse().unwrap();
    let out = semi_join(&parties(), &sales, &cond, &JoinOptions::default()).unwrap();
    assert_eq!(vec!["1", "2"], column_strings(&out.table, "q"));
}

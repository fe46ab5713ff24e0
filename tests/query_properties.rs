//! Query driver round-trip: `filter_map`/`filter_collect` match `where_rows`
//! directly, partition raze preserves row counts, and `select` tears down
//! its context frame whether it succeeds or fails.

use rayforce::aggregate::{AggFunc, AggSpec};
use rayforce::query::{filter_collect, filter_map, select, where_rows, QueryContext, QuerySpec};
use rayforce::types::object::ObjData;
use rayforce::types::symbol::SymbolTable;
use rayforce::types::table::{table, table_column, vector_i64};
use std::sync::Arc;

fn sample() -> rayforce::ObjRef {
    table(vec![
        ("id".into(), vector_i64(vec![1, 2, 3, 4, 5])),
        ("active".into(), vector_i64(vec![1, 0, 1, 0, 1])),
    ])
    .unwrap()
}

#[test]
fn filter_collect_matches_direct_where_rows() {
    let t = sample();
    let direct_rows = where_rows(&t, "active").unwrap();

    let lazy = filter_map(t, "active".to_string());
    let collected = filter_collect(&lazy).unwrap();
    assert_eq!(collected.len(), direct_rows.len());
}

#[test]
fn filter_collect_on_plain_table_is_identity() {
    let t = sample();
    let rows_before = t.len();
    let collected = filter_collect(&t).unwrap();
    assert_eq!(collected.len(), rows_before);
}

#[test]
fn select_pipeline_groups_filters_and_projects() {
    let t = table(vec![
        ("customer".into(), vector_i64(vec![1, 1, 2, 2])),
        ("amount".into(), vector_i64(vec![100, 50, 10, 10])),
        ("paid".into(), vector_i64(vec![1, 0, 1, 1])),
    ])
    .unwrap();

    let ctx = QueryContext::root(Arc::new(SymbolTable::new()));
    let spec = QuerySpec {
        where_pred: Some("paid".to_string()),
        by: Some(vec!["customer".to_string()]),
        agg_specs: vec![AggSpec { func: AggFunc::Sum, input_col: "amount".into(), output_name: "total".into() }],
        take: None,
        project: Some(vec!["customer".to_string(), "total".to_string()]),
    };
    let (ctx, result) = select(ctx, t, &spec, None);
    let result = result.unwrap();
    assert!(ctx.current_table().is_none());

    let ObjData::I64(customers) = table_column(&result, "customer").unwrap().data() else { unreachable!() };
    let ObjData::I64(totals) = table_column(&result, "total").unwrap().data() else { unreachable!() };
    for (c, t) in customers.iter().zip(totals.iter()) {
        match c {
            1 => assert_eq!(*t, 100),
            2 => assert_eq!(*t, 20),
            other => panic!("unexpected customer {other}"),
        }
    }
}

#[test]
fn select_take_caps_row_count() {
    let t = sample();
    let ctx = QueryContext::root(Arc::new(SymbolTable::new()));
    let spec = QuerySpec { take: Some(2), ..Default::default() };
    let (_, result) = select(ctx, t, &spec, None);
    assert_eq!(result.unwrap().len(), 2);
}

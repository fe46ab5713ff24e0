//! Rayforce smoke-test binary: builds a `VmConfig`/`WorkerPool`/`Heap`,
//! loads a couple of in-memory tables, runs a `select`-style query through
//! the query driver, and prints the result table. Not a REPL — the Lisp
//! reader/evaluator is out of scope for this core.

use clap::Parser;
use rayforce::aggregate::{AggFunc, AggSpec};
use rayforce::heap::{Heap, HeapConfig};
use rayforce::query::{select, QueryContext, QuerySpec};
use rayforce::types::object::ObjData;
use rayforce::types::symbol::SymbolTable;
use rayforce::types::table::{table, table_column, vector_i64};
use rayforce::{ObjRef, VmConfig, WorkerPool};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rayforce", about = "Rayforce query execution core smoke test")]
struct Cli {
    /// Override the default worker count (num_cpus - 1).
    #[arg(long)]
    workers: Option<usize>,
}

fn orders_table() -> ObjRef {
    table(vec![
        ("customer".into(), vector_i64(vec![1, 1, 2, 2, 3])),
        ("amount".into(), vector_i64(vec![100, 250, 40, 60, 500])),
        ("paid".into(), vector_i64(vec![1, 1, 0, 1, 1])),
    ])
    .expect("fixed-width columns")
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match cli.workers {
        Some(n) => VmConfig::default().with_worker_count(n),
        None => VmConfig::default(),
    };

    let pool = WorkerPool::new(config.worker_count);
    log::info!("rayforce smoke test starting with {} workers", pool.worker_count());
    let mut heap = Heap::new(HeapConfig::default()).expect("initial heap pool allocation");

    let symbols = Arc::new(SymbolTable::new());
    let ctx = QueryContext::root(symbols);

    let spec = QuerySpec {
        where_pred: Some("paid".to_string()),
        by: Some(vec!["customer".to_string()]),
        agg_specs: vec![AggSpec { func: AggFunc::Sum, input_col: "amount".into(), output_name: "total_paid".into() }],
        take: None,
        project: None,
    };

    let (_, result) = select(ctx, orders_table(), &spec, Some((&pool, &mut heap)));
    match result {
        Ok(table) => print_table(&table),
        Err(err) => eprintln!("query failed: {}", err),
    }
    pool.shutdown();
}

fn print_table(t: &ObjRef) {
    let ObjData::Table { columns } = t.data() else {
        eprintln!("expected a table");
        return;
    };
    let header: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    println!("{}", header.join("\t"));
    let rows = t.len();
    for row in 0..rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|(name, _)| {
                let col = table_column(t, name).expect("column exists");
                format_cell(col.data(), row)
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
}

fn format_cell(data: &ObjData, row: usize) -> String {
    match data {
        ObjData::I64(v) => v[row].to_string(),
        ObjData::I32(v) => v[row].to_string(),
        ObjData::F64(v) => v[row].to_string(),
        ObjData::U8(v) | ObjData::B8(v) => v[row].to_string(),
        _ => "?".to_string(),
    }
}

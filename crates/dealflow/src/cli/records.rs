//! `dealflow list`, `dealflow delete` and `dealflow export`.

use crate::cli::error::HelpfulError;
use crate::cli::output::print_record_page;
use crate::cli::{build_client, helpful, resolve_config, runtime, GlobalArgs};
use dealflow::export::{default_export_path, export_to_path};
use dealflow::table::{total_pages, PageError};
use dealflow::{
    DashboardConfig, Record, RecordStore, SortDirection, SortKey, TableEngine, ViewState,
};
use serde::Serialize;
use std::path::PathBuf;

/// Filter and sort options shared by `list` and `export`.
#[derive(Debug, Clone, Default)]
pub struct ViewArgs {
    pub min_interactions: Option<u32>,
    pub sort: SortKey,
    pub desc: bool,
}

impl ViewArgs {
    fn view_state(&self, page_size: usize) -> ViewState {
        let mut view = ViewState::new(page_size);
        view.set_min_interactions(self.min_interactions);
        let direction = if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        view.set_sort(self.sort, direction);
        view
    }
}

#[derive(Debug, Clone)]
pub struct ListArgs {
    pub view: ViewArgs,
    pub page: usize,
    pub page_size: Option<usize>,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub view: ViewArgs,
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    page: usize,
    page_size: usize,
    total_pages: usize,
    filtered_count: usize,
    total_count: usize,
    records: &'a [&'a Record],
}

pub fn list(global: &GlobalArgs, args: ListArgs) -> anyhow::Result<()> {
    let config = resolve_config(global, args.page_size)?;
    runtime()?.block_on(list_async(&config, args))
}

async fn list_async(config: &DashboardConfig, args: ListArgs) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let store = RecordStore::new(&client);
    store.load().await.map_err(helpful(config))?;
    let snapshot = store.snapshot();

    let mut view = args.view.view_state(config.table.page_size);
    let mut engine = TableEngine::new();
    let filtered = engine
        .filtered(&snapshot.records, snapshot.generation, &view)
        .len();
    view.go_to_page(args.page, total_pages(filtered, view.page_size()))
        .map_err(|err| match err {
            PageError::OutOfRange {
                requested,
                total_pages,
            } => HelpfulError::page_out_of_range(requested, total_pages),
        })?;

    let page = engine.page(&snapshot.records, snapshot.generation, &view);
    if args.json {
        let output = ListOutput {
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages.max(1),
            filtered_count: page.filtered_count,
            total_count: page.total_count,
            records: &page.rows,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_record_page(&page);
    }
    Ok(())
}

pub fn delete(global: &GlobalArgs, name: String) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    runtime()?.block_on(async {
        let client = build_client(&config)?;
        let store = RecordStore::new(&client);
        store.delete(&name).await.map_err(helpful(&config))?;
        println!("Deleted '{}'.", name);
        Ok::<(), anyhow::Error>(())
    })
}

pub fn export(global: &GlobalArgs, args: ExportArgs) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    runtime()?.block_on(export_async(&config, args))
}

async fn export_async(config: &DashboardConfig, args: ExportArgs) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let store = RecordStore::new(&client);
    store.load().await.map_err(helpful(config))?;
    let snapshot = store.snapshot();

    let view = args.view.view_state(config.table.page_size);
    let rows = TableEngine::new().filtered(&snapshot.records, snapshot.generation, &view);

    let path = args
        .output
        .unwrap_or_else(|| default_export_path(&config.export_dir()));
    let written = export_to_path(&path, rows).map_err(|e| HelpfulError::export_failed(&e))?;
    println!("Exported {} records to {}", written, path.display());
    Ok(())
}

//! Table view engine: filter, sort and page window over the held records.

use crate::record::Record;
use dealflow_protocol::defaults::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    FirstInteraction,
    LastInteraction,
    TotalInteractions,
    Contact,
    AnalysisDate,
}

impl SortKey {
    /// Column heading used by the table and the CSV export.
    pub fn heading(&self) -> &'static str {
        match self {
            SortKey::Name => "Name",
            SortKey::FirstInteraction => "First Interaction",
            SortKey::LastInteraction => "Last Interaction",
            SortKey::TotalInteractions => "Total Interactions",
            SortKey::Contact => "Company Contact",
            SortKey::AnalysisDate => "Analysis Date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page {requested} is out of range (valid pages: 1..={total_pages})")]
    OutOfRange { requested: usize, total_pages: usize },
}

/// Client-side filter, sort and pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    min_interactions: Option<u32>,
    sort_key: SortKey,
    sort_direction: SortDirection,
    page: usize,
    page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    /// A zero page size is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            min_interactions: None,
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn min_interactions(&self) -> Option<u32> {
        self.min_interactions
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the filter returns to the first page.
    pub fn set_min_interactions(&mut self, min_interactions: Option<u32>) {
        if self.min_interactions != min_interactions {
            self.min_interactions = min_interactions;
            self.page = 1;
        }
    }

    /// Same column flips the direction; a new column sorts ascending.
    pub fn toggle_sort(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_key = key;
            self.sort_direction = SortDirection::Asc;
        }
    }

    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.sort_key = key;
        self.sort_direction = direction;
    }

    /// Move to `page`. Out-of-range requests leave the current page untouched.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) -> Result<(), PageError> {
        let last = total_pages.max(1);
        if page == 0 || page > last {
            return Err(PageError::OutOfRange {
                requested: page,
                total_pages: last,
            });
        }
        self.page = page;
        Ok(())
    }

    pub fn next_page(&mut self, total_pages: usize) -> Result<(), PageError> {
        self.go_to_page(self.page + 1, total_pages)
    }

    pub fn previous_page(&mut self, total_pages: usize) -> Result<(), PageError> {
        self.go_to_page(self.page.saturating_sub(1), total_pages)
    }

    fn passes_filter(&self, record: &Record) -> bool {
        self.min_interactions
            .map_or(true, |min| record.total_interactions >= min)
    }
}

/// One rendered page of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage<'a> {
    pub rows: Vec<&'a Record>,
    pub page: usize,
    pub page_size: usize,
    /// `ceil(filtered_count / page_size)`; zero when nothing passes the filter.
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
}

impl TablePage<'_> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 1-based position of the first row, for "showing X-Y of Z" footers.
    pub fn first_row_number(&self) -> usize {
        (self.page - 1) * self.page_size + 1
    }
}

pub fn total_pages(filtered_count: usize, page_size: usize) -> usize {
    filtered_count.div_ceil(page_size.max(1))
}

/// Ordering for `key` and `direction`, ties broken by name ascending.
pub fn compare_records(
    a: &Record,
    b: &Record,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    let primary = match key {
        SortKey::Name => compare_text(&a.name, &b.name),
        SortKey::FirstInteraction => a.first_interaction.cmp(&b.first_interaction),
        SortKey::LastInteraction => a.last_interaction.cmp(&b.last_interaction),
        SortKey::TotalInteractions => a.total_interactions.cmp(&b.total_interactions),
        SortKey::Contact => compare_text(&a.contact, &b.contact),
        SortKey::AnalysisDate => a.analysis_date.cmp(&b.analysis_date),
    };
    let primary = match direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| a.name.cmp(&b.name))
}

/// Case-insensitive first so "acme" sorts beside "Acme".
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filtered and sorted view of `records`.
pub fn filter_and_sort<'a>(records: &'a [Record], view: &ViewState) -> Vec<&'a Record> {
    let mut rows: Vec<&Record> = records
        .iter()
        .filter(|record| view.passes_filter(record))
        .collect();
    rows.sort_by(|a, b| compare_records(a, b, view.sort_key, view.sort_direction));
    rows
}

/// Filter, sort and cut the page `view` points at.
pub fn derive_page<'a>(records: &'a [Record], view: &ViewState) -> TablePage<'a> {
    let rows = filter_and_sort(records, view);
    page_of(rows, records.len(), view)
}

fn page_of<'a>(rows: Vec<&'a Record>, total_count: usize, view: &ViewState) -> TablePage<'a> {
    let filtered_count = rows.len();
    let start = (view.page - 1).saturating_mul(view.page_size);
    let page_rows = rows
        .into_iter()
        .skip(start)
        .take(view.page_size)
        .collect();
    TablePage {
        rows: page_rows,
        page: view.page,
        page_size: view.page_size,
        total_pages: total_pages(filtered_count, view.page_size),
        filtered_count,
        total_count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoKey {
    generation: u64,
    min_interactions: Option<u32>,
    sort_key: SortKey,
    sort_direction: SortDirection,
}

/// Memoizes the filtered row order per (store generation, filter, sort).
///
/// Callers must pass the generation that belongs to `records`; page slicing is
/// recomputed on every call.
#[derive(Debug, Default)]
pub struct TableEngine {
    memo: Option<(MemoKey, Vec<usize>)>,
    recomputations: u64,
}

impl TableEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page<'a>(
        &mut self,
        records: &'a [Record],
        generation: u64,
        view: &ViewState,
    ) -> TablePage<'a> {
        let rows = self.filtered(records, generation, view);
        page_of(rows, records.len(), view)
    }

    pub fn filtered<'a>(
        &mut self,
        records: &'a [Record],
        generation: u64,
        view: &ViewState,
    ) -> Vec<&'a Record> {
        let key = MemoKey {
            generation,
            min_interactions: view.min_interactions,
            sort_key: view.sort_key,
            sort_direction: view.sort_direction,
        };

        let cached = matches!(&self.memo, Some((memo_key, _)) if *memo_key == key);
        if !cached {
            let mut order: Vec<usize> = (0..records.len())
                .filter(|&idx| view.passes_filter(&records[idx]))
                .collect();
            order.sort_by(|&a, &b| {
                compare_records(&records[a], &records[b], view.sort_key, view.sort_direction)
            });
            self.memo = Some((key, order));
            self.recomputations += 1;
        }

        match &self.memo {
            Some((_, order)) => order.iter().filter_map(|&idx| records.get(idx)).collect(),
            None => Vec::new(),
        }
    }

    /// How many times the row order has been rebuilt.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

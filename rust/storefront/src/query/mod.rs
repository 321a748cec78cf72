//! Product filter planning.
//!
//! A [`QueryPlan`] is built once per search and rendered twice: the data query carries ordering
//! and the page window, the count query carries neither. Both read the same `WHERE` clause and
//! the same bind list, so one `binds` vector serves both statements.

mod params;

pub use params::FilterParams;

use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use serde::Serialize;

pub(crate) const PRODUCT_COLUMNS: &str =
    "p.id, p.title, p.images, p.rating, p.price, b.name AS brand, c.name AS category";

pub(crate) const PRODUCT_JOINS: &str =
    "FROM product p JOIN brand b ON p.brand_id = b.id JOIN category c ON p.category_id = c.id";

const SEARCH_DOCUMENT: &str = "to_tsvector(p.title || ' ' || b.name || ' ' || c.name)";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    Text(String),
    Float(f64),
}

impl BindValue {
    pub(crate) fn apply<'a>(
        &self,
        query: BoxedSqlQuery<'a, Pg, SqlQuery>,
    ) -> BoxedSqlQuery<'a, Pg, SqlQuery> {
        use diesel::sql_types::{Float8, Text};
        match self {
            BindValue::Text(value) => query.bind::<Text, _>(value.clone()),
            BindValue::Float(value) => query.bind::<Float8, _>(*value),
        }
    }
}

/// One boolean condition plus the values its placeholders consume, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateFragment {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub limit: u64,
    pub offset: u64,
}

impl PageWindow {
    /// Both `page` and `limit` must be present and non-zero; anything else yields no window.
    pub fn from_page(page: Option<u32>, limit: Option<u32>) -> Option<Self> {
        match (page, limit) {
            (Some(page), Some(limit)) if page > 0 && limit > 0 => {
                let limit = u64::from(limit);
                Some(Self {
                    limit,
                    offset: (u64::from(page) - 1) * limit,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub where_clause: Option<String>,
    pub binds: Vec<BindValue>,
    pub page: Option<PageWindow>,
    /// Placeholder number bound to the normalized text query, reused for ranking.
    text_slot: Option<usize>,
}

impl QueryPlan {
    pub fn data_sql(&self) -> String {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} {PRODUCT_JOINS}");
        self.push_where(&mut sql);

        match self.text_slot {
            Some(slot) => sql.push_str(&format!(
                " ORDER BY ts_rank({SEARCH_DOCUMENT}, plainto_tsquery(${slot})) DESC, p.id ASC"
            )),
            None => sql.push_str(" ORDER BY p.id ASC"),
        }

        if let Some(PageWindow { limit, offset }) = self.page {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }

        sql
    }

    pub fn count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(p.id) AS total_count {PRODUCT_JOINS}");
        self.push_where(&mut sql);
        sql
    }

    fn push_where(&self, sql: &mut String) {
        if let Some(clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
    }
}

#[derive(Debug, Default)]
struct FragmentList {
    fragments: Vec<PredicateFragment>,
    last_slot: usize,
}

impl FragmentList {
    fn next_slot(&mut self) -> usize {
        self.last_slot += 1;
        self.last_slot
    }

    fn push_in_list(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }

        let mut slots = Vec::with_capacity(values.len());
        let mut binds = Vec::with_capacity(values.len());
        for value in values {
            slots.push(format!("${}", self.next_slot()));
            binds.push(BindValue::Text(value.clone()));
        }

        self.fragments.push(PredicateFragment {
            sql: format!("{column} IN ({})", slots.join(", ")),
            binds,
        });
    }

    fn push_comparison(&mut self, column: &str, op: &str, value: f64) {
        let slot = self.next_slot();
        self.fragments.push(PredicateFragment {
            sql: format!("{column} {op} ${slot}"),
            binds: vec![BindValue::Float(value)],
        });
    }

    fn push_text_match(&mut self, text: String) -> usize {
        let slot = self.next_slot();
        self.fragments.push(PredicateFragment {
            sql: format!("{SEARCH_DOCUMENT} @@ plainto_tsquery(${slot})"),
            binds: vec![BindValue::Text(text)],
        });
        slot
    }

    fn finish(self) -> (Option<String>, Vec<BindValue>) {
        if self.fragments.is_empty() {
            return (None, Vec::new());
        }

        let mut clauses = Vec::with_capacity(self.fragments.len());
        let mut binds = Vec::with_capacity(self.last_slot);
        for fragment in self.fragments {
            clauses.push(fragment.sql);
            binds.extend(fragment.binds);
        }

        (Some(clauses.join(" AND ")), binds)
    }
}

/// Builds the shared plan. Fragment order is fixed: brand, category, minimum price, maximum
/// price, text.
pub fn build_query_plan(params: &FilterParams) -> QueryPlan {
    let mut fragments = FragmentList::default();

    if let Some(brands) = &params.brand {
        fragments.push_in_list("b.name", brands);
    }

    if let Some(categories) = &params.category {
        fragments.push_in_list("c.name", categories);
    }

    if let Some(min) = params.price_gte {
        fragments.push_comparison("p.price", ">=", min);
    }

    if let Some(max) = params.price_lte {
        fragments.push_comparison("p.price", "<=", max);
    }

    let text_slot = params
        .normalized_text()
        .map(|text| fragments.push_text_match(text));

    let (where_clause, binds) = fragments.finish();

    QueryPlan {
        where_clause,
        binds,
        page: PageWindow::from_page(params.page, params.limit),
        text_slot,
    }
}

pub(crate) fn product_by_id_sql() -> String {
    format!("SELECT {PRODUCT_COLUMNS} {PRODUCT_JOINS} WHERE p.id = $1")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub sql: String,
    pub count_sql: String,
    pub params: Vec<BindValue>,
}

pub fn translate(params: &FilterParams) -> TranslateResponse {
    let plan = build_query_plan(params);
    TranslateResponse {
        sql: plan.data_sql(),
        count_sql: plan.count_sql(),
        params: plan.binds,
    }
}

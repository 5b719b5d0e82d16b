use pgcat_wire::{ListEnvelope, PaginationInfo};
use tokio_postgres::Row;

/// Builds the outbound list shape (spec.md §4.H): `{results, total,
/// pagination}`. The compiled query already folds the total count into the
/// same round-trip via `count(*) OVER()`, so an empty result set still
/// needs an explicit fallback to zero.
///
/// Open question (spec.md §9) resolved: `total` is reported identically in
/// both the top-level field and `pagination.total` — a single source of
/// truth is simpler for clients than two numbers that could disagree.
pub fn build_list_envelope(rows: &[Row], limit: i64, offset: i64) -> ListEnvelope<serde_json::Value> {
    let total = rows
        .first()
        .map(|r| r.get::<_, i64>("__total_count"))
        .unwrap_or(0);

    let results = rows
        .iter()
        .map(|r| r.get::<_, serde_json::Value>("__row"))
        .collect::<Vec<_>>();

    let has_more = offset + (results.len() as i64) < total;

    ListEnvelope {
        results,
        total,
        pagination: PaginationInfo {
            limit,
            offset,
            total,
            has_more,
        },
    }
}

// ── Result normalization ──
//
// Raw device rows to caller-facing rows, tagged with their menu.

use tikly_api::RawRow;

use crate::convert::CaseConvention;
use crate::model::{MenuPath, Row};

/// Normalize every row of one reply, keeping device order.
pub fn normalize(rows: &[RawRow], menu: &MenuPath, case: CaseConvention) -> Vec<Row> {
    rows.iter().map(|raw| Row::from_raw(raw, menu, case)).collect()
}

/// Reorder `rows` to follow `ids`, dropping rows with no id in the list.
pub(crate) fn order_by_ids(rows: Vec<Row>, ids: &[String]) -> Vec<Row> {
    let mut slots: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
    ids.iter()
        .filter_map(|id| {
            slots
                .iter_mut()
                .find(|slot| slot.as_ref().and_then(Row::id) == Some(id.as_str()))
                .and_then(Option::take)
        })
        .collect()
}

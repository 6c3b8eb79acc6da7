//! Header/line-item join.
//!
//! Line items are the driving side: every line item yields exactly one
//! transaction, with the header sharing its document key attached as a
//! dimension lookup. Unmatched line items keep a `None` header; unmatched
//! headers contribute nothing. Duplicate line-item keys pass through
//! unchanged — de-duplication is not this stage's concern.

use crate::core::{DocumentKey, HeaderAttributes, HeaderRecord, LineItemRecord, Transaction};
use std::collections::HashMap;

/// Join line items against headers on (company code, document number,
/// fiscal year). Output cardinality always equals the line-item count.
pub fn join_transactions(
    headers: &[HeaderRecord],
    line_items: Vec<LineItemRecord>,
) -> Vec<Transaction> {
    let index = build_header_index(headers);

    line_items
        .into_iter()
        .map(|line| {
            let header = index.get(&line.key).map(|h| HeaderAttributes::from(*h));
            Transaction {
                key: line.key,
                line_number: line.line_number,
                account: line.account,
                cost_center: line.cost_center,
                amount: line.amount,
                header,
            }
        })
        .collect()
}

/// Index headers by document key. When several headers share a key the
/// first occurrence wins; the join is a lookup, not a cross product.
fn build_header_index(headers: &[HeaderRecord]) -> HashMap<&DocumentKey, &HeaderRecord> {
    let mut index: HashMap<&DocumentKey, &HeaderRecord> = HashMap::with_capacity(headers.len());
    for header in headers {
        index.entry(&header.key).or_insert(header);
    }
    index
}

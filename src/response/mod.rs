//! Decoding of aggregation results into series or tables.
//!
//! Both decoders take any iterator of `Result<Document, DsError>` and consume it in a single
//! forward pass, holding only their accumulator.

mod table;
mod timeseries;

pub use table::{TableAccumulator, classify, decode_table};
pub use timeseries::{SeriesAccumulator, decode_timeseries};

use bson::Document;

use crate::errors::DsError;
use crate::types::{QueryResult, ResultKind};

/// Decode `docs` according to `kind` into the result for `ref_id`.
///
/// # Errors
/// `Decode` or `UnsupportedType` from the selected decoder, or any error the cursor yields.
pub fn decode<I>(kind: ResultKind, ref_id: &str, docs: I) -> Result<QueryResult, DsError>
where
    I: IntoIterator<Item = Result<Document, DsError>>,
{
    match kind {
        ResultKind::Timeserie => Ok(QueryResult::series(ref_id, decode_timeseries(docs)?)),
        ResultKind::Table => Ok(QueryResult::table(ref_id, decode_table(docs)?)),
    }
}

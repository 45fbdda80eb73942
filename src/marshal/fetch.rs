//! Row fetch and decode pipeline.
//!
//! One native row at a time lands in the define buffers; `push_row` turns
//! the buffers into a dynamic row value keyed by column name. Large objects
//! are pulled through the locator with a single full-length streamed read.

use crate::error::{Error, Result};
use crate::marshal::bind::alloc_buffer;
use crate::marshal::define::{Define, DefineBuffer, DefineKind};
use crate::oci::api::{FetchOutcome, OciApi, StmtHandle};
use crate::value::{Table, Value};

/// Fetch one row into the define buffers.
///
/// Returns `false` on exhaustion; the caller is then responsible for
/// releasing the defines and the statement. Any other non-success status is
/// an error.
pub async fn fetch_row<A: OciApi>(
    api: &mut A,
    stmt: StmtHandle,
    defines: &mut [Define],
) -> Result<bool> {
    match api.stmt_fetch(stmt, defines).await? {
        FetchOutcome::Row => Ok(true),
        FetchOutcome::NoData => Ok(false),
    }
}

/// Decode the fetched row: one dynamic value per column, keyed by column
/// name, in column order.
pub async fn push_row<A: OciApi>(api: &mut A, defines: &[Define]) -> Result<Table> {
    let mut row = Table::new();
    for define in defines {
        let value = decode_column(api, define).await?;
        row.set(define.name.clone(), value);
    }
    Ok(row)
}

async fn decode_column<A: OciApi>(api: &mut A, define: &Define) -> Result<Value> {
    match (define.kind, &define.buffer) {
        (DefineKind::Text | DefineKind::Other, DefineBuffer::Text { buf, len }) => {
            let end = (*len as usize).min(buf.len());
            let text = String::from_utf8(buf[..end].to_vec()).map_err(|_| {
                Error::type_conversion(format!("column {} is not valid UTF-8", define.name))
            })?;
            Ok(Value::String(text))
        }

        (DefineKind::Number, DefineBuffer::Number(num)) => {
            // Integer-valued numbers stay exact; everything else becomes a
            // float.
            if num.is_int()? {
                Ok(Value::Integer(num.to_i64()?))
            } else {
                Ok(Value::Number(num.to_f64()?))
            }
        }

        (DefineKind::Double, DefineBuffer::Int(i)) => Ok(Value::Number(*i as f64)),

        (DefineKind::Unsigned, DefineBuffer::Uint(u)) => Ok(Value::Integer(*u as i64)),

        (DefineKind::Signed, DefineBuffer::Int(i)) => Ok(Value::Integer(*i)),

        (DefineKind::Blob, DefineBuffer::Lob(lob)) => {
            let length = api.lob_length(*lob)?;
            let mut scratch = alloc_buffer(length as usize)?;
            let read = api.lob_read(*lob, &mut scratch, 0).await?;
            scratch.truncate(read as usize);
            Ok(Value::Bytes(scratch))
        }

        (DefineKind::Clob, DefineBuffer::Lob(lob)) => {
            let csform = api.lob_charset_form(*lob)?;
            let length = api.lob_length(*lob)?;
            // Headroom for multi-byte character expansion.
            let mut scratch = alloc_buffer(length as usize * 4)?;
            let read = api.lob_read(*lob, &mut scratch, csform).await?;
            scratch.truncate(read as usize);
            let text = String::from_utf8(scratch).map_err(|_| {
                Error::type_conversion(format!("column {} is not valid UTF-8", define.name))
            })?;
            Ok(Value::String(text))
        }

        (kind, _) => Err(Error::unreachable(format!(
            "invalid DEFINE state for column {} (kind {:?})",
            define.name, kind
        ))),
    }
}

/// Bulk fetch: repeat fetch-then-decode until exhaustion, building a
/// 1-indexed table of row tables. A decode failure propagates and discards
/// the partially built container.
pub async fn fetch_and_push_all<A: OciApi>(
    api: &mut A,
    stmt: StmtHandle,
    defines: &mut [Define],
) -> Result<Table> {
    let mut rows = Table::new();
    while fetch_row(api, stmt, defines).await? {
        let row = push_row(api, defines).await?;
        rows.push(row);
    }
    Ok(rows)
}

//! Bind descriptors: building, dynamic registration, RETURNING capture and
//! output packaging.
//!
//! A `Bind` carries one parameter through a statement execution. Input flows
//! out through `supply_input`, RETURNING output flows back in through
//! `capture_output`; both are invoked by the native interface while
//! `stmt_execute` runs, against descriptor state threaded in explicitly.

use crate::error::{Error, Result};
use crate::oci::api::{BindHandle, OciApi, StmtHandle};
use crate::oci::number::{OciNumber, NUMBER_WIRE_SIZE};
use crate::value::{Table, Value};

/// Allocate an owned buffer of `len` bytes, reporting failure instead of
/// aborting.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::allocation(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Logical bind type, declared to the native interface at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// Fixed-length character data.
    FixedString,
    /// Native decimal number.
    Number,
    /// 64-bit unsigned integer.
    UnsignedInt,
}

/// Typed bind payload. The discriminant is the logical type; every consumer
/// matches on it and never assumes a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// Owned byte buffer for fixed-string binds.
    Str(Vec<u8>),
    /// Native decimal encoding.
    Number(OciNumber),
    /// Unsigned integer payload.
    Uint(u64),
}

impl BindValue {
    /// The logical type of this payload.
    pub fn kind(&self) -> BindKind {
        match self {
            BindValue::Str(_) => BindKind::FixedString,
            BindValue::Number(_) => BindKind::Number,
            BindValue::Uint(_) => BindKind::UnsignedInt,
        }
    }

    /// A zeroed payload of the same logical type.
    fn zeroed(kind: BindKind) -> Self {
        match kind {
            BindKind::FixedString => BindValue::Str(Vec::new()),
            BindKind::Number => BindValue::Number(OciNumber::zero()),
            BindKind::UnsignedInt => BindValue::Uint(0),
        }
    }
}

/// One RETURNING output slot: a (parameter, returned-row) pair.
#[derive(Debug, Clone)]
pub struct BindReturn {
    /// Typed payload, same family as the parent bind.
    pub value: BindValue,
    /// Returned byte length.
    pub rlen: u32,
    /// Per-row native status code.
    pub rcode: u16,
    /// Per-row null indicator.
    pub indicator: i16,
}

/// One input parameter of the current statement.
#[derive(Debug, Clone)]
pub struct Bind {
    /// Placeholder name in the statement text.
    pub name: String,
    /// Typed payload.
    pub value: BindValue,
    /// Null indicator: -1 null, 0 present.
    pub indicator: i16,
    /// Byte length declared to the native bind call.
    pub declared_len: u32,
    /// Native bind handle, held from registration until teardown.
    pub handle: Option<BindHandle>,
    /// RETURNING output slots, sized at execute time.
    pub returns: Vec<BindReturn>,
}

impl Bind {
    fn null_string(name: String) -> Self {
        Self {
            name,
            value: BindValue::Str(Vec::new()),
            indicator: -1,
            declared_len: 0,
            handle: None,
            returns: Vec::new(),
        }
    }

    /// The logical bind type.
    pub fn kind(&self) -> BindKind {
        self.value.kind()
    }

    /// Number of RETURNING rows this bind produced.
    pub fn rows_returned(&self) -> usize {
        self.returns.len()
    }
}

/// Encode a host value as a numeric payload.
fn numeric_payload(value: &Value) -> Result<OciNumber> {
    match value {
        Value::Integer(i) => OciNumber::from_i64(*i),
        Value::Number(n) => OciNumber::from_f64(*n),
        Value::Boolean(b) => OciNumber::from_i64(if *b { 1 } else { 0 }),
        Value::String(s) => OciNumber::from_str(s.trim()),
        other => Err(Error::type_conversion(format!(
            "cannot bind {:?} as number",
            other
        ))),
    }
}

/// Copy a host value's byte representation into an owned string payload.
fn string_payload(value: &Value) -> Result<Vec<u8>> {
    let bytes = value
        .to_text_bytes()
        .ok_or_else(|| Error::type_conversion(format!("cannot bind {:?} as string", value)))?;
    let mut buf = alloc_buffer(bytes.len())?;
    buf.copy_from_slice(&bytes);
    Ok(buf)
}

/// Fill `bind` from a present (non-nil) value by its dynamic kind.
fn infer_from_value(bind: &mut Bind, value: &Value) -> Result<()> {
    bind.indicator = 0;
    match value {
        Value::Integer(_) | Value::Number(_) => {
            bind.value = BindValue::Number(numeric_payload(value)?);
            bind.declared_len = NUMBER_WIRE_SIZE;
        }
        Value::Boolean(b) => {
            bind.value = BindValue::Uint(if *b { 1 } else { 0 });
            bind.declared_len = std::mem::size_of::<u64>() as u32;
        }
        _ => {
            let buf = string_payload(value)?;
            bind.declared_len = buf.len() as u32;
            bind.value = BindValue::Str(buf);
        }
    }
    Ok(())
}

/// Build one bind descriptor from a parameter entry.
fn build_one(name: String, param: &Value) -> Result<Bind> {
    let mut bind = Bind::null_string(name);

    match param {
        // Binding spec: { value = ..., type = ..., size = ... }.
        Value::Table(spec) => {
            let value = spec.get_str("value").cloned().unwrap_or(Value::Nil);
            if !value.is_nil() {
                infer_from_value(&mut bind, &value)?;
            }

            // An explicit type literal overrides inference; unrecognized
            // literals fall back to fixed-string.
            if let Some(Value::String(literal)) = spec.get_str("type") {
                match literal.as_str() {
                    "number" => {
                        if bind.indicator == 0 {
                            bind.value = BindValue::Number(numeric_payload(&value)?);
                        } else {
                            bind.value = BindValue::Number(OciNumber::zero());
                        }
                        bind.declared_len = NUMBER_WIRE_SIZE;
                    }
                    _ => {
                        if bind.indicator == 0 {
                            let buf = string_payload(&value)?;
                            bind.declared_len = buf.len() as u32;
                            bind.value = BindValue::Str(buf);
                        } else {
                            bind.value = BindValue::Str(Vec::new());
                            bind.declared_len = 0;
                        }
                    }
                }
            }

            // The size hint applies to fixed-string binds only and sets the
            // declared length (RETURNING slots are sized from it).
            if bind.kind() == BindKind::FixedString {
                if let Some(size) = spec.get_str("size").and_then(Value::to_i64) {
                    bind.declared_len = size as u32;
                }
            }
        }
        // Bare nil binds as a null string.
        Value::Nil => {}
        // Bare scalar: infer from its kind.
        scalar => infer_from_value(&mut bind, scalar)?,
    }

    Ok(bind)
}

/// Bind Builder: one descriptor per parameter entry, appended in iteration
/// order, growing the array one element at a time.
///
/// On failure the already-built descriptors stay in `binds`; the caller is
/// responsible for running `free_binds`.
pub fn make_binds(params: &Table, binds: &mut Vec<Bind>) -> Result<()> {
    for (key, param) in params.iter() {
        let bind = build_one(key.to_string(), param)?;
        binds.push(bind);
    }
    Ok(())
}

/// Release every descriptor: native bind handles first, then the owned
/// payloads and return slots with them. Idempotent.
pub fn free_binds<A: OciApi>(api: &mut A, binds: &mut Vec<Bind>) {
    for bind in binds.drain(..) {
        if let Some(handle) = bind.handle {
            api.bind_release(handle);
        }
    }
}

/// Bind Executor: register every descriptor by name, then attach it for
/// piecewise callback-driven transfer. Processed in build order; the first
/// failure aborts and the caller runs `free_binds`.
pub fn do_binds<A: OciApi>(api: &mut A, stmt: StmtHandle, binds: &mut [Bind]) -> Result<()> {
    for bind in binds.iter_mut() {
        let handle = api.bind_by_name(stmt, &bind.name, bind.kind(), bind.declared_len)?;
        bind.handle = Some(handle);
        api.bind_dynamic(handle)?;
    }
    Ok(())
}

/// Piece framing tag handed to the native interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece {
    /// The whole value in a single piece.
    One,
}

/// Borrowed view of a bind's input payload.
#[derive(Debug)]
pub struct BindInput<'a> {
    /// Typed payload data.
    pub data: BindInputData<'a>,
    /// Payload byte length.
    pub len: u32,
    /// Framing tag.
    pub piece: Piece,
    /// Null indicator.
    pub indicator: i16,
}

/// The typed views an input payload can take.
#[derive(Debug)]
pub enum BindInputData<'a> {
    /// Fixed-string bytes.
    Bytes(&'a [u8]),
    /// Native decimal.
    Number(&'a OciNumber),
    /// Unsigned integer.
    Uint(u64),
}

/// Input-supply callback: pure hand-off of the descriptor's payload, its
/// length, the one-piece tag, and the indicator. No allocation.
pub fn supply_input(bind: &Bind) -> BindInput<'_> {
    let (data, len) = match &bind.value {
        BindValue::Str(buf) => (BindInputData::Bytes(buf.as_slice()), buf.len() as u32),
        BindValue::Number(num) => (BindInputData::Number(num), NUMBER_WIRE_SIZE),
        BindValue::Uint(v) => (BindInputData::Uint(*v), std::mem::size_of::<u64>() as u32),
    };
    BindInput {
        data,
        len,
        piece: Piece::One,
        indicator: bind.indicator,
    }
}

/// Output-capture callback, invoked once per returned row index.
///
/// On index 0 the native interface reports how many rows the statement will
/// return for this bind; a zero count means a PLSQL context where the
/// attribute is not populated and is treated as exactly one row. The return
/// array is then allocated, zero-initialized and recorded. Every invocation
/// sizes the slot to the originally declared bind length and, for
/// fixed-string binds, allocates a fresh owned buffer of that length.
pub fn capture_output(bind: &mut Bind, index: u32, rows_returned: u32) -> Result<&mut BindReturn> {
    if index == 0 {
        let rows = if rows_returned == 0 { 1 } else { rows_returned };
        let mut returns = Vec::new();
        returns
            .try_reserve_exact(rows as usize)
            .map_err(|_| Error::allocation(rows as usize * std::mem::size_of::<BindReturn>()))?;
        for _ in 0..rows {
            returns.push(BindReturn {
                value: BindValue::zeroed(bind.kind()),
                rlen: 0,
                rcode: 0,
                indicator: 0,
            });
        }
        bind.returns = returns;
    }

    let declared_len = bind.declared_len;
    let kind = bind.kind();
    let slot = bind
        .returns
        .get_mut(index as usize)
        .ok_or_else(|| Error::unreachable(format!("bind return index {} out of range", index)))?;

    slot.rlen = declared_len;
    if kind == BindKind::FixedString {
        slot.value = BindValue::Str(alloc_buffer(declared_len as usize)?);
    }
    Ok(slot)
}

/// Decode one return slot into a dynamic value, with the same numeric
/// dual-representation policy as row decoding.
fn decode_return(ret: &BindReturn) -> Result<Value> {
    match &ret.value {
        BindValue::Str(buf) => {
            let end = (ret.rlen as usize).min(buf.len());
            let text = String::from_utf8(buf[..end].to_vec())
                .map_err(|_| Error::type_conversion("returned string is not valid UTF-8"))?;
            Ok(Value::String(text))
        }
        BindValue::Number(num) => {
            if num.is_int()? {
                Ok(Value::Integer(num.to_i64()?))
            } else {
                Ok(Value::Number(num.to_f64()?))
            }
        }
        BindValue::Uint(v) => Ok(Value::Integer(*v as i64)),
    }
}

/// Bind-Output Packager: one entry per bind with a nonzero returned-row
/// count, keyed by bind name, each a 0-indexed table of decoded values.
/// Returns `None` when no bind produced rows, so the caller can omit the
/// result slot entirely.
pub fn push_binds(binds: &[Bind]) -> Result<Option<Table>> {
    let mut out = Table::new();
    let mut produced = 0usize;

    for bind in binds {
        if bind.returns.is_empty() {
            continue;
        }
        produced += 1;
        let mut rows = Table::new();
        for (row, ret) in bind.returns.iter().enumerate() {
            rows.set(row as i64, decode_return(ret)?);
        }
        out.set(bind.name.clone(), rows);
    }

    if produced == 0 {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Key;

    fn build(params: &Table) -> Vec<Bind> {
        let mut binds = Vec::new();
        make_binds(params, &mut binds).unwrap();
        binds
    }

    #[test]
    fn test_scalar_inference() {
        let mut params = Table::new();
        params.set("flag", true);
        params.set("count", 42i64);
        params.set("ratio", 1.5f64);
        params.set("name", "Bob");

        let binds = build(&params);
        assert_eq!(binds.len(), 4);

        assert_eq!(binds[0].kind(), BindKind::UnsignedInt);
        assert_eq!(binds[0].value, BindValue::Uint(1));
        assert_eq!(binds[1].kind(), BindKind::Number);
        assert_eq!(binds[2].kind(), BindKind::Number);
        assert_eq!(binds[3].kind(), BindKind::FixedString);
        assert_eq!(binds[3].value, BindValue::Str(b"Bob".to_vec()));
        assert_eq!(binds[3].declared_len, 3);
        assert!(binds.iter().all(|b| b.indicator == 0));
    }

    #[test]
    fn test_spec_table_value_and_size() {
        let mut spec = Table::new();
        spec.set("value", "abc");
        spec.set("size", 16i64);
        let mut params = Table::new();
        params.set("s", spec);

        let binds = build(&params);
        assert_eq!(binds[0].kind(), BindKind::FixedString);
        assert_eq!(binds[0].value, BindValue::Str(b"abc".to_vec()));
        // The size hint sets the declared length, not the payload.
        assert_eq!(binds[0].declared_len, 16);
    }

    #[test]
    fn test_spec_table_null_bind() {
        let mut params = Table::new();
        params.set("missing", Table::new());

        let binds = build(&params);
        assert_eq!(binds[0].indicator, -1);
        assert_eq!(binds[0].kind(), BindKind::FixedString);
    }

    #[test]
    fn test_explicit_type_overrides_inference() {
        let mut spec = Table::new();
        spec.set("value", "250");
        spec.set("type", "number");
        let mut params = Table::new();
        params.set("n", spec);

        let binds = build(&params);
        assert_eq!(binds[0].kind(), BindKind::Number);
        match &binds[0].value {
            BindValue::Number(num) => assert_eq!(num.to_i64().unwrap(), 250),
            other => panic!("expected number payload, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_type_literal_falls_back_to_string() {
        let mut spec = Table::new();
        spec.set("value", 7i64);
        spec.set("type", "rowid");
        let mut params = Table::new();
        params.set("x", spec);

        let binds = build(&params);
        assert_eq!(binds[0].kind(), BindKind::FixedString);
        assert_eq!(binds[0].value, BindValue::Str(b"7".to_vec()));
    }

    #[test]
    fn test_non_numeric_string_under_number_type_is_an_error() {
        let mut spec = Table::new();
        spec.set("value", "not a number");
        spec.set("type", "number");
        let mut params = Table::new();
        params.set("n", spec);

        let mut binds = Vec::new();
        let err = make_binds(&params, &mut binds).unwrap_err();
        assert!(matches!(err, Error::TypeConversion { .. }));
    }

    #[test]
    fn test_supply_input_hands_off_payload() {
        let mut params = Table::new();
        params.set("name", "xyz");
        let binds = build(&params);

        let input = supply_input(&binds[0]);
        assert_eq!(input.len, 3);
        assert_eq!(input.piece, Piece::One);
        assert_eq!(input.indicator, 0);
        match input.data {
            BindInputData::Bytes(b) => assert_eq!(b, b"xyz"),
            other => panic!("expected byte view, got {:?}", other),
        }
    }

    #[test]
    fn test_capture_output_zero_rows_is_one_row() {
        let mut params = Table::new();
        params.set("id", 1i64);
        let mut binds = build(&params);

        capture_output(&mut binds[0], 0, 0).unwrap();
        assert_eq!(binds[0].rows_returned(), 1);
    }

    #[test]
    fn test_capture_output_sizes_string_slots() {
        let mut spec = Table::new();
        spec.set("value", "seed");
        spec.set("size", 10i64);
        let mut params = Table::new();
        params.set("s", spec);
        let mut binds = build(&params);

        let slot = capture_output(&mut binds[0], 0, 3).unwrap();
        assert_eq!(slot.rlen, 10);
        match &slot.value {
            BindValue::Str(buf) => assert_eq!(buf.len(), 10),
            other => panic!("expected string slot, got {:?}", other),
        }
        assert_eq!(binds[0].rows_returned(), 3);
    }

    #[test]
    fn test_push_binds_none_when_nothing_returned() {
        let mut params = Table::new();
        params.set("a", 1i64);
        let binds = build(&params);
        assert!(push_binds(&binds).unwrap().is_none());
    }

    #[test]
    fn test_push_binds_zero_indexed_rows() {
        let mut params = Table::new();
        params.set("id", 5i64);
        let mut binds = build(&params);

        for index in 0..2u32 {
            let slot = capture_output(&mut binds[0], index, 2).unwrap();
            slot.value = BindValue::Number(OciNumber::from_i64(100 + index as i64).unwrap());
        }

        let out = push_binds(&binds).unwrap().unwrap();
        let rows = out.get_str("id").unwrap().as_table().unwrap();
        assert_eq!(rows.get_int(0), Some(&Value::Integer(100)));
        assert_eq!(rows.get_int(1), Some(&Value::Integer(101)));
        assert_eq!(rows.keys().collect::<Vec<&Key>>().len(), 2);
    }
}

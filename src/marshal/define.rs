//! Define descriptors: result-column description and decode-buffer setup.

use crate::error::Result;
use crate::marshal::bind::alloc_buffer;
use crate::oci::api::{ColumnDesc, DefineHandle, LobLocator, OciApi, StmtHandle};
use crate::oci::constants::*;
use crate::oci::number::OciNumber;

/// Logical column class, mapped from the native type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineKind {
    /// Fixed or variable character data.
    Text,
    /// Native decimal number.
    Number,
    /// REAL/DOUBLE family.
    Double,
    /// Unsigned integer family (octet, 8/16/32).
    Unsigned,
    /// Signed integer family (8/16/32, smallint, integer).
    Signed,
    /// Binary large object.
    Blob,
    /// Character large object.
    Clob,
    /// Unrecognized type code, treated as character data.
    Other,
}

impl DefineKind {
    /// Map a native describe-time type code onto a column class.
    pub fn from_code(code: u16) -> Self {
        match code {
            TYPECODE_VARCHAR | TYPECODE_VARCHAR2 => DefineKind::Text,
            TYPECODE_NUMBER => DefineKind::Number,
            TYPECODE_REAL | TYPECODE_DOUBLE => DefineKind::Double,
            TYPECODE_OCTET | TYPECODE_UNSIGNED8 | TYPECODE_UNSIGNED16 | TYPECODE_UNSIGNED32 => {
                DefineKind::Unsigned
            }
            TYPECODE_SIGNED8 | TYPECODE_SIGNED16 | TYPECODE_SIGNED32 | TYPECODE_SMALLINT
            | TYPECODE_INTEGER => DefineKind::Signed,
            TYPECODE_BLOB => DefineKind::Blob,
            TYPECODE_CLOB => DefineKind::Clob,
            _ => DefineKind::Other,
        }
    }

    /// Internal representation code registered with `define_by_pos`.
    ///
    /// The REAL/DOUBLE family deliberately registers the integer form; see
    /// DESIGN.md.
    pub fn sqlt(&self) -> u16 {
        match self {
            DefineKind::Text | DefineKind::Other => SQLT_AFC,
            DefineKind::Number => SQLT_VNU,
            DefineKind::Double | DefineKind::Signed => SQLT_INT,
            DefineKind::Unsigned => SQLT_UIN,
            DefineKind::Blob => SQLT_BLOB,
            DefineKind::Clob => SQLT_CLOB,
        }
    }
}

/// Decode buffer for one column.
///
/// `None` exists only between describe and define registration; decoding a
/// column whose buffer does not match its kind is a programming-invariant
/// violation, not a data condition.
#[derive(Debug, Clone)]
pub enum DefineBuffer {
    /// Not yet allocated.
    None,
    /// Character buffer plus the actual length of the last fetched value.
    Text { buf: Vec<u8>, len: u16 },
    /// Inline native decimal scalar.
    Number(OciNumber),
    /// Inline signed integer scalar.
    Int(i64),
    /// Inline unsigned integer scalar.
    Uint(u64),
    /// Owned large-object locator; content is pulled at decode time.
    Lob(LobLocator),
}

/// One result-set column.
#[derive(Debug, Clone)]
pub struct Define {
    /// Native define handle, held from registration until teardown.
    pub handle: Option<DefineHandle>,
    /// Column name from native metadata.
    pub name: String,
    /// Raw native type code.
    pub type_code: u16,
    /// Column class.
    pub kind: DefineKind,
    /// Declared width, in characters or bytes per `char_semantics`.
    pub width: u16,
    /// Whether `width` counts characters rather than bytes.
    pub char_semantics: bool,
    /// Decode buffer.
    pub buffer: DefineBuffer,
    /// Null indicator for the last fetched value.
    pub indicator: i16,
}

impl Define {
    fn from_desc(desc: ColumnDesc) -> Self {
        let width = if desc.char_semantics {
            desc.char_width
        } else {
            desc.byte_width
        };
        Self {
            handle: None,
            name: desc.name,
            type_code: desc.type_code,
            kind: DefineKind::from_code(desc.type_code),
            width,
            char_semantics: desc.char_semantics,
            buffer: DefineBuffer::None,
            indicator: 0,
        }
    }
}

/// Column Describer: enumerate columns one-indexed from 1 until the native
/// "no such position" condition, which is swallowed as end-of-columns. Any
/// other failure aborts.
pub fn describe<A: OciApi>(api: &mut A, stmt: StmtHandle) -> Result<Vec<Define>> {
    let mut defines = Vec::new();
    let mut pos = 1u32;
    loop {
        match api.param_get(stmt, pos) {
            Ok(desc) => defines.push(Define::from_desc(desc)),
            Err(err) if err.code == ORA_NO_SUCH_POSITION => break,
            Err(err) => return Err(err.into()),
        }
        pos += 1;
    }
    Ok(defines)
}

/// Column Definer: allocate a type-appropriate decode buffer per column and
/// register it by position.
///
/// Character buffers are sized to 4x the column width to absorb multi-byte
/// expansion. On any failure the partially built array is torn down through
/// `free_defines` before the error is returned.
pub fn make_defines<A: OciApi>(
    api: &mut A,
    stmt: StmtHandle,
    defines: &mut Vec<Define>,
) -> Result<()> {
    for index in 0..defines.len() {
        let pos = index as u32 + 1;
        let kind = defines[index].kind;

        let buffer = match kind {
            DefineKind::Text | DefineKind::Other => {
                let capacity = defines[index].width as usize * 4;
                match alloc_buffer(capacity) {
                    Ok(buf) => DefineBuffer::Text { buf, len: 0 },
                    Err(err) => {
                        free_defines(api, defines);
                        return Err(err);
                    }
                }
            }
            DefineKind::Number => DefineBuffer::Number(OciNumber::zero()),
            DefineKind::Double | DefineKind::Signed => DefineBuffer::Int(0),
            DefineKind::Unsigned => DefineBuffer::Uint(0),
            DefineKind::Blob | DefineKind::Clob => match api.lob_alloc() {
                Ok(lob) => DefineBuffer::Lob(lob),
                Err(err) => {
                    free_defines(api, defines);
                    return Err(err.into());
                }
            },
        };
        defines[index].buffer = buffer;

        match api.define_by_pos(stmt, pos, kind.sqlt()) {
            Ok(handle) => defines[index].handle = Some(handle),
            Err(err) => {
                free_defines(api, defines);
                return Err(err.into());
            }
        }
    }
    Ok(())
}

/// Release every descriptor: native define handles and LOB locators first,
/// the owned buffers with them. Safe on a partially built array and
/// idempotent.
pub fn free_defines<A: OciApi>(api: &mut A, defines: &mut Vec<Define>) {
    for define in defines.drain(..) {
        if let Some(handle) = define.handle {
            api.define_release(handle);
        }
        if let DefineBuffer::Lob(lob) = define.buffer {
            api.lob_free(lob);
        }
    }
}

//! Native interface constants.
//!
//! Type codes and status values mirror the OCI call interface this layer
//! marshals against.

// External (describe-time) column type codes.
pub const TYPECODE_VARCHAR: u16 = 1;
pub const TYPECODE_NUMBER: u16 = 2;
pub const TYPECODE_INTEGER: u16 = 3;
pub const TYPECODE_VARCHAR2: u16 = 9;
pub const TYPECODE_REAL: u16 = 21;
pub const TYPECODE_DOUBLE: u16 = 22;
pub const TYPECODE_UNSIGNED8: u16 = 23;
pub const TYPECODE_UNSIGNED16: u16 = 25;
pub const TYPECODE_UNSIGNED32: u16 = 26;
pub const TYPECODE_SIGNED8: u16 = 27;
pub const TYPECODE_SIGNED16: u16 = 28;
pub const TYPECODE_SIGNED32: u16 = 29;
pub const TYPECODE_CLOB: u16 = 112;
pub const TYPECODE_BLOB: u16 = 113;
pub const TYPECODE_OCTET: u16 = 245;
pub const TYPECODE_SMALLINT: u16 = 246;

// Internal (bind/define-time) data representation codes.
pub const SQLT_INT: u16 = 3;
pub const SQLT_VNU: u16 = 6;
pub const SQLT_UIN: u16 = 68;
pub const SQLT_AFC: u16 = 96;
pub const SQLT_CLOB: u16 = 112;
pub const SQLT_BLOB: u16 = 113;

// Native status codes.
pub const OCI_SUCCESS: i32 = 0;
pub const OCI_SUCCESS_WITH_INFO: i32 = 1;
pub const OCI_NO_DATA: i32 = 100;
pub const OCI_ERROR: i32 = -1;
pub const OCI_INVALID_HANDLE: i32 = -2;
pub const OCI_NEED_DATA: i32 = 99;
pub const OCI_STILL_EXECUTING: i32 = -3123;
pub const OCI_CONTINUE: i32 = -24200;

/// Error code reported by column introspection past the last position,
/// treated as end-of-columns rather than a failure.
pub const ORA_NO_SUCH_POSITION: i32 = 24334;

/// Character-set forms reported for CLOB locators.
pub const CS_FORM_IMPLICIT: u8 = 1;
pub const CS_FORM_NCHAR: u8 = 2;

/// Maximum mantissa bytes in the native decimal encoding.
pub const NUMBER_MAX_MANTISSA: usize = 20;

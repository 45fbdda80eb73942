//! The native call interface seam.
//!
//! `OciApi` is the contract the marshaling pipeline consumes: statement
//! prepare/execute/fetch, bind and define registration with piecewise
//! callback support, large-object reads, and informational-message
//! retrieval. A production implementor backs these with the native client
//! library, dispatching the four long-running calls off-thread
//! (`tokio::task::spawn_blocking`) so the async methods suspend instead of
//! blocking the scheduler; `crate::oci::fake::FakeOci` backs them with an
//! in-memory script for tests.

use std::future::Future;

use crate::marshal::bind::{Bind, BindKind};
use crate::marshal::define::Define;

/// Error reported by a native call: numeric code plus message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciError {
    /// Native error code.
    pub code: i32,
    /// Native error message.
    pub message: String,
}

impl OciError {
    /// Create a native error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result of a native call.
pub type OciResult<T> = std::result::Result<T, OciError>;

impl From<OciError> for crate::error::Error {
    fn from(e: OciError) -> Self {
        crate::error::Error::Oracle {
            code: e.code,
            message: e.message,
        }
    }
}

/// Opaque statement handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtHandle(pub u32);

/// Opaque bind handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindHandle(pub u32);

/// Opaque define handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefineHandle(pub u32);

/// Opaque large-object locator.
///
/// References data held server-side; content is pulled with `lob_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LobLocator(pub u32);

/// Statement class reported by the statement-type attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    /// Row-producing statement.
    Select,
    /// Data manipulation (INSERT/UPDATE/DELETE/MERGE).
    Dml,
    /// PLSQL block.
    Plsql,
    /// Anything else (DDL and the rest).
    Other,
}

/// Column description returned by `param_get`.
#[derive(Debug, Clone)]
pub struct ColumnDesc {
    /// Native type code.
    pub type_code: u16,
    /// Column name.
    pub name: String,
    /// Whether the column declares character-length semantics.
    pub char_semantics: bool,
    /// Width in characters, meaningful when `char_semantics` is set.
    pub char_width: u16,
    /// Width in bytes, meaningful otherwise.
    pub byte_width: u16,
}

/// Outcome of a one-row fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// One row landed in the define buffers.
    Row,
    /// The result set is exhausted.
    NoData,
}

/// The native call interface.
///
/// The four potentially long-running operations — execute, fetch, and the
/// two LOB read forms (distinguished by charset form) — are the only
/// suspension points in the layer; everything else completes inline.
/// `stmt_execute` and `stmt_fetch` receive the descriptor slices so the
/// implementor can drive the piecewise bind callbacks and land fetched
/// columns in the registered buffers; descriptor state is threaded
/// explicitly, never global.
pub trait OciApi: Send {
    /// Allocate a statement handle.
    fn stmt_alloc(&mut self) -> OciResult<StmtHandle>;

    /// Prepare `sql` on the statement.
    fn stmt_prepare(&mut self, stmt: StmtHandle, sql: &str) -> OciResult<()>;

    /// Read the statement-type attribute of a prepared statement.
    fn stmt_type(&mut self, stmt: StmtHandle) -> OciResult<StatementType>;

    /// Release a statement handle. Never fails; double-release is a no-op.
    fn stmt_release(&mut self, stmt: StmtHandle);

    /// Register a bind by placeholder name, declaring its data
    /// representation and byte length. Data transfer is deferred to the
    /// dynamic callbacks.
    fn bind_by_name(
        &mut self,
        stmt: StmtHandle,
        name: &str,
        kind: BindKind,
        declared_len: u32,
    ) -> OciResult<BindHandle>;

    /// Register the bind for piecewise callback-driven I/O. During
    /// `stmt_execute` the implementor pulls input via
    /// `marshal::bind::supply_input` and pushes RETURNING output via
    /// `marshal::bind::capture_output` on the matching descriptor.
    fn bind_dynamic(&mut self, bind: BindHandle) -> OciResult<()>;

    /// Release a bind handle. Never fails; double-release is a no-op.
    fn bind_release(&mut self, bind: BindHandle);

    /// Describe the result column at 1-based `pos`. Past the last column
    /// this fails with the "no such position" code
    /// (`constants::ORA_NO_SUCH_POSITION`).
    fn param_get(&mut self, stmt: StmtHandle, pos: u32) -> OciResult<ColumnDesc>;

    /// Register the destination buffer class for the column at 1-based
    /// `pos`. `sqlt` is the internal representation code the buffer holds.
    fn define_by_pos(&mut self, stmt: StmtHandle, pos: u32, sqlt: u16) -> OciResult<DefineHandle>;

    /// Release a define handle. Never fails; double-release is a no-op.
    fn define_release(&mut self, define: DefineHandle);

    /// Execute the statement. `iters` is 0 for row-producing statements and
    /// the execution count otherwise. Suspension point.
    fn stmt_execute(
        &mut self,
        stmt: StmtHandle,
        iters: u32,
        binds: &mut [Bind],
    ) -> impl Future<Output = OciResult<()>> + Send;

    /// Fetch one row into the define buffers. Suspension point.
    fn stmt_fetch(
        &mut self,
        stmt: StmtHandle,
        defines: &mut [Define],
    ) -> impl Future<Output = OciResult<FetchOutcome>> + Send;

    /// Allocate a large-object locator.
    fn lob_alloc(&mut self) -> OciResult<LobLocator>;

    /// Release a large-object locator. Never fails; double-release is a
    /// no-op.
    fn lob_free(&mut self, lob: LobLocator);

    /// Length of the object behind the locator.
    fn lob_length(&mut self, lob: LobLocator) -> OciResult<u32>;

    /// Character-set form of a character large object.
    fn lob_charset_form(&mut self, lob: LobLocator) -> OciResult<u8>;

    /// Read up to `buf.len()` bytes of the object into `buf`, requesting
    /// `csform` (0 for binary objects). Returns the byte count actually
    /// read. Suspension point.
    fn lob_read(
        &mut self,
        lob: LobLocator,
        buf: &mut [u8],
        csform: u8,
    ) -> impl Future<Output = OciResult<u32>> + Send;

    /// Take the pending "success with additional info" message, if the last
    /// call produced one. Informational, never an error.
    fn take_info(&mut self) -> Option<String>;

    /// Release every session-level native handle. Called once by
    /// `Connection::close`; further native calls are not made afterwards.
    fn shutdown(&mut self);
}

//! High-level connection API over the native call interface.
//!
//! A `Connection` owns one native interface handle and at most one live
//! statement at a time. `execute` materializes a full result; the
//! `cursor_*` family iterates row by row. Statement-scoped resources
//! (binds, defines, the statement handle) never outlive the operation that
//! created them — every failure path releases them before the error is
//! returned.

use std::fmt;

use futures::{stream, Stream};

use crate::error::{Error, Result};
use crate::marshal::bind::{self, Bind};
use crate::marshal::define::{self, Define};
use crate::marshal::fetch;
use crate::oci::api::{OciApi, StatementType, StmtHandle};
use crate::value::Table;

/// Result of a statement execution.
#[derive(Debug)]
pub struct ExecuteResult {
    /// Informational message from a "success with additional info" status.
    pub info: Option<String>,
    /// Decoded rows (1-indexed table of row tables), present only for
    /// row-producing statements.
    pub rows: Option<Table>,
    /// RETURNING output per bind name (each a 0-indexed table), present only
    /// if some bind produced rows.
    pub output_binds: Option<Table>,
}

impl ExecuteResult {
    /// Number of materialized rows (0 for non-query statements).
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map(Table::len).unwrap_or(0)
    }

    /// Whether the statement produced a result set.
    pub fn is_query(&self) -> bool {
        self.rows.is_some()
    }
}

/// A database connection bound to a native interface implementation.
///
/// The session itself (environment, server attach, authentication) is the
/// responsibility of whoever constructs the `OciApi` value; this layer picks
/// up from an attached session and marshals statements over it.
///
/// # Example
///
/// ```
/// use oracle_oci_rs::oci::constants::TYPECODE_NUMBER;
/// use oracle_oci_rs::oci::fake::{FakeCell, FakeColumn, FakeOci, Script};
/// use oracle_oci_rs::{Connection, Result};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<()> {
///     let mut api = FakeOci::new();
///     api.script(
///         "SELECT 1 FROM dual",
///         Script::select(
///             vec![FakeColumn::new("N", TYPECODE_NUMBER, 22)],
///             vec![vec![FakeCell::Int(1)]],
///         ),
///     );
///
///     let mut conn = Connection::new(api);
///     let result = conn.execute("SELECT 1 FROM dual", None).await?;
///     assert_eq!(result.row_count(), 1);
///     conn.close();
///     Ok(())
/// }
/// ```
pub struct Connection<A: OciApi> {
    api: A,
    open: bool,
    stmt: Option<StmtHandle>,
    binds: Vec<Bind>,
    defines: Vec<Define>,
    info: Option<String>,
}

impl<A: OciApi> Connection<A> {
    /// Wrap an attached native interface session.
    pub fn new(api: A) -> Self {
        Self {
            api,
            open: true,
            stmt: None,
            binds: Vec::new(),
            defines: Vec::new(),
            info: None,
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        !self.open
    }

    /// Whether a cursor is currently open.
    pub fn has_open_cursor(&self) -> bool {
        self.stmt.is_some()
    }

    /// Informational message from the last operation, if any.
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// The underlying native interface (for advanced use).
    pub fn native(&self) -> &A {
        &self.api
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::ConnectionClosed)
        }
    }

    fn ensure_no_cursor(&self) -> Result<()> {
        if self.stmt.is_some() {
            Err(Error::CursorAlreadyOpen)
        } else {
            Ok(())
        }
    }

    /// Release all statement-scoped resources.
    fn release_statement(&mut self, stmt: StmtHandle) {
        define::free_defines(&mut self.api, &mut self.defines);
        bind::free_binds(&mut self.api, &mut self.binds);
        self.api.stmt_release(stmt);
        self.stmt = None;
    }

    /// Execute a statement, materializing rows and RETURNING output.
    ///
    /// `params` maps placeholder names to values — bare scalars, or binding
    /// specs with `value`/`type`/`size` keys. Row-producing statements
    /// return `rows`; binds with RETURNING output return `output_binds`.
    pub async fn execute(&mut self, sql: &str, params: Option<&Table>) -> Result<ExecuteResult> {
        self.ensure_open()?;
        self.ensure_no_cursor()?;
        self.info = None;

        let stmt = self.api.stmt_alloc()?;
        self.stmt = Some(stmt);
        let result = self.execute_inner(stmt, sql, params).await;
        // The statement scope always ends here, success or failure.
        self.release_statement(stmt);
        result
    }

    async fn execute_inner(
        &mut self,
        stmt: StmtHandle,
        sql: &str,
        params: Option<&Table>,
    ) -> Result<ExecuteResult> {
        self.api.stmt_prepare(stmt, sql)?;

        if let Some(params) = params {
            bind::make_binds(params, &mut self.binds)?;
        }
        bind::do_binds(&mut self.api, stmt, &mut self.binds)?;

        let stmt_type = self.api.stmt_type(stmt)?;
        let iters = if stmt_type == StatementType::Select {
            0
        } else {
            1
        };
        self.api.stmt_execute(stmt, iters, &mut self.binds).await?;
        self.info = self.api.take_info();

        let rows = if stmt_type == StatementType::Select {
            let mut defines = define::describe(&mut self.api, stmt)?;
            define::make_defines(&mut self.api, stmt, &mut defines)?;
            self.defines = defines;
            let rows = fetch::fetch_and_push_all(&mut self.api, stmt, &mut self.defines).await?;
            define::free_defines(&mut self.api, &mut self.defines);
            Some(rows)
        } else {
            None
        };

        let output_binds = bind::push_binds(&self.binds)?;

        Ok(ExecuteResult {
            info: self.info.clone(),
            rows,
            output_binds,
        })
    }

    /// Prepare and execute a row-producing statement without materializing
    /// rows, leaving the cursor before the first row.
    ///
    /// Returns the informational message, if the execution produced one.
    pub async fn cursor_open(&mut self, sql: &str, params: Option<&Table>) -> Result<Option<String>> {
        self.ensure_open()?;
        self.ensure_no_cursor()?;
        self.info = None;

        let stmt = self.api.stmt_alloc()?;
        self.stmt = Some(stmt);
        match self.cursor_open_inner(stmt, sql, params).await {
            Ok(info) => {
                // Input binds are done once execution finished; only the
                // defines stay with the open cursor.
                bind::free_binds(&mut self.api, &mut self.binds);
                Ok(info)
            }
            Err(err) => {
                self.release_statement(stmt);
                Err(err)
            }
        }
    }

    async fn cursor_open_inner(
        &mut self,
        stmt: StmtHandle,
        sql: &str,
        params: Option<&Table>,
    ) -> Result<Option<String>> {
        self.api.stmt_prepare(stmt, sql)?;

        if let Some(params) = params {
            bind::make_binds(params, &mut self.binds)?;
        }
        bind::do_binds(&mut self.api, stmt, &mut self.binds)?;

        if self.api.stmt_type(stmt)? != StatementType::Select {
            return Err(Error::InvalidStatementType);
        }
        self.api.stmt_execute(stmt, 0, &mut self.binds).await?;
        self.info = self.api.take_info();

        let mut defines = define::describe(&mut self.api, stmt)?;
        define::make_defines(&mut self.api, stmt, &mut defines)?;
        self.defines = defines;

        Ok(self.info.clone())
    }

    /// Advance the open cursor one row.
    ///
    /// Returns `None` on exhaustion, at which point the cursor auto-closes;
    /// a subsequent call is a state error, not a native call.
    pub async fn cursor_fetch(&mut self) -> Result<Option<Table>> {
        self.ensure_open()?;
        let stmt = self.stmt.ok_or(Error::NoOpenCursor)?;

        match self.cursor_fetch_inner(stmt).await {
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.release_statement(stmt);
                Ok(None)
            }
            Err(err) => {
                self.release_statement(stmt);
                Err(err)
            }
        }
    }

    async fn cursor_fetch_inner(&mut self, stmt: StmtHandle) -> Result<Option<Table>> {
        if !fetch::fetch_row(&mut self.api, stmt, &mut self.defines).await? {
            return Ok(None);
        }
        self.info = self.api.take_info();
        let row = fetch::push_row(&mut self.api, &self.defines).await?;
        Ok(Some(row))
    }

    /// Close the open cursor, releasing its column buffers and statement
    /// handle. No-op when no cursor is open.
    pub fn cursor_close(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Some(stmt) = self.stmt {
            self.release_statement(stmt);
        }
        Ok(())
    }

    /// Release every native handle of this connection.
    ///
    /// Idempotent; returns `false` when the connection was already closed.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        if let Some(stmt) = self.stmt {
            self.release_statement(stmt);
        }
        self.api.shutdown();
        self.open = false;
        true
    }

    /// Stream the rows of the open cursor.
    ///
    /// Each poll advances the cursor one row; the stream ends at exhaustion
    /// (after which the cursor has auto-closed).
    pub fn row_stream(&mut self) -> impl Stream<Item = Result<Table>> + '_ {
        stream::unfold(self, |conn| async move {
            match conn.cursor_fetch().await {
                Ok(Some(row)) => Some((Ok(row), conn)),
                Ok(None) => None,
                Err(err) => Some((Err(err), conn)),
            }
        })
    }
}

impl<A: OciApi> fmt::Display for Connection<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "oracle connection ({})",
            if self.open { "open" } else { "closed" }
        )
    }
}

impl<A: OciApi> Drop for Connection<A> {
    fn drop(&mut self) {
        // Abandonment behaves like an explicit close.
        if self.open {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::fake::FakeOci;

    #[tokio::test]
    async fn test_execute_on_closed_connection() {
        let mut conn = Connection::new(FakeOci::new());
        assert!(conn.close());
        let err = conn.execute("SELECT 1 FROM dual", None).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_cursor_fetch_without_cursor() {
        let mut conn = Connection::new(FakeOci::new());
        let err = conn.cursor_fetch().await.unwrap_err();
        assert!(matches!(err, Error::NoOpenCursor));
    }

    #[test]
    fn test_display() {
        let mut conn = Connection::new(FakeOci::new());
        assert_eq!(format!("{}", conn), "oracle connection (open)");
        conn.close();
        assert_eq!(format!("{}", conn), "oracle connection (closed)");
    }
}

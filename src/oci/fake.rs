//! In-memory native interface for tests.
//!
//! `FakeOci` implements `OciApi` against per-statement scripts instead of a
//! database: scripted column metadata and rows land in the define buffers on
//! fetch, scripted RETURNING values are delivered through the real
//! `capture_output` callback, and bound input is pulled through the real
//! `supply_input` callback and recorded for assertions. Handle bookkeeping
//! counts double releases so teardown discipline is testable.

use std::collections::HashMap;

use bytes::Bytes;

use crate::marshal::bind::{self, Bind, BindKind, BindReturn, BindValue};
use crate::marshal::define::{Define, DefineBuffer};
use crate::oci::api::{
    BindHandle, ColumnDesc, DefineHandle, FetchOutcome, LobLocator, OciApi, OciError, OciResult,
    StatementType, StmtHandle,
};
use crate::oci::constants::{CS_FORM_IMPLICIT, OCI_ERROR, ORA_NO_SUCH_POSITION};
use crate::oci::number::OciNumber;

/// One scripted column.
#[derive(Debug, Clone)]
pub struct FakeColumn {
    /// Column name.
    pub name: String,
    /// Native type code.
    pub type_code: u16,
    /// Character-length semantics flag.
    pub char_semantics: bool,
    /// Width in the unit the semantics flag selects.
    pub width: u16,
}

impl FakeColumn {
    /// A column with byte-length semantics.
    pub fn new(name: &str, type_code: u16, width: u16) -> Self {
        Self {
            name: name.to_string(),
            type_code,
            char_semantics: false,
            width,
        }
    }

    /// Switch the column to character-length semantics.
    pub fn with_char_semantics(mut self) -> Self {
        self.char_semantics = true;
        self
    }
}

/// One scripted cell value.
#[derive(Debug, Clone)]
pub enum FakeCell {
    /// NULL.
    Null,
    /// Character data.
    Text(String),
    /// Native decimal, given as a decimal string.
    Num(String),
    /// Signed integer scalar.
    Int(i64),
    /// Unsigned integer scalar.
    Uint(u64),
    /// Floating-point scalar (delivered through the integer define form).
    Double(f64),
    /// Binary large object content.
    Blob(Bytes),
    /// Character large object content.
    Clob(String),
}

/// Scripted RETURNING output for one bind name.
#[derive(Debug, Clone)]
struct ReturningSpec {
    cells: Vec<FakeCell>,
    /// Row count reported to the output-capture callback; defaults to
    /// `cells.len()`. Script 0 to model the unpopulated PLSQL attribute.
    reported: Option<u32>,
}

/// Script for one SQL text.
#[derive(Debug, Clone)]
pub struct Script {
    statement_type: StatementType,
    columns: Vec<FakeColumn>,
    rows: Vec<Vec<FakeCell>>,
    returning: Vec<(String, ReturningSpec)>,
    info: Option<String>,
    fail_prepare: Option<(i32, String)>,
    fail_bind: Option<(i32, String)>,
    fail_execute: Option<(i32, String)>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            statement_type: StatementType::Other,
            columns: Vec::new(),
            rows: Vec::new(),
            returning: Vec::new(),
            info: None,
            fail_prepare: None,
            fail_bind: None,
            fail_execute: None,
        }
    }
}

impl Script {
    /// A row-producing statement with the given columns and rows.
    pub fn select(columns: Vec<FakeColumn>, rows: Vec<Vec<FakeCell>>) -> Self {
        Self {
            statement_type: StatementType::Select,
            columns,
            rows,
            ..Self::default()
        }
    }

    /// A DML statement.
    pub fn dml() -> Self {
        Self {
            statement_type: StatementType::Dml,
            ..Self::default()
        }
    }

    /// A PLSQL block.
    pub fn plsql() -> Self {
        Self {
            statement_type: StatementType::Plsql,
            ..Self::default()
        }
    }

    /// Add RETURNING output for a bind name.
    pub fn with_returning(mut self, name: &str, cells: Vec<FakeCell>) -> Self {
        self.returning.push((
            name.to_string(),
            ReturningSpec {
                cells,
                reported: None,
            },
        ));
        self
    }

    /// Override the row count reported to the output-capture callback for
    /// the last added RETURNING bind.
    pub fn with_reported_rows(mut self, reported: u32) -> Self {
        if let Some((_, spec)) = self.returning.last_mut() {
            spec.reported = Some(reported);
        }
        self
    }

    /// Attach a success-with-info message to execution.
    pub fn with_info(mut self, message: &str) -> Self {
        self.info = Some(message.to_string());
        self
    }

    /// Fail statement preparation.
    pub fn with_fail_prepare(mut self, code: i32, message: &str) -> Self {
        self.fail_prepare = Some((code, message.to_string()));
        self
    }

    /// Fail the first bind registration.
    pub fn with_fail_bind(mut self, code: i32, message: &str) -> Self {
        self.fail_bind = Some((code, message.to_string()));
        self
    }

    /// Fail execution.
    pub fn with_fail_execute(mut self, code: i32, message: &str) -> Self {
        self.fail_execute = Some((code, message.to_string()));
        self
    }
}

/// Input recorded when the interface pulled a bind through `supply_input`.
#[derive(Debug, Clone)]
pub struct CapturedBind {
    /// Placeholder name.
    pub name: String,
    /// Logical bind type.
    pub kind: BindKind,
    /// Null indicator.
    pub indicator: i16,
    /// Supplied length.
    pub len: u32,
    /// Supplied payload bytes (wire encoding for numbers).
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct FakeStmt {
    script: Script,
    pending_rows: Vec<Vec<FakeCell>>,
    next_row: usize,
}

#[derive(Debug)]
struct FakeBind {
    stmt: u32,
    name: String,
    dynamic: bool,
}

#[derive(Debug)]
struct FakeLob {
    content: Bytes,
    csform: u8,
}

/// Scriptable in-memory implementation of the native call interface.
#[derive(Debug, Default)]
pub struct FakeOci {
    scripts: HashMap<String, Script>,
    stmts: HashMap<u32, FakeStmt>,
    binds: HashMap<u32, FakeBind>,
    defines: HashMap<u32, u32>,
    lobs: HashMap<u32, FakeLob>,
    next_handle: u32,
    pending_info: Option<String>,
    captured: Vec<CapturedBind>,
    double_releases: u32,
    shut_down: bool,
}

impl FakeOci {
    /// Create an empty interface with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the script for a SQL text.
    pub fn script(&mut self, sql: &str, script: Script) {
        self.scripts.insert(sql.to_string(), script);
    }

    /// Inputs pulled through the input-supply callback, in execute order.
    pub fn captured(&self) -> &[CapturedBind] {
        &self.captured
    }

    /// Handle releases that had no live handle to release.
    pub fn double_release_count(&self) -> u32 {
        self.double_releases
    }

    /// Whether `shutdown` was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Count of currently live handles of every class.
    pub fn live_handles(&self) -> usize {
        self.stmts.len() + self.binds.len() + self.defines.len() + self.lobs.len()
    }

    fn alloc_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn fill_return_slot(slot: &mut BindReturn, cell: &FakeCell) -> OciResult<()> {
        match cell {
            FakeCell::Null => {
                slot.indicator = -1;
                return Ok(());
            }
            _ => slot.indicator = 0,
        }
        match (&mut slot.value, cell) {
            (BindValue::Str(buf), FakeCell::Text(s)) => {
                let n = s.len().min(buf.len());
                buf[..n].copy_from_slice(&s.as_bytes()[..n]);
                slot.rlen = n as u32;
                Ok(())
            }
            (BindValue::Number(_), FakeCell::Int(i)) => {
                slot.value = BindValue::Number(
                    OciNumber::from_i64(*i).map_err(|e| OciError::new(OCI_ERROR, e.to_string()))?,
                );
                Ok(())
            }
            (BindValue::Number(_), FakeCell::Num(s)) => {
                slot.value = BindValue::Number(
                    OciNumber::from_str(s).map_err(|e| OciError::new(OCI_ERROR, e.to_string()))?,
                );
                Ok(())
            }
            (BindValue::Uint(_), FakeCell::Uint(u)) => {
                slot.value = BindValue::Uint(*u);
                Ok(())
            }
            _ => Err(OciError::new(
                OCI_ERROR,
                "scripted RETURNING cell does not match bind type",
            )),
        }
    }

    fn write_define(&mut self, define: &mut Define, cell: &FakeCell) -> OciResult<()> {
        define.indicator = 0;
        match (&mut define.buffer, cell) {
            (DefineBuffer::Text { len, .. }, FakeCell::Null) => {
                define.indicator = -1;
                *len = 0;
                Ok(())
            }
            (_, FakeCell::Null) => {
                define.indicator = -1;
                Ok(())
            }
            (DefineBuffer::Text { buf, len }, FakeCell::Text(s)) => {
                let n = s.len().min(buf.len());
                buf[..n].copy_from_slice(&s.as_bytes()[..n]);
                *len = n as u16;
                Ok(())
            }
            (DefineBuffer::Number(slot), FakeCell::Int(i)) => {
                *slot =
                    OciNumber::from_i64(*i).map_err(|e| OciError::new(OCI_ERROR, e.to_string()))?;
                Ok(())
            }
            (DefineBuffer::Number(slot), FakeCell::Num(s)) => {
                *slot =
                    OciNumber::from_str(s).map_err(|e| OciError::new(OCI_ERROR, e.to_string()))?;
                Ok(())
            }
            (DefineBuffer::Int(slot), FakeCell::Int(i)) => {
                *slot = *i;
                Ok(())
            }
            // The REAL/DOUBLE family is defined through the integer form;
            // the native conversion truncates toward zero.
            (DefineBuffer::Int(slot), FakeCell::Double(f)) => {
                *slot = *f as i64;
                Ok(())
            }
            (DefineBuffer::Uint(slot), FakeCell::Uint(u)) => {
                *slot = *u;
                Ok(())
            }
            (DefineBuffer::Lob(loc), FakeCell::Blob(content)) => {
                self.lobs.insert(
                    loc.0,
                    FakeLob {
                        content: content.clone(),
                        csform: 0,
                    },
                );
                Ok(())
            }
            (DefineBuffer::Lob(loc), FakeCell::Clob(text)) => {
                self.lobs.insert(
                    loc.0,
                    FakeLob {
                        content: Bytes::from(text.clone().into_bytes()),
                        csform: CS_FORM_IMPLICIT,
                    },
                );
                Ok(())
            }
            _ => Err(OciError::new(
                OCI_ERROR,
                "scripted cell does not match define buffer",
            )),
        }
    }
}

impl OciApi for FakeOci {
    fn stmt_alloc(&mut self) -> OciResult<StmtHandle> {
        let id = self.alloc_handle();
        self.stmts.insert(
            id,
            FakeStmt {
                script: Script::default(),
                pending_rows: Vec::new(),
                next_row: 0,
            },
        );
        Ok(StmtHandle(id))
    }

    fn stmt_prepare(&mut self, stmt: StmtHandle, sql: &str) -> OciResult<()> {
        let script = self.scripts.get(sql).cloned().unwrap_or_default();
        if let Some((code, message)) = &script.fail_prepare {
            return Err(OciError::new(*code, message.clone()));
        }
        let state = self
            .stmts
            .get_mut(&stmt.0)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))?;
        state.script = script;
        Ok(())
    }

    fn stmt_type(&mut self, stmt: StmtHandle) -> OciResult<StatementType> {
        self.stmts
            .get(&stmt.0)
            .map(|s| s.script.statement_type)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))
    }

    fn stmt_release(&mut self, stmt: StmtHandle) {
        if self.stmts.remove(&stmt.0).is_none() {
            self.double_releases += 1;
        }
    }

    fn bind_by_name(
        &mut self,
        stmt: StmtHandle,
        name: &str,
        _kind: BindKind,
        _declared_len: u32,
    ) -> OciResult<BindHandle> {
        let state = self
            .stmts
            .get_mut(&stmt.0)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))?;
        if let Some((code, message)) = state.script.fail_bind.take() {
            return Err(OciError::new(code, message));
        }
        let id = self.alloc_handle();
        self.binds.insert(
            id,
            FakeBind {
                stmt: stmt.0,
                name: name.to_string(),
                dynamic: false,
            },
        );
        Ok(BindHandle(id))
    }

    fn bind_dynamic(&mut self, bind: BindHandle) -> OciResult<()> {
        let state = self
            .binds
            .get_mut(&bind.0)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such bind handle"))?;
        state.dynamic = true;
        Ok(())
    }

    fn bind_release(&mut self, bind: BindHandle) {
        if self.binds.remove(&bind.0).is_none() {
            self.double_releases += 1;
        }
    }

    fn param_get(&mut self, stmt: StmtHandle, pos: u32) -> OciResult<ColumnDesc> {
        let state = self
            .stmts
            .get(&stmt.0)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))?;
        let column = state
            .script
            .columns
            .get(pos as usize - 1)
            .ok_or_else(|| OciError::new(ORA_NO_SUCH_POSITION, "no such position"))?;
        Ok(ColumnDesc {
            type_code: column.type_code,
            name: column.name.clone(),
            char_semantics: column.char_semantics,
            char_width: if column.char_semantics {
                column.width
            } else {
                0
            },
            byte_width: column.width,
        })
    }

    fn define_by_pos(
        &mut self,
        stmt: StmtHandle,
        _pos: u32,
        _sqlt: u16,
    ) -> OciResult<DefineHandle> {
        if !self.stmts.contains_key(&stmt.0) {
            return Err(OciError::new(OCI_ERROR, "no such statement handle"));
        }
        let id = self.alloc_handle();
        self.defines.insert(id, stmt.0);
        Ok(DefineHandle(id))
    }

    fn define_release(&mut self, define: DefineHandle) {
        if self.defines.remove(&define.0).is_none() {
            self.double_releases += 1;
        }
    }

    async fn stmt_execute(
        &mut self,
        stmt: StmtHandle,
        _iters: u32,
        binds: &mut [Bind],
    ) -> OciResult<()> {
        let script = self
            .stmts
            .get(&stmt.0)
            .map(|s| s.script.clone())
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))?;
        if let Some((code, message)) = &script.fail_execute {
            return Err(OciError::new(*code, message.clone()));
        }

        // Pull every dynamically registered input through the real
        // input-supply callback and record it.
        for b in binds.iter() {
            let registered = b
                .handle
                .and_then(|h| self.binds.get(&h.0))
                .map(|fb| fb.stmt == stmt.0 && fb.dynamic)
                .unwrap_or(false);
            if !registered {
                continue;
            }
            let input = bind::supply_input(b);
            let bytes = match input.data {
                bind::BindInputData::Bytes(bytes) => bytes.to_vec(),
                bind::BindInputData::Number(num) => num.as_bytes().to_vec(),
                bind::BindInputData::Uint(v) => v.to_le_bytes().to_vec(),
            };
            self.captured.push(CapturedBind {
                name: b.name.clone(),
                kind: b.kind(),
                indicator: input.indicator,
                len: input.len,
                bytes,
            });
        }

        // Deliver scripted RETURNING output through the real output-capture
        // callback, once per returned row index.
        for (name, spec) in &script.returning {
            // Deliver to the descriptor whose registered placeholder name
            // matches.
            let Some(b) = binds.iter_mut().find(|b| {
                b.handle
                    .and_then(|h| self.binds.get(&h.0))
                    .map(|fb| fb.name == *name)
                    .unwrap_or(false)
            }) else {
                continue;
            };
            let reported = spec.reported.unwrap_or(spec.cells.len() as u32);
            let effective = if reported == 0 { 1 } else { reported };
            for index in 0..effective {
                let slot = bind::capture_output(b, index, reported)
                    .map_err(|e| OciError::new(OCI_ERROR, e.to_string()))?;
                if let Some(cell) = spec.cells.get(index as usize) {
                    Self::fill_return_slot(slot, cell)?;
                }
            }
        }

        let state = self
            .stmts
            .get_mut(&stmt.0)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))?;
        state.pending_rows = script.rows.clone();
        state.next_row = 0;
        self.pending_info = script.info.clone();
        Ok(())
    }

    async fn stmt_fetch(
        &mut self,
        stmt: StmtHandle,
        defines: &mut [Define],
    ) -> OciResult<FetchOutcome> {
        let row = {
            let state = self
                .stmts
                .get_mut(&stmt.0)
                .ok_or_else(|| OciError::new(OCI_ERROR, "no such statement handle"))?;
            if state.next_row >= state.pending_rows.len() {
                return Ok(FetchOutcome::NoData);
            }
            let row = state.pending_rows[state.next_row].clone();
            state.next_row += 1;
            row
        };
        if row.len() != defines.len() {
            return Err(OciError::new(OCI_ERROR, "scripted row width mismatch"));
        }
        for (define, cell) in defines.iter_mut().zip(row.iter()) {
            self.write_define(define, cell)?;
        }
        Ok(FetchOutcome::Row)
    }

    fn lob_alloc(&mut self) -> OciResult<LobLocator> {
        let id = self.alloc_handle();
        self.lobs.insert(
            id,
            FakeLob {
                content: Bytes::new(),
                csform: 0,
            },
        );
        Ok(LobLocator(id))
    }

    fn lob_free(&mut self, lob: LobLocator) {
        if self.lobs.remove(&lob.0).is_none() {
            self.double_releases += 1;
        }
    }

    fn lob_length(&mut self, lob: LobLocator) -> OciResult<u32> {
        self.lobs
            .get(&lob.0)
            .map(|l| l.content.len() as u32)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such lob locator"))
    }

    fn lob_charset_form(&mut self, lob: LobLocator) -> OciResult<u8> {
        self.lobs
            .get(&lob.0)
            .map(|l| l.csform)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such lob locator"))
    }

    async fn lob_read(&mut self, lob: LobLocator, buf: &mut [u8], _csform: u8) -> OciResult<u32> {
        let state = self
            .lobs
            .get(&lob.0)
            .ok_or_else(|| OciError::new(OCI_ERROR, "no such lob locator"))?;
        let n = state.content.len().min(buf.len());
        buf[..n].copy_from_slice(&state.content[..n]);
        Ok(n as u32)
    }

    fn take_info(&mut self) -> Option<String> {
        self.pending_info.take()
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
    }
}

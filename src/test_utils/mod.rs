//! Deterministic in-memory driver for tests.
//!
//! `ScriptedDriver` replays queued responses and records everything the engine asks of
//! it. Clones share state, so a test keeps one clone for inspection and hands the other
//! to a `Connection`.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::ConnectionConfig;
use crate::driver::{Driver, DriverOutcome, DriverRows, FieldMeta};
use crate::escape::mysql_escape_string;
use crate::types::SqlValue;

pub mod test_helpers;

pub use test_helpers::create_test_row;

/// Message the scripted server uses for a dropped link.
pub const GONE_AWAY: &str = "MySQL server has gone away";

/// One queued statement response.
#[derive(Debug, Clone, PartialEq)]
pub enum Scripted {
    Rows {
        fields: Vec<FieldMeta>,
        rows: Vec<Vec<SqlValue>>,
    },
    Done {
        insert_id: u64,
        affected_rows: u64,
    },
    Error(String),
}

/// Shared state behind every clone of a `ScriptedDriver`.
#[derive(Debug, Default)]
pub struct Script {
    pub responses: VecDeque<Scripted>,
    pub batch_failures: VecDeque<String>,
    pub connect_results: VecDeque<bool>,
    pub ping_results: VecDeque<bool>,
    pub executed: Vec<String>,
    pub connected: bool,
    pub connects: usize,
    pub pings: usize,
    pub closes: usize,
    pub frees: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub autocommit_calls: Vec<bool>,
    pub charset: Option<String>,
    pub supported_charsets: Vec<String>,
    pub native_types: bool,
    pub last_error: String,
    pub last_insert_id: u64,
    pub affected_rows: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    script: Rc<RefCell<Script>>,
}

impl ScriptedDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to the shared script.
    pub fn script(&self) -> RefMut<'_, Script> {
        self.script.borrow_mut()
    }

    /// Queue a result set. `fields` pairs column names with type codes.
    pub fn push_rows(&self, fields: &[(&str, u16)], rows: Vec<Vec<SqlValue>>) -> &Self {
        let fields = fields
            .iter()
            .map(|(name, code)| FieldMeta::new(*name, *code))
            .collect();
        self.script()
            .responses
            .push_back(Scripted::Rows { fields, rows });
        self
    }

    pub fn push_done(&self, insert_id: u64, affected_rows: u64) -> &Self {
        self.script().responses.push_back(Scripted::Done {
            insert_id,
            affected_rows,
        });
        self
    }

    pub fn push_error(&self, message: &str) -> &Self {
        self.script()
            .responses
            .push_back(Scripted::Error(message.to_string()));
        self
    }

    /// Make the next `execute_batch` fail before running anything.
    pub fn fail_next_batch(&self, message: &str) -> &Self {
        self.script().batch_failures.push_back(message.to_string());
        self
    }

    /// Queue results for upcoming `connect` calls; unqueued calls succeed.
    pub fn queue_connects(&self, results: &[bool]) -> &Self {
        self.script().connect_results.extend(results);
        self
    }

    /// Queue results for upcoming `ping` calls; unqueued calls report the link state.
    pub fn queue_pings(&self, results: &[bool]) -> &Self {
        self.script().ping_results.extend(results);
        self
    }

    pub fn support_charset(&self, charset: &str) -> &Self {
        self.script().supported_charsets.push(charset.to_string());
        self
    }

    pub fn with_native_types(&self, native: bool) -> &Self {
        self.script().native_types = native;
        self
    }

    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.script.borrow().executed.clone()
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.script.borrow().connects
    }

    #[must_use]
    pub fn pings(&self) -> usize {
        self.script.borrow().pings
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.script.borrow().closes
    }

    #[must_use]
    pub fn frees(&self) -> usize {
        self.script.borrow().frees
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.script.borrow().commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.script.borrow().rollbacks
    }

    #[must_use]
    pub fn autocommit_calls(&self) -> Vec<bool> {
        self.script.borrow().autocommit_calls.clone()
    }

    #[must_use]
    pub fn charset(&self) -> Option<String> {
        self.script.borrow().charset.clone()
    }

    fn respond(&self, sql: &str) -> DriverOutcome {
        let mut script = self.script();
        script.executed.push(sql.to_string());
        let response = script.responses.pop_front().unwrap_or(Scripted::Done {
            insert_id: 0,
            affected_rows: 0,
        });
        match response {
            Scripted::Rows { fields, rows } => {
                script.affected_rows = rows.len() as u64;
                DriverOutcome::Rows(Box::new(ScriptedRows {
                    fields,
                    rows,
                    offset: 0,
                    script: Rc::clone(&self.script),
                }))
            }
            Scripted::Done {
                insert_id,
                affected_rows,
            } => {
                script.last_insert_id = insert_id;
                script.affected_rows = affected_rows;
                script.last_error.clear();
                DriverOutcome::Done
            }
            Scripted::Error(message) => {
                if message.contains("gone away") {
                    script.connected = false;
                }
                script.last_error.clone_from(&message);
                DriverOutcome::Failed(message)
            }
        }
    }
}

impl Driver for ScriptedDriver {
    fn connect(&mut self, _config: &ConnectionConfig) -> bool {
        let mut script = self.script();
        script.connects += 1;
        let ok = script.connect_results.pop_front().unwrap_or(true);
        script.connected = ok;
        if !ok {
            script.last_error = "Can't connect to MySQL server".to_string();
        }
        ok
    }

    fn close(&mut self) {
        let mut script = self.script();
        script.closes += 1;
        script.connected = false;
    }

    fn execute(&mut self, sql: &str) -> DriverOutcome {
        self.respond(sql)
    }

    fn execute_batch(&mut self, sql: &str) -> Result<Vec<DriverOutcome>, String> {
        if let Some(message) = self.script().batch_failures.pop_front() {
            return Err(message);
        }
        let mut outcomes = Vec::new();
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let outcome = self.respond(statement);
            let failed = matches!(outcome, DriverOutcome::Failed(_));
            outcomes.push(outcome);
            if failed {
                break;
            }
        }
        Ok(outcomes)
    }

    fn escape(&self, raw: &str) -> String {
        mysql_escape_string(raw)
    }

    fn last_insert_id(&self) -> u64 {
        self.script.borrow().last_insert_id
    }

    fn affected_rows(&self) -> u64 {
        self.script.borrow().affected_rows
    }

    fn last_error(&self) -> String {
        self.script.borrow().last_error.clone()
    }

    fn ping(&mut self) -> bool {
        let mut script = self.script();
        script.pings += 1;
        let connected = script.connected;
        script.ping_results.pop_front().unwrap_or(connected)
    }

    fn set_charset(&mut self, charset: &str) -> bool {
        self.script().charset = Some(charset.to_string());
        true
    }

    fn supports_charset(&self, charset: &str) -> bool {
        self.script
            .borrow()
            .supported_charsets
            .iter()
            .any(|c| c.eq_ignore_ascii_case(charset))
    }

    fn set_autocommit(&mut self, enabled: bool) -> bool {
        self.script().autocommit_calls.push(enabled);
        true
    }

    fn commit(&mut self) -> bool {
        self.script().commits += 1;
        true
    }

    fn rollback(&mut self) -> bool {
        self.script().rollbacks += 1;
        true
    }

    fn native_types(&self) -> bool {
        self.script.borrow().native_types
    }
}

struct ScriptedRows {
    fields: Vec<FieldMeta>,
    rows: Vec<Vec<SqlValue>>,
    offset: usize,
    script: Rc<RefCell<Script>>,
}

impl DriverRows for ScriptedRows {
    fn fields(&self) -> Vec<FieldMeta> {
        self.fields.clone()
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn seek(&mut self, offset: usize) -> bool {
        if offset > self.rows.len() {
            return false;
        }
        self.offset = offset;
        true
    }

    fn fetch_row(&mut self) -> Option<Vec<SqlValue>> {
        let row = self.rows.get(self.offset).cloned()?;
        self.offset += 1;
        Some(row)
    }

    fn free(&mut self) {
        self.rows.clear();
        self.script.borrow_mut().frees += 1;
    }
}

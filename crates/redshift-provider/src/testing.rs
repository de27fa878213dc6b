//! In-memory cluster catalog for tests.
//!
//! `MockCatalog` understands the statements produced by [`crate::ddl`] and
//! keeps databases in a transactional table: a session works on a private
//! copy that replaces the shared table on commit and is discarded on
//! rollback or drop.
//!
//! # Features
//!
//! - **Statement history**: every executed statement, for assertions
//! - **Propagation delay**: new databases stay invisible to lookup-by-name for N lookups
//! - **Failure injection**: rejected statements, unreachable cluster, failing lookups or reads
//! - **Transaction accounting**: commits, rollbacks and still-open sessions
//!
//! ```rust
//! use redshift_core::{DatabaseResource, OwnerId, SettleConfig};
//! use redshift_provider::testing::MockCatalog;
//! use redshift_provider::DatabaseAdapter;
//!
//! # async fn example() -> redshift_core::CoreResult<()> {
//! let catalog = MockCatalog::new();
//! catalog.add_user(OwnerId::new(104), "etl_user");
//!
//! let adapter = DatabaseAdapter::new(catalog.clone(), SettleConfig::default());
//! let created = adapter
//!     .create(&DatabaseResource::new("analytics", OwnerId::new(104), None))
//!     .await?;
//!
//! assert!(created.id.is_some());
//! assert_eq!(catalog.statements().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redshift_core::{
    Catalog, CatalogSession, CoreError, CoreResult, DatabaseId, DatabaseRow, OwnerId,
};

/// Database rows plus the visibility bookkeeping that moves with them.
#[derive(Debug, Clone, Default)]
struct Tables {
    databases: BTreeMap<DatabaseId, DatabaseRow>,
    /// Remaining lookup-by-name misses per freshly created database.
    hidden: HashMap<String, u32>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct MockState {
    tables: Tables,
    users: HashMap<OwnerId, String>,
    propagation_delay: u32,
    statements: Vec<String>,
    rejected: Vec<(String, String)>,
    unreachable: bool,
    failing_lookups: bool,
    failing_reads: bool,
    open_sessions: usize,
    commits: usize,
    rollbacks: usize,
}

/// In-memory stand-in for a cluster catalog.
#[derive(Clone, Default)]
pub struct MockCatalog {
    state: Arc<Mutex<MockState>>,
}

impl MockCatalog {
    /// Creates an empty catalog; identifiers start at 100 000.
    pub fn new() -> Self {
        let catalog = Self::default();
        catalog.state.lock().tables.next_id = 100_000;
        catalog
    }

    /// Registers a user that databases may be owned by.
    pub fn add_user(&self, owner: OwnerId, username: impl Into<String>) {
        self.state.lock().users.insert(owner, username.into());
    }

    /// Inserts a committed database row directly, bypassing DDL.
    pub fn insert_database(&self, row: DatabaseRow) -> DatabaseId {
        let mut state = self.state.lock();
        let id = state.tables.allocate_id();
        state.tables.databases.insert(id, row);
        id
    }

    /// Makes each new database invisible to the next `lookups` name lookups.
    pub fn set_propagation_delay(&self, lookups: u32) {
        self.state.lock().propagation_delay = lookups;
    }

    /// Rejects the next statement containing `pattern` with `message`.
    pub fn reject_statement(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.state
            .lock()
            .rejected
            .push((pattern.into(), message.into()));
    }

    /// Makes every new transaction and autocommit statement fail to connect.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Makes catalog lookups inside sessions fail.
    pub fn set_failing_lookups(&self, failing: bool) {
        self.state.lock().failing_lookups = failing;
    }

    /// Makes only lookup-by-id inside sessions fail.
    pub fn set_failing_reads(&self, failing: bool) {
        self.state.lock().failing_reads = failing;
    }

    /// Committed row for `id`.
    pub fn database(&self, id: DatabaseId) -> Option<DatabaseRow> {
        self.state.lock().tables.databases.get(&id).cloned()
    }

    /// Number of committed databases.
    pub fn database_count(&self) -> usize {
        self.state.lock().tables.databases.len()
    }

    /// Every statement executed so far, committed or not.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Forgets the statement history.
    pub fn clear_statements(&self) {
        self.state.lock().statements.clear();
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }

    /// Sessions begun but neither committed, rolled back nor dropped.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().open_sessions
    }

    fn run(&self, tables: &mut Tables, statement: &str) -> CoreResult<()> {
        let mut state = self.state.lock();
        state.statements.push(statement.to_string());

        if let Some(pos) = state
            .rejected
            .iter()
            .position(|(pattern, _)| statement.contains(pattern.as_str()))
        {
            let (_, message) = state.rejected.remove(pos);
            return Err(CoreError::statement(message));
        }

        let delay = state.propagation_delay;
        apply(tables, &state.users, delay, statement)
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    type Session = MockSession;

    async fn begin(&self) -> CoreResult<MockSession> {
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(CoreError::connection("connection refused"));
        }
        state.open_sessions += 1;
        Ok(MockSession {
            catalog: self.clone(),
            tables: state.tables.clone(),
            finished: false,
        })
    }

    async fn execute_autocommit(&self, statement: &str) -> CoreResult<()> {
        if self.state.lock().unreachable {
            return Err(CoreError::connection("connection refused"));
        }
        let mut tables = self.state.lock().tables.clone();
        self.run(&mut tables, statement)?;
        self.state.lock().tables = tables;
        Ok(())
    }
}

/// Transaction over a private copy of the catalog tables.
pub struct MockSession {
    catalog: MockCatalog,
    tables: Tables,
    finished: bool,
}

impl MockSession {
    fn check_lookup(&self) -> CoreResult<()> {
        if self.catalog.state.lock().failing_lookups {
            return Err(CoreError::connection("server closed the connection unexpectedly"));
        }
        Ok(())
    }

    fn finish(&mut self, commit: bool) {
        let mut state = self.catalog.state.lock();
        if commit {
            state.tables = self.tables.clone();
            state.commits += 1;
        } else {
            state.rollbacks += 1;
        }
        state.open_sessions -= 1;
        self.finished = true;
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(false);
        }
    }
}

#[async_trait]
impl CatalogSession for MockSession {
    async fn execute(&mut self, statement: &str) -> CoreResult<()> {
        self.catalog.run(&mut self.tables, statement)
    }

    async fn find_database(&mut self, id: DatabaseId) -> CoreResult<Option<DatabaseRow>> {
        self.check_lookup()?;
        if self.catalog.state.lock().failing_reads {
            return Err(CoreError::connection("server closed the connection unexpectedly"));
        }
        Ok(self.tables.databases.get(&id).cloned())
    }

    async fn find_database_id(&mut self, name: &str) -> CoreResult<Option<DatabaseId>> {
        self.check_lookup()?;
        if let Some(remaining) = self.tables.hidden.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(self.tables.id_by_name(name))
    }

    async fn find_username(&mut self, owner: OwnerId) -> CoreResult<Option<String>> {
        self.check_lookup()?;
        Ok(self.catalog.state.lock().users.get(&owner).cloned())
    }

    async fn commit(mut self) -> CoreResult<()> {
        self.finish(true);
        Ok(())
    }

    async fn rollback(mut self) -> CoreResult<()> {
        self.finish(false);
        Ok(())
    }
}

impl Tables {
    fn allocate_id(&mut self) -> DatabaseId {
        let id = DatabaseId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn id_by_name(&self, name: &str) -> Option<DatabaseId> {
        self.databases
            .iter()
            .find(|(_, row)| row.name == name)
            .map(|(id, _)| *id)
    }

    fn require(&self, name: &str) -> CoreResult<DatabaseId> {
        self.id_by_name(name)
            .ok_or_else(|| CoreError::statement(format!("database \"{name}\" does not exist")))
    }
}

fn owner_by_name(users: &HashMap<OwnerId, String>, username: &str) -> CoreResult<OwnerId> {
    users
        .iter()
        .find(|(_, name)| name.as_str() == username)
        .map(|(id, _)| *id)
        .ok_or_else(|| CoreError::statement(format!("user \"{username}\" does not exist")))
}

fn apply(
    tables: &mut Tables,
    users: &HashMap<OwnerId, String>,
    propagation_delay: u32,
    statement: &str,
) -> CoreResult<()> {
    let tokens = tokenize(statement)?;
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();

    match words.as_slice() {
        ["CREATE", "DATABASE", name, rest @ ..] => {
            if tables.id_by_name(name).is_some() {
                return Err(CoreError::statement(format!(
                    "database \"{name}\" already exists"
                )));
            }
            let mut row = DatabaseRow {
                name: name.to_string(),
                owner: OwnerId::new(1),
                connection_limit: Some("UNLIMITED".to_string()),
            };
            let mut rest = rest;
            while !rest.is_empty() {
                match rest {
                    ["OWNER", owner, tail @ ..] => {
                        row.owner = owner_by_name(users, owner)?;
                        rest = tail;
                    }
                    ["CONNECTION", "LIMIT", limit, tail @ ..] => {
                        row.connection_limit = Some(limit.to_string());
                        rest = tail;
                    }
                    _ => return Err(syntax_error(statement)),
                }
            }
            let id = tables.allocate_id();
            tables.databases.insert(id, row);
            if propagation_delay > 0 {
                tables.hidden.insert(name.to_string(), propagation_delay);
            }
            Ok(())
        }
        ["ALTER", "DATABASE", name, "RENAME", "TO", new_name] => {
            let id = tables.require(name)?;
            if tables.id_by_name(new_name).is_some() {
                return Err(CoreError::statement(format!(
                    "database \"{new_name}\" already exists"
                )));
            }
            if let Some(row) = tables.databases.get_mut(&id) {
                row.name = new_name.to_string();
            }
            Ok(())
        }
        ["ALTER", "DATABASE", name, "OWNER", "TO", owner] => {
            let id = tables.require(name)?;
            let owner = owner_by_name(users, owner)?;
            if let Some(row) = tables.databases.get_mut(&id) {
                row.owner = owner;
            }
            Ok(())
        }
        ["ALTER", "DATABASE", name, "CONNECTION", "LIMIT", limit] => {
            let id = tables.require(name)?;
            if let Some(row) = tables.databases.get_mut(&id) {
                row.connection_limit = Some(limit.to_string());
            }
            Ok(())
        }
        ["DROP", "DATABASE", name] => {
            let id = tables.require(name)?;
            tables.databases.remove(&id);
            Ok(())
        }
        _ => Err(syntax_error(statement)),
    }
}

fn syntax_error(statement: &str) -> CoreError {
    CoreError::statement(format!("syntax error in `{statement}`"))
}

/// Splits a statement into bare words and unquoted identifiers.
fn tokenize(statement: &str) -> CoreResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = statement.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut ident = String::new();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        ident.push('"');
                    }
                    Some('"') => break,
                    Some(other) => ident.push(other),
                    None => return Err(syntax_error(statement)),
                }
            }
            tokens.push(ident);
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(word);
        }
    }

    Ok(tokens)
}

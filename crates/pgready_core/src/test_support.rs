//! Scripted connector and in-memory catalog for tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::ReadyError;
use crate::models::ConnectionTarget;
use crate::services::connector::{Connection, Connector};

#[derive(Default)]
struct CatalogState {
    tables: HashSet<(String, String)>,
    lookups: usize,
    lookup_failure: Option<ReadyError>,
    lookup_delay: Duration,
    liveness_failure: Option<ReadyError>,
    opened: usize,
    released: usize,
    max_open: usize,
}

/// In-memory catalog shared by every stub connection.
#[derive(Clone, Default)]
pub struct StubCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl StubCatalog {
    /// Catalog containing `schema.name` entries.
    pub fn with_tables(tables: &[&str]) -> Self {
        let catalog = Self::default();
        for table in tables {
            catalog.add_table(table);
        }
        catalog
    }

    pub fn add_table(&self, qualified: &str) {
        let (schema, name) = qualified.split_once('.').expect("schema.name");
        self.state.lock().tables.insert((schema.to_string(), name.to_string()));
    }

    pub fn fail_lookups_with(&self, err: ReadyError) {
        self.state.lock().lookup_failure = Some(err);
    }

    pub fn clear_lookup_failure(&self) {
        self.state.lock().lookup_failure = None;
    }

    pub fn delay_lookups(&self, delay: Duration) {
        self.state.lock().lookup_delay = delay;
    }

    pub fn fail_liveness_with(&self, err: ReadyError) {
        self.state.lock().liveness_failure = Some(err);
    }

    /// Catalog lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.state.lock().lookups
    }

    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    /// Highest number of connections open at the same time.
    pub fn max_open(&self) -> usize {
        self.state.lock().max_open
    }
}

/// Connection over a `StubCatalog`; counts opens and releases.
pub struct StubConnection {
    catalog: StubCatalog,
    released: bool,
}

impl StubConnection {
    pub fn new(catalog: StubCatalog) -> Self {
        {
            let mut state = catalog.state.lock();
            state.opened += 1;
            let open = state.opened - state.released;
            state.max_open = state.max_open.max(open);
        }
        Self { catalog, released: false }
    }
}

#[async_trait]
impl Connection for StubConnection {
    async fn verify_live(&mut self) -> Result<(), ReadyError> {
        match self.catalog.state.lock().liveness_failure.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn lookup_table_exists(&mut self, schema: &str, name: &str) -> Result<bool, ReadyError> {
        let delay = {
            let mut state = self.catalog.state.lock();
            state.lookups += 1;
            if let Some(err) = state.lookup_failure.clone() {
                return Err(err);
            }
            state.lookup_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let state = self.catalog.state.lock();
        Ok(state.tables.contains(&(schema.to_string(), name.to_string())))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.catalog.state.lock().released += 1;
        }
    }
}

impl Drop for StubConnection {
    fn drop(&mut self) {
        self.release();
    }
}

/// What a scripted connect call does.
#[derive(Clone)]
pub enum ConnectStep {
    Succeed,
    Fail(ReadyError),
    /// Never completes; only a deadline ends it.
    Hang,
}

struct ConnectorState {
    script: VecDeque<ConnectStep>,
    fallback: ConnectStep,
    connects: usize,
    connect_times: Vec<Instant>,
}

/// Connector that follows a script, then repeats a fallback step.
pub struct StubConnector {
    catalog: StubCatalog,
    latency: Duration,
    state: Mutex<ConnectorState>,
}

impl StubConnector {
    /// Connector whose every connect succeeds.
    pub fn new(catalog: StubCatalog) -> Self {
        Self {
            catalog,
            latency: Duration::ZERO,
            state: Mutex::new(ConnectorState {
                script: VecDeque::new(),
                fallback: ConnectStep::Succeed,
                connects: 0,
                connect_times: Vec::new(),
            }),
        }
    }

    /// Fail the first `times` connects with `err`.
    pub fn fail_first(self, times: usize, err: ReadyError) -> Self {
        {
            let mut state = self.state.lock();
            for _ in 0..times {
                state.script.push_back(ConnectStep::Fail(err.clone()));
            }
        }
        self
    }

    /// Append one step to the script.
    pub fn then(self, step: ConnectStep) -> Self {
        self.state.lock().script.push_back(step);
        self
    }

    /// Step used once the script is exhausted.
    pub fn then_always(self, step: ConnectStep) -> Self {
        self.state.lock().fallback = step;
        self
    }

    /// Time each connect takes before resolving.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    /// Clock reading at the start of each connect call.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().connect_times.clone()
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(
        &self,
        _target: &ConnectionTarget,
        _deadline: Instant,
    ) -> Result<Box<dyn Connection>, ReadyError> {
        let step = {
            let mut state = self.state.lock();
            state.connects += 1;
            state.connect_times.push(Instant::now());
            let fallback = state.fallback.clone();
            state.script.pop_front().unwrap_or(fallback)
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match step {
            ConnectStep::Succeed => Ok(Box::new(StubConnection::new(self.catalog.clone()))),
            ConnectStep::Fail(err) => Err(err),
            ConnectStep::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

//! In-process ledger host.
//!
//! Stands in for the peer that executes the contract: every invocation runs
//! on a fresh [`Transaction`] over the world state. The result of execution
//! is a [`Prepared`] response plus write-set; nothing touches the world
//! state until the write-set is committed, and a failed invocation produces
//! no write-set at all.
//!
//! Splitting `prepare` from `commit` lets a caller persist the write-set
//! somewhere durable first and only then apply it in memory.

use tracing::{info, warn};

use crate::dispatch::Invocation;
use crate::errors::Result;
use crate::store::StateStore;
use crate::txn::{Transaction, WriteSet};
use crate::SlaLedger;

/// An executed, not yet committed, invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub response: Vec<u8>,
    pub write_set: WriteSet,
}

pub struct Ledger<S: StateStore> {
    engine: SlaLedger,
    world: S,
}

impl<S: StateStore> Ledger<S> {
    pub fn new(engine: SlaLedger, world: S) -> Self {
        Self { engine, world }
    }

    pub fn engine(&self) -> &SlaLedger {
        &self.engine
    }

    pub fn world(&self) -> &S {
        &self.world
    }

    /// Execute without committing.
    pub fn prepare(&self, invocation: &Invocation) -> Result<Prepared> {
        let mut tx = Transaction::new(&self.world);
        match self.engine.invoke(&mut tx, invocation) {
            Ok(response) => Ok(Prepared {
                response,
                write_set: tx.into_write_set(),
            }),
            Err(e) => {
                warn!(
                    function = invocation.function(),
                    kind = e.kind().as_str(),
                    error = %e,
                    "invocation rejected"
                );
                Err(e)
            }
        }
    }

    pub fn commit(&mut self, write_set: &WriteSet) -> Result<()> {
        write_set.apply(&mut self.world)?;
        Ok(())
    }

    /// Execute a query. Any writes it makes are discarded.
    pub fn evaluate(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        self.prepare(invocation).map(|p| p.response)
    }

    /// Execute and commit in one step.
    pub fn submit(&mut self, invocation: &Invocation) -> Result<Vec<u8>> {
        let prepared = self.prepare(invocation)?;
        self.commit(&prepared.write_set)?;
        info!(
            function = invocation.function(),
            writes = prepared.write_set.len(),
            "transaction committed"
        );
        Ok(prepared.response)
    }

    /// Submit by function name and string arguments.
    pub fn submit_transaction(&mut self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        let invocation = Invocation::parse(function, args)?;
        self.submit(&invocation)
    }

    pub fn evaluate_transaction(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        let invocation = Invocation::parse(function, args)?;
        self.evaluate(&invocation)
    }
}

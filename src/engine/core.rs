// 8.0 engine/core.rs: main exchange struct. holds persisted state, collaborators, event log.

use super::results::ExchangeError;
use crate::config::{Configuration, EngineConfig};
use crate::connector::Connector;
use crate::events::{Event, EventId, EventPayload};
use crate::fee::{resolve_policy, FeePolicy};
use crate::ledger::{InMemoryLedger, Ledger};
use crate::reserve::{InMemoryReserve, Reserve};
use crate::store::{RowKey, Singleton, Table};
use crate::types::{AccountName, ExtendedSymbol, Timestamp};
use tracing::{debug, warn};

/// Persisted rows. Cloned as a whole to snapshot a unit of work.
#[derive(Debug, Clone, Default)]
pub(super) struct State {
    pub(super) configuration: Singleton<Configuration>,
    pub(super) connectors: Table<Connector>,
    pub(super) charges: Table<FeePolicy>,
}

/** 8.1: main exchange struct. all state lives here */
#[derive(Debug)]
pub struct Exchange<L = InMemoryLedger, R = InMemoryReserve> {
    pub(super) config: EngineConfig,
    pub(super) state: State,
    pub(super) ledger: L,
    pub(super) reserve: R,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl<L, R> Exchange<L, R>
where
    L: Ledger + Clone,
    R: Reserve + Clone,
{
    /// Fails when `config` does not validate.
    pub fn new(config: EngineConfig, ledger: L, reserve: R) -> Result<Self, ExchangeError> {
        config.validate()?;
        Ok(Self::assemble(config, ledger, reserve))
    }

    fn assemble(config: EngineConfig, ledger: L, reserve: R) -> Self {
        Self {
            config,
            state: State::default(),
            ledger,
            reserve,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    /// Move the clock to `timestamp`. The clock never runs behind wall time.
    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn contract(&self) -> &AccountName {
        &self.config.contract
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.state.configuration.get()
    }

    pub fn connector(&self, smart: &ExtendedSymbol) -> Option<&Connector> {
        self.state.connectors.find(&RowKey::from(smart))
    }

    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.state.connectors.iter().map(|(_, c)| c)
    }

    /// Per-asset policy only; see `effective_policy` for what a conversion would charge.
    pub fn fee_policy(&self, smart: &ExtendedSymbol) -> Option<&FeePolicy> {
        self.state.charges.find(&RowKey::from(smart))
    }

    pub fn effective_policy(&self, smart: &ExtendedSymbol) -> FeePolicy {
        let default = self.configuration().map(|c| c.default_policy());
        resolve_policy(self.fee_policy(smart), default.as_ref())
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    // outside a unit of work: for provisioning tokens and balances, not for conversions
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn reserve(&self) -> &R {
        &self.reserve
    }

    pub fn reserve_mut(&mut self) -> &mut R {
        &mut self.reserve
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn configuration_or_err(&self) -> Result<&Configuration, ExchangeError> {
        self.state
            .configuration
            .get()
            .ok_or(ExchangeError::NotInitialized)
    }

    /// Run `body` as one unit of work: on error every row, balance and reserve record it
    /// touched is restored.
    pub(super) fn atomically<T>(
        &mut self,
        action: &str,
        body: impl FnOnce(&mut Self) -> Result<T, ExchangeError>,
    ) -> Result<T, ExchangeError> {
        let state = self.state.clone();
        let ledger = self.ledger.clone();
        let reserve = self.reserve.clone();

        let result = body(self);
        if let Err(e) = &result {
            warn!(action, error = %e, "unit of work aborted, rolling back");
            self.state = state;
            self.ledger = ledger;
            self.reserve = reserve;
        }
        result
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.current_time = self.current_time.max(Timestamp::now());
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        debug!(event_id = event.id.0, payload = ?event.payload, "event");

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

impl Exchange<InMemoryLedger, InMemoryReserve> {
    /// Exchange over in-memory collaborators with default settings.
    pub fn in_memory() -> Self {
        Self::assemble(EngineConfig::default(), InMemoryLedger::new(), InMemoryReserve::default())
    }
}

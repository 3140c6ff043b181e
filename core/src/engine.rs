//! The simulation engine: one market, one seed, month after month.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Economics           profit and savings from last month's subscribers
//!   2. Bankruptcy          insolvent firms leave every quadrant index
//!   3. Price experiments   review running trials, maybe start one
//!   4. Product experiments review running trials, maybe start one
//!   5. Reassessment        households fix real problems, contemplators
//!                          reconsider
//!
//! RULES:
//!   - Phases execute in registration order, every month.
//!   - Phases only touch state through the SimContext they are handed.
//!   - All randomness flows through the context's DrawSource.
//!   - Everything a phase changes is reported as an event.

use crate::{
    bankruptcy_subsystem::BankruptcySubsystem,
    config::SimParams,
    context::SimContext,
    economics_subsystem::EconomicsSubsystem,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    market::MarketCatalogue,
    metrics::{firm_month_records, market_report, MarketReport},
    price_experiment_subsystem::PriceExperimentSubsystem,
    product_experiment_subsystem::ProductExperimentSubsystem,
    reassessment_subsystem::ReassessmentSubsystem,
    snapshot::{SimSnapshot, SNAPSHOT_INTERVAL},
    store::SimStore,
    subsystem::MonthPhase,
    types::{Month, RunId},
};

pub struct SimEngine {
    pub run_id:  RunId,
    pub ctx:     SimContext,
    /// Last completed month; 0 before the first step.
    pub month:   Month,
    phases:      Vec<Box<dyn MonthPhase>>,
    store:       Option<SimStore>,
    event_log:   Vec<EventLogEntry>,
    reports:     Vec<MarketReport>,
    initialized: bool,
}

impl SimEngine {
    /// Validate parameters and populate the grid. No phases registered.
    pub fn new(run_id: RunId, params: SimParams, market: MarketCatalogue) -> SimResult<Self> {
        params.validate()?;
        let ctx = SimContext::new(params, market);
        Ok(Self {
            run_id,
            ctx,
            month:       0,
            phases:      Vec::new(),
            store:       None,
            event_log:   Vec::new(),
            reports:     Vec::new(),
            initialized: false,
        })
    }

    /// Build a fully wired engine with every phase registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, params: SimParams, market: MarketCatalogue) -> SimResult<Self> {
        let mut engine = SimEngine::new(run_id, params, market)?;
        // EXECUTION ORDER: see module docs.
        engine.register(Box::new(EconomicsSubsystem::new()));
        engine.register(Box::new(BankruptcySubsystem::new()));
        engine.register(Box::new(PriceExperimentSubsystem::new()));
        engine.register(Box::new(ProductExperimentSubsystem::new()));
        engine.register(Box::new(ReassessmentSubsystem::new()));
        Ok(engine)
    }

    /// Test engine: reference market, small grid, in-memory store.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        let params = SimParams::default_test().with_seed(seed);
        let market = MarketCatalogue::fixture(params.initial_money_pool)?;
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, "0.1.0-test", "fixture", &serde_json::to_string(&params)?)?;

        let mut engine = SimEngine::build(run_id, params, market)?;
        engine.attach_store(store);
        Ok(engine)
    }

    /// Register a phase. Call in the documented execution order.
    pub fn register(&mut self, phase: Box<dyn MonthPhase>) {
        self.phases.push(phase);
    }

    /// Persist events, reports and snapshots to `store` from now on. The
    /// run row must already exist.
    pub fn attach_store(&mut self, store: SimStore) {
        self.store = Some(store);
    }

    pub fn store(&self) -> Option<&SimStore> {
        self.store.as_ref()
    }

    pub fn params(&self) -> &SimParams {
        &self.ctx.params
    }

    pub fn event_log(&self) -> &[EventLogEntry] {
        &self.event_log
    }

    pub fn events_for_month(&self, month: Month) -> impl Iterator<Item = &EventLogEntry> {
        self.event_log.iter().filter(move |e| e.month == month)
    }

    pub fn reports(&self) -> &[MarketReport] {
        &self.reports
    }

    pub fn is_finished(&self) -> bool {
        self.month >= self.ctx.params.months
    }

    fn record(&mut self, month: Month, phase: &str, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            month,
            phase:      phase.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        if let Some(store) = &self.store {
            store.append_event(&entry)?;
        }
        self.event_log.push(entry);
        Ok(())
    }

    /// Month 0: the populated grid before any firm acts.
    fn initialize(&mut self) -> SimResult<()> {
        let households = self.ctx.grid.populated_count();
        let event = SimEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed: self.ctx.rng.seed(),
            households,
        };
        self.record(0, "engine", &event)?;
        self.take_report(0)?;
        self.initialized = true;
        log::info!(
            "run={} initialised: seed={} households={households} firms={}",
            self.run_id,
            self.ctx.rng.seed(),
            self.ctx.market.firms.len()
        );
        Ok(())
    }

    /// Advance one month. This is the core simulation step.
    pub fn step(&mut self) -> SimResult<Vec<SimEvent>> {
        if !self.initialized {
            self.initialize()?;
        }
        if self.is_finished() {
            return Err(SimError::RunFinished {
                run_id: self.run_id.clone(),
                months: self.month,
            });
        }

        let month = self.month + 1;
        self.ctx.begin_month();
        let started = SimEvent::MonthStarted { month };
        self.record(month, "engine", &started)?;
        let mut month_events = vec![started];

        // Each phase sees all events emitted so far this month.
        let mut phases = std::mem::take(&mut self.phases);
        let outcome = self.run_phases(&mut phases, month, &mut month_events);
        self.phases = phases;
        outcome?;

        self.month = month;

        if let Some(store) = &self.store {
            for record in firm_month_records(&self.ctx, month) {
                store.insert_firm_month(&self.run_id, &record)?;
            }
        }

        if month % self.ctx.params.report_interval == 0 {
            let event = self.take_report(month)?;
            month_events.push(event);
        }

        let completed = SimEvent::MonthCompleted { month };
        self.record(month, "engine", &completed)?;
        month_events.push(completed);

        if month % SNAPSHOT_INTERVAL == 0 || self.is_finished() {
            self.take_snapshot(month)?;
        }
        if self.is_finished() {
            log::info!(
                "run={} finished after {month} months: {} of {} firms solvent",
                self.run_id,
                self.ctx.market.solvent_firms().count(),
                self.ctx.market.firms.len()
            );
        }
        Ok(month_events)
    }

    fn run_phases(
        &mut self,
        phases: &mut [Box<dyn MonthPhase>],
        month: Month,
        month_events: &mut Vec<SimEvent>,
    ) -> SimResult<()> {
        for phase in phases.iter_mut() {
            let new_events = phase.run(&mut self.ctx, month, month_events)?;
            for event in &new_events {
                self.record(month, phase.name(), event)?;
            }
            month_events.extend(new_events);
        }
        Ok(())
    }

    /// Run n months, stopping early if the run's horizon is reached.
    pub fn run_months(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            if self.is_finished() {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Run to the configured month count.
    pub fn run(&mut self) -> SimResult<()> {
        let remaining = self.ctx.params.months.saturating_sub(self.month);
        if !self.initialized {
            self.initialize()?;
        }
        self.run_months(remaining)
    }

    /// Hand back the final state and the reports collected on the way.
    pub fn into_parts(self) -> (SimContext, Vec<MarketReport>) {
        (self.ctx, self.reports)
    }

    fn take_report(&mut self, month: Month) -> SimResult<SimEvent> {
        let report = market_report(&self.ctx, month);
        if let Some(store) = &self.store {
            store.insert_market_report(&self.run_id, &report)?;
        }
        let event = SimEvent::MarketReported {
            month,
            hhi_mobile:   report.hhi_mobile,
            hhi_fixed:    report.hhi_fixed,
            disconnected: report.disconnected,
        };
        self.record(month, "metrics", &event)?;
        log::debug!(
            "month={month} metrics: complete={} mobile_only={} fixed_only={} disconnected={}",
            report.complete,
            report.mobile_only,
            report.fixed_only,
            report.disconnected
        );
        self.reports.push(report);
        Ok(event)
    }

    fn take_snapshot(&self, month: Month) -> SimResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let snapshot = SimSnapshot::capture(&self.run_id, month, &self.ctx);
        let json = serde_json::to_string(&snapshot)?;
        store.save_snapshot(&self.run_id, month, &json)?;
        log::debug!("Snapshot saved at month {month}");
        Ok(())
    }
}

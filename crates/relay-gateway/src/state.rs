//! Shared, process-wide collaborators every handler closes over (§6).

use std::sync::Arc;

use relay_ability::AbilityIndex;
use relay_adaptor::AdaptorRegistry;
use relay_billing::ConsumeTxnManager;
use relay_coalesce::Coalescer;
use relay_core::{EventListener, GatewayConfig};
use relay_engine::{RelayEngine, RelayEngineEvent};
use relay_ledger::QuotaLedger;

use crate::log::{LogEntry, RequestLog};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RelayEngine>,
    pub billing: Arc<ConsumeTxnManager>,
    pub ledger: Arc<QuotaLedger>,
    pub index: Arc<AbilityIndex>,
    pub config: Arc<GatewayConfig>,
    pub log: Arc<RequestLog>,
    pub models_coalescer: Arc<Coalescer<Vec<String>, String>>,
}

impl AppState {
    pub fn new(
        index: Arc<AbilityIndex>,
        ledger: Arc<QuotaLedger>,
        registry: Arc<AdaptorRegistry>,
        config: GatewayConfig,
    ) -> Self {
        let config = Arc::new(config);
        let billing = Arc::new(ConsumeTxnManager::new(Arc::clone(&ledger)));
        let log = Arc::new(RequestLog::new());
        let models_coalescer = Arc::new(Coalescer::new());

        let mut engine = RelayEngine::new(Arc::clone(&index), Arc::clone(&ledger), registry, (*config).clone());
        engine.add_listener(RequestLogListener { log: Arc::clone(&log) });
        let engine = Arc::new(engine);

        Self {
            engine,
            billing,
            ledger,
            index,
            config,
            log,
            models_coalescer,
        }
    }
}

/// Mirrors settlement outcomes into the request log so `GET
/// /api/cost/request/{request_id}` has something to look up once the
/// detached settle task finishes (§6).
struct RequestLogListener {
    log: Arc<RequestLog>,
}

impl EventListener<RelayEngineEvent> for RequestLogListener {
    fn on_event(&self, event: &RelayEngineEvent) {
        if let RelayEngineEvent::SettlementRecorded {
            request_id,
            token_id,
            user_id,
            group,
            model,
            delta,
            succeeded,
            ..
        } = event
        {
            self.log.record(LogEntry {
                request_id: request_id.clone(),
                token_id: *token_id,
                user_id: *user_id,
                group: group.clone(),
                model: model.clone(),
                status: if *succeeded { 200 } else { 500 },
                cost: *delta,
                succeeded: *succeeded,
            });
        }
    }
}

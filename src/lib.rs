pub mod analysis;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod prompts;
pub mod relay;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod synthesis;
pub mod types;

use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::ChatAnalysisEngine;
use crate::broadcast::EventPublisher;
use crate::llm::CompletionClient;
use crate::relay::StreamingRelay;
use crate::scheduler::PendingWorkSelector;
use crate::store::{ConversationStore, PgStore, ReportStore};
use crate::synthesis::ReportSynthesizer;

pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<PgStore>,
    pub relay: StreamingRelay,
    pub analysis: ChatAnalysisEngine,
    pub synthesizer: ReportSynthesizer,
    pub selector: PendingWorkSelector,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        llm: Arc<dyn CompletionClient>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        let conversation: Arc<dyn ConversationStore> = store.clone();
        let report: Arc<dyn ReportStore> = store.clone();

        AppState {
            relay: StreamingRelay::new(llm.clone(), publisher, conversation.clone()),
            analysis: ChatAnalysisEngine::new(llm.clone(), conversation.clone()),
            synthesizer: ReportSynthesizer::new(llm, report),
            selector: PendingWorkSelector::new(conversation),
            store,
            pool,
        }
    }
}

//! Lifecycle root (C14).
//!
//! Constructs every component in the dependency order §4 lays them out in,
//! wires the ten tools into the dispatcher, and owns graceful shutdown.
//! Replaces the teacher's per-module singleton tendency: `Config` is read
//! once and handed to every component by `Arc`, rather than re-read or
//! re-derived behind module-level statics.

use crate::ltmc::chat_linker::ChatLinker;
use crate::ltmc::config::Config;
use crate::ltmc::consistency::ConsistencyManager;
use crate::ltmc::embedding::HashingEmbedder;
use crate::ltmc::observability::Observability;
use crate::ltmc::retriever::HybridRetriever;
use crate::ltmc::rpc::dispatcher::ToolDispatcher;
use crate::ltmc::rpc::tools::{
    cache_tool::CacheTool, chat_tool::ChatTool, config_tool::ConfigTool,
    context_links_tool::ContextLinksTool, graph_tool::GraphTool, memory_tool::MemoryTool,
    pattern_tool::PatternTool, sync_tool::SyncTool, thought_tool::ThoughtTool, todo_tool::TodoTool,
    AppState,
};
use crate::ltmc::store::relational::RelationalStore;
use crate::ltmc::store::vector::VectorIndex;
use crate::ltmc::sync_coordinator::SyncCoordinator;
use crate::ltmc::thought_engine::ThoughtEngine;
use crate::ltmc::unified_ops::UnifiedOps;
use std::sync::Arc;

#[cfg(feature = "graph")]
use crate::ltmc::store::graph::GraphStore;

#[cfg(feature = "cache")]
use crate::ltmc::store::cache::CacheAdapter;

pub struct LtmcEngine {
    pub config: Config,
    pub state: AppState,
    pub dispatcher: Arc<ToolDispatcher>,
}

impl LtmcEngine {
    /// Opens C1 (required) then C2, then best-effort C3/C4 per §4.14's
    /// "log and proceed on failure" startup order, and registers the
    /// fixed ten-tool catalog.
    pub async fn start(config: Config) -> crate::ltmc::error::LtmcResult<Self> {
        let db = Arc::new(RelationalStore::open(&config.db_path)?);
        let vector = Arc::new(VectorIndex::open(&config.vector_index_path, config.embedding_dim));
        let embedder = Arc::new(HashingEmbedder::new(config.embedding_dim));

        let mut sync = SyncCoordinator::new(db.clone(), vector.clone(), embedder, &config);

        #[cfg(feature = "graph")]
        if config.graph_enabled {
            match GraphStore::open(&config.graph_uri) {
                Ok(store) => sync.graph = Some(Arc::new(store)),
                Err(e) => log::warn!("graph store unavailable at startup: {e}"),
            }
        }

        #[cfg(feature = "cache")]
        if config.cache_enabled {
            match CacheAdapter::connect(&config.cache_host, config.cache_port, config.cache_password.as_deref()).await {
                Ok(adapter) => sync.cache = Some(Arc::new(adapter)),
                Err(e) => log::warn!("cache adapter unavailable at startup: {e}"),
            }
        }

        let sync = Arc::new(sync);
        let ops = Arc::new(UnifiedOps::new(sync.clone(), config.chunk_size, config.chunk_overlap));
        let chat_linker = Arc::new(ChatLinker::new(db.clone()));
        let retriever = Arc::new(HybridRetriever::new(
            sync.clone(),
            chat_linker.clone(),
            config.overfetch,
            config.recency_tau_secs,
            config.context_budget_chars,
        ));
        let consistency = Arc::new(ConsistencyManager::new(sync.clone()));
        let thought_engine = Arc::new(ThoughtEngine::new(ops.clone(), retriever.clone()));
        let observability = Arc::new(Observability::new());

        let state = AppState {
            sync,
            ops,
            retriever,
            chat_linker,
            consistency,
            thought_engine,
            observability: observability.clone(),
        };

        let mut dispatcher = ToolDispatcher::new(&config, observability);
        dispatcher.register("memory", Arc::new(MemoryTool::new(state.clone())));
        dispatcher.register("chat", Arc::new(ChatTool::new(state.clone())));
        dispatcher.register("todo", Arc::new(TodoTool::new(state.clone())));
        dispatcher.register("context_links", Arc::new(ContextLinksTool::new(state.clone())));
        dispatcher.register("graph", Arc::new(GraphTool::new(state.clone())));
        dispatcher.register("cache", Arc::new(CacheTool::new(state.clone())));
        dispatcher.register("pattern", Arc::new(PatternTool::new()));
        dispatcher.register("sync", Arc::new(SyncTool::new(state.clone())));
        dispatcher.register("config", Arc::new(ConfigTool::new(state.clone())));
        dispatcher.register("thought", Arc::new(ThoughtTool::new(state.clone())));

        Ok(Self {
            config,
            state,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Drives the stdio transport until stdin closes, then checkpoints C2
    /// and (if enabled) C3 before returning, per §4.14's shutdown order.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        self.dispatcher.clone().run_stdio().await?;
        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.state.sync.vector.save() {
            log::warn!("failed to checkpoint vector index on shutdown: {e}");
        }
        #[cfg(feature = "graph")]
        if let Some(graph) = &self.state.sync.graph {
            if let Err(e) = graph.save() {
                log::warn!("failed to checkpoint graph store on shutdown: {e}");
            }
        }
    }
}

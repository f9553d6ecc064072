//! Chat/Context Linker (C12).
//!
//! Logs conversation turns and links them to the Chunks that answered
//! them. Validation (both ends of a link must exist) and idempotency of
//! duplicate links live in the relational store itself (§4.1); this is a
//! thin named surface matching the contract in §4.12.

use crate::ltmc::error::LtmcResult;
use crate::ltmc::store::relational::RelationalStore;
use crate::ltmc::store::{ChatMessage, ContextLink};
use std::sync::Arc;

pub struct ChatLinker {
    db: Arc<RelationalStore>,
}

impl ChatLinker {
    pub fn new(db: Arc<RelationalStore>) -> Self {
        Self { db }
    }

    pub fn log_chat(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        agent: Option<&str>,
        source_tool: Option<&str>,
        metadata: Option<&str>,
    ) -> LtmcResult<i64> {
        self.db
            .log_chat(conversation_id, role, content, agent, source_tool, metadata)
    }

    pub fn store_context_links(&self, message_id: i64, chunk_ids: &[i64]) -> LtmcResult<()> {
        self.db.add_context_links(message_id, chunk_ids)
    }

    pub fn get_context_links_for_message(&self, message_id: i64) -> LtmcResult<Vec<ContextLink>> {
        self.db.get_links_for_message(message_id)
    }

    pub fn get_messages_for_chunk(&self, chunk_id: i64) -> LtmcResult<Vec<ChatMessage>> {
        self.db.get_messages_for_chunk(chunk_id)
    }

    pub fn get_by_conversation(&self, conversation_id: &str) -> LtmcResult<Vec<ChatMessage>> {
        self.db.get_chat_by_conversation(conversation_id)
    }

    pub fn get_by_tool(&self, source_tool: &str) -> LtmcResult<Vec<ChatMessage>> {
        self.db.get_chat_by_tool(source_tool)
    }

    pub fn stats(&self) -> LtmcResult<(i64, i64)> {
        self.db.context_link_stats()
    }
}

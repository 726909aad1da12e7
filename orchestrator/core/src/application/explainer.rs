// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Explainer worker.
//!
//! Matches REQUEST messages from any sender. For each one it renders the
//! explanation prompt, calls the text-generation provider, relays the text to
//! storage and replies to the requester with the original correlation id:
//!
//! | Outcome | Reply |
//! |---------|-------|
//! | explanation generated | INFORM with the text |
//! | payload unreadable | FAILURE with the reason |
//! | generation failed or timed out | FAILURE with the reason |
//!
//! A storage failure is logged and does not change the reply.

use crate::domain::error::PipelineError;
use crate::domain::llm::{GenerationOptions, LLMProvider};
use crate::domain::patient::RiskAssessment;
use crate::domain::storage::ExplanationStore;
use crate::infrastructure::prompt_template_engine::ExplanationPromptBuilder;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use triage_swarm::{
    CyclicBehavior, Message, MessageHandler, PatternTemplate, Performative, WorkerContext,
};

pub struct Explainer {
    provider: Arc<dyn LLMProvider>,
    options: GenerationOptions,
    prompts: ExplanationPromptBuilder,
    store: Arc<dyn ExplanationStore>,
}

struct Explanation {
    user_id: Option<String>,
    text: String,
}

impl Explainer {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        options: GenerationOptions,
        prompts: ExplanationPromptBuilder,
        store: Arc<dyn ExplanationStore>,
    ) -> Self {
        Self {
            provider,
            options,
            prompts,
            store,
        }
    }

    pub fn into_behavior(self) -> CyclicBehavior<Self> {
        CyclicBehavior::new(
            "explain-risk",
            PatternTemplate::any().performative(Performative::Request),
            self,
        )
    }

    async fn explain(&self, request: &Message) -> Result<Explanation, PipelineError> {
        let assessment = RiskAssessment::from_slice(request.payload())?;
        let prompt = self
            .prompts
            .render(&assessment)
            .map_err(|e| PipelineError::MalformedPayload(format!("{:#}", e)))?;

        let started = Instant::now();
        let response = self.provider.generate(&prompt, &self.options).await?;
        let elapsed_ms = started.elapsed().as_millis() as f64;
        metrics::histogram!("triage_generation_latency_ms").record(elapsed_ms);

        debug!(
            provider = %response.provider,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            finish_reason = ?response.finish_reason,
            elapsed_ms,
            "Explanation generated"
        );

        Ok(Explanation {
            user_id: assessment.user_id,
            text: response.text,
        })
    }

    async fn relay_to_storage(&self, ctx: &WorkerContext, explanation: &Explanation) {
        let Some(user_id) = explanation.user_id.as_deref() else {
            warn!(worker = %ctx.worker_id(), "Explanation has no user_id, not stored");
            return;
        };

        match self.store.store(user_id, &explanation.text).await {
            Ok(()) => {
                metrics::counter!("triage_explanations_stored_total", "outcome" => "stored")
                    .increment(1);
            }
            Err(e) => {
                metrics::counter!("triage_explanations_stored_total", "outcome" => "failed")
                    .increment(1);
                warn!(worker = %ctx.worker_id(), user_id, error = %e, "Failed to store explanation");
            }
        }
    }
}

#[async_trait]
impl MessageHandler for Explainer {
    async fn handle(&mut self, request: Message, ctx: &WorkerContext) {
        info!(
            worker = %ctx.worker_id(),
            requester = %request.sender(),
            correlation_id = ?request.correlation_id().map(|c| c.as_str()),
            "Explanation requested"
        );

        let reply = match self.explain(&request).await {
            Ok(explanation) => {
                self.relay_to_storage(ctx, &explanation).await;
                info!(
                    worker = %ctx.worker_id(),
                    user_id = explanation.user_id.as_deref().unwrap_or("unknown"),
                    chars = explanation.text.chars().count(),
                    "Explanation sent"
                );
                metrics::counter!("triage_explanations_total", "outcome" => "generated").increment(1);
                request.reply(ctx.worker_id().clone(), Performative::Inform, explanation.text)
            }
            Err(e) => {
                warn!(worker = %ctx.worker_id(), error = %e, "Explanation failed");
                metrics::counter!("triage_explanations_total", "outcome" => "failed").increment(1);
                request.reply(
                    ctx.worker_id().clone(),
                    Performative::Failure,
                    format!("Erro ao gerar explicação: {}", e),
                )
            }
        };

        if let Err(e) = ctx.send(reply) {
            warn!(worker = %ctx.worker_id(), requester = %request.sender(), error = %e, "Reply not delivered");
        }
    }
}

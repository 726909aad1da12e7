// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Pattern templates for selective receive.

use super::message::{CorrelationId, Message, Performative, WorkerId};

/// Predicate over message fields. Unset fields match anything, so
/// [`PatternTemplate::any`] matches every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternTemplate {
    performative: Option<Performative>,
    sender: Option<WorkerId>,
    correlation_id: Option<CorrelationId>,
}

impl PatternTemplate {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn performative(mut self, performative: Performative) -> Self {
        self.performative = Some(performative);
        self
    }

    pub fn sender(mut self, sender: WorkerId) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        if let Some(performative) = self.performative {
            if message.performative() != performative {
                return false;
            }
        }
        if let Some(sender) = &self.sender {
            if message.sender() != sender {
                return false;
            }
        }
        if let Some(correlation_id) = &self.correlation_id {
            if message.correlation_id() != Some(correlation_id) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_template_matches_everything() {
        let template = PatternTemplate::any();
        assert!(template.matches(&Message::request("a".into(), "b".into(), "")));
        assert!(template.matches(&Message::failure("c".into(), "b".into(), "")));
    }

    #[test]
    fn test_performative_and_sender() {
        let template = PatternTemplate::any()
            .performative(Performative::Request)
            .sender("gateway".into());

        assert!(template.matches(&Message::request("gateway".into(), "classifier".into(), "")));
        assert!(!template.matches(&Message::inform("gateway".into(), "classifier".into(), "")));
        assert!(!template.matches(&Message::request("judge".into(), "classifier".into(), "")));
    }

    #[test]
    fn test_correlation_requires_presence() {
        let id = CorrelationId::from("explanation-1");
        let template = PatternTemplate::any().correlation_id(id.clone());

        let uncorrelated = Message::inform("explainer".into(), "judge".into(), "");
        let correlated = uncorrelated.clone().with_correlation_id(id);
        let other = Message::inform("explainer".into(), "judge".into(), "")
            .with_correlation_id("explanation-2".into());

        assert!(!template.matches(&uncorrelated));
        assert!(template.matches(&correlated));
        assert!(!template.matches(&other));
    }
}

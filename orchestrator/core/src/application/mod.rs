// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

pub mod classifier;
pub mod explainer;
pub mod gateway;
pub mod judge;
pub mod notifier;
pub mod pipeline;

pub use classifier::Classifier;
pub use explainer::Explainer;
pub use gateway::{Gateway, ACKNOWLEDGEMENT};
pub use judge::{ExplanationReply, Judge, LateReplyDrain};
pub use notifier::Notifier;
pub use pipeline::{PipelineCollaborators, TriagePipeline};

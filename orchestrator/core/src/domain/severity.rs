// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Severity Classification & Routing
//!
//! Pure decision logic, independent of any worker or mailbox machinery.
//!
//! ## Thresholds
//!
//! Evaluated from the highest tier down; the first match wins. The scoring
//! service's categorical `risk_level` is an OR-alternative to the numeric
//! score, so a hint can raise the tier the score alone would give but never
//! lower it.
//!
//! | Tier | Condition |
//! |------|-----------|
//! | `Critical` | score ≥ 0.8 or hint `"Muito Alto"` |
//! | `High` | score ≥ 0.6 or hint `"Alto"` |
//! | `Medium` | score ≥ 0.4 or hint `"Moderado"` |
//! | `Low` | score ≥ 0.2 or hint `"Baixo"` |
//! | `Minimal` | otherwise |
//!
//! ## Routing
//!
//! [`route_for`] maps a tier to its follow-up actions. Only `Critical` leaves
//! the Judge: it requests an explanation and alerts the Notifier. Every other
//! tier's actions are local (logged) and form the extension point for future
//! dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const CRITICAL_THRESHOLD: f64 = 0.8;
pub const HIGH_THRESHOLD: f64 = 0.6;
pub const MEDIUM_THRESHOLD: f64 = 0.4;
pub const LOW_THRESHOLD: f64 = 0.2;

/// Categorical `risk_level` values emitted by the scoring service.
pub mod risk_level {
    pub const VERY_HIGH: &str = "Muito Alto";
    pub const HIGH: &str = "Alto";
    pub const MODERATE: &str = "Moderado";
    pub const LOW: &str = "Baixo";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityTier {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 5] = [
        SeverityTier::Minimal,
        SeverityTier::Low,
        SeverityTier::Medium,
        SeverityTier::High,
        SeverityTier::Critical,
    ];

    /// Classify a risk score, optionally raised by a categorical hint.
    ///
    /// Total over every `f64`: NaN is treated as 0.0.
    pub fn classify(score: f64, hint: Option<&str>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score };
        let hinted = |expected: &str| hint == Some(expected);

        if score >= CRITICAL_THRESHOLD || hinted(risk_level::VERY_HIGH) {
            SeverityTier::Critical
        } else if score >= HIGH_THRESHOLD || hinted(risk_level::HIGH) {
            SeverityTier::High
        } else if score >= MEDIUM_THRESHOLD || hinted(risk_level::MODERATE) {
            SeverityTier::Medium
        } else if score >= LOW_THRESHOLD || hinted(risk_level::LOW) {
            SeverityTier::Low
        } else {
            SeverityTier::Minimal
        }
    }

    /// Tier from the numeric score alone.
    pub fn score_only(score: f64) -> Self {
        Self::classify(score, None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Minimal => "MINIMAL",
            SeverityTier::Low => "LOW",
            SeverityTier::Medium => "MEDIUM",
            SeverityTier::High => "HIGH",
            SeverityTier::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local follow-up actions decided by the Judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpAction {
    AlertEmergencyTeam,
    ScheduleUrgentAppointment,
    NotifyFamily,
    StartContinuousMonitoring,
    ScheduleCardiologistAppointment,
    RequestComplementaryExams,
    ReviewMedication,
    IncreaseMonitoringFrequency,
    ScheduleRoutineAppointment,
    ReviewTreatmentPlan,
    LifestyleGuidance,
    WeeklyMonitoring,
    KeepRoutineCheckups,
    ContinueCurrentMedication,
    EncourageHealthyHabits,
    MonthlyMonitoring,
    PreventionVisits,
    PreventionEducation,
    KeepHealthyLifestyle,
    QuarterlyMonitoring,
}

impl FollowUpAction {
    pub fn description(&self) -> &'static str {
        match self {
            Self::AlertEmergencyTeam => "alert the emergency medical team",
            Self::ScheduleUrgentAppointment => "schedule an urgent appointment",
            Self::NotifyFamily => "send a notification to the family",
            Self::StartContinuousMonitoring => "start continuous monitoring",
            Self::ScheduleCardiologistAppointment => "schedule a cardiologist appointment",
            Self::RequestComplementaryExams => "request complementary exams",
            Self::ReviewMedication => "adjust medication if needed",
            Self::IncreaseMonitoringFrequency => "increase monitoring frequency",
            Self::ScheduleRoutineAppointment => "schedule a routine appointment",
            Self::ReviewTreatmentPlan => "review the treatment plan",
            Self::LifestyleGuidance => "advise on lifestyle changes",
            Self::WeeklyMonitoring => "monitor weekly",
            Self::KeepRoutineCheckups => "keep routine check-ups",
            Self::ContinueCurrentMedication => "continue current medication",
            Self::EncourageHealthyHabits => "encourage healthy habits",
            Self::MonthlyMonitoring => "monitor monthly",
            Self::PreventionVisits => "prevention visits",
            Self::PreventionEducation => "prevention education",
            Self::KeepHealthyLifestyle => "keep a healthy lifestyle",
            Self::QuarterlyMonitoring => "monitor quarterly",
        }
    }
}

impl fmt::Display for FollowUpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub tier: SeverityTier,
    pub actions: Vec<FollowUpAction>,
    /// Send a correlated REQUEST to the Explainer.
    pub request_explanation: bool,
    /// Send an INFORM alert to the Notifier.
    pub alert_notifier: bool,
}

impl RoutingDecision {
    pub fn dispatches(&self) -> bool {
        self.request_explanation || self.alert_notifier
    }
}

pub fn route_for(tier: SeverityTier) -> RoutingDecision {
    use FollowUpAction::*;

    let (actions, escalate) = match tier {
        SeverityTier::Critical => (
            vec![
                AlertEmergencyTeam,
                ScheduleUrgentAppointment,
                NotifyFamily,
                StartContinuousMonitoring,
            ],
            true,
        ),
        SeverityTier::High => (
            vec![
                ScheduleCardiologistAppointment,
                RequestComplementaryExams,
                ReviewMedication,
                IncreaseMonitoringFrequency,
            ],
            false,
        ),
        SeverityTier::Medium => (
            vec![
                ScheduleRoutineAppointment,
                ReviewTreatmentPlan,
                LifestyleGuidance,
                WeeklyMonitoring,
            ],
            false,
        ),
        SeverityTier::Low => (
            vec![
                KeepRoutineCheckups,
                ContinueCurrentMedication,
                EncourageHealthyHabits,
                MonthlyMonitoring,
            ],
            false,
        ),
        SeverityTier::Minimal => (
            vec![
                PreventionVisits,
                PreventionEducation,
                KeepHealthyLifestyle,
                QuarterlyMonitoring,
            ],
            false,
        ),
    };

    RoutingDecision {
        tier,
        actions,
        request_explanation: escalate,
        alert_notifier: escalate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_closed() {
        assert_eq!(SeverityTier::score_only(0.8), SeverityTier::Critical);
        assert_eq!(SeverityTier::score_only(0.7999), SeverityTier::High);
        assert_eq!(SeverityTier::score_only(0.6), SeverityTier::High);
        assert_eq!(SeverityTier::score_only(0.4), SeverityTier::Medium);
        assert_eq!(SeverityTier::score_only(0.2), SeverityTier::Low);
        assert_eq!(SeverityTier::score_only(0.1999), SeverityTier::Minimal);
        assert_eq!(SeverityTier::score_only(0.0), SeverityTier::Minimal);
        assert_eq!(SeverityTier::score_only(1.0), SeverityTier::Critical);
    }

    #[test]
    fn test_hint_raises_tier() {
        assert_eq!(
            SeverityTier::classify(0.75, Some("Muito Alto")),
            SeverityTier::Critical
        );
        assert_eq!(SeverityTier::classify(0.75, None), SeverityTier::High);
        assert_eq!(SeverityTier::classify(0.05, Some("Baixo")), SeverityTier::Low);
        assert_eq!(SeverityTier::classify(0.1, Some("Moderado")), SeverityTier::Medium);
    }

    #[test]
    fn test_hint_never_lowers_tier() {
        let scores = [0.0, 0.1, 0.2, 0.35, 0.4, 0.55, 0.6, 0.79, 0.8, 0.95, 1.0];
        let hints = [
            None,
            Some("Muito Alto"),
            Some("Alto"),
            Some("Moderado"),
            Some("Baixo"),
            Some("unknown"),
        ];
        for score in scores {
            for h in hints {
                assert!(
                    SeverityTier::classify(score, h) >= SeverityTier::score_only(score),
                    "score {} hint {:?}",
                    score,
                    h
                );
            }
        }
    }

    #[test]
    fn test_unknown_hint_is_ignored() {
        assert_eq!(SeverityTier::classify(0.3, Some("alto")), SeverityTier::Low);
        assert_eq!(SeverityTier::classify(0.3, Some("")), SeverityTier::Low);
    }

    #[test]
    fn test_nan_and_out_of_range_scores() {
        assert_eq!(SeverityTier::classify(f64::NAN, None), SeverityTier::Minimal);
        assert_eq!(
            SeverityTier::classify(f64::NAN, Some("Alto")),
            SeverityTier::High
        );
        assert_eq!(SeverityTier::score_only(-1.0), SeverityTier::Minimal);
        assert_eq!(SeverityTier::score_only(7.0), SeverityTier::Critical);
    }

    #[test]
    fn test_tiers_are_ordered() {
        let mut sorted = SeverityTier::ALL;
        sorted.sort();
        assert_eq!(sorted, SeverityTier::ALL);
        assert!(SeverityTier::Critical > SeverityTier::High);
    }

    #[test]
    fn test_only_critical_dispatches() {
        for tier in SeverityTier::ALL {
            let decision = route_for(tier);
            assert_eq!(decision.tier, tier);
            assert_eq!(decision.actions.len(), 4);
            assert_eq!(decision.dispatches(), tier == SeverityTier::Critical);
            assert_eq!(decision.request_explanation, tier == SeverityTier::Critical);
        }
        assert!(route_for(SeverityTier::Critical)
            .actions
            .contains(&FollowUpAction::AlertEmergencyTeam));
    }

    #[test]
    fn test_tier_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&SeverityTier::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(SeverityTier::Medium.to_string(), "MEDIUM");
    }
}

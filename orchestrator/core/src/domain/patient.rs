// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Patient intake and risk assessment payloads.
//!
//! The schemas are owned by the external collaborators; only the logical
//! fields the pipeline consumes are typed here. Everything else is carried
//! through untouched in `extra`.

use crate::domain::error::PipelineError;
use crate::domain::severity::SeverityTier;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Raw gateway input that passed structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientIntake {
    body: Map<String, Value>,
}

impl PatientIntake {
    /// Accepts a non-empty JSON object.
    pub fn parse(raw: &[u8]) -> Result<Self, PipelineError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| PipelineError::MalformedPayload(format!("body is not UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Err(PipelineError::MalformedPayload("body is empty".into()));
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(body)) if !body.is_empty() => Ok(Self { body }),
            Ok(Value::Object(_)) => Err(PipelineError::MalformedPayload(
                "body is an empty JSON object".into(),
            )),
            Ok(other) => Err(PipelineError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(PipelineError::MalformedPayload(format!(
                "invalid JSON: {}",
                e
            ))),
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.body.get("user_id").and_then(id_to_string)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // serializing a Map<String, Value> cannot fail
        serde_json::to_vec(&self.body).unwrap_or_default()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_to_string))
}

/// Scoring service result, as consumed by the Judge and the Explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub chronic_risk_score: f64,

    /// Categorical level: "Baixo", "Moderado", "Alto" or "Muito Alto".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,

    /// Binary model output (0 or 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_prediction: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_features: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_used: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RiskAssessment {
    pub fn from_slice(raw: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(raw).map_err(|e| {
            PipelineError::MalformedPayload(format!("not a risk assessment: {}", e))
        })
    }

    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        serde_json::from_value(value).map_err(|e| {
            PipelineError::MalformedPayload(format!("not a risk assessment: {}", e))
        })
    }

    pub fn tier(&self) -> SeverityTier {
        SeverityTier::classify(self.chronic_risk_score, self.risk_level.as_deref())
    }

    /// The clinical summary line of `interpretation.overall`, when present.
    pub fn overall_interpretation(&self) -> Option<&str> {
        self.interpretation
            .as_ref()
            .and_then(|i| i.get("overall"))
            .and_then(Value::as_str)
    }

    /// Patient features echoed back by the scoring service. Missing or
    /// mistyped fields come back as `None`.
    pub fn features(&self) -> PatientFeatures {
        self.features_used
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn user_id_or_unknown(&self) -> &str {
        self.user_id.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PatientFeatures {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub blood_pressure: Option<Value>,
    #[serde(default)]
    pub cholesterol_level: Option<i64>,
    #[serde(default)]
    pub glucose_level: Option<i64>,
    #[serde(default)]
    pub lifestyle_factors: Option<LifestyleFactors>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LifestyleFactors {
    #[serde(default)]
    pub smoking: Option<bool>,
    #[serde(default)]
    pub alcohol: Option<bool>,
    #[serde(default)]
    pub physical_activity: Option<bool>,
}

/// BMI band as reported to clinicians.
pub fn bmi_category(bmi: f64) -> &'static str {
    if bmi < 18.5 {
        "Abaixo do peso"
    } else if bmi < 25.0 {
        "Peso normal"
    } else if bmi < 30.0 {
        "Sobrepeso"
    } else {
        "Obesidade"
    }
}

/// Cholesterol and glucose are reported on a 0..=2 scale.
pub fn level_description(level: i64) -> &'static str {
    match level {
        0 => "Normal",
        1 => "Acima do Normal",
        2 => "Muito Alto",
        _ => "Não especificado",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intake_accepts_object() {
        let intake = PatientIntake::parse(br#"{"user_id":"p1","bmi":31}"#).unwrap();
        assert_eq!(intake.user_id().as_deref(), Some("p1"));
        assert_eq!(intake.body().get("bmi"), Some(&json!(31)));
    }

    #[test]
    fn test_intake_numeric_user_id() {
        let intake = PatientIntake::parse(br#"{"user_id":42}"#).unwrap();
        assert_eq!(intake.user_id().as_deref(), Some("42"));
    }

    #[test]
    fn test_intake_rejects_malformed() {
        for raw in [
            &b""[..],
            b"   ",
            b"not json",
            b"{",
            b"[1,2]",
            b"\"text\"",
            b"{}",
            b"null",
        ] {
            assert!(
                matches!(PatientIntake::parse(raw), Err(PipelineError::MalformedPayload(_))),
                "accepted {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_assessment_keeps_unknown_fields() {
        let raw = json!({
            "user_id": "p1",
            "chronic_risk_score": 0.85,
            "risk_level": "Muito Alto",
            "model_version": "v3"
        });
        let assessment = RiskAssessment::from_value(raw).unwrap();
        assert_eq!(assessment.tier(), SeverityTier::Critical);
        assert_eq!(assessment.extra.get("model_version"), Some(&json!("v3")));

        let back = serde_json::to_value(&assessment).unwrap();
        assert_eq!(back["model_version"], json!("v3"));
        assert_eq!(back["chronic_risk_score"], json!(0.85));
    }

    #[test]
    fn test_assessment_requires_score() {
        assert!(RiskAssessment::from_value(json!({"user_id": "p1"})).is_err());
        assert!(RiskAssessment::from_value(json!({"chronic_risk_score": "high"})).is_err());
    }

    #[test]
    fn test_features_parse_partially() {
        let assessment = RiskAssessment::from_value(json!({
            "chronic_risk_score": 0.5,
            "features_used": {
                "age": 61,
                "bmi": 31.2,
                "cholesterol_level": 2,
                "lifestyle_factors": {"smoking": true}
            }
        }))
        .unwrap();
        let features = assessment.features();
        assert_eq!(features.age, Some(61));
        assert_eq!(features.gender, None);
        assert_eq!(
            features.lifestyle_factors.and_then(|l| l.smoking),
            Some(true)
        );
    }

    #[test]
    fn test_interpretation_helpers() {
        assert_eq!(bmi_category(17.0), "Abaixo do peso");
        assert_eq!(bmi_category(18.5), "Peso normal");
        assert_eq!(bmi_category(29.9), "Sobrepeso");
        assert_eq!(bmi_category(31.0), "Obesidade");
        assert_eq!(level_description(0), "Normal");
        assert_eq!(level_description(2), "Muito Alto");
        assert_eq!(level_description(9), "Não especificado");
    }
}

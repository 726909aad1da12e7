// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Explanation Prompt Builder
//!
//! Renders the cardiology explanation prompt sent to the text-generation
//! provider, using Handlebars for placeholder substitution.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn a [`RiskAssessment`] into the final prompt text
//! - **Integration:** Explainer worker → LLM input
//!
//! # Placeholders
//!
//! | Placeholder | Source |
//! |-------------|--------|
//! | `{{user_id}}` | assessment `user_id` |
//! | `{{age}}`, `{{gender}}` | `features_used` |
//! | `{{bmi}}`, `{{bmi_category}}` | `features_used.bmi` and its band |
//! | `{{blood_pressure}}` | `features_used.blood_pressure` |
//! | `{{cholesterol}}`, `{{glucose}}` | level 0..=2 described in words |
//! | `{{smoking}}`, `{{alcohol}}`, `{{physical_activity}}` | "Sim" / "Não" |
//! | `{{score}}` | `chronic_risk_score` with two decimals |
//! | `{{tier_label}}` | score-only tier, in Portuguese |
//!
//! Missing features render as "Não informado"; the prompt is still built.

use crate::domain::patient::{bmi_category, level_description, PatientFeatures, RiskAssessment};
use crate::domain::severity::SeverityTier;
use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;

const TEMPLATE_NAME: &str = "explanation";

const NOT_INFORMED: &str = "Não informado";

const EXPLANATION_TEMPLATE: &str = "\
Você é um especialista em cardiologia. Analise os dados do paciente e forneça uma explicação detalhada, educativa e empática sobre o risco cardiovascular.

**DADOS DO PACIENTE:**
- ID: {{user_id}}
- Idade: {{age}} anos
- Gênero: {{gender}}
- IMC: {{bmi}} ({{bmi_category}})
- Pressão Arterial: {{blood_pressure}} mmHg
- Nível de Colesterol: {{cholesterol}}
- Nível de Glicose: {{glucose}}
- Fumante: {{smoking}}
- Consumo de Álcool: {{alcohol}}
- Atividade Física: {{physical_activity}}
- **Score de Risco Crônico: {{score}} ({{tier_label}})**

**SOLICITAÇÃO:**
Forneça uma explicação abrangente que inclua:
1. **Interpretação do Score de Risco**: Explique o que significa o score de {{score}} em termos simples
2. **Principais Fatores de Risco**: Identifique quais fatores mais contribuem para o risco
3. **Recomendações Personalizadas**: Sugira mudanças específicas no estilo de vida
4. **Próximos Passos**: Orientações sobre acompanhamento médico
5. **Prognóstico**: Explique as perspectivas se as recomendações forem seguidas

**DIRETRIZES:**
- Use linguagem clara e acessível
- Seja empático e encorajador
- Forneça informações baseadas em evidências
- Estruture a resposta de forma organizada
- Limite a resposta a aproximadamente 500 palavras
";

/// Values substituted into the explanation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationContext {
    pub user_id: String,
    pub age: String,
    pub gender: String,
    pub bmi: String,
    pub bmi_category: String,
    pub blood_pressure: String,
    pub cholesterol: String,
    pub glucose: String,
    pub smoking: String,
    pub alcohol: String,
    pub physical_activity: String,
    pub score: String,
    pub tier_label: String,
}

impl ExplanationContext {
    pub fn from_assessment(assessment: &RiskAssessment) -> Self {
        let features: PatientFeatures = assessment.features();
        let lifestyle = features.lifestyle_factors.clone().unwrap_or_default();
        let score = assessment.chronic_risk_score;

        Self {
            user_id: assessment.user_id_or_unknown().to_string(),
            age: or_not_informed(features.age.map(|a| a.to_string())),
            gender: or_not_informed(features.gender.clone()),
            bmi: or_not_informed(features.bmi.map(|b| b.to_string())),
            bmi_category: or_not_informed(features.bmi.map(|b| bmi_category(b).to_string())),
            blood_pressure: or_not_informed(features.blood_pressure.as_ref().and_then(describe_pressure)),
            cholesterol: or_not_informed(
                features.cholesterol_level.map(|l| level_description(l).to_string()),
            ),
            glucose: or_not_informed(
                features.glucose_level.map(|l| level_description(l).to_string()),
            ),
            smoking: yes_no(lifestyle.smoking),
            alcohol: yes_no(lifestyle.alcohol),
            physical_activity: yes_no(lifestyle.physical_activity),
            score: format!("{:.2}", score),
            tier_label: tier_label(SeverityTier::score_only(score)).to_string(),
        }
    }
}

fn or_not_informed(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_INFORMED.to_string())
}

fn yes_no(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "Sim".to_string(),
        Some(false) => "Não".to_string(),
        None => NOT_INFORMED.to_string(),
    }
}

/// "120/80", 120 or {"systolic":120,"diastolic":80}.
fn describe_pressure(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            let systolic = map.get("systolic")?;
            let diastolic = map.get("diastolic")?;
            Some(format!("{}/{}", systolic, diastolic))
        }
        _ => None,
    }
}

/// Portuguese tier names used in the prompt.
pub fn tier_label(tier: SeverityTier) -> &'static str {
    match tier {
        SeverityTier::Critical => "CRÍTICO",
        SeverityTier::High => "ALTO",
        SeverityTier::Medium => "MÉDIO",
        SeverityTier::Low => "BAIXO",
        SeverityTier::Minimal => "MÍNIMO",
    }
}

pub struct ExplanationPromptBuilder {
    handlebars: Handlebars<'static>,
}

impl ExplanationPromptBuilder {
    pub fn new() -> Result<Self> {
        Self::with_template(EXPLANATION_TEMPLATE)
    }

    /// Use a custom template with the same placeholders.
    pub fn with_template(template: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .context("Invalid Handlebars template syntax")?;
        Ok(Self { handlebars })
    }

    pub fn render_context(&self, context: &ExplanationContext) -> Result<String> {
        self.handlebars
            .render(TEMPLATE_NAME, context)
            .context("Failed to render explanation prompt")
    }

    pub fn render(&self, assessment: &RiskAssessment) -> Result<String> {
        self.render_context(&ExplanationContext::from_assessment(assessment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assessment() -> RiskAssessment {
        RiskAssessment::from_value(json!({
            "user_id": "p1",
            "chronic_risk_score": 0.8523,
            "risk_level": "Muito Alto",
            "features_used": {
                "age": 61,
                "gender": "Masculino",
                "bmi": 31.2,
                "blood_pressure": "150/95",
                "cholesterol_level": 2,
                "glucose_level": 1,
                "lifestyle_factors": {"smoking": true, "alcohol": false, "physical_activity": false}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_full_prompt() {
        let prompt = ExplanationPromptBuilder::new()
            .unwrap()
            .render(&assessment())
            .unwrap();

        assert!(prompt.starts_with("Você é um especialista em cardiologia."));
        assert!(prompt.contains("- ID: p1\n"));
        assert!(prompt.contains("- Idade: 61 anos\n"));
        assert!(prompt.contains("- IMC: 31.2 (Obesidade)\n"));
        assert!(prompt.contains("- Pressão Arterial: 150/95 mmHg\n"));
        assert!(prompt.contains("- Nível de Colesterol: Muito Alto\n"));
        assert!(prompt.contains("- Nível de Glicose: Acima do Normal\n"));
        assert!(prompt.contains("- Fumante: Sim\n"));
        assert!(prompt.contains("- Consumo de Álcool: Não\n"));
        assert!(prompt.contains("**Score de Risco Crônico: 0.85 (CRÍTICO)**"));
        assert!(prompt.contains("o score de 0.85 em termos simples"));
        assert!(prompt.trim_end().ends_with("aproximadamente 500 palavras"));
    }

    #[test]
    fn test_missing_features_still_render() {
        let assessment =
            RiskAssessment::from_value(json!({"chronic_risk_score": 0.3})).unwrap();
        let prompt = ExplanationPromptBuilder::new()
            .unwrap()
            .render(&assessment)
            .unwrap();

        assert!(prompt.contains("- ID: unknown\n"));
        assert!(prompt.contains("- Idade: Não informado anos\n"));
        assert!(prompt.contains("(BAIXO)**"));
    }

    #[test]
    fn test_tier_label_ignores_hint() {
        let assessment = RiskAssessment::from_value(json!({
            "chronic_risk_score": 0.5,
            "risk_level": "Muito Alto"
        }))
        .unwrap();
        let context = ExplanationContext::from_assessment(&assessment);
        assert_eq!(context.tier_label, "MÉDIO");
        assert_eq!(context.score, "0.50");
    }

    #[test]
    fn test_blood_pressure_shapes() {
        assert_eq!(describe_pressure(&json!("120/80")).as_deref(), Some("120/80"));
        assert_eq!(describe_pressure(&json!(130)).as_deref(), Some("130"));
        assert_eq!(
            describe_pressure(&json!({"systolic": 140, "diastolic": 90})).as_deref(),
            Some("140/90")
        );
        assert_eq!(describe_pressure(&json!(null)), None);
    }

    #[test]
    fn test_no_html_escaping() {
        let builder = ExplanationPromptBuilder::with_template("{{gender}}").unwrap();
        let mut context = ExplanationContext::from_assessment(&assessment());
        context.gender = "<M&F>".into();
        assert_eq!(builder.render_context(&context).unwrap(), "<M&F>");
    }

    #[test]
    fn test_invalid_template_rejected() {
        assert!(ExplanationPromptBuilder::with_template("{{user_id").is_err());
    }
}

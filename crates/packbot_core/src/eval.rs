use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::model::Method;
use crate::resolver::Resolver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub question: String,
    /// `null` expects the blank-input prompt.
    pub expected_method: Option<Method>,
    #[serde(default)]
    pub expected_reply_contains: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub passed: bool,
    pub actual_method: Option<Method>,
    pub reply: String,
    pub score: Option<f32>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<EvalOutcome>,
}

impl EvalCase {
    pub fn matches(&self, method: Option<Method>, reply: &str) -> bool {
        if self.expected_method != method {
            return false;
        }
        match &self.expected_reply_contains {
            Some(needle) => reply.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

pub fn evaluate_cases(resolver: &Resolver, cases: &[EvalCase]) -> anyhow::Result<EvalSummary> {
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let decision = resolver.resolve(&case.question)?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        outcomes.push(EvalOutcome {
            case_id: case.case_id.clone(),
            passed: case.matches(decision.method, &decision.reply),
            actual_method: decision.method,
            reply: decision.reply,
            score: decision.score,
            latency_ms,
        });
    }

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    Ok(EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    })
}

//! Debate → evaluation.

use baton_debate::DebateActivationDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{preview, ContextSize, Metadata};

/// One argument exactly as produced by the debate executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateArgument {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl DebateArgument {
    pub fn new(role: impl Into<String>, content: impl Into<String>, confidence: f64) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            confidence,
            evidence: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.evidence.extend(evidence.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    pub round: usize,
    pub arguments: Vec<DebateArgument>,
}

/// Every round and argument of a deliberation, plus the decision that
/// started it.
#[derive(Debug, Clone, Serialize)]
pub struct DebateContext {
    pub topic: String,
    pub decision: Option<DebateActivationDecision>,
    pub rounds: Vec<DebateRound>,
    pub conclusion: Option<String>,
    pub consensus_score: Option<f64>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl DebateContext {
    pub fn new(topic: impl Into<String>, rounds: Vec<DebateRound>) -> Self {
        Self {
            topic: topic.into(),
            decision: None,
            rounds,
            conclusion: None,
            consensus_score: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_decision(mut self, decision: DebateActivationDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_conclusion(mut self, conclusion: impl Into<String>, consensus_score: f64) -> Self {
        self.conclusion = Some(conclusion.into());
        self.consensus_score = Some(consensus_score);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn all_arguments(&self) -> impl Iterator<Item = &DebateArgument> {
        self.rounds.iter().flat_map(|r| r.arguments.iter())
    }

    pub fn argument_count(&self) -> usize {
        self.rounds.iter().map(|r| r.arguments.len()).sum()
    }

    /// Mean argument confidence, `None` without arguments.
    pub fn average_confidence(&self) -> Option<f64> {
        let confidences: Vec<f64> = self.all_arguments().map(|a| a.confidence).collect();
        baton_core::text::mean(&confidences)
    }

    pub fn get_full_debate_context(&self) -> String {
        let mut out = format!("Topic: {}\n", self.topic);
        if let Some(decision) = &self.decision {
            out.push_str(&format!("Protocol: {} ({})\n", decision.protocol(), decision.reasoning()));
        }
        for round in &self.rounds {
            out.push_str(&format!("\nRound {}\n", round.round));
            for argument in &round.arguments {
                out.push_str(&format!(
                    "- {} (confidence {:.2}): {}\n",
                    argument.role, argument.confidence, argument.content
                ));
                for evidence in &argument.evidence {
                    out.push_str(&format!("    evidence: {evidence}\n"));
                }
            }
        }
        if let Some(conclusion) = &self.conclusion {
            out.push_str(&format!("\nConclusion: {conclusion}\n"));
        }
        out
    }

    pub fn get_structured_debate_context(&self) -> serde_json::Value {
        json!({
            "topic": self.topic,
            "decision": self.decision,
            "round_count": self.rounds.len(),
            "argument_count": self.argument_count(),
            "rounds": self.rounds,
            "conclusion": self.conclusion,
            "consensus_score": self.consensus_score,
            "average_confidence": self.average_confidence(),
            "metadata": self.metadata,
            "created_at": self.created_at,
        })
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "DebateContext: {} rounds, {} arguments on \"{}\"",
            self.rounds.len(),
            self.argument_count(),
            preview(&self.topic)
        );
        if let Some(score) = self.consensus_score {
            summary.push_str(&format!(" (consensus {score:.2})"));
        }
        summary
    }
}

impl ContextSize for DebateContext {
    fn content_size(&self) -> usize {
        let arguments: usize = self
            .all_arguments()
            .map(|a| a.content.content_size() + a.evidence.iter().map(|e| e.content_size()).sum::<usize>())
            .sum();
        self.topic.content_size() + arguments + self.conclusion.as_ref().map_or(0, |c| c.content_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_debate::DebateProtocol;

    fn debate() -> DebateContext {
        DebateContext::new(
            "Docker or Kubernetes?",
            vec![
                DebateRound {
                    round: 1,
                    arguments: vec![
                        DebateArgument::new("advocate", "Docker Compose is simpler for one host.", 0.8)
                            .with_evidence(["single VM deployment"]),
                        DebateArgument::new("critic", "Kubernetes scales across nodes.", 0.6),
                    ],
                },
                DebateRound {
                    round: 2,
                    arguments: vec![DebateArgument::new("judge", "Start with Compose.", 0.7)],
                },
            ],
        )
        .with_decision(DebateActivationDecision::activated(DebateProtocol::Judge, 0.8, 0.75, "comparison"))
        .with_conclusion("Start with Compose, revisit at scale.", 0.65)
    }

    #[test]
    fn keeps_every_argument() {
        let d = debate();
        assert_eq!(d.argument_count(), 3);
        let full = d.get_full_debate_context();
        for argument in d.all_arguments() {
            assert!(full.contains(&argument.content));
        }
        assert!(full.contains("evidence: single VM deployment"));
        assert!(full.contains("Protocol: judge"));
    }

    #[test]
    fn average_confidence() {
        assert!((debate().average_confidence().unwrap() - 0.7).abs() < 1e-9);
        assert_eq!(DebateContext::new("t", vec![]).average_confidence(), None);
    }

    #[test]
    fn structured_view_round_trips_rounds() {
        let value = debate().get_structured_debate_context();
        let rounds: Vec<DebateRound> = serde_json::from_value(value["rounds"].clone()).unwrap();
        assert_eq!(rounds, debate().rounds);
        assert_eq!(value["decision"]["protocol"], "judge");
    }

    #[test]
    fn arguments_accept_executor_json() {
        let arg: DebateArgument = serde_json::from_str(r#"{"role":"pro","content":"yes"}"#).unwrap();
        assert_eq!(arg.confidence, 0.0);
        assert!(arg.evidence.is_empty());
    }
}

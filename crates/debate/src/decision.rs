//! Debate decisions and protocols.

use serde::{Deserialize, Serialize};

/// Deliberation protocol handed to the external debate executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateProtocol {
    /// No debate.
    None,
    /// Agents argue in turn, each seeing the previous argument.
    Sequential,
    /// Agents argue independently, results merged afterwards.
    Parallel,
    /// Advocates argue, a judge agent decides.
    Judge,
    /// One agent proposes, others critique.
    Critique,
}

impl DebateProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Judge => "judge",
            Self::Critique => "critique",
        }
    }
}

impl std::fmt::Display for DebateProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether (and how) to debate a query.
///
/// Only constructible through [`inactive`](Self::inactive) and
/// [`activated`](Self::activated), so `protocol() == None` exactly when
/// `should_activate()` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebateActivationDecision {
    should_activate: bool,
    protocol: DebateProtocol,
    confidence: f64,
    reasoning: String,
    query_complexity: f64,
    debate_worthiness: f64,
}

impl DebateActivationDecision {
    /// A decision not to debate. Confidence is `1 - worthiness`.
    pub fn inactive(worthiness: f64, complexity: f64, reasoning: impl Into<String>) -> Self {
        let worthiness = unit(worthiness);
        Self {
            should_activate: false,
            protocol: DebateProtocol::None,
            confidence: 1.0 - worthiness,
            reasoning: reasoning.into(),
            query_complexity: unit(complexity),
            debate_worthiness: worthiness,
        }
    }

    /// A decision to debate with `protocol`. Confidence is the worthiness.
    ///
    /// `DebateProtocol::None` is promoted to `Sequential`; a blank
    /// reasoning string is replaced with a generic one.
    pub fn activated(
        protocol: DebateProtocol,
        worthiness: f64,
        complexity: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        let worthiness = unit(worthiness);
        let protocol = match protocol {
            DebateProtocol::None => DebateProtocol::Sequential,
            other => other,
        };
        let mut reasoning = reasoning.into();
        if reasoning.trim().is_empty() {
            reasoning = format!("Debate activated with {protocol} protocol");
        }
        Self {
            should_activate: true,
            protocol,
            confidence: worthiness,
            reasoning,
            query_complexity: unit(complexity),
            debate_worthiness: worthiness,
        }
    }

    pub fn should_activate(&self) -> bool {
        self.should_activate
    }

    pub fn protocol(&self) -> DebateProtocol {
        self.protocol
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn query_complexity(&self) -> f64 {
        self.query_complexity
    }

    pub fn debate_worthiness(&self) -> f64 {
        self.debate_worthiness
    }
}

/// Optional caller-supplied signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationContext {
    /// The user explicitly asked for multiple perspectives.
    #[serde(default)]
    pub explicit_request: bool,
    /// Upstream evidence (memories, plan) disagrees.
    #[serde(default)]
    pub conflicting_evidence: bool,
}

fn unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

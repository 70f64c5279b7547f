//! Default vocabularies and keyword classes.
//!
//! These are tunable data, not business rules: every list can be replaced
//! from `config.toml` without a code change.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Vocabularies used by the entity/concept extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Technology names and technical nouns recognized as entities.
    pub technical_terms: Vec<String>,
    /// Domain keywords recognized as concepts.
    pub domain_keywords: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            technical_terms: strings(&[
                "rust", "python", "javascript", "typescript", "java", "kotlin", "swift", "ruby",
                "golang", "c++", "c#", "scala", "elixir", "haskell", "docker", "kubernetes",
                "k8s", "helm", "terraform", "ansible", "aws", "azure", "gcp", "postgres",
                "postgresql", "mysql", "sqlite", "mongodb", "redis", "kafka", "rabbitmq",
                "elasticsearch", "graphql", "grpc", "rest", "http", "https", "json", "yaml",
                "toml", "sql", "nosql", "linux", "git", "github", "react", "vue", "angular",
                "svelte", "node.js", "nodejs", "deno", "django", "flask", "fastapi", "spring",
                "rails", "tokio", "wasm", "webassembly", "llm", "gpt", "openai", "tensorflow",
                "pytorch", "numpy", "pandas", "nginx", "microservices", "serverless", "lambda",
                "api", "sdk", "cli", "oauth", "jwt", "tls", "ssl", "websocket", "database",
                "cache", "queue", "compiler", "kernel", "container", "cluster",
                "machine learning", "deep learning", "neural network", "vector database",
                "load balancer", "message queue", "event sourcing",
            ]),
            domain_keywords: strings(&[
                "performance", "security", "scalability", "architecture", "deployment",
                "latency", "throughput", "reliability", "availability", "concurrency",
                "testing", "monitoring", "authentication", "authorization", "encryption",
                "migration", "optimization", "refactoring", "caching", "indexing", "memory",
                "cost", "maintainability", "compliance", "observability", "consistency",
                "durability", "portability", "usability",
            ]),
        }
    }
}

/// Keyword classes used by the complexity analyzer, the debate engine, and
/// the quality assessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub comparison: Vec<String>,
    pub decision: Vec<String>,
    pub analysis: Vec<String>,
    pub reasoning: Vec<String>,
    /// Phrases that signal an explicitly multi-perspective question.
    pub debate_patterns: Vec<String>,
    /// Query phrasing that asks for something to be done.
    pub action_query: Vec<String>,
    /// Response phrasing that tells the user what to do.
    pub action_response: Vec<String>,
    /// Failure or placeholder language in a response.
    pub failure_phrases: Vec<String>,
    /// Uncertain or evasive language.
    pub hedging: Vec<String>,
    pub polite: Vec<String>,
    pub dismissive: Vec<String>,
    /// Connectives that mark an explanation.
    pub explanatory: Vec<String>,
    pub examples: Vec<String>,
    /// Query words that suggest the answer should contain code.
    pub code_query: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            comparison: strings(&[
                "vs", "versus", "or", "compare", "comparing", "comparison", "better", "worse",
                "difference", "differences", "between", "alternative", "alternatives",
                "pros and cons", "compared to", "instead of",
            ]),
            decision: strings(&[
                "should", "choose", "choosing", "decide", "decision", "which", "recommend",
                "recommendation", "pick", "select", "best", "worth", "go with",
            ]),
            analysis: strings(&[
                "analyze", "analyse", "analysis", "evaluate", "evaluation", "assess",
                "assessment", "examine", "investigate", "review", "breakdown", "impact",
                "deep dive",
            ]),
            reasoning: strings(&[
                "why", "explain", "because", "reason", "reasons", "justify", "cause",
                "implications", "consequences", "rationale",
            ]),
            debate_patterns: strings(&[
                "trade-off", "trade-offs", "tradeoff", "tradeoffs", "debate", "argue",
                "arguments", "controversial", "perspectives", "opinion", "on the other hand",
                "advantages and disadvantages", "for and against",
            ]),
            action_query: strings(&[
                "how", "implement", "fix", "create", "build", "setup", "install", "configure",
                "write", "deploy", "add", "make", "generate", "migrate", "debug", "set up",
            ]),
            action_response: strings(&[
                "run", "install", "use", "add", "create", "step", "first", "then", "next",
                "execute", "configure", "open", "you can", "make sure",
            ]),
            failure_phrases: strings(&[
                "todo", "tbd", "placeholder", "i cannot", "i can't", "unable to",
                "not implemented", "lorem ipsum", "insert here", "error occurred",
                "something went wrong", "as an ai",
            ]),
            hedging: strings(&[
                "i'm not sure", "i am not sure", "i don't know", "not certain",
                "might be wrong", "hard to say",
            ]),
            polite: strings(&[
                "please", "thanks", "happy to", "glad to", "hope this helps", "thank you",
                "great question",
            ]),
            dismissive: strings(&[
                "obviously", "stupid", "dumb", "idiot", "rtfm", "whatever", "just google",
                "figure it out",
            ]),
            explanatory: strings(&[
                "because", "therefore", "since", "thus", "consequently", "as a result",
                "this means", "so that",
            ]),
            examples: strings(&["for example", "e.g", "such as", "for instance"]),
            code_query: strings(&[
                "code", "function", "implement", "script", "snippet", "program", "class",
                "method", "bug", "compile", "regex",
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lists_are_populated() {
        let k = KeywordConfig::default();
        for list in [
            &k.comparison,
            &k.decision,
            &k.analysis,
            &k.reasoning,
            &k.debate_patterns,
        ] {
            assert!(!list.is_empty());
        }
        assert!(VocabularyConfig::default().technical_terms.contains(&"docker".to_string()));
    }

    #[test]
    fn partial_override_keeps_other_lists() {
        let k: KeywordConfig = toml::from_str(r#"comparison = ["contra"]"#).unwrap();
        assert_eq!(k.comparison, vec!["contra"]);
        assert!(!k.decision.is_empty());
    }
}

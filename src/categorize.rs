//! Rule-based categorization of liked tweets.
//!
//! A categorizer holds an ordered list of rules, each mapping a category name
//! to a set of case-insensitive patterns. A tweet gets every category whose
//! rule matches its text; a tweet matching no rule gets no categories.
//!
//! Rules are immutable per run: they are compiled once at load time (built-in
//! set or the `[categories]` section of the config file) and never change
//! while a sync is in flight.

use crate::config::CategoryRuleConfig;
use crate::error::{Result, XlikesError};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// A single compiled categorization rule.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub name: String,
    patterns: Vec<Regex>,
}

impl CategoryRule {
    /// Whether any of this rule's patterns match the text.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// The built-in rule set: category name -> raw regex patterns.
const DEFAULT_RULES: &[(&str, &[&str])] = &[
    (
        "AI/ML",
        &[
            r"\bai\b", r"\bllm\b", r"\bgpt\b", r"\bclaude\b", r"\bopenai\b",
            r"\bmachine.?learning\b", r"\bdeep.?learning\b", r"\bneural\b",
            r"\btransformer\b", r"\bmodel\b", r"\binference\b", r"\btraining\b",
            r"\bfine.?tun", r"\bprompt\b", r"\brag\b", r"\bagent\b",
            r"\bembedding", r"\btoken", r"\bvector\b", r"\bchatbot\b",
            r"\bgemini\b", r"\bllama\b", r"\bmistral\b", r"\bgrok\b",
        ],
    ),
    (
        "Voice/Audio",
        &[
            r"\bvoice\b", r"\baudio\b", r"\btts\b", r"\bspeech\b",
            r"\bspeaker\b", r"\bwhisper\b", r"\bwebrtc\b",
            r"\breal.?time\b", r"\bstreaming\b", r"\blivekit\b",
        ],
    ),
    (
        "Web Development",
        &[
            r"\breact\b", r"\bnext\.?js\b", r"\bvue\b", r"\bsvelte\b",
            r"\bhtml\b", r"\bcss\b", r"\btailwind\b", r"\bjavascript\b",
            r"\btypescript\b", r"\bnode\b", r"\bnpm\b", r"\bvite\b",
            r"\bfrontend\b", r"\bbackend\b", r"\bfullstack\b",
            r"\bweb\s?app\b", r"\bapi\b", r"\brest\b", r"\bgraphql\b",
            r"\bframework\b",
        ],
    ),
    (
        "DevTools",
        &[
            r"\bgit\b", r"\bdocker\b", r"\bkubernetes\b", r"\bk8s\b",
            r"\bci.?cd\b", r"\bdevops\b", r"\bcli\b", r"\bterminal\b",
            r"\beditor\b", r"\bide\b", r"\bvscode\b", r"\bcursor\b",
            r"\brust\b", r"\bgo\b", r"\bpython\b", r"\bswift\b",
            r"\bcompiler\b", r"\bdebug", r"\bopen.?source\b",
            r"\bsdk\b", r"\blibrary\b", r"\bpackage\b",
        ],
    ),
    (
        "Design/UI",
        &[
            r"\bdesign\b", r"\bui\b", r"\bux\b", r"\bfigma\b",
            r"\bavatar\b", r"\banimation\b", r"\bshader\b", r"\b3d\b",
            r"\bvisual\b", r"\bgraphic\b", r"\bicon\b", r"\blogo\b",
            r"\billustrat", r"\bmotion\b",
        ],
    ),
    (
        "Crypto/Web3",
        &[
            r"\bcrypto\b", r"\bblockchain\b", r"\bweb3\b", r"\bdefi\b",
            r"\bnft\b", r"\bethereum\b", r"\bsolana\b", r"\bbitcoin\b",
            r"\bwallet\b", r"\bsmart.?contract\b",
        ],
    ),
    (
        "Business/Startup",
        &[
            r"\bstartup\b", r"\bfunding\b", r"\braised\b", r"\bseries\b",
            r"\bvc\b", r"\byc\b", r"\bfounder\b", r"\brevenue\b",
            r"\bgrowth\b", r"\blaunch\b", r"\bproduct\b", r"\bmarket\b",
        ],
    ),
    (
        "Data/Infra",
        &[
            r"\bdatabase\b", r"\bsql\b", r"\bpostgres\b", r"\bredis\b",
            r"\belastic\b", r"\bkafka\b", r"\binfra\b", r"\bcloud\b",
            r"\baws\b", r"\bgcp\b", r"\bazure\b", r"\bserverless\b",
            r"\bdata\b", r"\banalytics\b",
        ],
    ),
];

static BUILTIN: Lazy<Vec<CategoryRule>> = Lazy::new(|| {
    DEFAULT_RULES
        .iter()
        .map(|(name, patterns)| CategoryRule {
            name: (*name).to_string(),
            patterns: patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .expect("built-in pattern must compile")
                })
                .collect(),
        })
        .collect()
});

/// Assigns zero or more categories to tweet text.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self {
            rules: BUILTIN.clone(),
        }
    }
}

impl Categorizer {
    /// Build a categorizer from user-supplied keyword rules.
    ///
    /// Each keyword is compiled to a case-insensitive word-boundary match;
    /// regex metacharacters in keywords are escaped.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule has an empty name or no keywords.
    pub fn from_config(rules: &[CategoryRuleConfig]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.name.trim().is_empty() {
                return Err(XlikesError::validation("category rule with empty name"));
            }
            if rule.keywords.is_empty() {
                return Err(XlikesError::validation(format!(
                    "category rule '{}' has no keywords",
                    rule.name
                )));
            }
            let patterns = rule
                .keywords
                .iter()
                .map(|kw| {
                    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(kw)))
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| {
                            XlikesError::validation(format!(
                                "category rule '{}': bad keyword '{}': {}",
                                rule.name, kw, e
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            compiled.push(CategoryRule {
                name: rule.name.clone(),
                patterns,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Category names matching the given text, in rule order.
    ///
    /// Set semantics: each rule contributes its name at most once, and an
    /// unmatched tweet yields an empty list rather than a placeholder.
    #[must_use]
    pub fn categorize(&self, text: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(text))
            .map(|rule| rule.name.as_str())
            .collect()
    }
}

use common::utils::config::AppConfig;

pub const SENSITIVE_MESSAGE: &str = "⚠️ For questions involving personal, legal, or financial information, please contact our support team directly.";
pub const TOXIC_MESSAGE: &str =
    "⚠️ Let's keep this conversation respectful. Please rephrase your question.";

pub const DEFAULT_SENSITIVE_PHRASES: &[&str] = &[
    "bank account",
    "ssn",
    "password",
    "legal",
    "lawsuit",
    "refund",
    "payment",
    "personal data",
    "social security number",
];

pub const DEFAULT_TOXIC_TERMS: &[&str] = &["fuck", "shit", "bitch", "damn", "idiot", "stupid"];

/// Classification of a raw question. Blocked variants carry the term that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailVerdict {
    Allowed,
    BlockedSensitive(String),
    BlockedToxic(String),
}

impl GuardrailVerdict {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, Self::Allowed)
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::BlockedSensitive(_) => "sensitive",
            Self::BlockedToxic(_) => "toxic",
        }
    }

    /// Fixed reply sent instead of an answer.
    pub fn canned_message(&self) -> Option<&'static str> {
        match self {
            Self::Allowed => None,
            Self::BlockedSensitive(_) => Some(SENSITIVE_MESSAGE),
            Self::BlockedToxic(_) => Some(TOXIC_MESSAGE),
        }
    }
}

/// Case-insensitive substring screen run before any provider call.
#[derive(Debug, Clone)]
pub struct GuardrailFilter {
    sensitive: Vec<String>,
    toxic: Vec<String>,
}

impl Default for GuardrailFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENSITIVE_PHRASES.iter().copied(),
            DEFAULT_TOXIC_TERMS.iter().copied(),
        )
    }
}

impl GuardrailFilter {
    pub fn new<S, T>(sensitive: S, toxic: T) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        Self {
            sensitive: normalize_terms(sensitive),
            toxic: normalize_terms(toxic),
        }
    }

    /// Built-in lists, replaced per category by any override in the config.
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        Self {
            sensitive: config
                .guardrail_sensitive_phrases
                .as_ref()
                .map_or(defaults.sensitive, normalize_terms),
            toxic: config
                .guardrail_toxic_terms
                .as_ref()
                .map_or(defaults.toxic, normalize_terms),
        }
    }

    pub fn check(&self, question: &str) -> GuardrailVerdict {
        let lowered = question.to_lowercase();

        if let Some(phrase) = first_hit(&self.sensitive, &lowered) {
            return GuardrailVerdict::BlockedSensitive(phrase.to_string());
        }
        if let Some(term) = first_hit(&self.toxic, &lowered) {
            return GuardrailVerdict::BlockedToxic(term.to_string());
        }

        GuardrailVerdict::Allowed
    }
}

fn normalize_terms<I>(terms: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    terms
        .into_iter()
        .map(|term| term.as_ref().trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

fn first_hit<'a>(terms: &'a [String], lowered: &str) -> Option<&'a str> {
    terms
        .iter()
        .find(|term| lowered.contains(term.as_str()))
        .map(String::as_str)
}

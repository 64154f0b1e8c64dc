//! Chat intent routing
//!
//! Decides whether a free-text chat message asks to look up a new ticker or
//! is a question about the current one. Matching is keyword based and never
//! fails: every message resolves to exactly one [`ChatIntent`].

use regex::Regex;
use std::sync::LazyLock;

/// What a chat message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    /// Switch the desk to a new ticker symbol
    TickerLookup { symbol: String },
    /// Forward the message verbatim to the question endpoint
    Question { text: String },
}

impl ChatIntent {
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::TickerLookup { .. })
    }
}

/// Keyword tables
mod keywords {
    pub const TRIGGERS: &[&str] = &[
        "search for ticker",
        "find ticker",
        "get ticker",
        "lookup ticker",
    ];

    /// Words that veto a lookup even when a trigger phrase is present
    pub const EXCLUSIONS: &[&str] = &["price", "rollercoaster"];

    /// Common words that look like symbols but never are
    pub const DENYLIST: &[&str] = &["PRICE", "STOCK", "DATA", "INFO", "VALUE"];
}

/// Maximum ticker length accepted from chat
pub const MAX_TICKER_LEN: usize = 5;

static AFTER_TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ticker\s+([a-z]+)").expect("valid ticker regex"));

/// Router for chat messages
#[derive(Debug, Clone, Default)]
pub struct IntentRouter;

impl IntentRouter {
    /// Create a new router
    pub fn new() -> Self {
        Self
    }

    /// Classify a chat message
    pub fn classify(&self, message: &str) -> ChatIntent {
        let lower = message.to_lowercase();

        if !Self::is_triggered(&lower) {
            return Self::question(message);
        }

        let candidate = Self::extract_candidate(message, &lower);
        tracing::debug!("Lookup trigger matched, candidate ticker {:?}", candidate);

        match candidate {
            Some(symbol) if Self::is_valid_ticker(&symbol) => ChatIntent::TickerLookup { symbol },
            _ => Self::question(message),
        }
    }

    fn question(message: &str) -> ChatIntent {
        ChatIntent::Question {
            text: message.to_string(),
        }
    }

    fn is_triggered(lower: &str) -> bool {
        keywords::TRIGGERS.iter().any(|t| lower.contains(t))
            && !keywords::EXCLUSIONS.iter().any(|x| lower.contains(x))
    }

    /// Word after "ticker", falling back to the last space-separated token
    fn extract_candidate(message: &str, lower: &str) -> Option<String> {
        if let Some(word) = AFTER_TICKER.captures(lower).and_then(|c| c.get(1)) {
            return Some(word.as_str().to_uppercase());
        }
        message
            .split(' ')
            .next_back()
            .map(str::to_uppercase)
    }

    /// Ticker validation used for chat lookups
    pub fn is_valid_ticker(symbol: &str) -> bool {
        !symbol.is_empty()
            && symbol.len() <= MAX_TICKER_LEN
            && symbol.chars().all(|c| c.is_ascii_uppercase())
            && !keywords::DENYLIST.contains(&symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(symbol: &str) -> ChatIntent {
        ChatIntent::TickerLookup {
            symbol: symbol.to_string(),
        }
    }

    #[test]
    fn test_lookup_extracts_word_after_ticker() {
        let router = IntentRouter::new();

        assert_eq!(router.classify("search for ticker AAPL"), lookup("AAPL"));
        assert_eq!(router.classify("Find ticker msft please"), lookup("MSFT"));
        assert_eq!(router.classify("can you lookup ticker nvda"), lookup("NVDA"));
        assert_eq!(router.classify("GET TICKER F"), lookup("F"));
    }

    #[test]
    fn test_every_valid_symbol_after_trigger_is_extracted() {
        let router = IntentRouter::new();
        for symbol in ["A", "GE", "IBM", "TSLA", "GOOGL"] {
            for trigger in keywords::TRIGGERS {
                let message = format!("{trigger} {symbol}");
                assert_eq!(router.classify(&message), lookup(symbol), "{message}");
            }
        }
    }

    #[test]
    fn test_no_trigger_is_a_question() {
        let router = IntentRouter::new();

        for message in [
            "What's the outlook?",
            "ticker AAPL",
            "Is TSLA overvalued?",
            "show me the ticker",
            "",
        ] {
            assert_eq!(
                router.classify(message),
                ChatIntent::Question {
                    text: message.to_string()
                }
            );
        }
    }

    #[test]
    fn test_exclusion_words_veto_lookup() {
        let router = IntentRouter::new();

        let intent = router.classify("find ticker price AAPL");
        assert!(!intent.is_lookup());

        let intent = router.classify("search for ticker of that rollercoaster stock");
        assert!(!intent.is_lookup());
    }

    #[test]
    fn test_invalid_candidates_fall_back_to_question() {
        let router = IntentRouter::new();

        // too long
        assert!(!router.classify("find ticker AMAZONCOM").is_lookup());
        // denylisted word after "ticker"
        assert!(!router.classify("get ticker data").is_lookup());
        assert!(!router.classify("lookup ticker info").is_lookup());
    }

    #[test]
    fn test_fallback_to_last_token() {
        let router = IntentRouter::new();

        // "ticker" followed by punctuation, last token is the symbol
        assert_eq!(router.classify("find ticker: amd"), lookup("AMD"));
        // last token with punctuation fails validation
        assert!(!router.classify("find ticker: amd?").is_lookup());
    }

    #[test]
    fn test_question_keeps_original_casing() {
        let router = IntentRouter::new();
        let intent = router.classify("Find ticker Price for Apple");
        assert_eq!(
            intent,
            ChatIntent::Question {
                text: "Find ticker Price for Apple".to_string()
            }
        );
    }

    #[test]
    fn test_ticker_validation() {
        assert!(IntentRouter::is_valid_ticker("AAPL"));
        assert!(!IntentRouter::is_valid_ticker(""));
        assert!(!IntentRouter::is_valid_ticker("BRK.B"));
        assert!(!IntentRouter::is_valid_ticker("aapl"));
        assert!(!IntentRouter::is_valid_ticker("STOCK"));
    }
}

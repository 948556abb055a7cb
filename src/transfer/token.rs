//! Token symbol inference
//!
//! Best-effort enrichment for insufficient-funds replies that omit the token.
//! Never fails: no ticker in the message resolves to the native symbol.

use tracing::debug;

use crate::config::TokenConfig;

/// Resolves the token a funding wait should watch
#[derive(Debug, Clone)]
pub struct TokenResolver {
    known: Vec<String>,
    native: String,
}

impl TokenResolver {
    pub fn new(known: Vec<String>, native: impl Into<String>) -> Self {
        Self {
            known: known.into_iter().map(|t| t.to_ascii_uppercase()).collect(),
            native: native.into().to_ascii_uppercase(),
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.known.clone(), config.native.clone())
    }

    /// Explicit symbol first, then a scan of the request message, then native
    pub fn resolve(&self, explicit: Option<&str>, message: &str) -> String {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return token.to_ascii_uppercase();
        }

        match scan_ticker(message, &self.known) {
            Some(ticker) => {
                debug!(ticker, "Token inferred from request message");
                ticker.to_string()
            }
            None => {
                debug!(native = %self.native, "No ticker in request message, using native token");
                self.native.clone()
            }
        }
    }
}

/// Find the first allow-listed ticker mentioned in `message`
///
/// Matching is case-insensitive on whole words; allow-list order decides
/// between several mentioned tickers.
pub fn scan_ticker<'a>(message: &str, known: &'a [String]) -> Option<&'a str> {
    let words: Vec<&str> = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    known
        .iter()
        .find(|ticker| words.iter().any(|w| w.eq_ignore_ascii_case(ticker)))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        ["TON", "USDT", "USDC", "ETH"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_scan_finds_ticker_case_insensitive() {
        assert_eq!(scan_ticker("Send 100 TON to Samir", &known()), Some("TON"));
        assert_eq!(scan_ticker("send 5 usdt to bob", &known()), Some("USDT"));
        assert_eq!(scan_ticker("pay 0.1 Eth, thanks", &known()), Some("ETH"));
    }

    #[test]
    fn test_scan_matches_whole_words_only() {
        assert_eq!(scan_ticker("Send 3 coins to Boston", &known()), None);
        assert_eq!(scan_ticker("tonight send money", &known()), None);
    }

    #[test]
    fn test_allow_list_order_wins() {
        assert_eq!(
            scan_ticker("swap USDT for TON", &known()),
            Some("TON"),
            "TON precedes USDT in the allow-list"
        );
    }

    #[test]
    fn test_resolve_prefers_explicit_token() {
        let resolver = TokenResolver::new(known(), "TON");
        assert_eq!(resolver.resolve(Some("usdc"), "Send 100 TON"), "USDC");
        assert_eq!(resolver.resolve(Some("  "), "Send 100 ETH"), "ETH");
    }

    #[test]
    fn test_resolve_falls_back_to_native() {
        let resolver = TokenResolver::new(known(), "ton");
        assert_eq!(resolver.resolve(None, "Send 100 to Samir"), "TON");
        assert_eq!(resolver.resolve(None, ""), "TON");
    }
}

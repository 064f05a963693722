//! Shared detection patterns and keyword lists for the heuristic validators.

use lazy_static::lazy_static;
use regex::Regex;

/// Boilerplate phrases that suggest copied or filler text.
pub const SUSPICIOUS_PHRASES: &[&str] = &[
    "copy paste",
    "lorem ipsum",
    "sample text",
    "placeholder content",
];

/// Keywords counted toward the toxicity score (case-insensitive substring match).
pub const TOXIC_KEYWORDS: &[&str] = &[
    "hate",
    "toxic",
    "abuse",
    "harassment",
    "threat",
    "violence",
    "discrimination",
    "offensive",
    "inappropriate",
];

lazy_static! {
    // =========================================================================
    // WALLET ADDRESS FORMATS
    // =========================================================================

    /// Ethereum account address (0x + 40 hex digits)
    pub static ref ETHEREUM_ADDRESS: Regex = Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap();

    /// Legacy Bitcoin address (base58, P2PKH or P2SH)
    pub static ref BITCOIN_ADDRESS: Regex =
        Regex::new(r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$").unwrap();

    // =========================================================================
    // CITATIONS
    // =========================================================================

    /// Numbered reference: [1], [23]
    pub static ref CITATION_NUMBERED: Regex = Regex::new(r"\[\d+\]").unwrap();

    /// Author-year reference: (Smith, 2023), (Smith 2023)
    pub static ref CITATION_AUTHOR_YEAR: Regex = Regex::new(r"\(\w+,?\s*\d{4}\)").unwrap();

    /// DOI reference: doi:10.1000
    pub static ref CITATION_DOI: Regex = Regex::new(r"(?i)doi:\s*10\.\d+").unwrap();

    // =========================================================================
    // SPAM SIGNALS
    // =========================================================================

    /// HTTP(S) link
    pub static ref LINK_PATTERN: Regex = Regex::new(r"https?://\S+").unwrap();

    /// Emoticons, pictographs, transport symbols and regional indicators
    pub static ref EMOJI_PATTERN: Regex = Regex::new(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}]"
    ).unwrap();
}

/// Wallet address format: `"ethereum"`, `"bitcoin"` or `"unknown"`.
pub fn address_format(address: &str) -> &'static str {
    if ETHEREUM_ADDRESS.is_match(address) {
        "ethereum"
    } else if BITCOIN_ADDRESS.is_match(address) {
        "bitcoin"
    } else {
        "unknown"
    }
}

/// Number of citation tokens of any recognized style.
pub fn count_citations(content: &str) -> usize {
    CITATION_NUMBERED.find_iter(content).count()
        + CITATION_AUTHOR_YEAR.find_iter(content).count()
        + CITATION_DOI.find_iter(content).count()
}

/// Number of suspicious boilerplate phrases present.
pub fn count_suspicious_phrases(content: &str) -> usize {
    let lower = content.to_lowercase();
    SUSPICIOUS_PHRASES.iter().filter(|p| lower.contains(*p)).count()
}

/// Toxic keywords present in the content.
pub fn toxic_keywords_in(content: &str) -> Vec<&'static str> {
    let lower = content.to_lowercase();
    TOXIC_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect()
}

pub fn count_links(content: &str) -> usize {
    LINK_PATTERN.find_iter(content).count()
}

pub fn count_emoji(content: &str) -> usize {
    EMOJI_PATTERN.find_iter(content).count()
}

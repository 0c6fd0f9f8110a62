use crate::error::Error;
use tracing::debug;

/// Request/response contract with the remote language-model boundary.
/// Transport, retries and authentication are wholly owned by the
/// implementor; the engine only supplies prompts and parses the free-text
/// reply defensively.
pub trait LlmClient {
    fn send(&self, system_prompt: &str, user_prompt: &str) -> Result<String, Error>;
}

/// Rating midpoint used to pad short embedding replies and to stand in
/// for failed ones (dimensions are rated 0–10).
pub const EMBED_MIDPOINT: f64 = 5.0;

const JUDGE_SYSTEM_PROMPT: &str = "You rate the semantic similarity of two documents. \
Reply with a single number from 0 to 100, where 100 means the documents say the same \
thing. Judge meaning only; ignore formatting, markup and whitespace.";

const EMBED_SYSTEM_PROMPT: &str = "You rate a document along fixed semantic dimensions \
(topic, tone, formality, specificity, and so on). Reply with exactly the requested \
number of values from 0 to 10, separated by commas, and nothing else.";

/// Thin boundary over the external LLM client. Both operations return
/// `Result` so the fallback decision stays with the caller; neither ever
/// aborts a scan.
pub struct SemanticAugmenter<'a> {
    client: &'a dyn LlmClient,
    truncate_chars: usize,
    embed_dimensions: usize,
}

impl<'a> SemanticAugmenter<'a> {
    pub fn new(client: &'a dyn LlmClient, truncate_chars: usize, embed_dimensions: usize) -> Self {
        Self {
            client,
            truncate_chars,
            embed_dimensions,
        }
    }

    /// Ask the model to rate semantic similarity of two texts, 0–100.
    /// An unparseable reply degrades to a neutral 50; only transport
    /// failures surface as errors.
    pub fn judge_similarity(&self, text_a: &str, text_b: &str) -> Result<f64, Error> {
        let prompt = format!(
            "Document A:\n{}\n\nDocument B:\n{}\n\nSimilarity (0-100):",
            truncate(text_a, self.truncate_chars),
            truncate(text_b, self.truncate_chars),
        );
        let response = self.client.send(JUDGE_SYSTEM_PROMPT, &prompt)?;

        match parse_score(&response) {
            Some(score) => Ok(score),
            None => {
                debug!("No numeric score in model reply, using neutral 50");
                Ok(50.0)
            }
        }
    }

    /// Ask the model for a fixed-length rating vector. Short replies are
    /// padded with the midpoint, long ones truncated.
    pub fn embed(&self, text: &str) -> Result<Vec<f64>, Error> {
        let prompt = format!(
            "Rate this document along {} dimensions:\n{}",
            self.embed_dimensions,
            truncate(text, self.truncate_chars),
        );
        let response = self.client.send(EMBED_SYSTEM_PROMPT, &prompt)?;

        let mut vector = parse_vector(&response);
        vector.truncate(self.embed_dimensions);
        while vector.len() < self.embed_dimensions {
            vector.push(EMBED_MIDPOINT);
        }
        Ok(vector)
    }

    pub fn embed_dimensions(&self) -> usize {
        self.embed_dimensions
    }
}

/// All-midpoint vector, used when embedding fails entirely.
pub fn neutral_embedding(dimensions: usize) -> Vec<f64> {
    vec![EMBED_MIDPOINT; dimensions]
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// First integer or decimal token in free-form text, with a trailing
/// percent sign tolerated. Clamped to [0, 100].
fn parse_score(text: &str) -> Option<f64> {
    for token in text.split(|c: char| c.is_whitespace() || c == ',') {
        let trimmed = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '%');
        let trimmed = trimmed.trim_end_matches('%');
        if trimmed.is_empty() {
            continue;
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Some(value.clamp(0.0, 100.0));
        }
    }
    None
}

/// Every parseable number in a comma/whitespace-separated reply, in order.
fn parse_vector(text: &str) -> Vec<f64> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|token| {
            let trimmed = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-');
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient(String);

    impl LlmClient for FixedClient {
        fn send(&self, _system: &str, _user: &str) -> Result<String, Error> {
            Ok(self.0.clone())
        }
    }

    struct DeadClient;

    impl LlmClient for DeadClient {
        fn send(&self, _system: &str, _user: &str) -> Result<String, Error> {
            Err(Error::Llm("timeout".to_string()))
        }
    }

    #[test]
    fn test_parse_score_variants() {
        assert_eq!(parse_score("85"), Some(85.0));
        assert_eq!(parse_score("The score is 72.5 overall."), Some(72.5));
        assert_eq!(parse_score("Roughly 90% similar"), Some(90.0));
        assert_eq!(parse_score("Score: 66."), Some(66.0));
        assert_eq!(parse_score("way over 9000"), Some(100.0));
        assert_eq!(parse_score("no numbers here"), None);
    }

    #[test]
    fn test_judge_unparseable_reply_is_neutral() {
        let client = FixedClient("I cannot compare these documents.".to_string());
        let augmenter = SemanticAugmenter::new(&client, 100, 10);
        let score = augmenter.judge_similarity("a", "b").unwrap();
        assert_eq!(score, 50.0);
    }

    #[test]
    fn test_judge_transport_failure_is_error() {
        let augmenter = SemanticAugmenter::new(&DeadClient, 100, 10);
        assert!(augmenter.judge_similarity("a", "b").is_err());
    }

    #[test]
    fn test_embed_pads_and_truncates() {
        let client = FixedClient("7, 3, 9".to_string());
        let augmenter = SemanticAugmenter::new(&client, 100, 5);
        let vector = augmenter.embed("doc").unwrap();
        assert_eq!(vector, vec![7.0, 3.0, 9.0, EMBED_MIDPOINT, EMBED_MIDPOINT]);

        let client = FixedClient("1 2 3 4 5 6 7".to_string());
        let augmenter = SemanticAugmenter::new(&client, 100, 3);
        assert_eq!(augmenter.embed("doc").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_embed_garbage_reply_is_all_midpoint() {
        let client = FixedClient("no ratings, sorry".to_string());
        let augmenter = SemanticAugmenter::new(&client, 100, 4);
        assert_eq!(augmenter.embed("doc").unwrap(), neutral_embedding(4));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("short", 100), "short");
    }
}

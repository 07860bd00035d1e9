use crate::tokens::TokenEstimator;

const TRUNCATED_MARKER: &str = "\n\n[TRUNCATED]\n";

/// A system message with (part of) a document appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedPrompt {
    pub system_message: String,
    /// `false` when the base message alone already used up the budget and
    /// was returned unchanged.
    pub augmented: bool,
    /// `true` when only a prefix of the document fit.
    pub truncated: bool,
}

/// Longest prefix of `text` whose estimate fits in `budget` tokens.
///
/// Returns the prefix and whether anything was cut. Cuts land on
/// character boundaries.
pub fn truncate_to_tokens(
    estimator: &dyn TokenEstimator,
    text: &str,
    budget: usize,
) -> (String, bool) {
    if estimator.estimate(text) <= budget {
        return (text.to_string(), false);
    }

    // Byte offset at which each prefix of n chars ends.
    let ends: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .skip(1)
        .chain(std::iter::once(text.len()))
        .collect();

    // Binary search the largest char count whose prefix fits.
    let (mut lo, mut hi) = (0usize, ends.len());
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if estimator.estimate(&text[..ends[mid - 1]]) <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let cut = if lo == 0 { 0 } else { ends[lo - 1] };
    (text[..cut].to_string(), true)
}

/// Append as much of `document` to `base` as fits in
/// `max_context_tokens - tokens(base)`.
///
/// If the base message alone meets or exceeds the budget it is returned
/// unchanged.
pub fn augment_system_message(
    estimator: &dyn TokenEstimator,
    base: &str,
    document: &str,
    max_context_tokens: usize,
) -> AugmentedPrompt {
    let base_tokens = estimator.estimate(base);
    let Some(remaining) = max_context_tokens
        .checked_sub(base_tokens)
        .filter(|r| *r > 0)
    else {
        tracing::debug!(
            base_tokens,
            max_context_tokens,
            "no room left for document content"
        );
        return AugmentedPrompt {
            system_message: base.to_string(),
            augmented: false,
            truncated: false,
        };
    };

    let (content, truncated) = truncate_to_tokens(estimator, document, remaining);
    let mut system_message = format!("{base}\n\nDocument content:\n{content}");
    if truncated {
        system_message.push_str(TRUNCATED_MARKER);
    }

    AugmentedPrompt {
        system_message,
        augmented: true,
        truncated,
    }
}

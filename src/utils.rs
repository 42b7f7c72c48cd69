//! Utility functions for common operations.

use crate::error::ProviderError;

/// Counts the words in translated chapter text.
///
/// Letters and digits form words. An ASCII apostrophe or hyphen continues a
/// word that has already started, so `world-class` and `test's` count once.
/// Everything else separates words. Markup tags (`<p>`, `</p>`) are skipped
/// since translated content is HTML.
pub fn count_words(text: &str) -> i64 {
    let mut count = 0;
    let mut in_word = false;
    let mut in_tag = false;

    for c in text.chars() {
        if in_tag {
            in_tag = c != '>';
            continue;
        }
        if c == '<' {
            in_tag = true;
            in_word = false;
            continue;
        }

        let is_word_char = c.is_alphanumeric() || (in_word && (c == '\'' || c == '-'));

        if is_word_char && !in_word {
            count += 1;
            in_word = true;
        } else if !is_word_char {
            in_word = false;
        }
    }

    count
}

/// Merges genre candidates into an existing genre list.
///
/// Order of first appearance is kept and comparison is case-sensitive.
/// Duplicates already present in `genres` are collapsed too, and blank
/// candidates are ignored. Merging the same candidates twice is a no-op.
pub fn merge_genres<I, S>(genres: &mut Vec<String>, candidates: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut merged: Vec<String> = Vec::with_capacity(genres.len());
    let existing = std::mem::take(genres);

    let all = existing
        .into_iter()
        .chain(candidates.into_iter().map(|s| s.as_ref().to_string()));

    for genre in all {
        if genre.trim().is_empty() {
            continue;
        }
        if !merged.contains(&genre) {
            merged.push(genre);
        }
    }

    *genres = merged;
}

/// Checks if an HTTP response is successful, and if not, returns a detailed error.
///
/// This helper extracts both the status code and response body for better error messages.
pub async fn check_response_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::ApiError(format!("HTTP {}: {}", status, text)));
    }
    Ok(response)
}

/// Returns at most `max_chars` characters of `text`, for log previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

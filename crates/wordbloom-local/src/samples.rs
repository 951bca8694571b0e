//! The "random sample" action: fill an empty input with a sample text, or pick one of the
//! input's lines (fetching it when it is a URL).

use crate::orchestrate::is_url_shaped;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;
use wordbloom_core::ContentFetcher;

pub const SAMPLE_TEXTS: [&str; 4] = [
    "The quick brown fox jumps over the lazy dog.",
    "2023 brought many changes: 7 launches, 3 delays, and 12 lessons learned.",
    "Coding in JavaScript can be both fun and challenging.",
    "Roses are red, violets are blue, HTML and CSS, I love you.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplePick {
    Sample(&'static str),
    Line(String),
    Url(String),
}

pub fn pick<R: Rng + ?Sized>(input: &str, rng: &mut R) -> SamplePick {
    let lines: Vec<&str> = input
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    match lines.choose(rng) {
        None => SamplePick::Sample(SAMPLE_TEXTS.choose(rng).copied().unwrap_or(SAMPLE_TEXTS[0])),
        Some(line) if is_url_shaped(line) => {
            SamplePick::Url(line.split_whitespace().next().unwrap_or(line).to_string())
        }
        Some(line) => SamplePick::Line(line.to_string()),
    }
}

/// `pick` with the thread-local RNG.
pub fn pick_random(input: &str) -> SamplePick {
    pick(input, &mut rand::thread_rng())
}

/// Resolve a pick into replacement input text. A URL that cannot be fetched becomes the second
/// sample text plus a note naming the URL.
pub async fn resolve(fetcher: &dyn ContentFetcher, pick: SamplePick) -> String {
    match pick {
        SamplePick::Sample(s) => s.to_string(),
        SamplePick::Line(s) => s,
        SamplePick::Url(url) => match fetcher.fetch_text(&url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %url, error = %e, "sample fetch failed");
                format!(
                    "{}\n\n// (failed to fetch {url} - likely blocked by cross-origin policy)",
                    SAMPLE_TEXTS[1]
                )
            }
        },
    }
}

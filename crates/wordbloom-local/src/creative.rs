//! Template-based haiku/riddle/poem generator: the tier of last resort.
//!
//! Never fails, and every template mentions the target character at least once.

use rand::seq::SliceRandom;
use rand::Rng;
use wordbloom_core::GenerationType;

fn upper(c: char) -> String {
    c.to_uppercase().collect()
}

fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[String]) -> String {
    options.choose(rng).cloned().unwrap_or_default()
}

/// Pick and fill one template for `(ch, kind)` using `rng`.
pub fn generate<R: Rng + ?Sized>(ch: char, kind: GenerationType, rng: &mut R) -> String {
    let up = upper(ch);
    match kind {
        GenerationType::Haiku => {
            let first = [
                format!("{up} dawns on the meadow"),
                format!("{ch} winds whisper low"),
                format!("{ch} petals drift away"),
            ];
            let second = [
                "a single heartbeat".to_string(),
                "echoes along the valley".to_string(),
                "softly counts the hours".to_string(),
            ];
            let third = [
                "still breath of night".to_string(),
                "dawn spreads a quiet".to_string(),
                "and the world exhales".to_string(),
            ];
            format!(
                "{}\n{}\n{}",
                pick(rng, &first),
                pick(rng, &second),
                pick(rng, &third)
            )
        }
        GenerationType::Riddle => pick(
            rng,
            &[
                format!("I begin with {ch}. I am small but start many words. Who am I?"),
                format!("I stand at the start and signal the rest. I am {ch}, what am I called?"),
                format!(
                    "First among letters or numbers, {up} opens the gate.\nI start your words, guess my state."
                ),
            ],
        ),
        GenerationType::Poem => pick(
            rng,
            &[
                format!(
                    "{up} lights the line and makes it bloom,\nWords fall in order like stars in a room."
                ),
                format!(
                    "{ch} sings in silver, {ch} hums in gold,\nEvery word you start with {ch}, a little tale is told."
                ),
                format!(
                    "When {ch} begins, the sentence sways,\nIt carries the tune through nights and days."
                ),
            ],
        ),
    }
}

/// `generate` with the thread-local RNG.
pub fn generate_random(ch: char, kind: GenerationType) -> String {
    generate(ch, kind, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_alnum_char_and_kind_yields_text_mentioning_the_char() {
        let alnum = ('a'..='z').chain('A'..='Z').chain('0'..='9');
        for ch in alnum {
            for kind in GenerationType::ALL {
                for seed in 0..16u64 {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let out = generate(ch, kind, &mut rng);
                    assert!(!out.trim().is_empty());
                    assert!(
                        out.to_lowercase()
                            .contains(&ch.to_lowercase().collect::<String>()),
                        "{kind} for {ch:?} missing char: {out}"
                    );
                }
            }
        }
    }

    #[test]
    fn haiku_has_three_lines() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = generate('q', GenerationType::Haiku, &mut rng);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn same_seed_same_output() {
        let a = generate('m', GenerationType::Poem, &mut StdRng::seed_from_u64(42));
        let b = generate('m', GenerationType::Poem, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn uppercases_where_the_template_asks() {
        // Try enough seeds to hit the "{up} dawns" opener.
        let hit = (0..64u64).any(|seed| {
            generate('k', GenerationType::Haiku, &mut StdRng::seed_from_u64(seed))
                .starts_with("K dawns on the meadow")
        });
        assert!(hit);
    }
}

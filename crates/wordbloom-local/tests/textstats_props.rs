use proptest::prelude::*;
use wordbloom_local::sanitize::{html_to_plain, truncate_chars};
use wordbloom_local::textstats::{count_starts_with, text_stats, tokenize};

proptest! {
    #[test]
    fn starts_with_never_exceeds_total(text in "\\PC{0,200}", target in "\\PC{0,2}") {
        let s = text_stats(&text, &target);
        prop_assert!(s.starts_with_count <= s.total_words);
    }

    #[test]
    fn words_are_non_empty_and_whitespace_free(text in "\\PC{0,200}") {
        for w in tokenize(&text) {
            prop_assert!(!w.is_empty());
            prop_assert!(!w.chars().any(char::is_whitespace));
        }
    }

    #[test]
    fn every_word_counts_for_its_own_first_char(words in proptest::collection::vec("[a-z]{1,8}", 1..20)) {
        let text = words.join(" ");
        let toks = tokenize(&text);
        prop_assert_eq!(toks.len(), words.len());
        let first = words[0].chars().next().unwrap().to_string();
        let expected = words.iter().filter(|w| w.starts_with(first.as_str())).count();
        prop_assert_eq!(count_starts_with(&toks, &first.to_uppercase()), expected);
    }

    #[test]
    fn sanitized_text_has_no_whitespace_runs(html in "\\PC{0,300}") {
        let out = html_to_plain(&html);
        prop_assert!(!out.contains("  "));
        prop_assert_eq!(out.trim(), out.as_str());
    }

    #[test]
    fn truncation_respects_char_budget(s in "\\PC{0,100}", n in 0usize..120) {
        prop_assert!(truncate_chars(&s, n).chars().count() <= n);
    }
}

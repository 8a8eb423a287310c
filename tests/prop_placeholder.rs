use proptest::prelude::*;
use mongo_datasource::query::{FROM_TOKEN, MAX_DATA_POINTS_TOKEN, TO_TOKEN, date_literal, substitute};

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z{}\\[\\]:, ]{0,12}",
        Just(FROM_TOKEN.to_string()),
        Just(TO_TOKEN.to_string()),
        Just(MAX_DATA_POINTS_TOKEN.to_string()),
    ]
}

proptest! {
    #[test]
    fn prop_no_token_survives(parts in proptest::collection::vec(fragment(), 0..20), from in any::<i64>(), to in any::<i64>(), mdp in 1i64..100_000) {
        let text = parts.concat();
        let out = substitute(&text, from, to, mdp);
        prop_assert!(!out.contains(FROM_TOKEN));
        prop_assert!(!out.contains(TO_TOKEN));
        prop_assert!(!out.contains(MAX_DATA_POINTS_TOKEN));
        if text.contains(FROM_TOKEN) { prop_assert!(out.contains(&date_literal(from))); }
        if text.contains(TO_TOKEN) { prop_assert!(out.contains(&date_literal(to))); }
        if text.contains(MAX_DATA_POINTS_TOKEN) { prop_assert!(out.contains(&mdp.to_string())); }
    }

    #[test]
    fn prop_text_without_tokens_is_unchanged(text in "[a-zA-Z0-9{}\\[\\]:,\" ]{0,64}", from in any::<i64>(), to in any::<i64>()) {
        prop_assume!(!text.contains(FROM_TOKEN) && !text.contains(TO_TOKEN) && !text.contains(MAX_DATA_POINTS_TOKEN));
        prop_assert_eq!(substitute(&text, from, to, 7), text);
    }
}

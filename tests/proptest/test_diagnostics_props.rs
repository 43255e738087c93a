//! Property-based tests for error notice shortening

use proptest::prelude::*;
use pycalc::supervisor::diagnostics::{has_locator, shorten};

proptest! {
    #[test]
    fn test_traceback_shortens_to_one_line(
        file in prop_oneof![Just("<stdin>"), Just("<string>")],
        line_no in 1usize..10_000,
        message in "[A-Za-z]{1,20}Error: [ -~]{0,60}",
    ) {
        let stderr = format!(
            "Traceback (most recent call last):\n  File \"{}\", line {}, in <module>\n{}\n",
            file, line_no, message
        );

        prop_assert!(has_locator(&stderr));
        let notice = shorten(&stderr);

        prop_assert!(!notice.contains('\n'));
        let expected_prefix = format!("File \"{}\", line {}", file, line_no);
        prop_assert!(notice.starts_with(&expected_prefix));
        prop_assert!(notice.ends_with(message.trim()));
    }

    #[test]
    fn test_shorten_never_panics(text in "(\\PC|\n){0,400}") {
        let _ = shorten(&text);
    }

    #[test]
    fn test_text_without_locator_is_kept(text in "[^F]{0,200}") {
        prop_assert!(!has_locator(&text));
        prop_assert_eq!(shorten(&text), text.trim_end());
    }
}

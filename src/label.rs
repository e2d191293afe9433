use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LABEL_PREFIX_REGEX: Regex = Regex::new(r"^(?:[a-zA-Z]|[0-9]+)[).]\s+").unwrap();
}

/// Removes one leading authoring label such as `"b) "`, `"C. "` or `"12. "` and trims the rest.
///
/// Text without a label passes through trimmed but otherwise unchanged. Options and correct
/// answers must both go through this function before they are compared.
pub fn strip_label(text: &str) -> String {
    LABEL_PREFIX_REGEX.replace(text, "").trim().to_string()
}

/// Case-insensitive equality of two choices that are already in stripped form.
///
/// Neither side is stripped again: `"A. Lincoln"` and `"B. Lincoln"` are different choices.
pub fn same_choice(selected: &str, answer: &str) -> bool {
    selected.to_lowercase() == answer.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_letter_and_number_labels() {
        assert_eq!(strip_label("b) Paris"), "Paris");
        assert_eq!(strip_label("C. Madrid"), "Madrid");
        assert_eq!(strip_label("12. Rome"), "Rome");
        assert_eq!(strip_label("d)   Lisbon  "), "Lisbon");
    }

    #[test]
    fn leaves_unlabelled_text_alone() {
        assert_eq!(strip_label("Paris"), "Paris");
        assert_eq!(strip_label("b)Paris"), "b)Paris");
        assert_eq!(strip_label("ab) Paris"), "ab) Paris");
        assert_eq!(strip_label("  Paris "), "Paris");
    }

    #[test]
    fn removes_only_one_label() {
        assert_eq!(strip_label("a) b) Paris"), "b) Paris");
    }

    #[test]
    fn stripping_a_stripped_form_is_a_no_op() {
        for raw in ["a) Berlin", "B. Paris", "3. Rome", "Madrid", "x)  The letter x "] {
            let once = strip_label(raw);
            assert_eq!(strip_label(&once), once, "stripping {raw:?} twice changed it");
        }
    }

    #[test]
    fn same_choice_ignores_case_but_not_inner_labels() {
        assert!(same_choice("PARIS", "paris"));
        assert!(!same_choice("Berlin", "Paris"));
        assert!(!same_choice("B. Lincoln", "A. Lincoln"));
    }
}

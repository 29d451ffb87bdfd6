/// Turn a compact factor key into a display label: `titleTag` becomes `Title Tag`.
///
/// A space goes before every uppercase letter after the first character, then the
/// first character is capitalised. Renderer and tabular export both call this.
pub fn factor_label(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for (idx, ch) in key.chars().enumerate() {
        if idx > 0 && ch.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CategoryKind;
    use proptest::prelude::*;

    #[test]
    fn splits_camel_case_keys() {
        assert_eq!(factor_label("titleTag"), "Title Tag");
        assert_eq!(factor_label("headings"), "Headings");
        assert_eq!(factor_label("robotsTxt"), "Robots Txt");
        assert_eq!(
            factor_label("domainAuthorityEstimation"),
            "Domain Authority Estimation"
        );
    }

    #[test]
    fn handles_degenerate_input() {
        assert_eq!(factor_label(""), "");
        assert_eq!(factor_label("a"), "A");
        assert_eq!(factor_label("URL"), "U R L");
    }

    #[test]
    fn every_factor_key_gets_a_label() {
        for kind in CategoryKind::ALL {
            for key in kind.factor_keys() {
                let label = factor_label(key);
                assert!(label.chars().next().unwrap().is_uppercase(), "{label}");
                assert!(!label.contains("  "));
            }
        }
    }

    proptest! {
        #[test]
        fn label_is_pure(key in "[a-z][a-zA-Z]{0,24}") {
            prop_assert_eq!(factor_label(&key), factor_label(&key));
        }
    }
}

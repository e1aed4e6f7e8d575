/*!
 * Tests for language code utilities
 */

use pagewright::language_utils::{
    display_name, get_language_name, language_codes_match, normalize_to_part1_or_part2t,
    normalize_to_part2t,
};

#[test]
fn test_normalizeToPart2t_withSupportedTargets_shouldReturnTerminologyCodes() {
    let cases = [("si", "sin"), ("ta", "tam"), ("hi", "hin"), ("ger", "deu"), ("SIN", "sin")];
    for (code, expected) in cases {
        assert_eq!(normalize_to_part2t(code).unwrap(), expected, "{}", code);
    }
}

#[test]
fn test_normalizeToPart2t_withInvalidCode_shouldFail() {
    assert!(normalize_to_part2t("").is_err());
    assert!(normalize_to_part2t("xyz1").is_err());
    assert!(normalize_to_part2t("q").is_err());
}

#[test]
fn test_normalizeToPart1OrPart2t_shouldRoundTripTwoLetterCodes() {
    for code in ["si", "ta", "hi", "mr", "fr"] {
        assert_eq!(normalize_to_part1_or_part2t(code).unwrap(), code);
    }
}

#[test]
fn test_languageCodesMatch_shouldBeSymmetric() {
    assert!(language_codes_match("sin", "si"));
    assert!(language_codes_match("si", "sin"));
    assert!(language_codes_match("fre", "fra"));
    assert!(!language_codes_match("hi", "mr"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("ta").unwrap(), "Tamil");
    assert_eq!(get_language_name("hin").unwrap(), "Hindi");
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_displayName_shouldTrimUnknownCodes() {
    assert_eq!(display_name("  x-klingon "), "x-klingon");
}

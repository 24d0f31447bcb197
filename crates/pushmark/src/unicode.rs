//! Unicode predicates and CommonMark case folding.
//!
//! CommonMark needs three things beyond ASCII: whitespace and punctuation
//! classification of whole codepoints (for emphasis flanking rules), and
//! case folding of link labels. Classification is answered from the general
//! category data in `unicode-properties`. Folding starts from
//! `char::to_lowercase` and applies an override table for the codepoints
//! where simple lowercasing and Unicode case folding disagree (full folds
//! expanding to 2-3 codepoints, plus a handful of singletons like U+00DF
//! and the Greek final sigma).

use unicode_properties::{GeneralCategory, GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::byte_lookup;

/// Unicode whitespace in the CommonMark sense: the "Zs" category plus the
/// ASCII whitespace characters.
pub(crate) fn is_unicode_whitespace(codepoint: u32) -> bool {
    if codepoint <= 0x7f {
        return byte_lookup::is_whitespace(codepoint as u8)
            || byte_lookup::is_newline(codepoint as u8);
    }

    match char::from_u32(codepoint) {
        Some(c) => c.general_category() == GeneralCategory::SpaceSeparator,
        None => false,
    }
}

/// Unicode punctuation in the CommonMark sense: the general "P" and "S"
/// categories, with the ASCII range answered from the byte tables.
pub(crate) fn is_unicode_punct(codepoint: u32) -> bool {
    if codepoint <= 0x7f {
        return byte_lookup::is_ascii_punct(codepoint as u8);
    }

    match char::from_u32(codepoint) {
        Some(c) => matches!(
            c.general_category_group(),
            GeneralCategoryGroup::Punctuation | GeneralCategoryGroup::Symbol
        ),
        None => false,
    }
}

/// A fold override entry. A codepoint in `lo..=hi` folds to
/// `[a + (cp - lo), b, c][..len]`. Singles have `lo == hi`; the Greek
/// iota-subscript blocks use the range offset on the first codepoint.
struct FoldOverride {
    lo: u32,
    hi: u32,
    map: [u32; 3],
    len: u8,
}

const fn s1(cp: u32, a: u32) -> FoldOverride {
    FoldOverride { lo: cp, hi: cp, map: [a, 0, 0], len: 1 }
}

const fn s2(cp: u32, a: u32, b: u32) -> FoldOverride {
    FoldOverride { lo: cp, hi: cp, map: [a, b, 0], len: 2 }
}

const fn s3(cp: u32, a: u32, b: u32, c: u32) -> FoldOverride {
    FoldOverride { lo: cp, hi: cp, map: [a, b, c], len: 3 }
}

const fn r2(lo: u32, hi: u32, a: u32, b: u32) -> FoldOverride {
    FoldOverride { lo, hi, map: [a, b, 0], len: 2 }
}

/// Sorted by `lo`; consulted by binary search before falling back to
/// `char::to_lowercase`.
#[rustfmt::skip]
static FOLD_OVERRIDES: &[FoldOverride] = &[
    s1(0x00b5, 0x03bc),
    s2(0x00df, 0x0073, 0x0073),
    s2(0x0130, 0x0069, 0x0307),
    s2(0x0149, 0x02bc, 0x006e),
    s1(0x017f, 0x0073),
    s2(0x01f0, 0x006a, 0x030c),
    s1(0x0345, 0x03b9),
    s3(0x0390, 0x03b9, 0x0308, 0x0301),
    s3(0x03b0, 0x03c5, 0x0308, 0x0301),
    s1(0x03c2, 0x03c3),
    s1(0x03d0, 0x03b2),
    s1(0x03d1, 0x03b8),
    s1(0x03d5, 0x03c6),
    s1(0x03d6, 0x03c0),
    s1(0x03f0, 0x03ba),
    s1(0x03f1, 0x03c1),
    s1(0x03f5, 0x03b5),
    s2(0x0587, 0x0565, 0x0582),
    s1(0x1c80, 0x0432),
    s1(0x1c81, 0x0434),
    s1(0x1c82, 0x043e),
    s1(0x1c83, 0x0441),
    s1(0x1c84, 0x0442),
    s1(0x1c85, 0x0442),
    s1(0x1c86, 0x044a),
    s1(0x1c87, 0x0463),
    s1(0x1c88, 0xa64b),
    s2(0x1e96, 0x0068, 0x0331),
    s2(0x1e97, 0x0074, 0x0308),
    s2(0x1e98, 0x0077, 0x030a),
    s2(0x1e99, 0x0079, 0x030a),
    s2(0x1e9a, 0x0061, 0x02be),
    s1(0x1e9b, 0x1e61),
    s2(0x1e9e, 0x0073, 0x0073),
    s2(0x1f50, 0x03c5, 0x0313),
    s3(0x1f52, 0x03c5, 0x0313, 0x0300),
    s3(0x1f54, 0x03c5, 0x0313, 0x0301),
    s3(0x1f56, 0x03c5, 0x0313, 0x0342),
    r2(0x1f80, 0x1f87, 0x1f00, 0x03b9),
    r2(0x1f88, 0x1f8f, 0x1f00, 0x03b9),
    r2(0x1f90, 0x1f97, 0x1f20, 0x03b9),
    r2(0x1f98, 0x1f9f, 0x1f20, 0x03b9),
    r2(0x1fa0, 0x1fa7, 0x1f60, 0x03b9),
    r2(0x1fa8, 0x1faf, 0x1f60, 0x03b9),
    s2(0x1fb2, 0x1f70, 0x03b9),
    s2(0x1fb3, 0x03b1, 0x03b9),
    s2(0x1fb4, 0x03ac, 0x03b9),
    s2(0x1fb6, 0x03b1, 0x0342),
    s3(0x1fb7, 0x03b1, 0x0342, 0x03b9),
    s2(0x1fbc, 0x03b1, 0x03b9),
    s1(0x1fbe, 0x03b9),
    s2(0x1fc2, 0x1f74, 0x03b9),
    s2(0x1fc3, 0x03b7, 0x03b9),
    s2(0x1fc4, 0x03ae, 0x03b9),
    s2(0x1fc6, 0x03b7, 0x0342),
    s3(0x1fc7, 0x03b7, 0x0342, 0x03b9),
    s2(0x1fcc, 0x03b7, 0x03b9),
    s3(0x1fd2, 0x03b9, 0x0308, 0x0300),
    s3(0x1fd3, 0x03b9, 0x0308, 0x0301),
    s2(0x1fd6, 0x03b9, 0x0342),
    s3(0x1fd7, 0x03b9, 0x0308, 0x0342),
    s3(0x1fe2, 0x03c5, 0x0308, 0x0300),
    s3(0x1fe3, 0x03c5, 0x0308, 0x0301),
    s2(0x1fe4, 0x03c1, 0x0313),
    s2(0x1fe6, 0x03c5, 0x0342),
    s3(0x1fe7, 0x03c5, 0x0308, 0x0342),
    s2(0x1ff2, 0x1f7c, 0x03b9),
    s2(0x1ff3, 0x03c9, 0x03b9),
    s2(0x1ff4, 0x03ce, 0x03b9),
    s2(0x1ff6, 0x03c9, 0x0342),
    s3(0x1ff7, 0x03c9, 0x0342, 0x03b9),
    s2(0x1ffc, 0x03c9, 0x03b9),
    s2(0xfb00, 0x0066, 0x0066),
    s2(0xfb01, 0x0066, 0x0069),
    s2(0xfb02, 0x0066, 0x006c),
    s3(0xfb03, 0x0066, 0x0066, 0x0069),
    s3(0xfb04, 0x0066, 0x0066, 0x006c),
    s2(0xfb05, 0x0073, 0x0074),
    s2(0xfb06, 0x0073, 0x0074),
    s2(0xfb13, 0x0574, 0x0576),
    s2(0xfb14, 0x0574, 0x0565),
    s2(0xfb15, 0x0574, 0x056b),
    s2(0xfb16, 0x057e, 0x0576),
    s2(0xfb17, 0x0574, 0x056d),
];

/// Append the case fold of `c` (1-3 codepoints) to `out`.
pub(crate) fn fold_into(c: char, out: &mut String) {
    let codepoint = c as u32;

    // Fast path for ASCII characters.
    if codepoint <= 0x7f {
        out.push(c.to_ascii_lowercase());
        return;
    }

    let found = FOLD_OVERRIDES
        .binary_search_by(|entry| {
            if codepoint < entry.lo {
                std::cmp::Ordering::Greater
            } else if codepoint > entry.hi {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .ok();

    match found {
        Some(index) => {
            let entry = &FOLD_OVERRIDES[index];
            let first = entry.map[0] + (codepoint - entry.lo);
            for (i, cp) in [first, entry.map[1], entry.map[2]].iter().enumerate() {
                if i < entry.len as usize {
                    // The override data only holds scalar values.
                    out.push(char::from_u32(*cp).unwrap_or(c));
                }
            }
        }
        None => out.extend(c.to_lowercase()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fold_str(input: &str) -> String {
        let mut out = String::new();
        for c in input.chars() {
            fold_into(c, &mut out);
        }
        out
    }

    #[test]
    fn folds_ascii() {
        assert_eq!(fold_str("Foo Bar"), "foo bar");
    }

    #[test]
    fn folds_full_expansions() {
        assert_eq!(fold_str("ẞ"), "ss");
        assert_eq!(fold_str("ß"), "ss");
        assert_eq!(fold_str("ﬃ"), "ffi");
    }

    #[test]
    fn final_sigma_matches_sigma() {
        assert_eq!(fold_str("ΑΓΑΠΗΣ"), fold_str("αγαπης"));
    }

    #[test]
    fn iota_subscript_ranges() {
        // U+1F88 folds to U+1F00 U+03B9, offset within the block.
        assert_eq!(fold_str("\u{1f88}"), "\u{1f00}\u{3b9}");
        assert_eq!(fold_str("\u{1f8f}"), "\u{1f07}\u{3b9}");
    }

    #[test]
    fn classifies_codepoints() {
        assert!(is_unicode_whitespace(' ' as u32));
        assert!(is_unicode_whitespace(0x2003)); // EM SPACE
        assert!(!is_unicode_whitespace('x' as u32));
        assert!(is_unicode_punct('!' as u32));
        assert!(is_unicode_punct(0x2014)); // EM DASH
        assert!(is_unicode_punct(0x20ac)); // EURO SIGN (category Sc)
        assert!(!is_unicode_punct('x' as u32));
    }
}

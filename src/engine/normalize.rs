use icu_normalizer::DecomposingNormalizerBorrowed;

/// Canonical comparison form of a romanization or a keystroke buffer.
///
/// Lowercases, folds every diacritic (tone marks and the umlaut of `ü`) to its
/// base letter, then strips a single trailing tone digit `1`-`5`. Case, tone
/// marks and tone numbers never survive; only the syllable skeleton does.
///
/// The fold runs before the digit strip so that a digit followed by a stray
/// combining mark is handled the same way on every pass, which keeps the
/// function idempotent.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let mut folded = fold_marks(&lowered);
    strip_tone_digit(&mut folded);
    folded
}

fn fold_marks(s: &str) -> String {
    let nfd = DecomposingNormalizerBorrowed::new_nfd();
    let decomposed = nfd.normalize(s);
    decomposed.chars().filter(|&c| !is_combining_mark(c)).collect()
}

/// Only a lone trailing digit counts as a tone number; `"a12"` is left alone.
fn strip_tone_digit(s: &mut String) {
    let mut rev = s.chars().rev();
    let last = rev.next();
    let before = rev.next();
    if let Some(last) = last
        && is_tone_digit(last)
        && !before.is_some_and(is_tone_digit)
    {
        s.pop();
    }
}

fn is_tone_digit(c: char) -> bool {
    matches!(c, '1'..='5')
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

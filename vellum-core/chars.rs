#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  BlockBoundary,
  Word,
  Punctuation,
  Unknown,
}

pub fn categorize_char(ch: char) -> CharCategory {
  match ch {
    c if char_is_block_boundary(c) => CharCategory::BlockBoundary,
    c if char_is_whitespace(c) => CharCategory::Whitespace,
    c if char_is_word(c) => CharCategory::Word,
    c if char_is_punctuation(c) => CharCategory::Punctuation,
    _ => CharCategory::Unknown,
  }
}

/// Paragraph separator inside a flat document buffer.
///
/// The model normalizes all block breaks to `\n` on ingestion, so CR and
/// the unicode separators never appear between blocks.
#[inline]
pub fn char_is_block_boundary(ch: char) -> bool {
  ch == '\n'
}

#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
  match ch {
    '\u{0009}' | // Character Tabulation
    '\u{0020}' | // Space
    '\u{00A0}' | // No-break Space (common in prose; still a word separator for deletion)
    '\u{202F}' | // Narrow No-break Space
    '\u{205F}' | // Medium Mathematical Space
    '\u{3000}'   // Ideographic Space
    => true,

    // En Quad through Zero Width Space.
    ch if ('\u{2000}'..='\u{200B}').contains(&ch) => true,

    _ => false,
  }
}

#[inline]
pub fn char_is_punctuation(ch: char) -> bool {
  use unicode_general_category::{
    GeneralCategory,
    get_general_category,
  };

  matches!(
    get_general_category(ch),
    GeneralCategory::OtherPunctuation
      | GeneralCategory::OpenPunctuation
      | GeneralCategory::ClosePunctuation
      | GeneralCategory::InitialPunctuation
      | GeneralCategory::FinalPunctuation
      | GeneralCategory::ConnectorPunctuation
      | GeneralCategory::DashPunctuation
      | GeneralCategory::MathSymbol
      | GeneralCategory::CurrencySymbol
      | GeneralCategory::ModifierSymbol
  )
}

#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_'
}

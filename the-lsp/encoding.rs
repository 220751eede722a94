/// Unit servers count `character` offsets in, negotiated via
/// `general.positionEncodings`. UTF-16 when nothing was negotiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffsetEncoding {
  Utf8,
  #[default]
  Utf16,
  Utf32,
}

impl OffsetEncoding {
  pub fn from_lsp_name(name: &str) -> Option<Self> {
    match name {
      "utf-8" => Some(Self::Utf8),
      "utf-16" => Some(Self::Utf16),
      "utf-32" => Some(Self::Utf32),
      _ => None,
    }
  }

  fn width(self, ch: char) -> usize {
    match self {
      Self::Utf8 => ch.len_utf8(),
      Self::Utf16 => ch.len_utf16(),
      Self::Utf32 => 1,
    }
  }
}

/// Convert a server column into a char column of `line`. Offsets inside a
/// char round down, offsets past the end clamp to the line length.
pub fn to_char_column(line: &str, character: u32, encoding: OffsetEncoding) -> u32 {
  let target = character as usize;
  let mut units = 0usize;
  let mut column = 0u32;
  for ch in line.chars() {
    units += encoding.width(ch);
    if units > target {
      break;
    }
    column += 1;
  }
  column
}

/// Inverse of [`to_char_column`].
pub fn to_lsp_character(line: &str, column: u32, encoding: OffsetEncoding) -> u32 {
  let units: usize = line
    .chars()
    .take(column as usize)
    .map(|ch| encoding.width(ch))
    .sum();
  u32::try_from(units).unwrap_or(u32::MAX)
}

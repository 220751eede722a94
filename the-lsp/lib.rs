//! Language server adapters for the overlay: code lenses and document
//! highlights as [`the_overlay::AnnotationSource`]s.

mod encoding;
mod payload;
mod source;

pub use encoding::{
  OffsetEncoding,
  to_char_column,
  to_lsp_character,
};
pub use payload::{
  CodeLens,
  DocumentHighlight,
  LspPosition,
  LspRange,
  PayloadError,
  code_lens_params,
  code_lens_resolve_params,
  document_highlight_params,
  execute_command_params,
  parse_code_lens_resolve_response,
  parse_code_lens_response,
  parse_document_highlight_response,
};
pub use source::{
  CODE_LENS,
  CODE_LENS_RESOLVE,
  CodeLensSource,
  DOCUMENT_HIGHLIGHT,
  DocumentHighlightSource,
  DocumentLookup,
  EXECUTE_COMMAND,
  LspRequester,
  RequestError,
};

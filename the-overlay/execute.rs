use crate::{
  annotation::{
    Action,
    Annotation,
  },
  position::ProviderId,
};

/// An annotation that can be run from the cursor line.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
  pub provider: ProviderId,
  pub line:     u32,
  pub action:   Action,
}

impl Candidate {
  /// Text shown when several candidates share a line.
  pub fn label(&self) -> String {
    self.action.title.clone()
  }
}

/// Annotations anchored on `line` whose action has a command.
pub fn executable_at(entries: &[(ProviderId, Annotation)], line: u32) -> Vec<Candidate> {
  entries
    .iter()
    .filter(|(_, annotation)| annotation.line() == line)
    .filter_map(|(provider, annotation)| {
      annotation.executable_action().map(|action| {
        Candidate {
          provider: *provider,
          line,
          action: action.clone(),
        }
      })
    })
    .collect()
}

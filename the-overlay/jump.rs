//! Cursor movement between annotations (`]r` / `[r` style).

use crate::{
  annotation::Annotation,
  position::Position,
};

/// Target after moving `count` annotations forward (positive) or backward
/// (negative) from `cursor`. Stops at the last reachable annotation when
/// fewer than `|count|` remain; `None` when not even one step is possible.
///
/// `annotations` must be ordered by start position.
pub fn jump(annotations: &[Annotation], cursor: Position, count: i32) -> Option<Position> {
  let mut position = cursor;
  let mut moved = false;
  for _ in 0..count.unsigned_abs() {
    let next = if count > 0 {
      step_forward(annotations, position)
    } else {
      step_backward(annotations, position)
    };
    let Some(next) = next else {
      break;
    };
    position = next;
    moved = true;
  }
  moved.then_some(position)
}

fn step_forward(annotations: &[Annotation], cursor: Position) -> Option<Position> {
  let same_line = annotations
    .iter()
    .map(|annotation| annotation.range.start)
    .find(|start| start.line == cursor.line && start.character > cursor.character);
  same_line.or_else(|| {
    annotations
      .iter()
      .map(|annotation| annotation.range.start)
      .find(|start| start.line > cursor.line)
  })
}

fn step_backward(annotations: &[Annotation], cursor: Position) -> Option<Position> {
  let same_line = annotations
    .iter()
    .rev()
    .find(|annotation| {
      let range = annotation.range;
      range.start.line == cursor.line
        && range.end.line == cursor.line
        && range.end.character < cursor.character
    })
    .map(|annotation| annotation.range.start);
  same_line.or_else(|| {
    annotations
      .iter()
      .rev()
      .map(|annotation| annotation.range.start)
      .find(|start| start.line < cursor.line)
  })
}

//! Stateless presentation of one expression as a row of tags.

use ratatui::{style::Style, text::Span};

use crate::expression::{EditingPart, Expression};
use crate::theme::Theme;

/// What a click on a tag piece means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagHit {
    Label,
    Symbol,
    Value,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Label,
    Symbol,
    Value,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPiece {
    pub text: String,
    pub kind: TagKind,
    /// `None` for pieces that do not react to clicks
    pub hit: Option<TagHit>,
}

impl TagPiece {
    fn new(text: impl Into<String>, kind: TagKind, hit: Option<TagHit>) -> Self {
        Self { text: text.into(), kind, hit }
    }

    pub fn style(&self, theme: &Theme, readonly: bool) -> Style {
        if readonly {
            return theme.readonly_style();
        }
        match self.kind {
            TagKind::Label => theme.label_style(),
            TagKind::Symbol => theme.symbol_style(),
            TagKind::Value => theme.value_style(),
            TagKind::Remove => theme.remove_style(),
        }
    }

    pub fn span(&self, theme: &Theme, readonly: bool) -> Span<'static> {
        Span::styled(self.text.clone(), self.style(theme, readonly))
    }
}

/// Pieces for `expr`: label, symbol, then value and close marker.
///
/// Nothing is shown for a blank label. The value is hidden while it is the part
/// being edited. Readonly expressions produce no clickable pieces.
pub fn tag_pieces(expr: &Expression, part: EditingPart) -> Vec<TagPiece> {
    let mut pieces = Vec::new();
    if expr.lacks_label() {
        return pieces;
    }
    let editable = !expr.readonly;
    let clickable = |hit: TagHit| editable.then_some(hit);

    pieces.push(TagPiece::new(format!(" {} ", expr.label), TagKind::Label, clickable(TagHit::Label)));
    match expr.symbol {
        Some(symbol) => pieces.push(TagPiece::new(
            format!(" {symbol} ▾"),
            TagKind::Symbol,
            clickable(TagHit::Symbol),
        )),
        None => pieces.push(TagPiece::new(" = ", TagKind::Symbol, clickable(TagHit::Label))),
    }
    if part != EditingPart::FieldValue {
        for value in &expr.value {
            pieces.push(TagPiece::new(format!(" {} ", value.display()), TagKind::Value, clickable(TagHit::Value)));
        }
        if editable && !expr.value.is_empty() {
            pieces.push(TagPiece::new("× ", TagKind::Remove, Some(TagHit::Remove)));
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expression::Symbol;

    fn texts(pieces: &[TagPiece]) -> Vec<&str> {
        pieces.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_complete_expression_pieces() {
        let expr = Expression::new("Status", "status").with_value("Open", "open");
        let pieces = tag_pieces(&expr, EditingPart::None);
        assert_eq!(texts(&pieces), vec![" Status ", " = ", " Open ", "× "]);
        let hits: Vec<_> = pieces.iter().map(|p| p.hit).collect();
        assert_eq!(
            hits,
            vec![Some(TagHit::Label), Some(TagHit::Label), Some(TagHit::Value), Some(TagHit::Remove)]
        );
    }

    #[test]
    fn test_value_hidden_while_edited() {
        let expr = Expression::new("Status", "status").with_value("Open", "open");
        assert_eq!(texts(&tag_pieces(&expr, EditingPart::FieldValue)), vec![" Status ", " = "]);
    }

    #[test]
    fn test_blank_label_renders_nothing() {
        assert!(tag_pieces(&Expression::new(" ", "x"), EditingPart::FieldName).is_empty());
    }

    #[test]
    fn test_symbol_piece_cycles() {
        let expr = Expression::new("Priority", "priority").with_symbol(Symbol::Ne);
        let pieces = tag_pieces(&expr, EditingPart::FieldValue);
        assert_eq!(pieces[1].text, " != ▾");
        assert_eq!(pieces[1].hit, Some(TagHit::Symbol));
    }

    #[test]
    fn test_readonly_has_no_hits_and_no_close() {
        let expr = Expression::new("Project", "project").with_value("core", "core").readonly();
        let pieces = tag_pieces(&expr, EditingPart::None);
        assert_eq!(texts(&pieces), vec![" Project ", " = ", " core "]);
        assert!(pieces.iter().all(|p| p.hit.is_none()));
    }
}

//! YAML loader producing [`DocumentNode`] trees with source positions.

use std::collections::HashMap;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::{DocumentError, DocumentNode, NodeContent, ScalarStyle, Tag};

/// Parse a single YAML document into a node tree.
///
/// Anchors are resolved eagerly; aliases clone the anchored subtree.
pub fn parse_document(content: &str) -> Result<DocumentNode, DocumentError> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = DocumentBuilder::default();
    parser
        .load(&mut builder, false)
        .map_err(|e| DocumentError::Scan(e.to_string()))?;
    if let Some(error) = builder.error {
        return Err(error);
    }
    builder.root.ok_or(DocumentError::Empty)
}

/// A container node under construction
enum Frame {
    Sequence {
        items: Vec<DocumentNode>,
        anchor: usize,
        line: usize,
        column: usize,
    },
    Mapping {
        entries: Vec<(DocumentNode, DocumentNode)>,
        pending_key: Option<DocumentNode>,
        anchor: usize,
        line: usize,
        column: usize,
    },
}

#[derive(Default)]
struct DocumentBuilder {
    stack: Vec<Frame>,
    root: Option<DocumentNode>,
    /// Anchored subtrees, registered once complete. An alias to an anchor
    /// that is still on the stack cannot resolve, which rejects cycles.
    anchors: HashMap<usize, DocumentNode>,
    error: Option<DocumentError>,
}

impl DocumentBuilder {
    fn push_complete(&mut self, node: DocumentNode, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                None => *pending_key = Some(node),
                Some(key) => entries.push((key, node)),
            },
        }
    }
}

impl MarkedEventReceiver for DocumentBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        let line = marker.line();
        let column = marker.col() + 1;

        match event {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor, _tag) => {
                let style = match style {
                    TScalarStyle::Plain => ScalarStyle::Plain,
                    _ => ScalarStyle::Quoted,
                };
                let node = DocumentNode {
                    content: NodeContent::Scalar { value, style },
                    line,
                    column,
                    tag: Tag::None,
                };
                self.push_complete(node, anchor);
            }

            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(node) => {
                    let node = node.clone();
                    self.push_complete(node, 0);
                }
                None => {
                    self.error = Some(DocumentError::UnknownAlias { line, column });
                }
            },

            Event::SequenceStart(anchor, _tag) => {
                self.stack.push(Frame::Sequence {
                    items: Vec::new(),
                    anchor,
                    line,
                    column,
                });
            }

            Event::SequenceEnd => {
                if let Some(Frame::Sequence {
                    items,
                    anchor,
                    line,
                    column,
                }) = self.stack.pop()
                {
                    let node = DocumentNode {
                        content: NodeContent::Sequence(items),
                        line,
                        column,
                        tag: Tag::None,
                    };
                    self.push_complete(node, anchor);
                }
            }

            Event::MappingStart(anchor, _tag) => {
                self.stack.push(Frame::Mapping {
                    entries: Vec::new(),
                    pending_key: None,
                    anchor,
                    line,
                    column,
                });
            }

            Event::MappingEnd => {
                if let Some(Frame::Mapping {
                    entries,
                    anchor,
                    line,
                    column,
                    ..
                }) = self.stack.pop()
                {
                    let node = DocumentNode {
                        content: NodeContent::Mapping(entries),
                        line,
                        column,
                        tag: Tag::None,
                    };
                    self.push_complete(node, anchor);
                }
            }
        }
    }
}

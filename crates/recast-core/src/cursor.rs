/*!
# Cursor - Ancestor Chain and Pass-Scoped Messages

A `Cursor` is the context handed to every visit: an immutable chain of
frames from the current node up to the compilation unit, plus access to the
message channel of the traversal pass it belongs to.

## Design

- Frames are `Rc`-linked and shared between sibling cursors; descending
  pushes one frame and never touches the parent chain. Nodes themselves
  carry no parent pointers.
- Messages live in a `MessageBoard`, a side-map keyed by `PassId`. Each
  `TraversalPass` opens its own scope on the board and closes it when it
  finishes or is dropped, so a message can never be read by a later pass.
- After-visits (deferred work such as adding an import or formatting a
  class) are queued on the same scope and handed back by
  `TraversalPass::finish`.

The board is `Rc<RefCell<_>>` on purpose: a pass is single-threaded and
files are processed in parallel with one board each.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ast::{ClassDecl, Markers, NodeKind};

/// Identity of one traversal pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassId(Uuid);

impl PassId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Work queued during a pass and run once the pass completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfterVisit {
    /// Ensure the unit imports this fully-qualified type
    AddImport(String),
    /// Run the formatter over the named top-level class
    Format { class: String },
}

/// One entry of the ancestor chain
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub markers: Markers,
}

impl Frame {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            markers: Markers::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn class(class: &ClassDecl) -> Self {
        Self::new(NodeKind::Class)
            .named(class.name.clone())
            .with_markers(class.markers.clone())
    }
}

#[derive(Debug)]
struct PathNode {
    frame: Frame,
    parent: Option<Rc<PathNode>>,
}

#[derive(Debug, Default)]
struct PassScope {
    messages: HashMap<String, Value>,
    after_visits: Vec<AfterVisit>,
}

/// Message side-map shared by the passes run over one unit
#[derive(Debug, Clone, Default)]
pub struct MessageBoard {
    scopes: Rc<RefCell<HashMap<PassId, PassScope>>>,
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new pass with an empty message scope
    pub fn begin_pass(&self) -> TraversalPass {
        let id = PassId::new();
        self.scopes.borrow_mut().insert(id, PassScope::default());
        debug!(pass = %id, "Opened traversal pass");
        TraversalPass {
            id,
            board: self.clone(),
        }
    }

    /// Number of passes whose scope is still open
    pub fn open_passes(&self) -> usize {
        self.scopes.borrow().len()
    }

    fn close(&self, id: PassId) -> Option<PassScope> {
        self.scopes.borrow_mut().remove(&id)
    }

    fn with_scope<R>(&self, id: PassId, f: impl FnOnce(&mut PassScope) -> R) -> Option<R> {
        self.scopes.borrow_mut().get_mut(&id).map(f)
    }
}

/// One traversal over a unit; owns a scope on the board until finished
#[derive(Debug)]
pub struct TraversalPass {
    id: PassId,
    board: MessageBoard,
}

impl TraversalPass {
    pub fn id(&self) -> PassId {
        self.id
    }

    /// Root cursor with an empty ancestor chain
    pub fn cursor(&self) -> Cursor {
        Cursor {
            path: None,
            depth: 0,
            pass: self.id,
            board: self.board.clone(),
        }
    }

    /// Close the pass: drop leftover messages and return the queued after-visits
    pub fn finish(self) -> Vec<AfterVisit> {
        let Some(scope) = self.board.close(self.id) else {
            return Vec::new();
        };
        if !scope.messages.is_empty() {
            let keys: Vec<_> = scope.messages.keys().cloned().collect();
            debug!(pass = %self.id, ?keys, "Dropping unconsumed messages");
        }
        scope.after_visits
    }
}

impl Drop for TraversalPass {
    fn drop(&mut self) {
        // finish() already closed the scope; this covers early returns
        self.board.close(self.id);
    }
}

/// Visit context: ancestor chain plus the pass's message channel
#[derive(Debug, Clone)]
pub struct Cursor {
    path: Option<Rc<PathNode>>,
    depth: usize,
    pass: PassId,
    board: MessageBoard,
}

impl Cursor {
    /// Child cursor for a node below the current one
    pub fn descend(&self, frame: Frame) -> Cursor {
        Cursor {
            path: Some(Rc::new(PathNode {
                frame,
                parent: self.path.clone(),
            })),
            depth: self.depth + 1,
            pass: self.pass,
            board: self.board.clone(),
        }
    }

    /// Frame of the node this cursor points at
    pub fn frame(&self) -> Option<&Frame> {
        self.path.as_deref().map(|node| &node.frame)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pass_id(&self) -> PassId {
        self.pass
    }

    /// Frames from the current node up to the root
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: self.path.as_deref(),
        }
    }

    /// Closest frame of the given kind, the current frame included
    pub fn nearest(&self, kind: NodeKind) -> Option<&Frame> {
        self.ancestors().find(|frame| frame.kind == kind)
    }

    pub fn put_message(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let stored = self.board.with_scope(self.pass, |scope| {
            scope.messages.insert(key.clone(), value.into());
        });
        if stored.is_none() {
            warn!(pass = %self.pass, key = %key, "Message posted after its pass finished");
        }
    }

    /// Read a message without consuming it
    pub fn peek_message(&self, key: &str) -> Option<Value> {
        self.board
            .with_scope(self.pass, |scope| scope.messages.get(key).cloned())
            .flatten()
    }

    /// Read and remove a message
    pub fn poll_message(&self, key: &str) -> Option<Value> {
        self.board
            .with_scope(self.pass, |scope| scope.messages.remove(key))
            .flatten()
    }

    /// Queue deferred work; duplicates are ignored
    pub fn do_after_visit(&self, visit: AfterVisit) {
        let queued = self.board.with_scope(self.pass, |scope| {
            if !scope.after_visits.contains(&visit) {
                scope.after_visits.push(visit.clone());
            }
        });
        if queued.is_none() {
            warn!(pass = %self.pass, ?visit, "After-visit queued after its pass finished");
        }
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a PathNode>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(&node.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Marker;

    #[test]
    fn test_descend_builds_ancestor_chain() {
        let board = MessageBoard::new();
        let pass = board.begin_pass();
        let root = pass.cursor();

        let unit = root.descend(Frame::new(NodeKind::CompilationUnit));
        let class = unit.descend(Frame::new(NodeKind::Class).named("RandomUtil"));
        let method = class.descend(Frame::new(NodeKind::Method).named("generateString"));

        assert_eq!(method.depth(), 3);
        let kinds: Vec<_> = method.ancestors().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Method, NodeKind::Class, NodeKind::CompilationUnit]
        );
        assert_eq!(
            method.nearest(NodeKind::Class).and_then(|f| f.name.as_deref()),
            Some("RandomUtil")
        );

        // the parent chain is untouched by descending
        assert_eq!(class.depth(), 2);
        assert_eq!(class.frame().map(|f| f.kind), Some(NodeKind::Class));
        assert!(root.frame().is_none());
    }

    #[test]
    fn test_messages_cross_sibling_cursors() {
        let board = MessageBoard::new();
        let pass = board.begin_pass();
        let unit = pass.cursor().descend(Frame::new(NodeKind::CompilationUnit));

        let import = unit.descend(Frame::new(NodeKind::Import));
        import.put_message("COMMONS_LANG_2", true);

        let class = unit.descend(Frame::new(NodeKind::Class));
        assert_eq!(class.peek_message("COMMONS_LANG_2"), Some(Value::Bool(true)));
        assert_eq!(class.poll_message("COMMONS_LANG_2"), Some(Value::Bool(true)));
        assert_eq!(class.poll_message("COMMONS_LANG_2"), None);
    }

    #[test]
    fn test_messages_do_not_leak_between_passes() {
        let board = MessageBoard::new();

        let first = board.begin_pass();
        let stale = first.cursor();
        stale.put_message("key", "value");
        assert!(first.finish().is_empty());
        assert_eq!(board.open_passes(), 0);

        let second = board.begin_pass();
        assert_eq!(second.cursor().peek_message("key"), None);
        assert_ne!(second.id(), stale.pass_id());

        // a cursor from a finished pass cannot write anymore
        stale.put_message("key", "late");
        assert_eq!(second.cursor().peek_message("key"), None);
        assert_eq!(stale.peek_message("key"), None);
    }

    #[test]
    fn test_after_visits_are_deduplicated() {
        let board = MessageBoard::new();
        let pass = board.begin_pass();
        let cursor = pass.cursor();

        cursor.do_after_visit(AfterVisit::AddImport("java.security.SecureRandom".into()));
        cursor.do_after_visit(AfterVisit::AddImport("java.security.SecureRandom".into()));
        cursor.do_after_visit(AfterVisit::Format {
            class: "RandomUtil".into(),
        });

        let queued = pass.finish();
        assert_eq!(queued.len(), 2);
        assert_eq!(
            queued[0],
            AfterVisit::AddImport("java.security.SecureRandom".into())
        );
    }

    #[test]
    fn test_dropped_pass_closes_scope() {
        let board = MessageBoard::new();
        {
            let pass = board.begin_pass();
            pass.cursor().put_message("key", 1);
            assert_eq!(board.open_passes(), 1);
        }
        assert_eq!(board.open_passes(), 0);
    }

    #[test]
    fn test_class_frame_copies_markers() {
        let class = crate::ast::ClassDecl::new("RandomUtil").with_markers(
            Markers::default().add_if_absent(Marker::SearchResult {
                recipe: "FixCwe338".into(),
            }),
        );
        let frame = Frame::class(&class);
        assert_eq!(frame.name.as_deref(), Some("RandomUtil"));
        assert!(frame.markers.has_search_result("FixCwe338"));
    }
}

//! Declaration scopes.
//!
//! Scopes live in an arena and point at their parent by index. Scope 0 is
//! the global context, holding command, lookup and library action
//! declarations; every block, `for` loop and `OnCommand` handler gets a node
//! context chained to the one around it. Bindings for all scopes share one
//! vector in declaration order, and each scope lists the ids of its own, so
//! undoing a speculative parse is a truncation back to a [`ScopeMark`].

use serde::Serialize;

use crate::ast::BaseType;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BindingId(usize);

impl BindingId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ──────────────────────────────────────────────
// Bindings
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BindingKind {
    Command,
    Lookup,
    LibraryAction,
    Variable,
    ArrayVariable,
    InInterface,
    InOutInterface,
    NodeId,
}

impl BindingKind {
    /// Whether the binding names a value usable in expressions.
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            BindingKind::Variable
                | BindingKind::ArrayVariable
                | BindingKind::InInterface
                | BindingKind::InOutInterface
        )
    }

    /// Two bindings conflict when their kinds share a namespace.
    pub fn same_namespace(self, other: BindingKind) -> bool {
        self == other || (self.is_variable() && other.is_variable())
    }

    pub fn describe(self) -> &'static str {
        match self {
            BindingKind::Command => "command",
            BindingKind::Lookup => "lookup",
            BindingKind::LibraryAction => "library action",
            BindingKind::Variable | BindingKind::ArrayVariable => "variable",
            BindingKind::InInterface | BindingKind::InOutInterface => "interface variable",
            BindingKind::NodeId => "node",
        }
    }
}

/// The declared type of a variable, parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeclaredType {
    /// `None` for `Any`.
    pub base: Option<BaseType>,
    pub array: bool,
    pub array_size: Option<u64>,
}

impl DeclaredType {
    pub fn scalar(base: BaseType) -> Self {
        DeclaredType {
            base: Some(base),
            array: false,
            array_size: None,
        }
    }

    pub fn array_of(base: BaseType, size: Option<u64>) -> Self {
        DeclaredType {
            base: Some(base),
            array: true,
            array_size: size,
        }
    }

    pub fn any() -> Self {
        DeclaredType::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSignature {
    pub name: Option<String>,
    pub ty: DeclaredType,
    /// Library action `InOut` parameter.
    pub in_out: bool,
}

/// Parameter and return types of a command, lookup or library action.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Signature {
    pub parameters: Vec<ParameterSignature>,
    pub variadic: bool,
    pub returns: Option<DeclaredType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub scope: ScopeId,
    pub declared_type: Option<DeclaredType>,
    pub signature: Option<Signature>,
    pub span: Span,
}

impl Binding {
    /// A binding not yet placed in a scope; [`ScopeArena::declare`] sets it.
    pub fn new(name: impl Into<String>, kind: BindingKind, span: Span) -> Self {
        Binding {
            name: name.into(),
            kind,
            scope: ScopeId::GLOBAL,
            declared_type: None,
            signature: None,
            span,
        }
    }

    pub fn with_type(mut self, ty: DeclaredType) -> Self {
        self.declared_type = Some(ty);
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

// ──────────────────────────────────────────────
// Scopes
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeKind {
    Global,
    Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Label of the node this context belongs to, if it has one.
    pub name: Option<String>,
    #[serde(skip)]
    bindings: Vec<BindingId>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>, name: Option<String>) -> Self {
        Scope {
            kind,
            parent,
            name,
            bindings: Vec::new(),
        }
    }
}

/// Arena position to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMark {
    scopes: usize,
    bindings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        ScopeArena::new()
    }
}

impl ScopeArena {
    /// An arena holding only the global context.
    pub fn new() -> Self {
        ScopeArena {
            scopes: vec![Scope::new(ScopeKind::Global, None, None)],
            bindings: Vec::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::GLOBAL
    }

    pub fn push_child(&mut self, parent: ScopeId, name: Option<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes
            .push(Scope::new(ScopeKind::Node, Some(parent), name));
        id
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).and_then(|s| s.parent)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// `scope` followed by each enclosing scope out to the global context.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |s| self.parent(*s))
    }

    /// Record a binding in `scope`. Existing bindings are never replaced;
    /// duplicate checks are the caller's business.
    pub fn declare(&mut self, scope: ScopeId, mut binding: Binding) -> BindingId {
        binding.scope = scope;
        let id = BindingId(self.bindings.len());
        if let Some(s) = self.scopes.get_mut(scope.0) {
            s.bindings.push(id);
        }
        self.bindings.push(binding);
        id
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Bindings declared directly in `scope`, in declaration order.
    pub fn bindings_in(&self, scope: ScopeId) -> impl Iterator<Item = &Binding> + '_ {
        self.scope(scope)
            .map(|s| s.bindings.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.bindings.get(id.0))
    }

    /// First binding of `name` declared directly in `scope`.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.bindings_in(scope).find(|b| b.name == name)
    }

    /// Nearest binding of `name`, searching `scope` and then its ancestors.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.resolve_kind(scope, name, |_| true)
    }

    /// Like [`ScopeArena::resolve`], considering only bindings whose kind
    /// passes `filter`.
    pub fn resolve_kind(
        &self,
        scope: ScopeId,
        name: &str,
        filter: impl Fn(BindingKind) -> bool,
    ) -> Option<&Binding> {
        self.ancestors(scope).find_map(|s| {
            self.bindings_in(s)
                .find(|b| b.name == name && filter(b.kind))
        })
    }

    /// A variable of `name` visible from the scopes enclosing `scope`,
    /// not counting `scope` itself.
    pub fn find_inherited_variable(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        let parent = self.parent(scope)?;
        self.resolve_kind(parent, name, BindingKind::is_variable)
    }

    /// Whether a node reference to `name` from `scope` can be satisfied: the
    /// node itself, one of its children, or an ancestor or a child of one
    /// (which covers siblings).
    pub fn is_node_id_reachable(&self, scope: ScopeId, name: &str) -> bool {
        self.ancestors(scope).any(|s| {
            let own = self
                .scope(s)
                .and_then(|sc| sc.name.as_deref())
                .is_some_and(|n| n == name);
            own || self
                .bindings_in(s)
                .any(|b| b.kind == BindingKind::NodeId && b.name == name)
        })
    }

    pub fn mark(&self) -> ScopeMark {
        ScopeMark {
            scopes: self.scopes.len(),
            bindings: self.bindings.len(),
        }
    }

    /// Forget every scope and binding created since `mark`.
    pub fn rollback(&mut self, mark: ScopeMark) {
        if mark.bindings < self.bindings.len() {
            let removed = self.bindings.split_off(mark.bindings);
            // Newest first, so each pop takes the binding being removed.
            for binding in removed.iter().rev() {
                if let Some(s) = self.scopes.get_mut(binding.scope.0) {
                    s.bindings.pop();
                }
            }
        }
        self.scopes.truncate(mark.scopes.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Binding {
        Binding::new(name, BindingKind::Variable, Span::default())
            .with_type(DeclaredType::scalar(BaseType::Integer))
    }

    #[test]
    fn resolution_walks_outward_and_skips_siblings() {
        let mut arena = ScopeArena::new();
        let root = arena.push_child(arena.global(), None);
        let left = arena.push_child(root, Some("Left".into()));
        let right = arena.push_child(root, Some("Right".into()));
        let inner = arena.push_child(left, None);

        arena.declare(root, var("shared"));
        arena.declare(left, var("mine"));

        assert!(arena.resolve(inner, "shared").is_some());
        assert!(arena.resolve(inner, "mine").is_some());
        assert!(arena.resolve(right, "mine").is_none());
        assert!(arena.resolve(root, "mine").is_none());
    }

    #[test]
    fn first_declaration_wins_within_a_scope() {
        let mut arena = ScopeArena::new();
        let s = arena.push_child(arena.global(), None);
        let first = Binding::new("x", BindingKind::Variable, Span::new(0, 1, 1, 1));
        let second = Binding::new("x", BindingKind::Variable, Span::new(10, 11, 2, 1));
        arena.declare(s, first);
        arena.declare(s, second);
        assert_eq!(arena.resolve(s, "x").map(|b| b.span.line), Some(1));
        assert_eq!(arena.bindings_in(s).count(), 2);
    }

    #[test]
    fn rollback_discards_scopes_and_bindings() {
        let mut arena = ScopeArena::new();
        arena.declare(arena.global(), Binding::new("Cmd", BindingKind::Command, Span::default()));
        let mark = arena.mark();
        let s = arena.push_child(arena.global(), None);
        arena.declare(s, var("tmp"));
        arena.rollback(mark);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.bindings().len(), 1);
        assert!(arena.scope(s).is_none());
    }

    #[test]
    fn rollback_keeps_surviving_scopes_consistent() {
        let mut arena = ScopeArena::new();
        let outer = arena.push_child(arena.global(), None);
        arena.declare(outer, var("kept"));
        let mark = arena.mark();
        arena.declare(outer, var("dropped"));
        let inner = arena.push_child(outer, None);
        arena.declare(inner, var("gone"));
        arena.declare(arena.global(), Binding::new("Late", BindingKind::Command, Span::default()));
        arena.rollback(mark);

        let names: Vec<&str> = arena.bindings_in(outer).map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["kept"]);
        assert_eq!(arena.bindings_in(arena.global()).count(), 0);

        // Fresh declarations after a rollback land where they are declared.
        let again = arena.push_child(outer, None);
        arena.declare(again, var("fresh"));
        arena.declare(outer, var("later"));
        let names: Vec<&str> = arena.bindings_in(outer).map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["kept", "later"]);
        assert_eq!(arena.resolve(again, "fresh").map(|b| b.scope), Some(again));
        assert!(arena.resolve(again, "gone").is_none());
    }

    #[test]
    fn resolve_kind_filters_namespaces() {
        let mut arena = ScopeArena::new();
        let g = arena.global();
        arena.declare(g, Binding::new("Foo", BindingKind::Command, Span::default()));
        assert!(arena.resolve_kind(g, "Foo", BindingKind::is_variable).is_none());
        assert!(arena
            .resolve_kind(g, "Foo", |k| k == BindingKind::Command)
            .is_some());
    }

    #[test]
    fn node_ids_reachable_through_ancestors() {
        let mut arena = ScopeArena::new();
        let root = arena.push_child(arena.global(), Some("Root".into()));
        arena.declare(root, Binding::new("A", BindingKind::NodeId, Span::default()));
        arena.declare(root, Binding::new("B", BindingKind::NodeId, Span::default()));
        let a = arena.push_child(root, Some("A".into()));
        arena.declare(a, Binding::new("A1", BindingKind::NodeId, Span::default()));
        let a1 = arena.push_child(a, Some("A1".into()));

        assert!(arena.is_node_id_reachable(a1, "A1"));
        assert!(arena.is_node_id_reachable(a1, "B"));
        assert!(arena.is_node_id_reachable(a1, "Root"));
        assert!(!arena.is_node_id_reachable(root, "A1"));
    }

    #[test]
    fn inherited_variable_search_excludes_own_scope() {
        let mut arena = ScopeArena::new();
        let outer = arena.push_child(arena.global(), None);
        let inner = arena.push_child(outer, None);
        arena.declare(inner, var("x"));
        assert!(arena.find_inherited_variable(inner, "x").is_none());
        arena.declare(outer, var("x"));
        assert!(arena.find_inherited_variable(inner, "x").is_some());
    }
}

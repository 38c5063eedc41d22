//! Plan syntax tree.
//!
//! A tree of [`Node`]s, each with a [`NodeKind`], the token it was built
//! from (if any) and its children in source order. Nodes are immutable once
//! built; the parser assembles them with the builder functions
//! [`Node::leaf`], [`Node::node`], [`Node::promote`], [`Node::promote_as`]
//! and [`Node::error`].

use serde::Serialize;

use crate::token::{Span, Token, TokenKind};

// ──────────────────────────────────────────────
// Kind parameters
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseType {
    Boolean,
    Integer,
    Real,
    String,
    Date,
    Duration,
}

impl BaseType {
    pub fn from_token(kind: TokenKind) -> Option<BaseType> {
        Some(match kind {
            TokenKind::Boolean => BaseType::Boolean,
            TokenKind::Integer => BaseType::Integer,
            TokenKind::Real => BaseType::Real,
            TokenKind::String => BaseType::String,
            TokenKind::Date => BaseType::Date,
            TokenKind::Duration => BaseType::Duration,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockVariant {
    Plain,
    Sequence,
    UncheckedSequence,
    Concurrence,
    Try,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConditionKind {
    Start,
    Repeat,
    Skip,
    Pre,
    Post,
    Invariant,
    End,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceOptionKind {
    Name,
    LowerBound,
    UpperBound,
    ReleaseAtTermination,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Or,
    Xor,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOperator> {
        Some(match kind {
            TokenKind::Or => BinaryOperator::Or,
            TokenKind::Xor => BinaryOperator::Xor,
            TokenKind::And => BinaryOperator::And,
            TokenKind::DoubleEquals => BinaryOperator::Equal,
            TokenKind::NotEquals => BinaryOperator::NotEqual,
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::Leq => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::Geq => BinaryOperator::GreaterEqual,
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            TokenKind::Asterisk => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::Percent => BinaryOperator::Modulo,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeReferenceKind {
    SelfRef,
    Parent,
    Child,
    Sibling,
    /// A bare node id.
    Named,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeState {
    Inactive,
    Waiting,
    Executing,
    Finishing,
    Failing,
    IterationEnded,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeOutcome {
    Success,
    Failure,
    Skipped,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureType {
    PreConditionFailed,
    PostConditionFailed,
    InvariantConditionFailed,
    ParentFailed,
    ParentExited,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandHandle {
    Accepted,
    Denied,
    Failed,
    RcvdBySystem,
    SentToSystem,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimepointKind {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuiltinFunction {
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
    Trunc,
    RealToInt,
    Strlen,
    ArraySize,
    ArrayMaxSize,
    Max,
    Min,
    Mod,
}

impl BuiltinFunction {
    pub fn arity(self) -> usize {
        match self {
            BuiltinFunction::Max | BuiltinFunction::Min | BuiltinFunction::Mod => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeStatePredicateKind {
    Executing,
    Failed,
    Finished,
    Inactive,
    InvariantFailed,
    IterationEnded,
    IterationFailed,
    IterationSucceeded,
    ParentFailed,
    PostconditionFailed,
    PreconditionFailed,
    Skipped,
    Succeeded,
    Waiting,
}

// ──────────────────────────────────────────────
// Node kinds
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    // Declarations
    Plan,
    GlobalDeclarations,
    CommandDeclaration,
    LookupDeclaration,
    LibraryActionDeclaration,
    Parameters,
    Parameter,
    VariadicParameter,
    ArrayType,
    ReturnType,
    TypeName(BaseType),
    AnyType,

    // Plan structure
    Action,
    Block(BlockVariant),
    Comment,
    VariableDeclarations,
    VariableDeclaration,
    ArrayVariableDeclaration,
    In,
    InOut,
    Condition(ConditionKind),
    Priority,
    Resource,
    ResourceOption(ResourceOptionKind),

    // Statements
    Assignment,
    CommandInvocation,
    CommandWithAssignment,
    ArgumentList,
    LibraryCall,
    Aliases,
    Alias,
    Request,
    Update,
    Pair,
    SynchronousCommand,
    Timeout,
    Wait,
    For,
    If,
    ElseIf,
    Else,
    While,
    OnCommand,
    OnMessage,

    // Expressions
    Binary(BinaryOperator),
    Not,
    Negate,
    BooleanLiteral,
    IntegerLiteral,
    RealLiteral,
    StringLiteral,
    DateLiteral,
    DurationLiteral,
    ArrayLiteral,
    Variable,
    ArrayReference,
    Name,
    Lookup,
    LookupNow,
    LookupOnChange,
    Tolerance,
    NodeReference(NodeReferenceKind),
    NodeStateVariable,
    NodeOutcomeVariable,
    NodeFailureVariable,
    NodeCommandHandleVariable,
    NodeTimepointValue,
    NodeStateValue(NodeState),
    NodeOutcomeValue(NodeOutcome),
    NodeFailureValue(FailureType),
    CommandHandleValue(CommandHandle),
    Timepoint(TimepointKind),
    IsKnown,
    Function(BuiltinFunction),
    MessageReceived,
    NodeStatePredicate(NodeStatePredicateKind),

    /// A token with no dedicated node kind.
    Keyword(TokenKind),
    /// Stands in for a construct that failed to parse.
    Error,
}

impl NodeKind {
    /// The kind a token becomes when it is promoted to a node on its own.
    pub fn from_token(kind: TokenKind) -> NodeKind {
        use TokenKind as T;

        if let Some(base) = BaseType::from_token(kind) {
            return NodeKind::TypeName(base);
        }
        if let Some(op) = BinaryOperator::from_token(kind) {
            return NodeKind::Binary(op);
        }
        match kind {
            T::Ident => NodeKind::Name,
            T::Int => NodeKind::IntegerLiteral,
            T::Double => NodeKind::RealLiteral,
            T::Str => NodeKind::StringLiteral,
            T::True | T::False => NodeKind::BooleanLiteral,
            T::Any => NodeKind::AnyType,
            T::Ellipsis => NodeKind::VariadicParameter,
            T::HashParen => NodeKind::ArrayLiteral,
            T::Not => NodeKind::Not,

            T::Command => NodeKind::CommandDeclaration,
            T::LibraryAction => NodeKind::LibraryActionDeclaration,

            T::LBrace => NodeKind::Block(BlockVariant::Plain),
            T::Sequence => NodeKind::Block(BlockVariant::Sequence),
            T::UncheckedSequence => NodeKind::Block(BlockVariant::UncheckedSequence),
            T::Concurrence => NodeKind::Block(BlockVariant::Concurrence),
            T::Try => NodeKind::Block(BlockVariant::Try),
            T::Comment => NodeKind::Comment,
            T::In => NodeKind::In,
            T::InOut => NodeKind::InOut,
            T::Priority => NodeKind::Priority,
            T::Resource => NodeKind::Resource,
            T::Name => NodeKind::ResourceOption(ResourceOptionKind::Name),
            T::LowerBound => NodeKind::ResourceOption(ResourceOptionKind::LowerBound),
            T::UpperBound => NodeKind::ResourceOption(ResourceOptionKind::UpperBound),
            T::ReleaseAtTermination => {
                NodeKind::ResourceOption(ResourceOptionKind::ReleaseAtTermination)
            }
            T::StartCondition => NodeKind::Condition(ConditionKind::Start),
            T::RepeatCondition => NodeKind::Condition(ConditionKind::Repeat),
            T::SkipCondition => NodeKind::Condition(ConditionKind::Skip),
            T::PreCondition => NodeKind::Condition(ConditionKind::Pre),
            T::PostCondition => NodeKind::Condition(ConditionKind::Post),
            T::InvariantCondition => NodeKind::Condition(ConditionKind::Invariant),
            T::EndCondition => NodeKind::Condition(ConditionKind::End),
            T::ExitCondition => NodeKind::Condition(ConditionKind::Exit),

            T::For => NodeKind::For,
            T::If => NodeKind::If,
            T::ElseIf => NodeKind::ElseIf,
            T::Else => NodeKind::Else,
            T::While => NodeKind::While,
            T::OnCommand => NodeKind::OnCommand,
            T::OnMessage => NodeKind::OnMessage,
            T::LibraryCall => NodeKind::LibraryCall,
            T::Request => NodeKind::Request,
            T::Update => NodeKind::Update,
            T::SynchronousCommand => NodeKind::SynchronousCommand,
            T::Timeout => NodeKind::Timeout,
            T::Wait => NodeKind::Wait,

            T::IsKnown => NodeKind::IsKnown,
            T::Lookup => NodeKind::Lookup,
            T::LookupNow => NodeKind::LookupNow,
            T::LookupOnChange => NodeKind::LookupOnChange,
            T::MessageReceived => NodeKind::MessageReceived,
            T::Bar | T::Abs => NodeKind::Function(BuiltinFunction::Abs),
            T::Ceil => NodeKind::Function(BuiltinFunction::Ceil),
            T::Floor => NodeKind::Function(BuiltinFunction::Floor),
            T::Round => NodeKind::Function(BuiltinFunction::Round),
            T::Sqrt => NodeKind::Function(BuiltinFunction::Sqrt),
            T::Trunc => NodeKind::Function(BuiltinFunction::Trunc),
            T::RealToInt => NodeKind::Function(BuiltinFunction::RealToInt),
            T::Strlen => NodeKind::Function(BuiltinFunction::Strlen),
            T::ArraySize => NodeKind::Function(BuiltinFunction::ArraySize),
            T::ArrayMaxSize => NodeKind::Function(BuiltinFunction::ArrayMaxSize),
            T::Max => NodeKind::Function(BuiltinFunction::Max),
            T::Min => NodeKind::Function(BuiltinFunction::Min),
            T::Mod => NodeKind::Function(BuiltinFunction::Mod),

            T::SelfRef => NodeKind::NodeReference(NodeReferenceKind::SelfRef),
            T::Parent => NodeKind::NodeReference(NodeReferenceKind::Parent),
            T::Child => NodeKind::NodeReference(NodeReferenceKind::Child),
            T::Sibling => NodeKind::NodeReference(NodeReferenceKind::Sibling),
            T::State => NodeKind::NodeStateVariable,
            T::Outcome => NodeKind::NodeOutcomeVariable,
            T::Failure => NodeKind::NodeFailureVariable,
            T::CommandHandleVar => NodeKind::NodeCommandHandleVariable,
            T::StartTimepoint => NodeKind::Timepoint(TimepointKind::Start),
            T::EndTimepoint => NodeKind::Timepoint(TimepointKind::End),

            T::Inactive => NodeKind::NodeStateValue(NodeState::Inactive),
            T::Waiting => NodeKind::NodeStateValue(NodeState::Waiting),
            T::Executing => NodeKind::NodeStateValue(NodeState::Executing),
            T::Finishing => NodeKind::NodeStateValue(NodeState::Finishing),
            T::Failing => NodeKind::NodeStateValue(NodeState::Failing),
            T::IterationEnded => NodeKind::NodeStateValue(NodeState::IterationEnded),
            T::Finished => NodeKind::NodeStateValue(NodeState::Finished),

            T::SuccessOutcome => NodeKind::NodeOutcomeValue(NodeOutcome::Success),
            T::FailureOutcome => NodeKind::NodeOutcomeValue(NodeOutcome::Failure),
            T::SkippedOutcome => NodeKind::NodeOutcomeValue(NodeOutcome::Skipped),
            T::InterruptedOutcome => NodeKind::NodeOutcomeValue(NodeOutcome::Interrupted),

            T::PreConditionFailed => NodeKind::NodeFailureValue(FailureType::PreConditionFailed),
            T::PostConditionFailed => NodeKind::NodeFailureValue(FailureType::PostConditionFailed),
            T::InvariantConditionFailed => {
                NodeKind::NodeFailureValue(FailureType::InvariantConditionFailed)
            }
            T::ParentFailed => NodeKind::NodeFailureValue(FailureType::ParentFailed),
            T::ParentExited => NodeKind::NodeFailureValue(FailureType::ParentExited),
            T::Exited => NodeKind::NodeFailureValue(FailureType::Exited),

            T::CommandAccepted => NodeKind::CommandHandleValue(CommandHandle::Accepted),
            T::CommandDenied => NodeKind::CommandHandleValue(CommandHandle::Denied),
            T::CommandFailed => NodeKind::CommandHandleValue(CommandHandle::Failed),
            T::CommandRcvdBySystem => NodeKind::CommandHandleValue(CommandHandle::RcvdBySystem),
            T::CommandSentToSystem => NodeKind::CommandHandleValue(CommandHandle::SentToSystem),
            T::CommandSuccess => NodeKind::CommandHandleValue(CommandHandle::Success),

            T::NodeExecuting => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Executing),
            T::NodeFailed => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Failed),
            T::NodeFinished => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Finished),
            T::NodeInactive => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Inactive),
            T::NodeInvariantFailed => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::InvariantFailed)
            }
            T::NodeIterationEnded => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::IterationEnded)
            }
            T::NodeIterationFailed => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::IterationFailed)
            }
            T::NodeIterationSucceeded => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::IterationSucceeded)
            }
            T::NodeParentFailed => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::ParentFailed)
            }
            T::NodePostconditionFailed => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::PostconditionFailed)
            }
            T::NodePreconditionFailed => {
                NodeKind::NodeStatePredicate(NodeStatePredicateKind::PreconditionFailed)
            }
            T::NodeSkipped => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Skipped),
            T::NodeSucceeded => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Succeeded),
            T::NodeWaiting => NodeKind::NodeStatePredicate(NodeStatePredicateKind::Waiting),

            other => NodeKind::Keyword(other),
        }
    }

    /// Kinds whose token text is part of what the node means.
    fn carries_text(self) -> bool {
        matches!(
            self,
            NodeKind::Name
                | NodeKind::Variable
                | NodeKind::BooleanLiteral
                | NodeKind::IntegerLiteral
                | NodeKind::RealLiteral
                | NodeKind::StringLiteral
                | NodeKind::DateLiteral
                | NodeKind::DurationLiteral
                | NodeKind::NodeReference(NodeReferenceKind::Named)
                | NodeKind::Error
        )
    }
}

// ──────────────────────────────────────────────
// Nodes
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    kind: NodeKind,
    token: Option<Token>,
    children: Vec<Node>,
}

impl Node {
    // -- Builders -----------------------------------------------

    /// A childless node whose kind follows from the token.
    pub fn leaf(token: Token) -> Node {
        Node::promote(token, Vec::new())
    }

    /// A synthetic node with no originating token.
    pub fn node(kind: NodeKind, children: Vec<Node>) -> Node {
        Node {
            kind,
            token: None,
            children,
        }
    }

    /// The token becomes the root, with `children` attached beneath it.
    pub fn promote(token: Token, children: Vec<Node>) -> Node {
        Node {
            kind: NodeKind::from_token(token.kind),
            token: Some(token),
            children,
        }
    }

    /// Like [`Node::promote`], with the kind chosen by context rather than
    /// by the token (`-` as `Negate`, an identifier as `Variable`).
    pub fn promote_as(kind: NodeKind, token: Token, children: Vec<Node>) -> Node {
        Node {
            kind,
            token: Some(token),
            children,
        }
    }

    /// Placeholder for a construct that could not be parsed; `token` is
    /// where the failure was detected.
    pub fn error(token: Token) -> Node {
        Node {
            kind: NodeKind::Error,
            token: Some(token),
            children: Vec::new(),
        }
    }

    // -- Accessors ----------------------------------------------

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.text.as_str())
    }

    pub fn span(&self) -> Option<Span> {
        self.token.as_ref().map(|t| t.span)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn is_error(&self) -> bool {
        self.kind == NodeKind::Error
    }

    /// Whether this node or any descendant is an error placeholder.
    pub fn contains_error(&self) -> bool {
        self.walk().any(Node::is_error)
    }

    /// Value of an integer literal in decimal, `0x`, `0o` or `0b` form.
    pub fn integer_value(&self) -> Option<i64> {
        if self.kind != NodeKind::IntegerLiteral {
            return None;
        }
        parse_integer(self.text()?)
    }

    /// Value of a numeric literal as a real.
    pub fn real_value(&self) -> Option<f64> {
        match self.kind {
            NodeKind::RealLiteral => self.text()?.parse().ok(),
            NodeKind::IntegerLiteral => self.integer_value().map(|v| v as f64),
            _ => None,
        }
    }

    /// Pre-order traversal, starting with `self`.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    // -- Views --------------------------------------------------

    /// Compact structural dump: `(Kind child ...)`, with `Kind:text` for
    /// names, variables and literals.
    pub fn to_sexpr(&self) -> String {
        let mut out = String::new();
        self.write_sexpr(&mut out);
        out
    }

    fn write_sexpr(&self, out: &mut String) {
        if !self.children.is_empty() {
            out.push('(');
        }
        out.push_str(&format!("{:?}", self.kind));
        if self.kind.carries_text() {
            if let Some(token) = &self.token {
                out.push(':');
                if self.kind == NodeKind::StringLiteral {
                    out.push_str(&format!("{:?}", token.text));
                } else {
                    out.push_str(&token.text);
                }
            }
        }
        for child in &self.children {
            out.push(' ');
            child.write_sexpr(out);
        }
        if !self.children.is_empty() {
            out.push(')');
        }
    }

    /// JSON view: every node has `kind`, `text`, `line`, `column` and
    /// `children`, with `null` where a node has no token.
    pub fn to_json_value(&self) -> serde_json::Value {
        let children: Vec<serde_json::Value> =
            self.children.iter().map(Node::to_json_value).collect();
        serde_json::json!({
            "kind":     format!("{:?}", self.kind),
            "text":     self.text(),
            "line":     self.token.as_ref().map(|t| t.span.line),
            "column":   self.token.as_ref().map(|t| t.span.column),
            "children": children,
        })
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let lower = digits.get(..2).map(str::to_ascii_lowercase);
    let (radix, body) = match lower.as_deref() {
        Some("0x") => (16, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        _ => (10, digits),
    };
    let magnitude = i64::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Iterator returned by [`Node::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

//! Token kinds, tokens and token sets shared by the lexer and the parser.

use serde::Serialize;
use std::fmt;

// ──────────────────────────────────────────────
// Source positions
// ──────────────────────────────────────────────

/// Byte range of a token in the source, plus the 1-based line and column
/// of its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Zero-width span at the start of `self`.
    pub fn empty_at(self) -> Self {
        Span {
            end: self.start,
            ..self
        }
    }

    /// Span covering `self` through `other`.
    pub fn to(self, other: Span) -> Self {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

// ──────────────────────────────────────────────
// Token kinds
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenKind {
    // Literals and names
    Ident,
    Int,
    Double,
    Str,
    Eof,

    // Punctuation and operators
    Asterisk,
    Bar,
    Colon,
    Comma,
    DoubleEquals,
    Ellipsis,
    Equals,
    Geq,
    Greater,
    HashParen,
    LBrace,
    LBracket,
    Leq,
    Less,
    LParen,
    NotEquals,
    Percent,
    Period,
    Plus,
    Minus,
    RBrace,
    RBracket,
    RParen,
    Semicolon,
    Slash,
    And,
    Or,
    Not,
    Xor,

    // Types
    Any,
    Boolean,
    Integer,
    Real,
    String,
    Date,
    Duration,

    // Declarations
    Command,
    Lookup,
    LibraryAction,
    Returns,

    // Block structure and attributes
    Sequence,
    UncheckedSequence,
    Concurrence,
    Try,
    Comment,
    In,
    InOut,
    Priority,
    Resource,
    Name,
    LowerBound,
    UpperBound,
    ReleaseAtTermination,
    StartCondition,
    RepeatCondition,
    SkipCondition,
    PreCondition,
    PostCondition,
    InvariantCondition,
    EndCondition,
    ExitCondition,

    // Statements
    For,
    If,
    ElseIf,
    Else,
    EndIf,
    While,
    OnCommand,
    OnMessage,
    LibraryCall,
    Request,
    Update,
    SynchronousCommand,
    Timeout,
    Wait,

    // Expression keywords
    True,
    False,
    IsKnown,
    LookupNow,
    LookupOnChange,
    MessageReceived,
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

    // Node references and node variables
    SelfRef,
    Parent,
    Child,
    Sibling,
    State,
    Outcome,
    Failure,
    CommandHandleVar,
    StartTimepoint,
    EndTimepoint,

    // Node states
    Inactive,
    Waiting,
    Executing,
    Finishing,
    Failing,
    IterationEnded,
    Finished,

    // Outcomes
    SuccessOutcome,
    FailureOutcome,
    SkippedOutcome,
    InterruptedOutcome,

    // Failure types
    PreConditionFailed,
    PostConditionFailed,
    InvariantConditionFailed,
    ParentFailed,
    ParentExited,
    Exited,

    // Command handles
    CommandAccepted,
    CommandDenied,
    CommandFailed,
    CommandRcvdBySystem,
    CommandSentToSystem,
    CommandSuccess,

    // Node state predicates
    NodeExecuting,
    NodeFailed,
    NodeFinished,
    NodeInactive,
    NodeInvariantFailed,
    NodeIterationEnded,
    NodeIterationFailed,
    NodeIterationSucceeded,
    NodeParentFailed,
    NodePostconditionFailed,
    NodePreconditionFailed,
    NodeSkipped,
    NodeSucceeded,
    NodeWaiting,
}

impl TokenKind {
    /// Map an identifier-shaped word to its keyword, if it is reserved.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "XOR" => TokenKind::Xor,

            "Any" => TokenKind::Any,
            "Boolean" => TokenKind::Boolean,
            "Integer" => TokenKind::Integer,
            "Real" => TokenKind::Real,
            "String" => TokenKind::String,
            "Date" => TokenKind::Date,
            "Duration" => TokenKind::Duration,

            "Command" => TokenKind::Command,
            "Lookup" => TokenKind::Lookup,
            "LibraryAction" => TokenKind::LibraryAction,
            "Returns" => TokenKind::Returns,

            "Sequence" => TokenKind::Sequence,
            "UncheckedSequence" => TokenKind::UncheckedSequence,
            "Concurrence" => TokenKind::Concurrence,
            "Try" => TokenKind::Try,
            "Comment" => TokenKind::Comment,
            "In" => TokenKind::In,
            "InOut" => TokenKind::InOut,
            "Priority" => TokenKind::Priority,
            "Resource" => TokenKind::Resource,
            "Name" => TokenKind::Name,
            "LowerBound" => TokenKind::LowerBound,
            "UpperBound" => TokenKind::UpperBound,
            "ReleaseAtTermination" => TokenKind::ReleaseAtTermination,
            "StartCondition" | "Start" => TokenKind::StartCondition,
            "RepeatCondition" | "Repeat" => TokenKind::RepeatCondition,
            "SkipCondition" | "Skip" => TokenKind::SkipCondition,
            "PreCondition" | "Pre" => TokenKind::PreCondition,
            "PostCondition" | "Post" => TokenKind::PostCondition,
            "InvariantCondition" | "Invariant" => TokenKind::InvariantCondition,
            "EndCondition" | "End" => TokenKind::EndCondition,
            "ExitCondition" | "Exit" => TokenKind::ExitCondition,

            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "elseif" => TokenKind::ElseIf,
            "else" => TokenKind::Else,
            "endif" => TokenKind::EndIf,
            "while" => TokenKind::While,
            "OnCommand" => TokenKind::OnCommand,
            "OnMessage" => TokenKind::OnMessage,
            "LibraryCall" => TokenKind::LibraryCall,
            "Request" => TokenKind::Request,
            "Update" => TokenKind::Update,
            "SynchronousCommand" => TokenKind::SynchronousCommand,
            "Timeout" => TokenKind::Timeout,
            "Wait" => TokenKind::Wait,

            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "isKnown" => TokenKind::IsKnown,
            "LookupNow" => TokenKind::LookupNow,
            "LookupOnChange" => TokenKind::LookupOnChange,
            "MessageReceived" => TokenKind::MessageReceived,
            "abs" => TokenKind::Abs,
            "ceil" => TokenKind::Ceil,
            "floor" => TokenKind::Floor,
            "round" => TokenKind::Round,
            "sqrt" => TokenKind::Sqrt,
            "trunc" => TokenKind::Trunc,
            "real_to_int" => TokenKind::RealToInt,
            "strlen" => TokenKind::Strlen,
            "arraySize" => TokenKind::ArraySize,
            "arrayMaxSize" => TokenKind::ArrayMaxSize,
            "max" => TokenKind::Max,
            "min" => TokenKind::Min,
            "mod" => TokenKind::Mod,

            "Self" => TokenKind::SelfRef,
            "Parent" => TokenKind::Parent,
            "Child" => TokenKind::Child,
            "Sibling" => TokenKind::Sibling,
            "state" => TokenKind::State,
            "outcome" => TokenKind::Outcome,
            "failure" => TokenKind::Failure,
            "command_handle" => TokenKind::CommandHandleVar,
            "START" => TokenKind::StartTimepoint,
            "END" => TokenKind::EndTimepoint,

            "INACTIVE" => TokenKind::Inactive,
            "WAITING" => TokenKind::Waiting,
            "EXECUTING" => TokenKind::Executing,
            "FINISHING" => TokenKind::Finishing,
            "FAILING" => TokenKind::Failing,
            "ITERATION_ENDED" => TokenKind::IterationEnded,
            "FINISHED" => TokenKind::Finished,

            "SUCCESS" => TokenKind::SuccessOutcome,
            "FAILURE" => TokenKind::FailureOutcome,
            "SKIPPED" => TokenKind::SkippedOutcome,
            "INTERRUPTED" => TokenKind::InterruptedOutcome,

            "PRE_CONDITION_FAILED" => TokenKind::PreConditionFailed,
            "POST_CONDITION_FAILED" => TokenKind::PostConditionFailed,
            "INVARIANT_CONDITION_FAILED" => TokenKind::InvariantConditionFailed,
            "PARENT_FAILED" => TokenKind::ParentFailed,
            "PARENT_EXITED" => TokenKind::ParentExited,
            "EXITED" => TokenKind::Exited,

            "COMMAND_ACCEPTED" => TokenKind::CommandAccepted,
            "COMMAND_DENIED" => TokenKind::CommandDenied,
            "COMMAND_FAILED" => TokenKind::CommandFailed,
            "COMMAND_RCVD_BY_SYSTEM" => TokenKind::CommandRcvdBySystem,
            "COMMAND_SENT_TO_SYSTEM" => TokenKind::CommandSentToSystem,
            "COMMAND_SUCCESS" => TokenKind::CommandSuccess,

            "NodeExecuting" => TokenKind::NodeExecuting,
            "NodeFailed" => TokenKind::NodeFailed,
            "NodeFinished" => TokenKind::NodeFinished,
            "NodeInactive" => TokenKind::NodeInactive,
            "NodeInvariantFailed" => TokenKind::NodeInvariantFailed,
            "NodeIterationEnded" => TokenKind::NodeIterationEnded,
            "NodeIterationFailed" => TokenKind::NodeIterationFailed,
            "NodeIterationSucceeded" => TokenKind::NodeIterationSucceeded,
            "NodeParentFailed" => TokenKind::NodeParentFailed,
            "NodePostconditionFailed" => TokenKind::NodePostconditionFailed,
            "NodePreconditionFailed" => TokenKind::NodePreconditionFailed,
            "NodeSkipped" => TokenKind::NodeSkipped,
            "NodeSucceeded" => TokenKind::NodeSucceeded,
            "NodeWaiting" => TokenKind::NodeWaiting,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical spelling of fixed-lexeme tokens. `None` for literal classes.
    pub fn lexeme(self) -> Option<&'static str> {
        let s = match self {
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Double
            | TokenKind::Str
            | TokenKind::Eof => return None,

            TokenKind::Asterisk => "*",
            TokenKind::Bar => "|",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::DoubleEquals => "==",
            TokenKind::Ellipsis => "...",
            TokenKind::Equals => "=",
            TokenKind::Geq => ">=",
            TokenKind::Greater => ">",
            TokenKind::HashParen => "#(",
            TokenKind::LBrace => "{",
            TokenKind::LBracket => "[",
            TokenKind::Leq => "<=",
            TokenKind::Less => "<",
            TokenKind::LParen => "(",
            TokenKind::NotEquals => "!=",
            TokenKind::Percent => "%",
            TokenKind::Period => ".",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::RBrace => "}",
            TokenKind::RBracket => "]",
            TokenKind::RParen => ")",
            TokenKind::Semicolon => ";",
            TokenKind::Slash => "/",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Xor => "XOR",

            TokenKind::Any => "Any",
            TokenKind::Boolean => "Boolean",
            TokenKind::Integer => "Integer",
            TokenKind::Real => "Real",
            TokenKind::String => "String",
            TokenKind::Date => "Date",
            TokenKind::Duration => "Duration",

            TokenKind::Command => "Command",
            TokenKind::Lookup => "Lookup",
            TokenKind::LibraryAction => "LibraryAction",
            TokenKind::Returns => "Returns",

            TokenKind::Sequence => "Sequence",
            TokenKind::UncheckedSequence => "UncheckedSequence",
            TokenKind::Concurrence => "Concurrence",
            TokenKind::Try => "Try",
            TokenKind::Comment => "Comment",
            TokenKind::In => "In",
            TokenKind::InOut => "InOut",
            TokenKind::Priority => "Priority",
            TokenKind::Resource => "Resource",
            TokenKind::Name => "Name",
            TokenKind::LowerBound => "LowerBound",
            TokenKind::UpperBound => "UpperBound",
            TokenKind::ReleaseAtTermination => "ReleaseAtTermination",
            TokenKind::StartCondition => "StartCondition",
            TokenKind::RepeatCondition => "RepeatCondition",
            TokenKind::SkipCondition => "SkipCondition",
            TokenKind::PreCondition => "PreCondition",
            TokenKind::PostCondition => "PostCondition",
            TokenKind::InvariantCondition => "InvariantCondition",
            TokenKind::EndCondition => "EndCondition",
            TokenKind::ExitCondition => "ExitCondition",

            TokenKind::For => "for",
            TokenKind::If => "if",
            TokenKind::ElseIf => "elseif",
            TokenKind::Else => "else",
            TokenKind::EndIf => "endif",
            TokenKind::While => "while",
            TokenKind::OnCommand => "OnCommand",
            TokenKind::OnMessage => "OnMessage",
            TokenKind::LibraryCall => "LibraryCall",
            TokenKind::Request => "Request",
            TokenKind::Update => "Update",
            TokenKind::SynchronousCommand => "SynchronousCommand",
            TokenKind::Timeout => "Timeout",
            TokenKind::Wait => "Wait",

            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::IsKnown => "isKnown",
            TokenKind::LookupNow => "LookupNow",
            TokenKind::LookupOnChange => "LookupOnChange",
            TokenKind::MessageReceived => "MessageReceived",
            TokenKind::Abs => "abs",
            TokenKind::Ceil => "ceil",
            TokenKind::Floor => "floor",
            TokenKind::Round => "round",
            TokenKind::Sqrt => "sqrt",
            TokenKind::Trunc => "trunc",
            TokenKind::RealToInt => "real_to_int",
            TokenKind::Strlen => "strlen",
            TokenKind::ArraySize => "arraySize",
            TokenKind::ArrayMaxSize => "arrayMaxSize",
            TokenKind::Max => "max",
            TokenKind::Min => "min",
            TokenKind::Mod => "mod",

            TokenKind::SelfRef => "Self",
            TokenKind::Parent => "Parent",
            TokenKind::Child => "Child",
            TokenKind::Sibling => "Sibling",
            TokenKind::State => "state",
            TokenKind::Outcome => "outcome",
            TokenKind::Failure => "failure",
            TokenKind::CommandHandleVar => "command_handle",
            TokenKind::StartTimepoint => "START",
            TokenKind::EndTimepoint => "END",

            TokenKind::Inactive => "INACTIVE",
            TokenKind::Waiting => "WAITING",
            TokenKind::Executing => "EXECUTING",
            TokenKind::Finishing => "FINISHING",
            TokenKind::Failing => "FAILING",
            TokenKind::IterationEnded => "ITERATION_ENDED",
            TokenKind::Finished => "FINISHED",

            TokenKind::SuccessOutcome => "SUCCESS",
            TokenKind::FailureOutcome => "FAILURE",
            TokenKind::SkippedOutcome => "SKIPPED",
            TokenKind::InterruptedOutcome => "INTERRUPTED",

            TokenKind::PreConditionFailed => "PRE_CONDITION_FAILED",
            TokenKind::PostConditionFailed => "POST_CONDITION_FAILED",
            TokenKind::InvariantConditionFailed => "INVARIANT_CONDITION_FAILED",
            TokenKind::ParentFailed => "PARENT_FAILED",
            TokenKind::ParentExited => "PARENT_EXITED",
            TokenKind::Exited => "EXITED",

            TokenKind::CommandAccepted => "COMMAND_ACCEPTED",
            TokenKind::CommandDenied => "COMMAND_DENIED",
            TokenKind::CommandFailed => "COMMAND_FAILED",
            TokenKind::CommandRcvdBySystem => "COMMAND_RCVD_BY_SYSTEM",
            TokenKind::CommandSentToSystem => "COMMAND_SENT_TO_SYSTEM",
            TokenKind::CommandSuccess => "COMMAND_SUCCESS",

            TokenKind::NodeExecuting => "NodeExecuting",
            TokenKind::NodeFailed => "NodeFailed",
            TokenKind::NodeFinished => "NodeFinished",
            TokenKind::NodeInactive => "NodeInactive",
            TokenKind::NodeInvariantFailed => "NodeInvariantFailed",
            TokenKind::NodeIterationEnded => "NodeIterationEnded",
            TokenKind::NodeIterationFailed => "NodeIterationFailed",
            TokenKind::NodeIterationSucceeded => "NodeIterationSucceeded",
            TokenKind::NodeParentFailed => "NodeParentFailed",
            TokenKind::NodePostconditionFailed => "NodePostconditionFailed",
            TokenKind::NodePreconditionFailed => "NodePreconditionFailed",
            TokenKind::NodeSkipped => "NodeSkipped",
            TokenKind::NodeSucceeded => "NodeSucceeded",
            TokenKind::NodeWaiting => "NodeWaiting",
        };
        Some(s)
    }

    /// How the token is named in "expecting ..." messages.
    pub fn describe(self) -> String {
        match self {
            TokenKind::Ident => "identifier".to_owned(),
            TokenKind::Int => "integer literal".to_owned(),
            TokenKind::Double => "real literal".to_owned(),
            TokenKind::Str => "string literal".to_owned(),
            TokenKind::Eof => "<EOF>".to_owned(),
            other => format!("'{}'", other.lexeme().unwrap_or("?")),
        }
    }

    fn bit(self) -> (usize, u64) {
        let index = self as usize;
        (index / 64, 1u64 << (index % 64))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

// ──────────────────────────────────────────────
// Tokens
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source lexeme; decoded contents for string literals.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }

    /// A token conjured by single-token insertion during error recovery.
    pub fn missing(kind: TokenKind, at: Span) -> Self {
        Token {
            kind,
            text: format!("<missing {}>", kind.describe()),
            span: at.empty_at(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.text.starts_with("<missing ") && self.span.start == self.span.end
    }

    /// How the token is quoted in diagnostics: `'x'` or `'<EOF>'`.
    pub fn error_display(&self) -> String {
        match self.kind {
            TokenKind::Eof => "'<EOF>'".to_owned(),
            TokenKind::Str => format!("'\"{}\"'", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

// ──────────────────────────────────────────────
// Token sets
// ──────────────────────────────────────────────

/// A set of token kinds, used for lookahead decisions and follow sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSet([u64; 3]);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet([0; 3]);

    pub const fn of(kinds: &[TokenKind]) -> TokenSet {
        let mut bits = [0u64; 3];
        let mut i = 0;
        while i < kinds.len() {
            let index = kinds[i] as usize;
            bits[index / 64] |= 1u64 << (index % 64);
            i += 1;
        }
        TokenSet(bits)
    }

    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet([
            self.0[0] | other.0[0],
            self.0[1] | other.0[1],
            self.0[2] | other.0[2],
        ])
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        let (word, mask) = kind.bit();
        self.0[word] & mask != 0
    }
}

/// Token sets the grammar refers to by name.
pub mod sets {
    use super::{TokenKind as K, TokenSet};

    pub const TYPE_NAMES: TokenSet = TokenSet::of(&[
        K::Boolean,
        K::Integer,
        K::Real,
        K::String,
        K::Date,
        K::Duration,
    ]);

    pub const BLOCK_VARIANTS: TokenSet = TokenSet::of(&[
        K::Sequence,
        K::UncheckedSequence,
        K::Concurrence,
        K::Try,
    ]);

    pub const CONDITIONS: TokenSet = TokenSet::of(&[
        K::StartCondition,
        K::RepeatCondition,
        K::SkipCondition,
        K::PreCondition,
        K::PostCondition,
        K::InvariantCondition,
        K::EndCondition,
        K::ExitCondition,
    ]);

    pub const ATTRIBUTE_START: TokenSet =
        CONDITIONS.union(TokenSet::of(&[K::Priority, K::Resource]));

    pub const INTERFACE_DIRECTIONS: TokenSet = TokenSet::of(&[K::In, K::InOut]);

    pub const NODE_DECLARATION_START: TokenSet = TYPE_NAMES.union(INTERFACE_DIRECTIONS);

    pub const RESOURCE_OPTIONS: TokenSet = TokenSet::of(&[
        K::Name,
        K::LowerBound,
        K::UpperBound,
        K::ReleaseAtTermination,
        K::Priority,
    ]);

    pub const ACTION_START: TokenSet = BLOCK_VARIANTS.union(TokenSet::of(&[
        K::Ident,
        K::LParen,
        K::LBrace,
        K::For,
        K::If,
        K::OnCommand,
        K::OnMessage,
        K::While,
        K::LibraryCall,
        K::Request,
        K::Update,
        K::SynchronousCommand,
        K::Wait,
    ]));

    /// What may follow any action: another action, the end of the
    /// enclosing block, an `if` continuation, or the end of the plan.
    pub const ACTION_FOLLOW: TokenSet = ACTION_START.union(TokenSet::of(&[
        K::RBrace,
        K::ElseIf,
        K::Else,
        K::EndIf,
        K::Eof,
    ]));

    /// What may follow a declaration or attribute inside a block.
    pub const BLOCK_ITEM_FOLLOW: TokenSet = NODE_DECLARATION_START
        .union(ATTRIBUTE_START)
        .union(ACTION_FOLLOW)
        .union(TokenSet::of(&[K::Comment]));

    pub const GLOBAL_DECLARATION_FOLLOW: TokenSet = BLOCK_ITEM_FOLLOW.union(TokenSet::of(&[
        K::Command,
        K::Lookup,
        K::LibraryAction,
    ]));

    pub const NODE_STATES: TokenSet = TokenSet::of(&[
        K::Inactive,
        K::Waiting,
        K::Executing,
        K::Finishing,
        K::Failing,
        K::IterationEnded,
        K::Finished,
    ]);

    pub const OUTCOMES: TokenSet = TokenSet::of(&[
        K::SuccessOutcome,
        K::FailureOutcome,
        K::SkippedOutcome,
        K::InterruptedOutcome,
    ]);

    pub const FAILURE_TYPES: TokenSet = TokenSet::of(&[
        K::PreConditionFailed,
        K::PostConditionFailed,
        K::InvariantConditionFailed,
        K::ParentFailed,
        K::ParentExited,
        K::Exited,
    ]);

    pub const COMMAND_HANDLES: TokenSet = TokenSet::of(&[
        K::CommandAccepted,
        K::CommandDenied,
        K::CommandFailed,
        K::CommandRcvdBySystem,
        K::CommandSentToSystem,
        K::CommandSuccess,
    ]);

    pub const NODE_STATE_PREDICATES: TokenSet = TokenSet::of(&[
        K::NodeExecuting,
        K::NodeFailed,
        K::NodeFinished,
        K::NodeInactive,
        K::NodeInvariantFailed,
        K::NodeIterationEnded,
        K::NodeIterationFailed,
        K::NodeIterationSucceeded,
        K::NodeParentFailed,
        K::NodePostconditionFailed,
        K::NodePreconditionFailed,
        K::NodeSkipped,
        K::NodeSucceeded,
        K::NodeWaiting,
    ]);

    pub const ONE_ARG_FUNCTIONS: TokenSet = TokenSet::of(&[
        K::Abs,
        K::Ceil,
        K::Floor,
        K::Round,
        K::Sqrt,
        K::Trunc,
        K::RealToInt,
        K::Strlen,
        K::ArraySize,
        K::ArrayMaxSize,
    ]);

    pub const TWO_ARG_FUNCTIONS: TokenSet = TokenSet::of(&[K::Max, K::Min, K::Mod]);

    pub const NODE_REFERENCE_START: TokenSet =
        TokenSet::of(&[K::SelfRef, K::Parent, K::Child, K::Sibling]);

    pub const LITERAL_START: TokenSet = TokenSet::of(&[
        K::True,
        K::False,
        K::Int,
        K::Double,
        K::Str,
        K::Minus,
    ]);
}

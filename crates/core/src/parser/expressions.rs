use super::{PResult, Parser, Reference};
use crate::ast::{Node, NodeKind, NodeReferenceKind};
use crate::token::{sets, Token, TokenKind, TokenSet};

const OR: TokenSet = TokenSet::of(&[TokenKind::Or]);
const XOR: TokenSet = TokenSet::of(&[TokenKind::Xor]);
const AND: TokenSet = TokenSet::of(&[TokenKind::And]);
const EQUALITY: TokenSet = TokenSet::of(&[TokenKind::DoubleEquals, TokenKind::NotEquals]);
const RELATIONAL: TokenSet = TokenSet::of(&[
    TokenKind::Less,
    TokenKind::Leq,
    TokenKind::Greater,
    TokenKind::Geq,
]);
const ADDITIVE: TokenSet = TokenSet::of(&[TokenKind::Plus, TokenKind::Minus]);
const MULTIPLICATIVE: TokenSet =
    TokenSet::of(&[TokenKind::Asterisk, TokenKind::Slash, TokenKind::Percent]);

const NODE_VARIABLES: TokenSet = TokenSet::of(&[
    TokenKind::State,
    TokenKind::Outcome,
    TokenKind::Failure,
    TokenKind::CommandHandleVar,
]);
const TIMEPOINTS: TokenSet = TokenSet::of(&[TokenKind::StartTimepoint, TokenKind::EndTimepoint]);

/// What may come right after a closing `)` or `]` inside an expression.
pub(super) const AFTER_CLOSE: TokenSet = OR
    .union(XOR)
    .union(AND)
    .union(EQUALITY)
    .union(RELATIONAL)
    .union(ADDITIVE)
    .union(MULTIPLICATIVE)
    .union(TokenSet::of(&[
        TokenKind::Semicolon,
        TokenKind::Comma,
        TokenKind::RParen,
        TokenKind::RBracket,
    ]));

/// Keywords that stand alone as constant values.
const VALUE_KEYWORDS: TokenSet = sets::NODE_STATES
    .union(sets::OUTCOMES)
    .union(sets::FAILURE_TYPES)
    .union(sets::COMMAND_HANDLES)
    .union(TIMEPOINTS);

impl<'s> Parser<'s> {
    // -- Binary levels ------------------------------------------

    pub(super) fn expression(&mut self) -> PResult<Node> {
        self.nested(|p| p.binary_level(OR, Self::xor_expression))
    }

    fn xor_expression(&mut self) -> PResult<Node> {
        self.binary_level(XOR, Self::and_expression)
    }

    fn and_expression(&mut self) -> PResult<Node> {
        self.binary_level(AND, Self::equality)
    }

    fn equality(&mut self) -> PResult<Node> {
        self.binary_level(EQUALITY, Self::relational)
    }

    fn relational(&mut self) -> PResult<Node> {
        self.binary_level(RELATIONAL, Self::additive)
    }

    fn additive(&mut self) -> PResult<Node> {
        self.binary_level(ADDITIVE, Self::multiplicative)
    }

    fn multiplicative(&mut self) -> PResult<Node> {
        self.binary_level(MULTIPLICATIVE, Self::unary)
    }

    /// Left fold of `operand (op operand)*`; the operator token becomes the
    /// root of each step.
    fn binary_level(
        &mut self,
        operators: TokenSet,
        operand: fn(&mut Self) -> PResult<Node>,
    ) -> PResult<Node> {
        let mut left = operand(self)?;
        while self.at_any(operators) {
            let op = self.advance();
            let right = operand(self)?;
            left = Node::promote(op, vec![left, right]);
        }
        Ok(left)
    }

    // -- Unary --------------------------------------------------

    fn unary(&mut self) -> PResult<Node> {
        match (self.la(1), self.la(2)) {
            (TokenKind::Not, _) => {
                let op = self.advance();
                let operand = self.nested(Self::unary)?;
                Ok(Node::promote(op, vec![operand]))
            }
            (TokenKind::Minus, TokenKind::Int | TokenKind::Double) => Ok(self.negative_literal()),
            (TokenKind::Minus, _) => {
                let op = self.advance();
                let operand = self.nested(Self::unary)?;
                Ok(Node::promote_as(NodeKind::Negate, op, vec![operand]))
            }
            _ => self.quantity(),
        }
    }

    /// `-` directly before a number folds into the literal.
    fn negative_literal(&mut self) -> Node {
        let minus = self.advance();
        let number = self.advance();
        Node::leaf(Token::new(
            number.kind,
            format!("-{}", number.text),
            minus.span.to(number.span),
        ))
    }

    // -- Primaries ----------------------------------------------

    fn quantity(&mut self) -> PResult<Node> {
        match self.la(1) {
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect_before(TokenKind::RParen, AFTER_CLOSE)?;
                Ok(inner)
            }
            TokenKind::Bar => {
                let bar = self.advance();
                let operand = self.expression()?;
                self.expect(TokenKind::Bar)?;
                Ok(Node::promote(bar, vec![operand]))
            }
            TokenKind::IsKnown | TokenKind::MessageReceived => self.call(1),
            kind if sets::ONE_ARG_FUNCTIONS.contains(kind) => self.call(1),
            kind if sets::TWO_ARG_FUNCTIONS.contains(kind) => self.call(2),
            TokenKind::Lookup | TokenKind::LookupOnChange | TokenKind::LookupNow => self.lookup(),
            kind if sets::NODE_STATE_PREDICATES.contains(kind) => {
                let predicate = self.advance();
                self.expect(TokenKind::LParen)?;
                let reference = self.node_reference()?;
                self.expect(TokenKind::RParen)?;
                Ok(Node::promote(predicate, vec![reference]))
            }
            kind if sets::NODE_REFERENCE_START.contains(kind) => self.node_reference_value(),
            TokenKind::Ident => {
                if self.la(2) == TokenKind::Period {
                    if let Some(value) = self.try_parse("node reference", Self::node_reference_value) {
                        return Ok(value);
                    }
                }
                self.variable_reference()
            }
            TokenKind::True
            | TokenKind::False
            | TokenKind::Int
            | TokenKind::Double
            | TokenKind::Str => Ok(Node::leaf(self.advance())),
            TokenKind::HashParen => self.array_literal(),
            TokenKind::Date | TokenKind::Duration => self.time_literal(),
            kind if VALUE_KEYWORDS.contains(kind) => Ok(Node::leaf(self.advance())),
            _ => Err(self.mismatch("expression")),
        }
    }

    /// A built-in taking `arity` comma-separated arguments in parentheses.
    fn call(&mut self, arity: usize) -> PResult<Node> {
        let function = self.advance();
        self.expect(TokenKind::LParen)?;
        let mut arguments = vec![self.expression()?];
        while arguments.len() < arity {
            self.expect(TokenKind::Comma)?;
            arguments.push(self.expression()?);
        }
        self.expect_before(TokenKind::RParen, AFTER_CLOSE)?;
        Ok(Node::promote(function, arguments))
    }

    /// `NAME '[' expression ']'` or `NAME`
    pub(super) fn variable_reference(&mut self) -> PResult<Node> {
        let name = self.expect(TokenKind::Ident)?;
        self.check_reference(&name, Reference::Variable);
        let variable = Node::promote_as(NodeKind::Variable, name, Vec::new());
        if self.eat(TokenKind::LBracket).is_none() {
            return Ok(variable);
        }
        let index = self.expression()?;
        self.expect_before(
            TokenKind::RBracket,
            AFTER_CLOSE.union(TokenSet::of(&[TokenKind::Equals])),
        )?;
        Ok(Node::node(NodeKind::ArrayReference, vec![variable, index]))
    }

    fn array_literal(&mut self) -> PResult<Node> {
        let open = self.expect(TokenKind::HashParen)?;
        let mut elements = Vec::new();
        while self.at_any(sets::LITERAL_START) {
            if self.at(TokenKind::Minus) {
                if !matches!(self.la(2), TokenKind::Int | TokenKind::Double) {
                    return Err(self.mismatch("literal"));
                }
                elements.push(self.negative_literal());
            } else {
                elements.push(Node::leaf(self.advance()));
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Node::promote(open, elements))
    }

    /// `Date("...")` or `Duration("...")`; the string token carries the node.
    fn time_literal(&mut self) -> PResult<Node> {
        let keyword = self.advance();
        self.expect(TokenKind::LParen)?;
        let text = self.expect(TokenKind::Str)?;
        self.expect(TokenKind::RParen)?;
        let kind = if keyword.kind == TokenKind::Date {
            NodeKind::DateLiteral
        } else {
            NodeKind::DurationLiteral
        };
        Ok(Node::promote_as(kind, text, Vec::new()))
    }

    // -- Lookups ------------------------------------------------

    /// `Lookup(name(args)?, tolerance?)`, `LookupOnChange(...)` or
    /// `LookupNow(name(args)?)`.
    fn lookup(&mut self) -> PResult<Node> {
        self.with_paraphrase("in lookup", |p| {
            let keyword = p.advance();
            p.expect(TokenKind::LParen)?;
            let name = if p.eat(TokenKind::LParen).is_some() {
                let name = p.expression()?;
                p.expect(TokenKind::RParen)?;
                name
            } else {
                let name = p.expect(TokenKind::Ident)?;
                p.check_reference(&name, Reference::Lookup);
                Node::leaf(name)
            };
            let mut children = vec![name];
            if p.eat(TokenKind::LParen).is_some() {
                if !p.at(TokenKind::RParen) {
                    children.push(p.argument_list()?);
                }
                p.expect(TokenKind::RParen)?;
            }
            if keyword.kind != TokenKind::LookupNow && p.eat(TokenKind::Comma).is_some() {
                children.push(Node::node(NodeKind::Tolerance, vec![p.expression()?]));
            }
            p.expect_before(TokenKind::RParen, AFTER_CLOSE)?;
            Ok(Node::promote(keyword, children))
        })
    }

    // -- Node references ----------------------------------------

    /// `Self`, `Parent`, `Child(NAME)`, `Sibling(NAME)` or a bare node id.
    fn node_reference(&mut self) -> PResult<Node> {
        match self.la(1) {
            TokenKind::SelfRef | TokenKind::Parent => Ok(Node::leaf(self.advance())),
            TokenKind::Child | TokenKind::Sibling => {
                let relation = self.advance();
                self.expect(TokenKind::LParen)?;
                let name = self.expect(TokenKind::Ident)?;
                self.expect(TokenKind::RParen)?;
                Ok(Node::promote(relation, vec![Node::leaf(name)]))
            }
            TokenKind::Ident => Ok(Node::promote_as(
                NodeKind::NodeReference(NodeReferenceKind::Named),
                self.advance(),
                Vec::new(),
            )),
            _ => Err(self.mismatch("node reference")),
        }
    }

    /// `ref '.' (state|outcome|failure|command_handle)` or
    /// `ref '.' STATE '.' (START|END)`.
    fn node_reference_value(&mut self) -> PResult<Node> {
        let reference = self.node_reference()?;
        self.expect(TokenKind::Period)?;
        match self.la(1) {
            kind if NODE_VARIABLES.contains(kind) => {
                let variable = self.advance();
                Ok(Node::promote(variable, vec![reference]))
            }
            kind if sets::NODE_STATES.contains(kind) => {
                let state = Node::leaf(self.advance());
                self.expect(TokenKind::Period)?;
                let timepoint = self.expect_one_of(TIMEPOINTS, "'START' or 'END'")?;
                Ok(Node::node(
                    NodeKind::NodeTimepointValue,
                    vec![reference, state, Node::leaf(timepoint)],
                ))
            }
            _ => Err(self.mismatch("node variable")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CheckLevel, ParseOptions};
    use crate::{parse, parse_with_options};
    use pretty_assertions::assert_eq;

    /// Right-hand side of `x = <src>;`.
    fn expr(src: &str) -> String {
        let out = parse(&format!("x = {src};"));
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        out.plan
            .child(0)
            .and_then(|action| action.child(0))
            .and_then(|assignment| assignment.child(1))
            .expect("right-hand side")
            .to_sexpr()
    }

    #[test]
    fn precedence_climbs_from_or_to_multiplication() {
        assert_eq!(
            expr("a OR b && !c == d + 1 * 2"),
            "(Binary(Or) Variable:a (Binary(And) Variable:b (Binary(Equal) (Not Variable:c) \
             (Binary(Add) Variable:d (Binary(Multiply) IntegerLiteral:1 IntegerLiteral:2)))))"
        );
        assert_eq!(
            expr("a XOR b || c"),
            "(Binary(Or) (Binary(Xor) Variable:a Variable:b) Variable:c)"
        );
    }

    #[test]
    fn binary_levels_associate_left() {
        assert_eq!(
            expr("a - b - c"),
            "(Binary(Subtract) (Binary(Subtract) Variable:a Variable:b) Variable:c)"
        );
        assert_eq!(
            expr("8 / 4 % 3"),
            "(Binary(Modulo) (Binary(Divide) IntegerLiteral:8 IntegerLiteral:4) IntegerLiteral:3)"
        );
    }

    #[test]
    fn minus_folds_into_numbers_only() {
        assert_eq!(expr("-5"), "IntegerLiteral:-5");
        assert_eq!(expr("-2.5"), "RealLiteral:-2.5");
        assert_eq!(expr("-y"), "(Negate Variable:y)");
        assert_eq!(
            expr("1 - -2"),
            "(Binary(Subtract) IntegerLiteral:1 IntegerLiteral:-2)"
        );
    }

    #[test]
    fn functions_and_predicates() {
        assert_eq!(expr("|y|"), "(Function(Abs) Variable:y)");
        assert_eq!(
            expr("max(sqrt(a), 3)"),
            "(Function(Max) (Function(Sqrt) Variable:a) IntegerLiteral:3)"
        );
        assert_eq!(expr("isKnown(a[2])"), "(IsKnown (ArrayReference Variable:a IntegerLiteral:2))");
        assert_eq!(
            expr("NodeFinished(Child(Step))"),
            "(NodeStatePredicate(Finished) (NodeReference(Child) Name:Step))"
        );
    }

    #[test]
    fn lookups() {
        assert_eq!(
            expr("Lookup(Temp(1, \"a\"), 0.5)"),
            "(Lookup Name:Temp (ArgumentList IntegerLiteral:1 StringLiteral:\"a\") (Tolerance RealLiteral:0.5))"
        );
        assert_eq!(expr("LookupNow(time)"), "(LookupNow Name:time)");
        assert_eq!(
            expr("LookupOnChange((which))"),
            "(LookupOnChange Variable:which)"
        );
    }

    #[test]
    fn node_reference_forms() {
        assert_eq!(expr("Self.outcome"), "(NodeOutcomeVariable NodeReference(SelfRef))");
        assert_eq!(expr("Fetch.state"), "(NodeStateVariable NodeReference(Named):Fetch)");
        assert_eq!(
            expr("Parent.EXECUTING.START"),
            "(NodeTimepointValue NodeReference(Parent) NodeStateValue(Executing) Timepoint(Start))"
        );
        assert_eq!(
            expr("Sibling(B).command_handle == COMMAND_SUCCESS"),
            "(Binary(Equal) (NodeCommandHandleVariable (NodeReference(Sibling) Name:B)) \
             CommandHandleValue(Success))"
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            expr("#(1 -2 \"s\" true)"),
            "(ArrayLiteral IntegerLiteral:1 IntegerLiteral:-2 StringLiteral:\"s\" BooleanLiteral:true)"
        );
        assert_eq!(expr("Date(\"2024-01-01\")"), "DateLiteral:2024-01-01");
        assert_eq!(expr("Duration(\"PT5S\")"), "DurationLiteral:PT5S");
        assert_eq!(expr("FAILURE"), "NodeOutcomeValue(Failure)");
    }

    #[test]
    fn missing_operand_names_the_statement() {
        let out = parse("x = ;");
        assert_eq!(
            out.diagnostics[0].message,
            "mismatched input ';' expecting expression in assignment"
        );
    }

    #[test]
    fn undeclared_lookup_is_reported() {
        let out = parse_with_options(
            "Real Lookup Temp; Real t = Lookup(Temp) + LookupNow(Pressure);",
            ParseOptions {
                references: CheckLevel::Warning,
                ..ParseOptions::default()
            },
        );
        let messages: Vec<&str> = out.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["lookup \"Pressure\" is not declared"]);
    }
}

use super::expressions::AFTER_CLOSE;
use super::{PResult, Parser, Reference};
use crate::ast::{Node, NodeKind};
use crate::scope::{Binding, BindingKind, DeclaredType};
use crate::token::{sets, Token, TokenKind, TokenSet};

/// What may come right after the `)` closing a command's arguments.
const INVOCATION_CLOSE: TokenSet = AFTER_CLOSE.union(TokenSet::of(&[TokenKind::Timeout]));

impl<'s> Parser<'s> {
    // -- Actions ------------------------------------------------

    /// `(NAME ':')? body`. A label names the node in the enclosing context.
    pub(super) fn action(&mut self) -> PResult<Node> {
        self.nested(Self::labeled_action)
    }

    fn labeled_action(&mut self) -> PResult<Node> {
        self.rule("in action", sets::ACTION_FOLLOW, |p| {
            let label = if p.at(TokenKind::Ident) && p.la(2) == TokenKind::Colon {
                let name = p.advance();
                p.advance();
                p.declare(Binding::new(name.text.clone(), BindingKind::NodeId, name.span));
                Some(name)
            } else {
                None
            };

            let body = p.action_body(label.as_ref().map(|t| t.text.clone()))?;
            let mut children: Vec<Node> = label.into_iter().map(Node::leaf).collect();
            children.push(body);
            Ok(Node::node(NodeKind::Action, children))
        })
    }

    fn action_body(&mut self, label: Option<String>) -> PResult<Node> {
        match self.la(1) {
            kind if kind == TokenKind::LBrace || sets::BLOCK_VARIANTS.contains(kind) => {
                self.block(label)
            }
            TokenKind::For => self.for_loop(label),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_loop(),
            TokenKind::OnCommand => self.on_command(label),
            TokenKind::OnMessage => self.on_message(),
            TokenKind::LibraryCall => self.library_call(),
            TokenKind::Request => self.request(),
            TokenKind::Update => self.update(),
            TokenKind::SynchronousCommand => self.synchronous_command(),
            TokenKind::Wait => self.wait(),
            TokenKind::Ident | TokenKind::LParen => {
                if self.at_assignment() {
                    self.assignment()
                } else {
                    self.command_statement()
                }
            }
            _ => Err(self.no_viable_alternative()),
        }
    }

    // -- Compound actions ---------------------------------------

    /// `for (type NAME = init; test; update) action`. The loop variable
    /// lives in a context of its own.
    fn for_loop(&mut self, label: Option<String>) -> PResult<Node> {
        self.rule("in \"for\" statement", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::For)?;
            p.within_scope(label, |p| {
                p.expect(TokenKind::LParen)?;
                let (type_node, base) = p.type_name()?;
                let name = p.expect(TokenKind::Ident)?;
                p.expect(TokenKind::Equals)?;
                let init = p.expression()?;
                p.declare_variable(&name, BindingKind::Variable, DeclaredType::scalar(base));
                let variable = Node::node(
                    NodeKind::VariableDeclaration,
                    vec![type_node, Node::leaf(name), init],
                );
                p.expect(TokenKind::Semicolon)?;
                let test = p.expression()?;
                p.expect(TokenKind::Semicolon)?;
                let update = p.expression()?;
                p.expect(TokenKind::RParen)?;
                let body = p.action()?;
                Ok(Node::promote(keyword, vec![variable, test, update, body]))
            })
        })
    }

    fn if_statement(&mut self) -> PResult<Node> {
        self.rule("in \"if\" statement", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::If)?;
            let mut children = vec![p.expression()?, p.action()?];
            while p.at(TokenKind::ElseIf) {
                let elseif = p.advance();
                let test = p.expression()?;
                let then = p.action()?;
                children.push(Node::promote(elseif, vec![test, then]));
            }
            if p.at(TokenKind::Else) {
                let otherwise = p.advance();
                let then = p.action()?;
                children.push(Node::promote(otherwise, vec![then]));
            }
            p.expect(TokenKind::EndIf)?;
            p.eat(TokenKind::Semicolon);
            Ok(Node::promote(keyword, children))
        })
    }

    fn while_loop(&mut self) -> PResult<Node> {
        self.rule("in \"while\" statement", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::While)?;
            let test = p.expression()?;
            let body = p.action()?;
            Ok(Node::promote(keyword, vec![test, body]))
        })
    }

    /// `OnCommand expr params? action`. A parenthesis after the command
    /// name may open either the parameter list or the action, so the
    /// parameter list is a trial parse.
    fn on_command(&mut self, label: Option<String>) -> PResult<Node> {
        self.rule("in OnCommand action", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::OnCommand)?;
            let name = p.expression()?;
            p.within_scope(label, |p| {
                let mut children = vec![name];
                if p.at(TokenKind::LParen) {
                    if let Some((parameters, signature)) =
                        p.try_parse("OnCommand parameters", Self::params_spec)
                    {
                        let named = parameters
                            .children()
                            .iter()
                            .zip(&signature.parameters)
                            .filter_map(|(node, sig)| {
                                let token = node.children().last()?.token()?;
                                (token.kind == TokenKind::Ident).then(|| (token.clone(), sig.ty))
                            })
                            .collect::<Vec<(Token, DeclaredType)>>();
                        for (token, ty) in named {
                            let kind = if ty.array {
                                BindingKind::ArrayVariable
                            } else {
                                BindingKind::Variable
                            };
                            p.declare_variable(&token, kind, ty);
                        }
                        children.push(parameters);
                    }
                }
                children.push(p.action()?);
                Ok(Node::promote(keyword, children))
            })
        })
    }

    fn on_message(&mut self) -> PResult<Node> {
        self.rule("in OnMessage action", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::OnMessage)?;
            let message = p.expression()?;
            let body = p.action()?;
            Ok(Node::promote(keyword, vec![message, body]))
        })
    }

    // -- Assignments and commands -------------------------------

    /// `NAME '='` settles it at two tokens; `NAME '['` needs the whole
    /// target parsed to see whether `=` follows.
    fn at_assignment(&mut self) -> bool {
        match (self.la(1), self.la(2)) {
            (TokenKind::Ident, TokenKind::Equals) => true,
            (TokenKind::Ident, TokenKind::LBracket) => self.predicts_assignment_target(),
            _ => false,
        }
    }

    fn predicts_assignment_target(&mut self) -> bool {
        self.predicts("assignment target", |p| {
            p.variable_reference()?;
            p.expect(TokenKind::Equals)?;
            Ok(())
        })
    }

    /// `lhs '=' (commandInvocation | expression) ';'`
    fn assignment(&mut self) -> PResult<Node> {
        self.rule("in assignment", sets::ACTION_FOLLOW, |p| {
            let target = p.variable_reference()?;
            let equals = p.expect(TokenKind::Equals)?;
            let (kind, value) = if p.at_command_invocation() {
                (NodeKind::CommandWithAssignment, p.command_invocation()?)
            } else {
                (NodeKind::Assignment, p.expression()?)
            };
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote_as(kind, equals, vec![target, value]))
        })
    }

    /// Whether a command invocation starts here: a command name directly
    /// followed by `(`, or a parenthesized name expression followed by `(`.
    fn at_command_invocation(&mut self) -> bool {
        match (self.la(1), self.la(2)) {
            (TokenKind::Ident, TokenKind::LParen) => true,
            (TokenKind::LParen, _) => self.predicts("dynamic command name", |p| {
                p.expect(TokenKind::LParen)?;
                p.expression()?;
                p.expect(TokenKind::RParen)?;
                p.expect(TokenKind::LParen)?;
                Ok(())
            }),
            _ => false,
        }
    }

    fn command_statement(&mut self) -> PResult<Node> {
        self.rule("in command invocation", sets::ACTION_FOLLOW, |p| {
            let invocation = p.command_invocation()?;
            p.expect(TokenKind::Semicolon)?;
            Ok(invocation)
        })
    }

    /// `(NAME | '(' expression ')') '(' argumentList? ')'`
    fn command_invocation(&mut self) -> PResult<Node> {
        let callee = if self.eat(TokenKind::LParen).is_some() {
            let name = self.expression()?;
            self.expect(TokenKind::RParen)?;
            name
        } else {
            let name = self.expect(TokenKind::Ident)?;
            self.check_reference(&name, Reference::Command);
            Node::leaf(name)
        };
        self.expect(TokenKind::LParen)?;
        let mut children = vec![callee];
        if !self.at(TokenKind::RParen) {
            children.push(self.argument_list()?);
        }
        self.expect_before(TokenKind::RParen, INVOCATION_CLOSE)?;
        Ok(Node::node(NodeKind::CommandInvocation, children))
    }

    pub(super) fn argument_list(&mut self) -> PResult<Node> {
        let mut arguments = vec![self.expression()?];
        while self.eat(TokenKind::Comma).is_some() {
            arguments.push(self.expression()?);
        }
        Ok(Node::node(NodeKind::ArgumentList, arguments))
    }

    // -- Other simple actions -----------------------------------

    /// `LibraryCall NAME ('(' (NAME = expr),* ')')? ;`
    fn library_call(&mut self) -> PResult<Node> {
        self.rule("in library call", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::LibraryCall)?;
            let name = p.expect(TokenKind::Ident)?;
            p.check_reference(&name, Reference::LibraryAction);
            let mut children = vec![Node::leaf(name)];
            if p.eat(TokenKind::LParen).is_some() {
                let mut aliases = Vec::new();
                if !p.at(TokenKind::RParen) {
                    loop {
                        let formal = p.expect(TokenKind::Ident)?;
                        p.expect(TokenKind::Equals)?;
                        let actual = p.expression()?;
                        aliases.push(Node::node(NodeKind::Alias, vec![Node::leaf(formal), actual]));
                        if p.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                p.expect_before(TokenKind::RParen, TokenSet::of(&[TokenKind::Semicolon]))?;
                if !aliases.is_empty() {
                    children.push(Node::node(NodeKind::Aliases, aliases));
                }
            }
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, children))
        })
    }

    fn request(&mut self) -> PResult<Node> {
        self.rule("in Request", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::Request)?;
            let node = p.expect(TokenKind::Ident)?;
            let mut children = vec![Node::leaf(node)];
            children.extend(p.pairs()?);
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, children))
        })
    }

    fn update(&mut self) -> PResult<Node> {
        self.rule("in Update", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::Update)?;
            let pairs = p.pairs()?;
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, pairs))
        })
    }

    /// `(NAME '=' expression (',' NAME '=' expression)*)?`
    fn pairs(&mut self) -> PResult<Vec<Node>> {
        let mut pairs = Vec::new();
        if !self.at(TokenKind::Ident) {
            return Ok(pairs);
        }
        loop {
            let name = self.expect(TokenKind::Ident)?;
            self.expect(TokenKind::Equals)?;
            let value = self.expression()?;
            pairs.push(Node::node(NodeKind::Pair, vec![Node::leaf(name), value]));
            if self.eat(TokenKind::Comma).is_none() {
                return Ok(pairs);
            }
        }
    }

    /// `SynchronousCommand (lhs '=')? commandInvocation
    /// ('Timeout' expr (',' expr)?)? ';'`
    fn synchronous_command(&mut self) -> PResult<Node> {
        self.rule("in SynchronousCommand", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::SynchronousCommand)?;
            let mut children = Vec::new();
            if p.at(TokenKind::Ident) && p.predicts_assignment_target() {
                children.push(p.variable_reference()?);
                p.expect(TokenKind::Equals)?;
            }
            children.push(p.command_invocation()?);
            if let Some(timeout) = p.eat(TokenKind::Timeout) {
                let mut limits = vec![p.expression()?];
                if p.eat(TokenKind::Comma).is_some() {
                    limits.push(p.expression()?);
                }
                children.push(Node::promote(timeout, limits));
            }
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, children))
        })
    }

    /// `Wait expr (',' tolerance)? ;`
    fn wait(&mut self) -> PResult<Node> {
        self.rule("in Wait", sets::ACTION_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::Wait)?;
            let mut children = vec![p.expression()?];
            if p.eat(TokenKind::Comma).is_some() {
                children.push(Node::node(NodeKind::Tolerance, vec![p.expression()?]));
            }
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, children))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CheckLevel, ParseOptions};
    use crate::error::DiagnosticKind;
    use crate::scope::BindingKind;
    use crate::{parse, parse_with_options};
    use pretty_assertions::assert_eq;

    /// The root action of a plan that must parse cleanly.
    fn action(src: &str) -> String {
        let out = parse(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        out.plan.children().last().expect("root action").to_sexpr()
    }

    #[test]
    fn assignment_and_command_statement() {
        assert_eq!(
            action("{ x = y + 1; Move(1, \"up\"); }"),
            "(Action (Block(Plain) \
             (Action (Assignment Variable:x (Binary(Add) Variable:y IntegerLiteral:1))) \
             (Action (CommandInvocation Name:Move (ArgumentList IntegerLiteral:1 StringLiteral:\"up\")))))"
        );
    }

    #[test]
    fn array_element_assignment_is_predicted() {
        assert_eq!(
            action("a[i + 1] = 0;"),
            "(Action (Assignment (ArrayReference Variable:a (Binary(Add) Variable:i IntegerLiteral:1)) \
             IntegerLiteral:0))"
        );
    }

    #[test]
    fn command_results_are_assigned() {
        assert_eq!(
            action("{ r = Fetch(); s = (name)(2); }"),
            "(Action (Block(Plain) \
             (Action (CommandWithAssignment Variable:r (CommandInvocation Name:Fetch))) \
             (Action (CommandWithAssignment Variable:s \
             (CommandInvocation Variable:name (ArgumentList IntegerLiteral:2))))))"
        );
    }

    #[test]
    fn parenthesized_right_hand_side_stays_an_expression() {
        assert_eq!(
            action("s = (a + b) * 2;"),
            "(Action (Assignment Variable:s (Binary(Multiply) \
             (Binary(Add) Variable:a Variable:b) IntegerLiteral:2)))"
        );
    }

    #[test]
    fn if_with_elseif_and_else() {
        assert_eq!(
            action("if a Go(); elseif b Stop(); else Wait 1; endif"),
            "(Action (If Variable:a (Action (CommandInvocation Name:Go)) \
             (ElseIf Variable:b (Action (CommandInvocation Name:Stop))) \
             (Else (Action (Wait IntegerLiteral:1)))))"
        );
    }

    #[test]
    fn for_loop_declares_its_variable() {
        let out = parse_with_options(
            "for (Integer i = 0; i < 3; i + 1) Ping(i);",
            ParseOptions {
                references: CheckLevel::Error,
                ..ParseOptions::default()
            },
        );
        let messages: Vec<&str> = out.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["command \"Ping\" is not declared"]);
        assert_eq!(
            out.plan.child(0).expect("root").to_sexpr(),
            "(Action (For (VariableDeclaration TypeName(Integer) Name:i IntegerLiteral:0) \
             (Binary(Less) Variable:i IntegerLiteral:3) \
             (Binary(Add) Variable:i IntegerLiteral:1) \
             (Action (CommandInvocation Name:Ping (ArgumentList Variable:i)))))"
        );
    }

    #[test]
    fn on_command_parameters_versus_parenthesized_action() {
        assert_eq!(
            action("OnCommand \"go\" (Integer speed) Drive(speed);"),
            "(Action (OnCommand StringLiteral:\"go\" \
             (Parameters (Parameter TypeName(Integer) Name:speed)) \
             (Action (CommandInvocation Name:Drive (ArgumentList Variable:speed)))))"
        );
        assert_eq!(
            action("OnCommand \"go\" (target)(1);"),
            "(Action (OnCommand StringLiteral:\"go\" \
             (Action (CommandInvocation Variable:target (ArgumentList IntegerLiteral:1)))))"
        );
    }

    #[test]
    fn on_command_parameters_are_variables_of_the_handler() {
        let out = parse("OnCommand \"go\" (Integer speed, Real gains[3]) Drive(speed);");
        let kinds: Vec<(&str, BindingKind)> = out
            .scopes
            .bindings()
            .iter()
            .map(|b| (b.name.as_str(), b.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("speed", BindingKind::Variable),
                ("gains", BindingKind::ArrayVariable),
            ]
        );
    }

    #[test]
    fn library_call_request_update() {
        assert_eq!(
            action("{ LibraryCall Drive(speed = 2, mode = \"fast\"); LibraryCall Idle; \
                    Request Arm priority = 1; Update done = true, count = 3; }"),
            "(Action (Block(Plain) \
             (Action (LibraryCall Name:Drive (Aliases (Alias Name:speed IntegerLiteral:2) \
             (Alias Name:mode StringLiteral:\"fast\")))) \
             (Action (LibraryCall Name:Idle)) \
             (Action (Request Name:Arm (Pair Name:priority IntegerLiteral:1))) \
             (Action (Update (Pair Name:done BooleanLiteral:true) (Pair Name:count IntegerLiteral:3)))))"
        );
    }

    #[test]
    fn synchronous_command_with_target_and_timeout() {
        assert_eq!(
            action("SynchronousCommand r[0] = Read(1) Timeout 5, 0.5;"),
            "(Action (SynchronousCommand (ArrayReference Variable:r IntegerLiteral:0) \
             (CommandInvocation Name:Read (ArgumentList IntegerLiteral:1)) \
             (Timeout IntegerLiteral:5 RealLiteral:0.5)))"
        );
    }

    #[test]
    fn wait_with_tolerance() {
        assert_eq!(
            action("Wait 10, 0.1;"),
            "(Action (Wait IntegerLiteral:10 (Tolerance RealLiteral:0.1)))"
        );
    }

    #[test]
    fn labels_declare_node_ids() {
        let out = parse("Outer: { Inner: Wait 1; }");
        let names: Vec<(&str, BindingKind)> = out
            .scopes
            .bindings()
            .iter()
            .map(|b| (b.name.as_str(), b.kind))
            .collect();
        assert_eq!(
            names,
            vec![("Outer", BindingKind::NodeId), ("Inner", BindingKind::NodeId)]
        );
        assert_eq!(
            out.plan.child(0).expect("root").to_sexpr(),
            "(Action Name:Outer (Block(Plain) (Action Name:Inner (Wait IntegerLiteral:1))))"
        );
    }

    #[test]
    fn missing_endif_is_conjured_at_end_of_input() {
        let out = parse("if a Go();");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Syntax);
        assert_eq!(out.diagnostics[0].message, "missing 'endif' at '<EOF>' in \"if\" statement");
    }

    #[test]
    fn no_viable_alternative_in_block_recovers_at_next_action() {
        let out = parse("{ ) ) ; Wait 1; }");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Recovered);
        assert_eq!(out.diagnostics[0].message, "no viable alternative at input ')' in action");
        let block = out.plan.child(0).and_then(|a| a.child(0)).expect("block");
        assert_eq!(block.children().len(), 2);
        assert!(block.children()[0].is_error());
    }
}

use super::{PResult, Parser};
use crate::ast::{BaseType, Node, NodeKind};
use crate::scope::{Binding, BindingKind, DeclaredType, ParameterSignature, ScopeId, Signature};
use crate::token::{sets, Token, TokenKind, TokenSet};

/// Declared size of an array from its integer literal token.
pub(super) fn array_size(token: &Token) -> Option<u64> {
    Node::leaf(token.clone())
        .integer_value()
        .and_then(|v| u64::try_from(v).ok())
}

impl<'s> Parser<'s> {
    // -- Lookahead ----------------------------------------------

    /// Whether a global declaration starts here.
    pub(super) fn at_global_declaration(&self) -> bool {
        match self.la(1) {
            TokenKind::Command | TokenKind::Lookup | TokenKind::LibraryAction => true,
            kind if sets::TYPE_NAMES.contains(kind) => self.keyword_after_return_type().is_some(),
            _ => false,
        }
    }

    /// For a declaration opening with a return type, the keyword deciding
    /// its kind. It sits at most five tokens out: `Integer Command`,
    /// `Integer[] Lookup`, `Integer[10] Command`.
    fn keyword_after_return_type(&self) -> Option<TokenKind> {
        let at = match (self.la(2), self.la(3), self.la(4)) {
            (TokenKind::LBracket, TokenKind::RBracket, _) => 4,
            (TokenKind::LBracket, TokenKind::Int, TokenKind::RBracket) => 5,
            (TokenKind::LBracket, _, _) => return None,
            _ => 2,
        };
        match self.la(at) {
            kind @ (TokenKind::Command | TokenKind::Lookup) => Some(kind),
            _ => None,
        }
    }

    // -- Global declarations ------------------------------------

    pub(super) fn global_declarations(&mut self) -> PResult<Node> {
        let mut declarations = Vec::new();
        while self.at_global_declaration() {
            declarations.push(self.global_declaration()?);
        }
        Ok(Node::node(NodeKind::GlobalDeclarations, declarations))
    }

    fn global_declaration(&mut self) -> PResult<Node> {
        let keyword = match self.la(1) {
            kind @ (TokenKind::Command | TokenKind::Lookup | TokenKind::LibraryAction) => kind,
            _ => self
                .keyword_after_return_type()
                .unwrap_or(TokenKind::Command),
        };
        match keyword {
            TokenKind::Lookup => self.lookup_declaration(),
            TokenKind::LibraryAction => self.library_action_declaration(),
            _ => self.command_declaration(),
        }
    }

    /// `[returnType] Command NAME [params] [Returns returnType] ;`
    ///
    /// The return type is always the last child, wherever it was written.
    fn command_declaration(&mut self) -> PResult<Node> {
        self.rule(
            "in command declaration",
            sets::GLOBAL_DECLARATION_FOLLOW,
            |p| {
                let mut returns = if p.at_any(sets::TYPE_NAMES) {
                    Some(p.return_type()?)
                } else {
                    None
                };
                let keyword = p.expect(TokenKind::Command)?;
                let name = p.expect(TokenKind::Ident)?;
                let mut children = vec![Node::leaf(name.clone())];
                let mut signature = Signature::default();
                if p.at(TokenKind::LParen) {
                    let (parameters, parsed) = p.params_spec()?;
                    children.push(parameters);
                    signature = parsed;
                }
                if returns.is_none() && p.eat(TokenKind::Returns).is_some() {
                    returns = Some(p.return_type()?);
                }
                p.expect(TokenKind::Semicolon)?;

                if let Some((node, ty)) = returns {
                    signature.returns = Some(ty);
                    children.push(node);
                }
                p.declare_global(&name, BindingKind::Command, signature);
                Ok(Node::promote_as(
                    NodeKind::CommandDeclaration,
                    keyword,
                    children,
                ))
            },
        )
    }

    /// `returnType Lookup NAME [params] ;` or
    /// `Lookup NAME [params] Returns returnType ;`
    fn lookup_declaration(&mut self) -> PResult<Node> {
        self.rule(
            "in lookup declaration",
            sets::GLOBAL_DECLARATION_FOLLOW,
            |p| {
                let mut returns = if p.at_any(sets::TYPE_NAMES) {
                    Some(p.return_type()?)
                } else {
                    None
                };
                let keyword = p.expect(TokenKind::Lookup)?;
                let name = p.expect(TokenKind::Ident)?;
                let mut signature = Signature::default();
                let mut parameters = None;
                if p.at(TokenKind::LParen) {
                    let (node, parsed) = p.params_spec()?;
                    parameters = Some(node);
                    signature = parsed;
                }
                let (return_node, ty) = match returns.take() {
                    Some(r) => r,
                    None => {
                        p.expect(TokenKind::Returns)?;
                        p.return_type()?
                    }
                };
                p.expect(TokenKind::Semicolon)?;

                signature.returns = Some(ty);
                p.declare_global(&name, BindingKind::Lookup, signature);
                let mut children = vec![Node::leaf(name), return_node];
                children.extend(parameters);
                Ok(Node::promote_as(
                    NodeKind::LookupDeclaration,
                    keyword,
                    children,
                ))
            },
        )
    }

    /// `LibraryAction NAME [( In|InOut type NAME, ... )] ;`
    fn library_action_declaration(&mut self) -> PResult<Node> {
        self.rule(
            "in library action declaration",
            sets::GLOBAL_DECLARATION_FOLLOW,
            |p| {
                let keyword = p.expect(TokenKind::LibraryAction)?;
                let name = p.expect(TokenKind::Ident)?;
                let mut children = vec![Node::leaf(name.clone())];
                let mut signature = Signature::default();
                if p.at(TokenKind::LParen) {
                    let (interface, parsed) = p.library_interface()?;
                    children.push(interface);
                    signature = parsed;
                }
                p.expect(TokenKind::Semicolon)?;
                p.declare_global(&name, BindingKind::LibraryAction, signature);
                Ok(Node::promote_as(
                    NodeKind::LibraryActionDeclaration,
                    keyword,
                    children,
                ))
            },
        )
    }

    fn declare_global(&mut self, name: &Token, kind: BindingKind, signature: Signature) {
        if name.is_missing() {
            return;
        }
        self.declare_in(
            ScopeId::GLOBAL,
            Binding::new(name.text.clone(), kind, name.span).with_signature(signature),
        );
    }

    fn library_interface(&mut self) -> PResult<(Node, Signature)> {
        self.with_paraphrase("in library action interface", |p| {
            p.expect(TokenKind::LParen)?;
            let mut parameters = Vec::new();
            let mut signature = Signature::default();
            if !p.at(TokenKind::RParen) {
                loop {
                    let (node, parameter) = p.library_parameter()?;
                    parameters.push(node);
                    signature.parameters.push(parameter);
                    if p.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            p.expect_before(TokenKind::RParen, TokenSet::of(&[TokenKind::Semicolon]))?;
            Ok((Node::node(NodeKind::Parameters, parameters), signature))
        })
    }

    fn library_parameter(&mut self) -> PResult<(Node, ParameterSignature)> {
        let direction = self.expect_one_of(sets::INTERFACE_DIRECTIONS, "'In' or 'InOut'")?;
        let (type_node, base) = self.type_name()?;
        let name = self.expect(TokenKind::Ident)?;
        let (shape, ty) = if self.at(TokenKind::LBracket) {
            self.advance();
            let size = self.expect(TokenKind::Int)?;
            self.expect(TokenKind::RBracket)?;
            let ty = DeclaredType::array_of(base, array_size(&size));
            (
                Node::node(NodeKind::ArrayType, vec![type_node, Node::leaf(size)]),
                ty,
            )
        } else {
            (type_node, DeclaredType::scalar(base))
        };
        let parameter = ParameterSignature {
            name: Some(name.text.clone()),
            ty,
            in_out: direction.kind == TokenKind::InOut,
        };
        Ok((
            Node::promote(direction, vec![shape, Node::leaf(name)]),
            parameter,
        ))
    }

    // -- Types --------------------------------------------------

    pub(super) fn type_name(&mut self) -> PResult<(Node, BaseType)> {
        match BaseType::from_token(self.la(1)) {
            Some(base) => Ok((Node::leaf(self.advance()), base)),
            None => Err(self.mismatch("type name")),
        }
    }

    /// `type ( '[' INT? ']' )?` as a `ReturnType` node.
    fn return_type(&mut self) -> PResult<(Node, DeclaredType)> {
        let (type_node, base) = self.type_name()?;
        if self.eat(TokenKind::LBracket).is_none() {
            return Ok((
                Node::node(NodeKind::ReturnType, vec![type_node]),
                DeclaredType::scalar(base),
            ));
        }
        let size = self.eat(TokenKind::Int);
        self.expect(TokenKind::RBracket)?;
        let ty = DeclaredType::array_of(base, size.as_ref().and_then(array_size));
        let mut array = vec![type_node];
        array.extend(size.map(Node::leaf));
        Ok((
            Node::node(
                NodeKind::ReturnType,
                vec![Node::node(NodeKind::ArrayType, array)],
            ),
            ty,
        ))
    }

    // -- Parameter lists ----------------------------------------

    /// `( param, ..., [...] )` for commands, lookups and `OnCommand`.
    pub(super) fn params_spec(&mut self) -> PResult<(Node, Signature)> {
        self.with_paraphrase("in parameter specification", |p| {
            p.expect(TokenKind::LParen)?;
            let mut parameters = Vec::new();
            let mut signature = Signature::default();
            if !p.at(TokenKind::RParen) {
                loop {
                    if p.at(TokenKind::Ellipsis) {
                        parameters.push(Node::leaf(p.advance()));
                        signature.variadic = true;
                        break;
                    }
                    let (node, parameter) = p.param_spec()?;
                    parameters.push(node);
                    signature.parameters.push(parameter);
                    if p.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            p.expect_before(
                TokenKind::RParen,
                TokenSet::of(&[TokenKind::Semicolon, TokenKind::Returns]),
            )?;
            Ok((Node::node(NodeKind::Parameters, parameters), signature))
        })
    }

    /// One parameter. Forms are tried in order: `Any name?`, `type[size?]
    /// name?`, `type name[size]`, `type name?`.
    fn param_spec(&mut self) -> PResult<(Node, ParameterSignature)> {
        if self.at(TokenKind::Any) {
            let any = Node::leaf(self.advance());
            let name = self.eat(TokenKind::Ident);
            let parameter = ParameterSignature {
                name: name.as_ref().map(|t| t.text.clone()),
                ty: DeclaredType::any(),
                in_out: false,
            };
            let mut children = vec![any];
            children.extend(name.map(Node::leaf));
            return Ok((Node::node(NodeKind::Parameter, children), parameter));
        }
        if let Some(found) = self.try_parse("array type parameter", Self::array_type_parameter) {
            return Ok(found);
        }
        if let Some(found) = self.try_parse("named array parameter", Self::named_array_parameter) {
            return Ok(found);
        }
        self.scalar_parameter()
    }

    fn array_type_parameter(&mut self) -> PResult<(Node, ParameterSignature)> {
        let (type_node, base) = self.type_name()?;
        self.expect(TokenKind::LBracket)?;
        let size = self.eat(TokenKind::Int);
        self.expect(TokenKind::RBracket)?;
        let name = self.eat(TokenKind::Ident);

        let parameter = ParameterSignature {
            name: name.as_ref().map(|t| t.text.clone()),
            ty: DeclaredType::array_of(base, size.as_ref().and_then(array_size)),
            in_out: false,
        };
        let mut array = vec![type_node];
        array.extend(size.map(Node::leaf));
        let mut children = vec![Node::node(NodeKind::ArrayType, array)];
        children.extend(name.map(Node::leaf));
        Ok((Node::node(NodeKind::Parameter, children), parameter))
    }

    fn named_array_parameter(&mut self) -> PResult<(Node, ParameterSignature)> {
        let (type_node, base) = self.type_name()?;
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::LBracket)?;
        let size = self.expect(TokenKind::Int)?;
        self.expect(TokenKind::RBracket)?;

        let parameter = ParameterSignature {
            name: Some(name.text.clone()),
            ty: DeclaredType::array_of(base, array_size(&size)),
            in_out: false,
        };
        let array = Node::node(NodeKind::ArrayType, vec![type_node, Node::leaf(size)]);
        Ok((
            Node::node(NodeKind::Parameter, vec![array, Node::leaf(name)]),
            parameter,
        ))
    }

    fn scalar_parameter(&mut self) -> PResult<(Node, ParameterSignature)> {
        let (type_node, base) = self.type_name()?;
        let name = self.eat(TokenKind::Ident);
        let parameter = ParameterSignature {
            name: name.as_ref().map(|t| t.text.clone()),
            ty: DeclaredType::scalar(base),
            in_out: false,
        };
        let mut children = vec![type_node];
        children.extend(name.map(Node::leaf));
        Ok((Node::node(NodeKind::Parameter, children), parameter))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CheckLevel, ParseOptions};
    use crate::scope::{BindingKind, DeclaredType};
    use crate::{parse, parse_with_options};
    use pretty_assertions::assert_eq;

    fn declarations(src: &str) -> String {
        let out = parse(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        out.plan.child(0).expect("declarations").to_sexpr()
    }

    #[test]
    fn command_with_leading_return_type_puts_it_last() {
        assert_eq!(
            declarations("Integer[10] Command Fetch(String key); Fetch(\"a\");"),
            "(GlobalDeclarations (CommandDeclaration Name:Fetch \
             (Parameters (Parameter TypeName(String) Name:key)) \
             (ReturnType (ArrayType TypeName(Integer) IntegerLiteral:10))))"
        );
    }

    #[test]
    fn command_with_trailing_returns_clause() {
        assert_eq!(
            declarations("Command Ping Returns Boolean; Ping();"),
            "(GlobalDeclarations (CommandDeclaration Name:Ping (ReturnType TypeName(Boolean))))"
        );
    }

    #[test]
    fn lookup_return_type_comes_second() {
        assert_eq!(
            declarations("Real Lookup Temp(Integer sensor); Wait 1;"),
            "(GlobalDeclarations (LookupDeclaration Name:Temp (ReturnType TypeName(Real)) \
             (Parameters (Parameter TypeName(Integer) Name:sensor))))"
        );
    }

    #[test]
    fn parameter_forms_in_priority_order() {
        assert_eq!(
            declarations("Command C(Any, Any a, Real[] r, Integer[4], String s[3], Boolean b, ...); C(1);"),
            "(GlobalDeclarations (CommandDeclaration Name:C (Parameters \
             (Parameter AnyType) \
             (Parameter AnyType Name:a) \
             (Parameter (ArrayType TypeName(Real)) Name:r) \
             (Parameter (ArrayType TypeName(Integer) IntegerLiteral:4)) \
             (Parameter (ArrayType TypeName(String) IntegerLiteral:3) Name:s) \
             (Parameter TypeName(Boolean) Name:b) \
             VariadicParameter)))"
        );
    }

    #[test]
    fn library_action_interface() {
        assert_eq!(
            declarations("LibraryAction Move(In Real x, InOut Integer hits[8]); Wait 1;"),
            "(GlobalDeclarations (LibraryActionDeclaration Name:Move (Parameters \
             (In TypeName(Real) Name:x) \
             (InOut (ArrayType TypeName(Integer) IntegerLiteral:8) Name:hits))))"
        );
    }

    #[test]
    fn variadic_signature_and_array_return() {
        let out = parse("Integer[] Lookup Readings(String s, ...); Wait 1;");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let lookup = out
            .scopes
            .resolve(out.scopes.global(), "Readings")
            .expect("declared");
        assert_eq!(lookup.kind, BindingKind::Lookup);
        let signature = lookup.signature.as_ref().expect("signature");
        assert!(signature.variadic);
        assert_eq!(signature.parameters.len(), 1);
        assert_eq!(
            signature.returns,
            Some(DeclaredType::array_of(crate::ast::BaseType::Integer, None))
        );
    }

    #[test]
    fn duplicate_command_is_reported_with_a_note() {
        let out = parse_with_options(
            "Command Go; Command Go(Integer); Go();",
            ParseOptions {
                redeclarations: CheckLevel::Error,
                ..ParseOptions::default()
            },
        );
        let messages: Vec<&str> = out.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "command \"Go\" is already declared in this context",
                "command \"Go\" previously declared here",
            ]
        );
    }
}

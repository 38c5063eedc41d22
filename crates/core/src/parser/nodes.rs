use super::{PResult, Parser, Reference};
use crate::ast::{BaseType, BlockVariant, Node, NodeKind, ResourceOptionKind};
use crate::error::{DiagnosticKind, SyntaxErrorKind};
use crate::scope::{Binding, BindingKind, DeclaredType};
use crate::token::{sets, Token, TokenKind};

use super::declarations::array_size;

/// Binding kind for a declared name, given the interface direction it was
/// declared under (if any).
fn binding_kind(direction: Option<TokenKind>, array: bool) -> BindingKind {
    match direction {
        Some(TokenKind::In) => BindingKind::InInterface,
        Some(_) => BindingKind::InOutInterface,
        None if array => BindingKind::ArrayVariable,
        None => BindingKind::Variable,
    }
}

fn resource_option_kind(kind: TokenKind) -> ResourceOptionKind {
    match kind {
        TokenKind::LowerBound => ResourceOptionKind::LowerBound,
        TokenKind::UpperBound => ResourceOptionKind::UpperBound,
        TokenKind::ReleaseAtTermination => ResourceOptionKind::ReleaseAtTermination,
        TokenKind::Priority => ResourceOptionKind::Priority,
        _ => ResourceOptionKind::Name,
    }
}

impl<'s> Parser<'s> {
    // -- Plan ---------------------------------------------------

    /// `declarations? rootAction EOF`
    pub(super) fn plan(&mut self) -> Node {
        let mut children = Vec::new();
        if self.at_global_declaration() {
            children.push(
                self.global_declarations()
                    .unwrap_or_else(|error| Node::error(error.token)),
            );
        }
        children.push(self.root_action());
        Node::node(NodeKind::Plan, children)
    }

    /// A plan body is either one action spanning the rest of the input, or
    /// the items of an implicit plain block.
    fn root_action(&mut self) -> Node {
        let single = self.try_parse("single root action", |p| {
            let action = p.action()?;
            p.expect(TokenKind::Eof)?;
            Ok(action)
        });
        match single {
            Some(action) => action,
            None => self.implicit_root_block(),
        }
    }

    fn implicit_root_block(&mut self) -> Node {
        if self.at(TokenKind::Eof) {
            let error = self.mismatch("action");
            self.session.report_syntax(DiagnosticKind::Syntax, &error);
        }
        let mut items = self.within_scope(None, |p| {
            let mut items = Vec::new();
            while !p.at(TokenKind::Eof) {
                if p.at(TokenKind::RBrace) {
                    let error = p.syntax_error(SyntaxErrorKind::Extraneous {
                        found: p.cur().error_display(),
                        expected: TokenKind::Eof.describe(),
                    });
                    p.session.report_syntax(DiagnosticKind::Syntax, &error);
                    p.step();
                    continue;
                }
                let start = p.pos;
                match p.block_item() {
                    Ok(item) => items.push(item),
                    Err(error) => items.push(Node::error(error.token)),
                }
                p.skip_if_stalled(start);
            }
            items
        });
        // A lone action that only failed the trial because of errors.
        if items.len() == 1 && items[0].kind() == NodeKind::Action {
            if let Some(action) = items.pop() {
                return action;
            }
        }
        Node::node(
            NodeKind::Action,
            vec![Node::node(NodeKind::Block(BlockVariant::Plain), items)],
        )
    }

    // -- Blocks -------------------------------------------------

    /// `variant? '{' item* '}'`. The block's context takes the action label
    /// as its name.
    pub(super) fn block(&mut self, label: Option<String>) -> PResult<Node> {
        self.rule("in block", sets::ACTION_FOLLOW, |p| {
            let variant = if p.at_any(sets::BLOCK_VARIANTS) {
                Some(p.advance())
            } else {
                None
            };
            let open = p.expect(TokenKind::LBrace)?;
            let items = p.within_scope(label, |p| p.within_braces(Self::block_items))?;
            p.expect(TokenKind::RBrace)?;
            Ok(Node::promote(variant.unwrap_or(open), items))
        })
    }

    /// Items up to the closing brace. Declarations, attributes and actions
    /// are accepted in any order.
    fn block_items(&mut self) -> PResult<Vec<Node>> {
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let start = self.pos;
            items.push(self.block_item()?);
            self.skip_if_stalled(start);
        }
        Ok(items)
    }

    /// A block item that recovered without consuming anything has already
    /// left its error node; drop the offending token so the next item does
    /// not fail on it a second time.
    fn skip_if_stalled(&mut self, start: usize) {
        if self.pos == start && !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            self.step();
        }
    }

    fn block_item(&mut self) -> PResult<Node> {
        match self.la(1) {
            TokenKind::Comment => self.comment(),
            TokenKind::In | TokenKind::InOut => self.interface_declaration(),
            kind if sets::TYPE_NAMES.contains(kind) => self.variable_declarations(),
            kind if sets::CONDITIONS.contains(kind) => self.condition(),
            TokenKind::Priority => self.priority(),
            TokenKind::Resource => self.resource(),
            _ => self.action(),
        }
    }

    fn comment(&mut self) -> PResult<Node> {
        self.rule("in comment", sets::BLOCK_ITEM_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::Comment)?;
            let text = p.expect(TokenKind::Str)?;
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, vec![Node::leaf(text)]))
        })
    }

    // -- Node declarations --------------------------------------

    /// `type declarator (',' declarator)* ';'`
    fn variable_declarations(&mut self) -> PResult<Node> {
        self.rule("in variable declaration", sets::BLOCK_ITEM_FOLLOW, |p| {
            let (type_node, base) = p.type_name()?;
            let mut declarations = vec![p.declarator(&type_node, base, None)?];
            while p.eat(TokenKind::Comma).is_some() {
                declarations.push(p.declarator(&type_node, base, None)?);
            }
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::node(NodeKind::VariableDeclarations, declarations))
        })
    }

    /// `In|InOut` followed by either typed declarators or bare names of
    /// variables inherited from an enclosing node.
    fn interface_declaration(&mut self) -> PResult<Node> {
        self.rule("in interface declaration", sets::BLOCK_ITEM_FOLLOW, |p| {
            let direction = p.expect_one_of(sets::INTERFACE_DIRECTIONS, "'In' or 'InOut'")?;
            let mut children = Vec::new();
            if p.at_any(sets::TYPE_NAMES) {
                let (type_node, base) = p.type_name()?;
                loop {
                    children.push(p.declarator(&type_node, base, Some(direction.kind))?);
                    if p.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            } else {
                loop {
                    let name = p.expect(TokenKind::Ident)?;
                    p.check_reference(&name, Reference::Variable);
                    children.push(Node::leaf(name));
                    if p.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(direction, children))
        })
    }

    /// One declared name: the array form `NAME '[' INT ']'` is tried first,
    /// then the scalar form. Either takes an optional `= expression`.
    fn declarator(
        &mut self,
        type_node: &Node,
        base: BaseType,
        direction: Option<TokenKind>,
    ) -> PResult<Node> {
        let array_head = self.try_parse("array declarator", |p| {
            let name = p.expect(TokenKind::Ident)?;
            p.expect(TokenKind::LBracket)?;
            let size = p.expect(TokenKind::Int)?;
            p.expect(TokenKind::RBracket)?;
            Ok((name, size))
        });

        let (kind, name, mut children, ty) = match array_head {
            Some((name, size)) => {
                let ty = DeclaredType::array_of(base, array_size(&size));
                let children = vec![type_node.clone(), Node::leaf(name.clone()), Node::leaf(size)];
                (NodeKind::ArrayVariableDeclaration, name, children, ty)
            }
            None => {
                let name = self.expect(TokenKind::Ident)?;
                let children = vec![type_node.clone(), Node::leaf(name.clone())];
                (NodeKind::VariableDeclaration, name, children, DeclaredType::scalar(base))
            }
        };
        if self.eat(TokenKind::Equals).is_some() {
            children.push(self.expression()?);
        }

        self.declare_variable(&name, binding_kind(direction, ty.array), ty);
        Ok(Node::node(kind, children))
    }

    /// Enter a variable into the active context.
    pub(super) fn declare_variable(&mut self, name: &Token, kind: BindingKind, ty: DeclaredType) {
        if name.is_missing() {
            return;
        }
        self.declare(Binding::new(name.text.clone(), kind, name.span).with_type(ty));
    }

    // -- Attributes ---------------------------------------------

    fn condition(&mut self) -> PResult<Node> {
        self.rule("in condition", sets::BLOCK_ITEM_FOLLOW, |p| {
            let keyword = p.expect_one_of(sets::CONDITIONS, "condition")?;
            let test = p.expression()?;
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, vec![test]))
        })
    }

    fn priority(&mut self) -> PResult<Node> {
        self.rule("in priority", sets::BLOCK_ITEM_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::Priority)?;
            let value = p.expect(TokenKind::Int)?;
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, vec![Node::leaf(value)]))
        })
    }

    /// `Resource option = expr (',' option = expr)* ';'`
    fn resource(&mut self) -> PResult<Node> {
        self.rule("in resource", sets::BLOCK_ITEM_FOLLOW, |p| {
            let keyword = p.expect(TokenKind::Resource)?;
            let mut options = Vec::new();
            loop {
                let option = p.expect_one_of(sets::RESOURCE_OPTIONS, "resource option")?;
                p.expect(TokenKind::Equals)?;
                let value = p.expression()?;
                options.push(Node::promote_as(
                    NodeKind::ResourceOption(resource_option_kind(option.kind)),
                    option,
                    vec![value],
                ));
                if p.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            p.expect(TokenKind::Semicolon)?;
            Ok(Node::promote(keyword, options))
        })
    }
}

//! Infix expression parsing (led - left denotation)

use super::ast::*;
use super::nud::is_simple_target;
use super::state::*;
use super::ParseError;
use crate::frontend::lexer::tokens::*;

type InfixFn<'a> = fn(&mut ParserState<'a>, Expr, u8) -> Option<Expr>;

impl<'a> ParserState<'a> {
    /// Get infix binding powers and parser for the current token
    #[inline]
    pub(crate) fn infix_info(&self) -> Option<(u8, u8, InfixFn<'a>)> {
        if let Some((op, _)) = self.gt_op() {
            return Some(match op {
                GtOp::Gt | GtOp::Ge => (BP_CMP, BP_CMP + 1, Self::parse_binary),
                GtOp::Shr | GtOp::UShr => (BP_SHIFT, BP_SHIFT + 1, Self::parse_binary),
                GtOp::ShrEq | GtOp::UShrEq => (BP_ASSIGN, BP_ASSIGN, Self::parse_assign),
            });
        }
        match self.kind() {
            // Assignment (right associative)
            TokenKind::Punct(
                Punct::Eq
                | Punct::PlusEq
                | Punct::MinusEq
                | Punct::StarEq
                | Punct::StarStarEq
                | Punct::SlashEq
                | Punct::PercentEq
                | Punct::LtLtEq
                | Punct::AmpEq
                | Punct::PipeEq
                | Punct::CaretEq
                | Punct::AmpAmpEq
                | Punct::PipePipeEq
                | Punct::QuestionQuestionEq,
            ) => Some((BP_ASSIGN, BP_ASSIGN, Self::parse_assign)),
            // Conditional
            TokenKind::Punct(Punct::Question) => Some((BP_COND, BP_ASSIGN, Self::parse_conditional)),
            // Logical
            TokenKind::Punct(Punct::QuestionQuestion) => Some((BP_NULLISH, BP_NULLISH + 1, Self::parse_binary)),
            TokenKind::Punct(Punct::PipePipe) => Some((BP_OR, BP_OR + 1, Self::parse_binary)),
            TokenKind::Punct(Punct::AmpAmp) => Some((BP_AND, BP_AND + 1, Self::parse_binary)),
            // Bitwise
            TokenKind::Punct(Punct::Pipe) => Some((BP_BIT_OR, BP_BIT_OR + 1, Self::parse_binary)),
            TokenKind::Punct(Punct::Caret) => Some((BP_BIT_XOR, BP_BIT_XOR + 1, Self::parse_binary)),
            TokenKind::Punct(Punct::Amp) => Some((BP_BIT_AND, BP_BIT_AND + 1, Self::parse_binary)),
            // Equality
            TokenKind::Punct(Punct::EqEq | Punct::NotEq | Punct::EqEqEq | Punct::NotEqEq) => {
                Some((BP_EQ, BP_EQ + 1, Self::parse_binary))
            }
            // Comparison
            TokenKind::Punct(Punct::Lt | Punct::Le) | TokenKind::Keyword(Keyword::Instanceof) => {
                Some((BP_CMP, BP_CMP + 1, Self::parse_binary))
            }
            TokenKind::Keyword(Keyword::In) if !self.no_in => Some((BP_CMP, BP_CMP + 1, Self::parse_binary)),
            // Type assertion
            TokenKind::Identifier(name)
                if self.ts && (name == "as" || name == "satisfies") && !self.newline_before() =>
            {
                Some((BP_CMP, BP_CMP + 1, Self::parse_as))
            }
            // Shift
            TokenKind::Punct(Punct::LtLt) => Some((BP_SHIFT, BP_SHIFT + 1, Self::parse_binary)),
            // Addition/Subtraction
            TokenKind::Punct(Punct::Plus | Punct::Minus) => Some((BP_ADD, BP_ADD + 1, Self::parse_binary)),
            // Multiplication/Division/Modulo
            TokenKind::Punct(Punct::Star | Punct::Slash | Punct::Percent) => {
                Some((BP_MUL, BP_MUL + 1, Self::parse_binary))
            }
            // Exponent (right associative)
            TokenKind::Punct(Punct::StarStar) => Some((BP_EXP, BP_EXP, Self::parse_binary)),
            // Postfix update, restricted production
            TokenKind::Punct(Punct::PlusPlus | Punct::MinusMinus) if !self.newline_before() => {
                Some((BP_POSTFIX, BP_POSTFIX, Self::parse_postfix_update))
            }
            // Member access, calls, tagged templates
            TokenKind::Punct(Punct::Dot | Punct::QuestionDot | Punct::LBracket | Punct::LParen)
            | TokenKind::NoSubstitutionTemplate(_)
            | TokenKind::TemplateHead(_) => Some((BP_CALL, BP_CALL, Self::parse_chain_infix)),
            // Non-null assertion
            TokenKind::Punct(Punct::Bang) if self.ts && !self.newline_before() => {
                Some((BP_CALL, BP_CALL, Self::parse_chain_infix))
            }
            _ => None,
        }
    }

    /// Parse assignment expression
    fn parse_assign(
        &mut self,
        lhs: Expr,
        right_bp: u8,
    ) -> Option<Expr> {
        let start = lhs.span.start;
        let (op, count) = if let Some((gt, count)) = self.gt_op() {
            match gt {
                GtOp::ShrEq => (AssignOp::Binary(BinaryOp::Shr), count),
                GtOp::UShrEq => (AssignOp::Binary(BinaryOp::UShr), count),
                _ => {
                    self.error_unexpected();
                    return None;
                }
            }
        } else {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Eq) => AssignOp::Assign,
                TokenKind::Punct(Punct::PlusEq) => AssignOp::Binary(BinaryOp::Add),
                TokenKind::Punct(Punct::MinusEq) => AssignOp::Binary(BinaryOp::Sub),
                TokenKind::Punct(Punct::StarEq) => AssignOp::Binary(BinaryOp::Mul),
                TokenKind::Punct(Punct::StarStarEq) => AssignOp::Binary(BinaryOp::Exp),
                TokenKind::Punct(Punct::SlashEq) => AssignOp::Binary(BinaryOp::Div),
                TokenKind::Punct(Punct::PercentEq) => AssignOp::Binary(BinaryOp::Mod),
                TokenKind::Punct(Punct::LtLtEq) => AssignOp::Binary(BinaryOp::Shl),
                TokenKind::Punct(Punct::AmpEq) => AssignOp::Binary(BinaryOp::BitAnd),
                TokenKind::Punct(Punct::PipeEq) => AssignOp::Binary(BinaryOp::BitOr),
                TokenKind::Punct(Punct::CaretEq) => AssignOp::Binary(BinaryOp::BitXor),
                TokenKind::Punct(Punct::AmpAmpEq) => AssignOp::Logical(LogicalOp::And),
                TokenKind::Punct(Punct::PipePipeEq) => AssignOp::Logical(LogicalOp::Or),
                TokenKind::Punct(Punct::QuestionQuestionEq) => AssignOp::Logical(LogicalOp::Nullish),
                _ => {
                    self.error_unexpected();
                    return None;
                }
            };
            (op, 1)
        };

        if op != AssignOp::Assign && !is_simple_target(&lhs) {
            self.error(ParseError::InvalidAssignmentTarget { offset: start });
            return None;
        }
        let target = self.expr_to_pattern(lhs)?;
        self.bump_n(count);

        let value = self.parse_expression(right_bp)?;
        Some(self.finish_expr(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            start,
        ))
    }

    /// Parse `test ? cons : alt`
    fn parse_conditional(
        &mut self,
        test: Expr,
        right_bp: u8,
    ) -> Option<Expr> {
        let start = test.span.start;
        self.expect(Punct::Question)?;
        let cons = self.with_no_in(false, |s| s.parse_assignment())?;
        self.expect(Punct::Colon)?;
        let alt = self.parse_expression(right_bp)?;
        Some(self.finish_expr(
            ExprKind::Conditional {
                test: Box::new(test),
                cons: Box::new(cons),
                alt: Box::new(alt),
            },
            start,
        ))
    }

    /// Parse binary operator expression
    fn parse_binary(
        &mut self,
        lhs: Expr,
        right_bp: u8,
    ) -> Option<Expr> {
        let start = lhs.span.start;
        let (op, count) = if let Some((gt, count)) = self.gt_op() {
            let op = match gt {
                GtOp::Gt => BinaryOp::Gt,
                GtOp::Ge => BinaryOp::Ge,
                GtOp::Shr => BinaryOp::Shr,
                GtOp::UShr => BinaryOp::UShr,
                _ => {
                    self.error_unexpected();
                    return None;
                }
            };
            (Ok(op), count)
        } else {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Plus) => Ok(BinaryOp::Add),
                TokenKind::Punct(Punct::Minus) => Ok(BinaryOp::Sub),
                TokenKind::Punct(Punct::Star) => Ok(BinaryOp::Mul),
                TokenKind::Punct(Punct::Slash) => Ok(BinaryOp::Div),
                TokenKind::Punct(Punct::Percent) => Ok(BinaryOp::Mod),
                TokenKind::Punct(Punct::StarStar) => Ok(BinaryOp::Exp),
                TokenKind::Punct(Punct::EqEq) => Ok(BinaryOp::Eq),
                TokenKind::Punct(Punct::NotEq) => Ok(BinaryOp::NotEq),
                TokenKind::Punct(Punct::EqEqEq) => Ok(BinaryOp::StrictEq),
                TokenKind::Punct(Punct::NotEqEq) => Ok(BinaryOp::StrictNotEq),
                TokenKind::Punct(Punct::Lt) => Ok(BinaryOp::Lt),
                TokenKind::Punct(Punct::Le) => Ok(BinaryOp::Le),
                TokenKind::Punct(Punct::LtLt) => Ok(BinaryOp::Shl),
                TokenKind::Punct(Punct::Amp) => Ok(BinaryOp::BitAnd),
                TokenKind::Punct(Punct::Pipe) => Ok(BinaryOp::BitOr),
                TokenKind::Punct(Punct::Caret) => Ok(BinaryOp::BitXor),
                TokenKind::Keyword(Keyword::In) => Ok(BinaryOp::In),
                TokenKind::Keyword(Keyword::Instanceof) => Ok(BinaryOp::Instanceof),
                TokenKind::Punct(Punct::AmpAmp) => Err(LogicalOp::And),
                TokenKind::Punct(Punct::PipePipe) => Err(LogicalOp::Or),
                TokenKind::Punct(Punct::QuestionQuestion) => Err(LogicalOp::Nullish),
                _ => {
                    self.error_unexpected();
                    return None;
                }
            };
            (op, 1)
        };
        self.bump_n(count);

        let rhs = self.parse_expression(right_bp)?;
        let kind = match op {
            Ok(op) => ExprKind::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            },
            Err(op) => ExprKind::Logical {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            },
        };
        Some(self.finish_expr(kind, start))
    }

    /// Parse `expr as T` / `expr satisfies T`
    fn parse_as(
        &mut self,
        lhs: Expr,
        _right_bp: u8,
    ) -> Option<Expr> {
        let start = lhs.span.start;
        let type_start = self.start();
        self.bump();
        self.parse_type()?;
        self.strip(self.span_from(type_start));
        Some(self.finish_expr(ExprKind::TypeCast(Box::new(lhs)), start))
    }

    /// Parse postfix `x++` / `x--`
    fn parse_postfix_update(
        &mut self,
        lhs: Expr,
        _right_bp: u8,
    ) -> Option<Expr> {
        let start = lhs.span.start;
        if !is_simple_target(&lhs) {
            self.error(ParseError::InvalidAssignmentTarget { offset: start });
            return None;
        }
        let op = if self.at(Punct::PlusPlus) {
            UpdateOp::Inc
        } else {
            UpdateOp::Dec
        };
        self.bump();
        Some(self.finish_expr(
            ExprKind::Update {
                op,
                prefix: false,
                arg: Box::new(lhs),
            },
            start,
        ))
    }

    fn parse_chain_infix(
        &mut self,
        lhs: Expr,
        _right_bp: u8,
    ) -> Option<Expr> {
        self.parse_chain(lhs)
    }

    /// Parse a run of member accesses, calls, tagged templates and non-null
    /// assertions. A run containing `?.` is wrapped in one `OptChain` node.
    pub fn parse_chain(
        &mut self,
        lhs: Expr,
    ) -> Option<Expr> {
        let start = lhs.span.start;
        let (mut expr, mut has_optional) = match lhs.kind {
            ExprKind::OptChain(inner) => (*inner, true),
            kind => (
                Expr {
                    kind,
                    span: lhs.span,
                },
                false,
            ),
        };

        loop {
            match self.kind().clone() {
                TokenKind::Punct(Punct::Dot) => {
                    self.bump();
                    let property = self.parse_member_name()?;
                    expr = self.finish_expr(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::Punct(Punct::QuestionDot) => {
                    self.bump();
                    has_optional = true;
                    if let Some(span) = self.try_expr_type_args() {
                        self.strip(span);
                    }
                    if self.at(Punct::LParen) {
                        let args = self.parse_arguments()?;
                        expr = self.finish_expr(
                            ExprKind::Call {
                                callee: Box::new(expr),
                                args,
                                optional: true,
                            },
                            start,
                        );
                    } else if self.skip(Punct::LBracket) {
                        let index = self.with_no_in(false, |s| s.parse_expression_seq())?;
                        self.expect(Punct::RBracket)?;
                        expr = self.finish_expr(
                            ExprKind::Member {
                                object: Box::new(expr),
                                property: MemberProp::Computed(Box::new(index)),
                                optional: true,
                            },
                            start,
                        );
                    } else {
                        let property = self.parse_member_name()?;
                        expr = self.finish_expr(
                            ExprKind::Member {
                                object: Box::new(expr),
                                property,
                                optional: true,
                            },
                            start,
                        );
                    }
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.bump();
                    let index = self.with_no_in(false, |s| s.parse_expression_seq())?;
                    self.expect(Punct::RBracket)?;
                    expr = self.finish_expr(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: MemberProp::Computed(Box::new(index)),
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::Punct(Punct::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = self.finish_expr(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            optional: false,
                        },
                        start,
                    );
                }
                TokenKind::NoSubstitutionTemplate(_) | TokenKind::TemplateHead(_) => {
                    let quasi = self.parse_template()?;
                    expr = self.finish_expr(
                        ExprKind::TaggedTemplate {
                            tag: Box::new(expr),
                            quasi,
                        },
                        start,
                    );
                }
                TokenKind::Punct(Punct::Bang) if self.ts && !self.newline_before() => {
                    let bang = self.current().span;
                    self.bump();
                    self.strip(bang);
                    expr = self.finish_expr(ExprKind::TypeCast(Box::new(expr)), start);
                }
                TokenKind::Punct(Punct::Lt) if self.ts => match self.try_expr_type_args() {
                    Some(span) => self.strip(span),
                    None => break,
                },
                _ => break,
            }
        }

        if has_optional {
            let span = self.span_from(start);
            expr = Self::expr_at(ExprKind::OptChain(Box::new(expr)), span);
        }
        Some(expr)
    }
}

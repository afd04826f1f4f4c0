//! The AST-builder capability the engine consumes.  The host front end owns
//! real expression building (overload resolution, conversions); this module
//! reproduces the slice the engine needs: arithmetic and relational operators
//! over scalar operands, assignments, comma chains, conditional expressions,
//! and constant folding.  Construction returns `None` when the operands do
//! not admit the operator; callers treat that as a hard failure of whatever
//! rewrite they were assembling.

use log::debug;

use super::ast::{AstContext, BinOp, Callee, Expr, ExprId, Ty, TyId, UnaryOp};
use super::Span;

impl AstContext {
    /// Result type of an arithmetic operator over two operand types, or
    /// `None` when the operator does not apply.  Dependent operands yield the
    /// dependent type so analysis can be deferred rather than failed.
    fn arith_ty(&mut self, op: BinOp, l: TyId, r: TyId) -> Option<TyId> {
        let lt = self.tys.non_reference(l);
        let rt = self.tys.non_reference(r);
        if self.tys.is_dependent(lt) || self.tys.is_dependent(rt) {
            return Some(self.tys.add(Ty::Dependent));
        }
        // Pointer arithmetic: ptr +- int, and ptr - ptr.
        if self.tys.is_pointer(lt) {
            if op.is_additive() && self.tys.is_integer(rt) {
                return Some(lt);
            }
            if op == BinOp::Sub && self.tys.is_pointer(rt) {
                return Some(self.int_ty());
            }
            return None;
        }
        if self.tys.is_pointer(rt) {
            if op == BinOp::Add && self.tys.is_integer(lt) {
                return Some(rt);
            }
            return None;
        }
        if !self.tys.is_arithmetic(lt) || !self.tys.is_arithmetic(rt) {
            // Iterator difference is built through build_distance, not here.
            return None;
        }
        if matches!(op, BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor)
            && (self.tys.is_floating(lt) || self.tys.is_floating(rt))
        {
            return None;
        }
        if self.tys.is_floating(lt) || self.tys.is_floating(rt) {
            return Some(self.tys.add(Ty::Float));
        }
        if matches!(self.tys.get(lt), Ty::UInt) || matches!(self.tys.get(rt), Ty::UInt) {
            return Some(self.uint_ty());
        }
        Some(self.int_ty())
    }

    /// Builds a binary operator expression.  Relational and logical operators
    /// produce `bool`; everything else follows the usual arithmetic
    /// conversions.
    pub fn build_bin_op(&mut self, op: BinOp, l: ExprId, r: ExprId, span: Span) -> Option<ExprId> {
        let lt = self.exprs.ty(l);
        let rt = self.exprs.ty(r);
        let ty = if op.is_relational() || matches!(op, BinOp::Eq | BinOp::Ne) {
            let lt = self.tys.non_reference(lt);
            let rt = self.tys.non_reference(rt);
            if self.tys.is_dependent(lt) || self.tys.is_dependent(rt) {
                self.tys.add(Ty::Dependent)
            } else if (self.tys.is_scalar(lt) && self.tys.is_scalar(rt))
                || (self.tys.is_overloadable(lt) && self.tys.same_unqualified(lt, rt))
            {
                self.bool_ty()
            } else {
                debug!("build_bin_op: {:?} not applicable to operand types", op);
                return None;
            }
        } else if matches!(op, BinOp::And | BinOp::Or) {
            self.bool_ty()
        } else {
            match self.arith_ty(op, lt, rt) {
                Some(t) => t,
                None => {
                    debug!("build_bin_op: {:?} not applicable to operand types", op);
                    return None;
                }
            }
        };
        Some(self.exprs.add(Expr::Binary(op, l, r), ty, span))
    }

    pub fn build_unary(&mut self, op: UnaryOp, arg: ExprId, span: Span) -> Option<ExprId> {
        let at = self.tys.non_reference(self.exprs.ty(arg));
        let ty = match op {
            UnaryOp::Minus => {
                if self.tys.is_dependent(at) {
                    self.tys.add(Ty::Dependent)
                } else if self.tys.is_arithmetic(at) {
                    at
                } else {
                    return None;
                }
            }
            UnaryOp::Not => self.bool_ty(),
            UnaryOp::Deref => match self.tys.get(at) {
                Ty::Pointer(inner) => *inner,
                Ty::Dependent => at,
                _ => return None,
            },
            UnaryOp::AddrOf => {
                let t = self.exprs.ty(arg);
                self.tys.add(Ty::Pointer(t))
            }
        };
        Some(self.exprs.add(Expr::Unary(op, arg), ty, span))
    }

    /// `lhs = rhs`; the result has the lvalue's type.
    pub fn build_assign(&mut self, lhs: ExprId, rhs: ExprId, span: Span) -> ExprId {
        let ty = self.exprs.ty(lhs);
        self.exprs.add(Expr::Assign(lhs, rhs), ty, span)
    }

    pub fn build_compound_assign(
        &mut self,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Option<ExprId> {
        let lt = self.exprs.ty(lhs);
        let rt = self.exprs.ty(rhs);
        self.arith_ty(op, lt, rt)?;
        Some(self.exprs.add(Expr::CompoundAssign(op, lhs, rhs), lt, span))
    }

    pub fn build_comma(&mut self, l: ExprId, r: ExprId, span: Span) -> ExprId {
        let ty = self.exprs.ty(r);
        self.exprs.add(Expr::Comma(l, r), ty, span)
    }

    pub fn build_conditional(
        &mut self,
        cond: ExprId,
        then: ExprId,
        otherwise: ExprId,
        span: Span,
    ) -> Option<ExprId> {
        let tt = self.exprs.ty(then);
        let et = self.exprs.ty(otherwise);
        let ty = if self.tys.same_unqualified(tt, et) {
            tt
        } else {
            self.arith_ty(BinOp::Add, tt, et)?
        };
        Some(self.exprs.add(Expr::Conditional(cond, then, otherwise), ty, span))
    }

    /// Wraps a synthesized statement expression in a discard-value
    /// conversion so downstream consumers see an expression of void shape.
    pub fn build_to_void(&mut self, e: ExprId, span: Span) -> ExprId {
        let ty = self.exprs.ty(e);
        self.exprs.add(Expr::ToVoid(e), ty, span)
    }

    pub fn build_var_ref(&mut self, var: super::ast::VarId, span: Span) -> ExprId {
        let ty = self.vars.get(var).ty;
        self.exprs.add(Expr::VarRef(var), ty, span)
    }

    /// The distance between two iterator expressions, as the host's
    /// `std::distance` template lookup would produce it.  Only defined for
    /// random-access iterator class types.
    pub fn build_distance(&mut self, from: ExprId, to: ExprId, span: Span) -> Option<ExprId> {
        let ft = self.tys.non_reference(self.exprs.ty(from));
        if !self.tys.is_overloadable(ft) {
            return None;
        }
        let ty = self.int_ty();
        Some(self.exprs.add(Expr::Call(Callee::Distance, vec![from, to]), ty, span))
    }

    pub fn build_call(&mut self, callee: Callee, args: Vec<ExprId>, ty: TyId, span: Span) -> ExprId {
        self.exprs.add(Expr::Call(callee, args), ty, span)
    }

    pub fn build_sizeof(&mut self, ty: TyId, span: Span) -> ExprId {
        let uint = self.uint_ty();
        self.exprs.add(Expr::SizeOf(ty), uint, span)
    }

    /// Constant-folds an expression to an integer value.  Returns `None` for
    /// anything that is not a compile-time integer constant.
    pub fn eval_const(&self, e: ExprId) -> Option<i64> {
        match self.exprs.get(e) {
            Expr::IntLit(v) => Some(*v),
            Expr::Unary(UnaryOp::Minus, arg) => self.eval_const(*arg).map(|v| -v),
            Expr::Binary(op, l, r) => {
                let l = self.eval_const(*l)?;
                let r = self.eval_const(*r)?;
                match op {
                    BinOp::Add => Some(l + r),
                    BinOp::Sub => Some(l - r),
                    BinOp::Mul => Some(l * r),
                    BinOp::Div => {
                        if r == 0 {
                            None
                        } else {
                            Some(l / r)
                        }
                    }
                    BinOp::Rem => {
                        if r == 0 {
                            None
                        } else {
                            Some(l % r)
                        }
                    }
                    BinOp::Lt => Some((l < r) as i64),
                    BinOp::Le => Some((l <= r) as i64),
                    BinOp::Gt => Some((l > r) as i64),
                    BinOp::Ge => Some((l >= r) as i64),
                    BinOp::Eq => Some((l == r) as i64),
                    BinOp::Ne => Some((l != r) as i64),
                    BinOp::And => Some(((l != 0) && (r != 0)) as i64),
                    BinOp::Or => Some(((l != 0) || (r != 0)) as i64),
                    BinOp::BitAnd => Some(l & r),
                    BinOp::BitOr => Some(l | r),
                    BinOp::BitXor => Some(l ^ r),
                }
            }
            Expr::Comma(_, r) => self.eval_const(*r),
            Expr::ToVoid(inner) | Expr::Cast(inner) => self.eval_const(*inner),
            _ => None,
        }
    }

    /// Whether the expression can be evaluated at compile time.  Non-constant
    /// clause arguments get hoisted into synthesized variables.
    pub fn is_evaluatable(&self, e: ExprId) -> bool {
        self.eval_const(e).is_some()
    }
}

//! Shared scaffolding for the semantic engine tests: a small in-memory
//! compilation unit with helpers for declaring variables, classes and
//! statements, plus a tiny expression interpreter used to exercise the
//! rewrites the engine synthesizes.

use std::collections::HashMap;

use crate::sema::ast::{
    AstContext, BinOp, ClassInfo, Expr, ExprId, MemberFn, ScopeId, StorageClass, Stmt, StmtId, Ty,
    TyId, UnaryOp, Var, VarId,
};
use crate::sema::diag::BufferedReporter;
use crate::sema::engine::Sema;
use crate::sema::Span;

pub(crate) struct Fixture {
    pub sema: Sema<BufferedReporter>,
    /// The function body scope directives in these tests hang off.
    pub fn_scope: ScopeId,
    next_offset: u32,
}

impl Fixture {
    pub fn new() -> Fixture {
        let mut ctx = AstContext::new();
        let fn_scope = ctx.scopes.add(None);
        Fixture {
            sema: Sema::new(ctx, BufferedReporter::new()),
            fn_scope,
            next_offset: 1,
        }
    }

    /// A fresh, unique span; reference-site assertions rely on every
    /// clause entry having its own.
    pub fn span(&mut self) -> Span {
        let o = self.next_offset;
        self.next_offset += 10;
        Span::at(o)
    }

    pub fn child_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.sema.ctx.scopes.add(Some(parent))
    }

    pub fn int_ty(&mut self) -> TyId {
        self.sema.ctx.int_ty()
    }

    fn add_var(&mut self, name: &str, ty: TyId, scope: Option<ScopeId>, global: bool) -> VarId {
        let name = self.sema.ctx.intern(name);
        let decl_span = self.span();
        self.sema.ctx.vars.add(Var {
            name,
            ty,
            storage: StorageClass::None,
            scope,
            decl_span,
            is_global: global,
            is_static_local: false,
            is_static_member: false,
            is_tls: false,
            is_synthetic: false,
        })
    }

    /// A function-local automatic variable declared in `scope`.
    pub fn local(&mut self, name: &str, ty: TyId, scope: ScopeId) -> VarId {
        self.add_var(name, ty, Some(scope), false)
    }

    pub fn local_int(&mut self, name: &str, scope: ScopeId) -> VarId {
        let ty = self.int_ty();
        self.local(name, ty, scope)
    }

    /// A file-scope variable.
    pub fn global(&mut self, name: &str, ty: TyId) -> VarId {
        self.add_var(name, ty, None, true)
    }

    pub fn global_int(&mut self, name: &str) -> VarId {
        let ty = self.int_ty();
        self.global(name, ty)
    }

    /// A class with every special member available.
    pub fn class_ty(&mut self, name: &str) -> TyId {
        self.class_ty_with(name, |_| ())
    }

    /// A class whose special members can be customized by the caller.
    pub fn class_ty_with(&mut self, name: &str, adjust: impl FnOnce(&mut ClassInfo)) -> TyId {
        let name = self.sema.ctx.intern(name);
        let decl_span = self.span();
        let mut info = ClassInfo {
            name,
            default_ctor: MemberFn::Available,
            copy_ctor: MemberFn::Available,
            copy_assign: MemberFn::Available,
            dtor: MemberFn::Available,
            has_mutable_fields: false,
            trivially_copyable: false,
            bases: vec![],
            conversions: vec![],
            decl_span,
        };
        adjust(&mut info);
        let class = self.sema.ctx.classes.add(info);
        self.sema.ctx.tys.add(Ty::Class(class))
    }

    pub fn var_ref(&mut self, var: VarId) -> ExprId {
        let span = self.span();
        self.sema.ctx.build_var_ref(var, span)
    }

    pub fn int_lit(&mut self, value: i64) -> ExprId {
        let span = self.span();
        self.sema.ctx.int_literal(value, span)
    }

    pub fn stmt(&mut self, stmt: Stmt) -> StmtId {
        let span = self.span();
        self.sema.ctx.stmts.add(stmt, span)
    }

    pub fn empty_body(&mut self) -> StmtId {
        self.stmt(Stmt::Compound(vec![]))
    }

    /// `for (var = lb; var relop bound; var += step) body` with the pieces
    /// spelled out.  `relop` is the comparison with the variable on the
    /// left-hand side.
    pub fn for_loop(
        &mut self,
        var: VarId,
        lb: i64,
        relop: BinOp,
        bound: i64,
        step: i64,
        body: Option<StmtId>,
    ) -> StmtId {
        let var_ref = self.var_ref(var);
        let lb = self.int_lit(lb);
        let span = self.span();
        let assign = self.sema.ctx.build_assign(var_ref, lb, span);
        let init = self.stmt(Stmt::Expr(assign));

        let var_ref = self.var_ref(var);
        let bound = self.int_lit(bound);
        let span = self.span();
        let cond = self
            .sema
            .ctx
            .build_bin_op(relop, var_ref, bound, span)
            .unwrap();

        let var_ref = self.var_ref(var);
        let span = self.span();
        let inc = if step == 1 {
            self.sema.ctx.exprs.add(
                Expr::IncDec {
                    arg: var_ref,
                    is_inc: true,
                    is_prefix: false,
                },
                self.sema.ctx.exprs.ty(var_ref),
                span,
            )
        } else {
            let (op, magnitude) = if step < 0 {
                (BinOp::Sub, -step)
            } else {
                (BinOp::Add, step)
            };
            let step = self.int_lit(magnitude);
            self.sema
                .ctx
                .build_compound_assign(op, var_ref, step, span)
                .unwrap()
        };

        let body = Some(body.unwrap_or_else(|| self.empty_body()));
        self.stmt(Stmt::For {
            init: Some(init),
            cond: Some(cond),
            inc: Some(inc),
            body,
        })
    }

    pub fn diagnostics(&self) -> &[crate::sema::diag::Diagnostic] {
        self.sema.reporter().diagnostics()
    }

    pub fn error_count(&self) -> usize {
        self.sema.reporter().error_count()
    }
}

/// Evaluates an expression tree against a mutable variable environment,
/// including the assignment and comma forms the collapse rewrite produces.
/// Only the operations the tests need are supported.
pub(crate) fn eval_with_env(
    ctx: &AstContext,
    env: &mut HashMap<VarId, i64>,
    e: ExprId,
) -> i64 {
    match ctx.exprs.get(e).clone() {
        Expr::IntLit(v) => v,
        Expr::VarRef(v) => *env.get(&v).unwrap_or(&0),
        Expr::Unary(UnaryOp::Minus, a) => -eval_with_env(ctx, env, a),
        Expr::Binary(op, l, r) => {
            let l = eval_with_env(ctx, env, l);
            let r = eval_with_env(ctx, env, r);
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Rem => l % r,
                BinOp::Lt => (l < r) as i64,
                BinOp::Le => (l <= r) as i64,
                BinOp::Gt => (l > r) as i64,
                BinOp::Ge => (l >= r) as i64,
                _ => panic!("operator not supported by the test evaluator"),
            }
        }
        Expr::Assign(lhs, rhs) => {
            let value = eval_with_env(ctx, env, rhs);
            let var = ctx.exprs.as_var_ref(lhs).expect("assignment to a variable");
            env.insert(var, value);
            value
        }
        Expr::CompoundAssign(op, lhs, rhs) => {
            let var = ctx.exprs.as_var_ref(lhs).expect("assignment to a variable");
            let old = *env.get(&var).unwrap_or(&0);
            let rhs = eval_with_env(ctx, env, rhs);
            let value = match op {
                BinOp::Add => old + rhs,
                BinOp::Sub => old - rhs,
                BinOp::Mul => old * rhs,
                _ => panic!("operator not supported by the test evaluator"),
            };
            env.insert(var, value);
            value
        }
        Expr::Comma(l, r) => {
            eval_with_env(ctx, env, l);
            eval_with_env(ctx, env, r)
        }
        Expr::ToVoid(inner) | Expr::Cast(inner) => eval_with_env(ctx, env, inner),
        other => panic!("expression not supported by the test evaluator: {:?}", other),
    }
}

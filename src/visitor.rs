// Copyright 2021 - 2025 Unleash Mutants Contributors

//! AST Walker & Mutation Catalogue (§4.1): walks every node of a parsed
//! source file, runs token-swap and expression-rewrite detection, and
//! assigns each emitted mutant its initial `NotCovered`/`Runnable`/`Skipped`
//! status.
//!
//! Grounded in the teacher's `visit.rs` `DiscoveryVisitor`, but rebuilt
//! around [`crate::mutation_kind`]'s literal catalogue/rewrite tables
//! instead of per-operator `quote!` replacement lists, since candidate
//! kinds here are looked up rather than hard-coded per match arm.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{Attribute, BinOp, UnOp};

use crate::coverage::CoverageProfile;
use crate::diff::DiffScope;
use crate::config::Config;
use crate::mutant::{token_swap_rewrite, Mutant, Rewrite};
use crate::mutation_kind::{candidate_kinds, MutationKind, TokenKind};
use crate::source::SourceFile;
use crate::span::Span;
use crate::status::Status;
use crate::Result;

/// Map a `syn::BinOp` onto the token catalogue, for operators we mutate.
///
/// Shift operators have no catalogue entry (§4.1 "illegal / unparseable
/// tokens are ignored silently"), so they fall through to `None`.
fn token_for_binop(op: &BinOp) -> Option<TokenKind> {
    match op {
        BinOp::Add(_) => Some(TokenKind::Add),
        BinOp::Sub(_) => Some(TokenKind::Sub),
        BinOp::Mul(_) => Some(TokenKind::Mul),
        BinOp::Div(_) => Some(TokenKind::Div),
        BinOp::Rem(_) => Some(TokenKind::Rem),
        BinOp::Eq(_) => Some(TokenKind::Eq),
        BinOp::Ne(_) => Some(TokenKind::Ne),
        BinOp::Lt(_) => Some(TokenKind::Lt),
        BinOp::Le(_) => Some(TokenKind::Le),
        BinOp::Gt(_) => Some(TokenKind::Gt),
        BinOp::Ge(_) => Some(TokenKind::Ge),
        BinOp::And(_) => Some(TokenKind::And),
        BinOp::Or(_) => Some(TokenKind::Or),
        BinOp::BitAnd(_) => Some(TokenKind::BitAnd),
        BinOp::BitOr(_) => Some(TokenKind::BitOr),
        BinOp::BitXor(_) => Some(TokenKind::BitXor),
        BinOp::AddAssign(_) => Some(TokenKind::AddAssign),
        BinOp::SubAssign(_) => Some(TokenKind::SubAssign),
        BinOp::MulAssign(_) => Some(TokenKind::MulAssign),
        BinOp::DivAssign(_) => Some(TokenKind::DivAssign),
        BinOp::RemAssign(_) => Some(TokenKind::RemAssign),
        BinOp::BitAndAssign(_) => Some(TokenKind::BitAndAssign),
        BinOp::BitOrAssign(_) => Some(TokenKind::BitOrAssign),
        BinOp::BitXorAssign(_) => Some(TokenKind::BitXorAssign),
        _ => None,
    }
}

/// Derive the package name for a file (§4.1): walk the tree-relative
/// directory components upward looking for one whose name matches the
/// module name; prepend the module name to whatever sits below the match.
/// If no ancestor matches, the package is just the module name.
pub fn derive_package_name(module_name: &str, tree_relative: &Utf8Path) -> String {
    let dir = tree_relative.parent().unwrap_or_else(|| Utf8Path::new(""));
    for ancestor in dir.ancestors() {
        if ancestor.file_name().is_some_and(|name| name == module_name) {
            let mut joined = Utf8PathBuf::from(module_name);
            if let Ok(below) = dir.strip_prefix(ancestor) {
                if !below.as_str().is_empty() {
                    joined.push(below);
                }
            }
            return joined.as_str().replace('\\', "/");
        }
    }
    module_name.to_string()
}

/// True if the attrs carry `#[cfg_attr(unleash, skip)]` (§4.1 "added":
/// annotation-based opt-out, grounded in the teacher's
/// `#[mutants::skip]`/`annotation.rs` mechanism).
fn attrs_skip(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident("cfg_attr") {
            return false;
        }
        let mut skip = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("unleash") || meta.path.is_ident("skip") {
                skip = true;
            }
            Ok(())
        });
        skip
    })
}

/// True if the source line immediately above `line` (1-based) contains a
/// `unleash:skip` line comment.
fn comment_skip(source_lines: &[&str], line: usize) -> bool {
    line > 1
        && source_lines
            .get(line - 2)
            .is_some_and(|text| text.contains("unleash:skip"))
}

struct Walker<'c> {
    source_file: Arc<SourceFile>,
    source_lines: Vec<&'c str>,
    config: &'c Config,
    coverage: &'c CoverageProfile,
    diff_scope: &'c DiffScope,
    mutants: Vec<Mutant>,
}

impl<'c> Walker<'c> {
    fn skip(&self, attrs: &[Attribute], span: &Span) -> bool {
        attrs_skip(attrs) || comment_skip(&self.source_lines, span.start.line)
    }

    /// Emit one mutant for `(kind, token)` at `span`, assigning its initial
    /// status from coverage and diff scope (§4.1).
    fn emit(&mut self, kind: MutationKind, span: Span, rewrite: Rewrite) {
        if !self.config.kind_enabled(kind) {
            // Skip, don't return: other candidate kinds for this same token
            // must still be considered (§9 Open Question resolution).
            return;
        }
        let tree_relative = self.source_file.tree_relative.clone();
        let position = crate::position::Position::new(tree_relative.clone(), span.start.line, span.start.column);
        let mut status = Status::NotCovered;
        if self.coverage.is_covered(&position) {
            status = status.promote_covered();
        }
        if !self.diff_scope.is_in_diff(&tree_relative, span.start.line) {
            status = status.demote_skipped();
        }
        self.mutants.push(Mutant {
            kind,
            package: Arc::clone(&self.source_file.package),
            source_file: Arc::clone(&self.source_file),
            span,
            rewrite,
            initial_status: status,
        });
    }

    fn emit_token_swap_candidates(&mut self, token: TokenKind, span: Span) {
        for &kind in candidate_kinds(token) {
            let rewrite = token_swap_rewrite(kind, token);
            self.emit(kind, span, rewrite);
        }
    }
}

impl<'ast> Visit<'ast> for Walker<'_> {
    fn visit_expr_binary(&mut self, i: &'ast syn::ExprBinary) {
        let span: Span = i.op.span().into();
        if self.skip(&i.attrs, &span) {
            return;
        }
        if let Some(token) = token_for_binop(&i.op) {
            self.emit_token_swap_candidates(token, span);
        }
        syn::visit::visit_expr_binary(self, i);
    }

    fn visit_expr_unary(&mut self, i: &'ast syn::ExprUnary) {
        let span: Span = i.op.span().into();
        if self.skip(&i.attrs, &span) {
            return;
        }
        match i.op {
            UnOp::Neg(_) => self.emit_token_swap_candidates(TokenKind::Neg, span),
            UnOp::Not(_) => {
                // The only expression-rewrite kind (§3): wrap `!x` as `!(!x)`
                // rather than swapping a token.
                if self.config.kind_enabled(MutationKind::InvertLogicalNot) {
                    let original = span_covering_expr(i);
                    let text = original.extract(self.source_file.code());
                    self.emit(
                        MutationKind::InvertLogicalNot,
                        original,
                        Rewrite::ExpressionRewrite { replacement: format!("!({text})") },
                    );
                }
            }
            _ => {}
        }
        syn::visit::visit_expr_unary(self, i);
    }

    fn visit_expr_break(&mut self, i: &'ast syn::ExprBreak) {
        let span: Span = i.break_token.span().into();
        if !self.skip(&i.attrs, &span) {
            self.emit_token_swap_candidates(TokenKind::Break, span);
        }
        syn::visit::visit_expr_break(self, i);
    }

    fn visit_expr_continue(&mut self, i: &'ast syn::ExprContinue) {
        let span: Span = i.continue_token.span().into();
        if !self.skip(&i.attrs, &span) {
            self.emit_token_swap_candidates(TokenKind::Continue, span);
        }
        syn::visit::visit_expr_continue(self, i);
    }
}

/// Span of the whole unary expression (operator plus operand), used for the
/// `InvertLogicalNot` expression rewrite so the captured text is the full
/// `!x` rather than just the `!` token.
fn span_covering_expr(i: &syn::ExprUnary) -> Span {
    i.span().into()
}

/// Discover every mutant in one source file (§4.1).
///
/// Emission rules already applied by the caller: test-file-suffix files,
/// excluded files, and non-`.rs` files never reach here (`source.rs`).
/// Illegal/unparseable files are reported as a parse error rather than
/// silently skipped, since a whole-file parse failure is not one of the
/// "illegal token" cases the spec means to ignore.
pub fn discover_file(
    source_file: Arc<SourceFile>,
    config: &Config,
    coverage: &CoverageProfile,
    diff_scope: &DiffScope,
) -> Result<Vec<Mutant>> {
    use anyhow::Context;
    let syn_file = syn::parse_str::<syn::File>(source_file.code())
        .with_context(|| format!("parse {}", source_file.tree_relative_slashes()))?;
    let source_lines: Vec<&str> = source_file.code().lines().collect();
    let mut walker = Walker {
        source_file,
        source_lines,
        config,
        coverage,
        diff_scope,
        mutants: Vec::new(),
    };
    walker.visit_file(&syn_file);
    Ok(walker.mutants)
}

// Copyright 2021 - 2025 Unleash Mutants Contributors

//! The closed set of mutation kinds, and the literal tables that drive
//! token-swap detection and rewriting.
//!
//! Adapted from the teacher's per-operator match arms in `visit.rs`
//! (`visit_expr_binary`/`visit_expr_unary`), which pick replacement tokens
//! per `syn::BinOp`/`syn::UnOp` variant. Here the table is keyed by our own
//! [`TokenKind`] so that several [`MutationKind`]s can legitimately share one
//! physical operator token, as required by §4.1.

use strum::{Display, EnumString};

/// A mutable operator token that the walker can recognise on an AST node.
///
/// This is independent of `syn`'s own operator types so that the catalogue
/// below can be a plain literal table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TokenKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Break,
    Continue,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    BitAnd,
    BitOr,
    BitXor,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    /// The plain `=` assignment token. Never emitted as a mutation
    /// *source*, only ever used as a rewrite *target*.
    PlainAssign,
}

impl TokenKind {
    /// The literal source text for this token, used when splicing text.
    pub fn text(self) -> &'static str {
        use TokenKind::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Neg => "-",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            And => "&&",
            Or => "||",
            Not => "!",
            Break => "break",
            Continue => "continue",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            RemAssign => "%=",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            BitAndAssign => "&=",
            BitOrAssign => "|=",
            BitXorAssign => "^=",
            PlainAssign => "=",
        }
    }
}

/// The closed set of mutation kinds (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum MutationKind {
    ArithmeticBase,
    ConditionalsBoundary,
    ConditionalsNegation,
    IncrementDecrement,
    InvertNegatives,
    InvertLogical,
    InvertLoopCtrl,
    InvertAssignments,
    InvertBitwise,
    InvertBitwiseAssignments,
    RemoveSelfAssignments,
    InvertLogicalNot,
}

impl MutationKind {
    /// All kinds, in declaration order; used to build default-enabled maps
    /// and to enumerate `mutants.<kind-slug>.enabled` configuration keys.
    pub const ALL: &'static [MutationKind] = &[
        MutationKind::ArithmeticBase,
        MutationKind::ConditionalsBoundary,
        MutationKind::ConditionalsNegation,
        MutationKind::IncrementDecrement,
        MutationKind::InvertNegatives,
        MutationKind::InvertLogical,
        MutationKind::InvertLoopCtrl,
        MutationKind::InvertAssignments,
        MutationKind::InvertBitwise,
        MutationKind::InvertBitwiseAssignments,
        MutationKind::RemoveSelfAssignments,
        MutationKind::InvertLogicalNot,
    ];

    /// The config-file/CLI slug for this kind, e.g. `conditionals-boundary`.
    pub fn slug(self) -> String {
        self.to_string()
    }

    /// Whether this kind is enabled unless the configuration says otherwise.
    ///
    /// Only `InvertLogical` defaults to off (§3): swapping `&&`/`||` very
    /// often produces a mutant that's logically equivalent once short
    /// circuiting is accounted for, so in the teacher's corpus this class of
    /// mutation is the noisiest and is opt-in.
    pub fn default_enabled(self) -> bool {
        !matches!(self, MutationKind::InvertLogical)
    }

    /// `true` for the one kind that requires structural (expression) rewrite
    /// rather than a single-token swap (§3, §4.1, §4.2).
    pub fn is_expression_rewrite(self) -> bool {
        matches!(self, MutationKind::InvertLogicalNot)
    }
}

/// The `TokenKind -> {MutationKind...}` catalogue (§4.1).
///
/// A literal constant table: for a given operator token, the list of
/// mutation kinds that could plausibly replace it. More than one kind may
/// name the same token (e.g. `Lt` supports both a boundary shift and a
/// negation); the walker emits one mutant per enabled kind in the list.
pub const TOKEN_CATALOGUE: &[(TokenKind, &[MutationKind])] = &[
    (TokenKind::Add, &[MutationKind::ArithmeticBase]),
    (TokenKind::Sub, &[MutationKind::ArithmeticBase]),
    (TokenKind::Mul, &[MutationKind::ArithmeticBase]),
    (TokenKind::Div, &[MutationKind::ArithmeticBase]),
    (TokenKind::Rem, &[MutationKind::ArithmeticBase]),
    (TokenKind::Neg, &[MutationKind::InvertNegatives]),
    (TokenKind::Eq, &[MutationKind::ConditionalsNegation]),
    (TokenKind::Ne, &[MutationKind::ConditionalsNegation]),
    (
        TokenKind::Lt,
        &[
            MutationKind::ConditionalsBoundary,
            MutationKind::ConditionalsNegation,
        ],
    ),
    (
        TokenKind::Le,
        &[
            MutationKind::ConditionalsBoundary,
            MutationKind::ConditionalsNegation,
        ],
    ),
    (
        TokenKind::Gt,
        &[
            MutationKind::ConditionalsBoundary,
            MutationKind::ConditionalsNegation,
        ],
    ),
    (
        TokenKind::Ge,
        &[
            MutationKind::ConditionalsBoundary,
            MutationKind::ConditionalsNegation,
        ],
    ),
    (TokenKind::And, &[MutationKind::InvertLogical]),
    (TokenKind::Or, &[MutationKind::InvertLogical]),
    (TokenKind::Break, &[MutationKind::InvertLoopCtrl]),
    (TokenKind::Continue, &[MutationKind::InvertLoopCtrl]),
    (
        TokenKind::AddAssign,
        &[
            MutationKind::InvertAssignments,
            MutationKind::IncrementDecrement,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (
        TokenKind::SubAssign,
        &[
            MutationKind::InvertAssignments,
            MutationKind::IncrementDecrement,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (
        TokenKind::MulAssign,
        &[
            MutationKind::InvertAssignments,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (
        TokenKind::DivAssign,
        &[
            MutationKind::InvertAssignments,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (
        TokenKind::RemAssign,
        &[
            MutationKind::InvertAssignments,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (TokenKind::BitAnd, &[MutationKind::InvertBitwise]),
    (TokenKind::BitOr, &[MutationKind::InvertBitwise]),
    (TokenKind::BitXor, &[MutationKind::InvertBitwise]),
    (
        TokenKind::BitAndAssign,
        &[
            MutationKind::InvertBitwiseAssignments,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (
        TokenKind::BitOrAssign,
        &[
            MutationKind::InvertBitwiseAssignments,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
    (
        TokenKind::BitXorAssign,
        &[
            MutationKind::InvertBitwiseAssignments,
            MutationKind::RemoveSelfAssignments,
        ],
    ),
];

/// Look up the candidate kinds for a token in [`TOKEN_CATALOGUE`].
pub fn candidate_kinds(token: TokenKind) -> &'static [MutationKind] {
    TOKEN_CATALOGUE
        .iter()
        .find(|(t, _)| *t == token)
        .map(|(_, kinds)| *kinds)
        .unwrap_or(&[])
}

/// The `MutationKind -> (TokenKind -> TokenKind)` rewrite table (§4.1).
///
/// Each entry is `(kind, from, to)`. `InvertNegatives` has no destination
/// token: the minus sign is simply deleted, which [`rewrite_for`] reports by
/// returning `None` for the replacement text while still matching the
/// `(kind, from)` pair.
///
/// Per the Open Question in §9: `RemoveSelfAssignments` is mapped here to
/// [`TokenKind::PlainAssign`] (not to itself), resolving the documented
/// legacy no-op bug as directed.
pub const REWRITE_TABLE: &[(MutationKind, TokenKind, TokenKind)] = &[
    (MutationKind::ArithmeticBase, TokenKind::Add, TokenKind::Sub),
    (MutationKind::ArithmeticBase, TokenKind::Sub, TokenKind::Add),
    (MutationKind::ArithmeticBase, TokenKind::Mul, TokenKind::Div),
    (MutationKind::ArithmeticBase, TokenKind::Div, TokenKind::Mul),
    (MutationKind::ArithmeticBase, TokenKind::Rem, TokenKind::Mul),
    (MutationKind::ConditionalsBoundary, TokenKind::Lt, TokenKind::Le),
    (MutationKind::ConditionalsBoundary, TokenKind::Le, TokenKind::Lt),
    (MutationKind::ConditionalsBoundary, TokenKind::Gt, TokenKind::Ge),
    (MutationKind::ConditionalsBoundary, TokenKind::Ge, TokenKind::Gt),
    (MutationKind::ConditionalsNegation, TokenKind::Eq, TokenKind::Ne),
    (MutationKind::ConditionalsNegation, TokenKind::Ne, TokenKind::Eq),
    (MutationKind::ConditionalsNegation, TokenKind::Lt, TokenKind::Ge),
    (MutationKind::ConditionalsNegation, TokenKind::Ge, TokenKind::Lt),
    (MutationKind::ConditionalsNegation, TokenKind::Gt, TokenKind::Le),
    (MutationKind::ConditionalsNegation, TokenKind::Le, TokenKind::Gt),
    (MutationKind::InvertLogical, TokenKind::And, TokenKind::Or),
    (MutationKind::InvertLogical, TokenKind::Or, TokenKind::And),
    (MutationKind::InvertLoopCtrl, TokenKind::Break, TokenKind::Continue),
    (MutationKind::InvertLoopCtrl, TokenKind::Continue, TokenKind::Break),
    (
        MutationKind::InvertAssignments,
        TokenKind::AddAssign,
        TokenKind::SubAssign,
    ),
    (
        MutationKind::InvertAssignments,
        TokenKind::SubAssign,
        TokenKind::AddAssign,
    ),
    (
        MutationKind::InvertAssignments,
        TokenKind::MulAssign,
        TokenKind::DivAssign,
    ),
    (
        MutationKind::InvertAssignments,
        TokenKind::DivAssign,
        TokenKind::MulAssign,
    ),
    (
        MutationKind::InvertAssignments,
        TokenKind::RemAssign,
        TokenKind::MulAssign,
    ),
    (
        MutationKind::IncrementDecrement,
        TokenKind::AddAssign,
        TokenKind::SubAssign,
    ),
    (
        MutationKind::IncrementDecrement,
        TokenKind::SubAssign,
        TokenKind::AddAssign,
    ),
    (MutationKind::InvertBitwise, TokenKind::BitAnd, TokenKind::BitOr),
    (MutationKind::InvertBitwise, TokenKind::BitOr, TokenKind::BitAnd),
    (MutationKind::InvertBitwise, TokenKind::BitXor, TokenKind::BitAnd),
    (
        MutationKind::InvertBitwiseAssignments,
        TokenKind::BitAndAssign,
        TokenKind::BitOrAssign,
    ),
    (
        MutationKind::InvertBitwiseAssignments,
        TokenKind::BitOrAssign,
        TokenKind::BitAndAssign,
    ),
    (
        MutationKind::InvertBitwiseAssignments,
        TokenKind::BitXorAssign,
        TokenKind::BitAndAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::AddAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::SubAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::MulAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::DivAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::RemAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::BitAndAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::BitOrAssign,
        TokenKind::PlainAssign,
    ),
    (
        MutationKind::RemoveSelfAssignments,
        TokenKind::BitXorAssign,
        TokenKind::PlainAssign,
    ),
];

/// Resolve the replacement token for `(kind, from)`, per [`REWRITE_TABLE`].
///
/// Returns `None` if there is no entry (the kind is `InvertNegatives`, which
/// deletes the token rather than swapping it, or the pair is simply absent).
pub fn rewrite_for(kind: MutationKind, from: TokenKind) -> Option<TokenKind> {
    REWRITE_TABLE
        .iter()
        .find(|(k, f, _)| *k == kind && *f == from)
        .map(|(_, _, to)| *to)
}

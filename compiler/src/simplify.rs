// simplify.rs — Minimal symbolic simplifier for size expressions
//
// Stands in for the front end's expression algebra. Folds integer constants
// and applies the additive/multiplicative identities; anything else is left
// symbolic. Enough to turn `1 * 64 * 64` into `4096` and `1 * a.extent.0`
// into `a.extent.0`.
//
// Preconditions: none.
// Postconditions: the result is semantically equal to the input.
// Failure modes: none (division by a constant zero is left unfolded).
// Side effects: none.

use crate::ir::{BinOp, Expr, Type, TypeCode};

/// Simplify an expression bottom-up.
pub fn simplify(e: &Expr) -> Expr {
    match e {
        Expr::Binary { op, a, b } => fold_binary(*op, simplify(a), simplify(b)),
        Expr::Cast { ty, value } => {
            let value = simplify(value);
            match value {
                Expr::IntImm { value: v, .. } if !ty.is_float() && !ty.is_handle() => {
                    Expr::IntImm {
                        value: wrap_to(*ty, v),
                        ty: *ty,
                    }
                }
                other => Expr::Cast {
                    ty: *ty,
                    value: Box::new(other),
                },
            }
        }
        Expr::Not(inner) => Expr::Not(Box::new(simplify(inner))),
        Expr::Select {
            condition,
            true_value,
            false_value,
        } => Expr::Select {
            condition: Box::new(simplify(condition)),
            true_value: Box::new(simplify(true_value)),
            false_value: Box::new(simplify(false_value)),
        },
        Expr::Load { name, ty, index } => Expr::Load {
            name: name.clone(),
            ty: *ty,
            index: Box::new(simplify(index)),
        },
        Expr::Call { name, ty, args } => Expr::Call {
            name: name.clone(),
            ty: *ty,
            args: args.iter().map(simplify).collect(),
        },
        Expr::IntImm { .. }
        | Expr::FloatImm { .. }
        | Expr::StringImm(_)
        | Expr::Variable { .. } => e.clone(),
    }
}

/// Value of `v` after a C++ conversion to the integer type `ty`.
fn wrap_to(ty: Type, v: i64) -> i64 {
    let bits = ty.bits;
    if ty.code == TypeCode::UInt && bits == 1 {
        return i64::from(v != 0);
    }
    if bits == 0 || bits >= 64 {
        return v;
    }
    let mask = (1u64 << bits) - 1;
    let low = v as u64 & mask;
    match ty.code {
        TypeCode::Int if low >> (bits - 1) == 1 => (low | !mask) as i64,
        _ => low as i64,
    }
}

/// `simplify(a * b)`, the step used to accumulate buffer sizes.
pub fn mul(a: &Expr, b: &Expr) -> Expr {
    simplify(&Expr::mul(a.clone(), b.clone()))
}

/// Product of all expressions, starting from `1`.
pub fn product<'e>(factors: impl IntoIterator<Item = &'e Expr>) -> Expr {
    factors
        .into_iter()
        .fold(Expr::int(1), |acc, f| mul(&acc, f))
}

/// Constant integer value after simplification, if any.
pub fn const_int(e: &Expr) -> Option<i64> {
    simplify(e).as_int()
}

fn fold_binary(op: BinOp, a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        let ty = result_type(&a, &b);
        let folded = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            BinOp::Div if y != 0 => Some(x.div_euclid(y)),
            BinOp::Mod if y != 0 => Some(x.rem_euclid(y)),
            BinOp::Min => Some(x.min(y)),
            BinOp::Max => Some(x.max(y)),
            _ => None,
        };
        if let Some(value) = folded {
            return Expr::IntImm { value, ty };
        }
    }

    match (op, a.as_int(), b.as_int()) {
        (BinOp::Mul, Some(1), _) => b,
        (BinOp::Mul, _, Some(1)) => a,
        (BinOp::Mul, Some(0), _) | (BinOp::Mul, _, Some(0)) => Expr::IntImm {
            value: 0,
            ty: result_type(&a, &b),
        },
        (BinOp::Add, Some(0), _) => b,
        (BinOp::Add, _, Some(0)) | (BinOp::Sub, _, Some(0)) => a,
        (BinOp::Div, _, Some(1)) => a,
        _ => Expr::binary(op, a, b),
    }
}

fn result_type(a: &Expr, b: &Expr) -> Type {
    let (ta, tb) = (a.ty(), b.ty());
    if ta.bits >= tb.bits {
        ta
    } else {
        tb
    }
}

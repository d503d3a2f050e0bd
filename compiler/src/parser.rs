// Parser for textual `.hir` IR files.
//
// Parses a token stream (from the lexer) into an `ir::Pipeline`. Uses chumsky
// combinators. The format mirrors the IR one-to-one:
//
//   func name(buffer input: uint8, scalar p: int32) { stmt* }
//
//   let N = e { ... }              for (N, min, extent) { ... }
//   if (c) { ... } else { ... }    allocate N<T>[e, ...] { ... }
//   free N;                        realize N<T>([min, extent], ...) { ... }
//   produce N { ... }              consume N { ... }
//   assert(c, "message");          N[index] = e;      N(args) = e;
//   e;
//
// Expressions: literals, `name` / `name:T` variables (default int32),
// `cast<T>(e)`, `load<T>(N, index)`, calls `f(args)` / `f(args):T`, the
// builtins `min`, `max`, `select`, and the usual infix operators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns a pipeline plus any parse errors.
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ir::{BinOp, Expr, Param, ParamKind, Pipeline, Range, Stmt, Type};
use crate::lexer::Token;

/// Result of parsing: pipeline plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub pipeline: Option<Pipeline>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse an IR source string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter();
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (pipeline, parse_errors) = pipeline_parser().parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| Rich::custom(e.span, e.message))
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        pipeline,
        errors: all_errors,
    }
}

/// `min`, `max` and `select` are operators in the IR, calls in the text.
fn call_expr(name: String, args: Vec<Expr>, ty: Option<Type>) -> Result<Expr, String> {
    let builtin = |op: BinOp, mut args: Vec<Expr>| match args.len() {
        2 => {
            let b = args.pop();
            let a = args.pop();
            match (a, b) {
                (Some(a), Some(b)) => Ok(Expr::binary(op, a, b)),
                _ => Err(format!("`{}` takes 2 arguments", name)),
            }
        }
        n => Err(format!("`{}` takes 2 arguments, found {}", name, n)),
    };
    match name.as_str() {
        "min" => builtin(BinOp::Min, args),
        "max" => builtin(BinOp::Max, args),
        "select" => {
            let [condition, true_value, false_value]: [Expr; 3] = args
                .try_into()
                .map_err(|v: Vec<Expr>| format!("`select` takes 3 arguments, found {}", v.len()))?;
            Ok(Expr::Select {
                condition: Box::new(condition),
                true_value: Box::new(true_value),
                false_value: Box::new(false_value),
            })
        }
        _ => Ok(Expr::call(name, ty.unwrap_or(Type::int(32)), args)),
    }
}

fn negate(e: Expr) -> Expr {
    match e {
        Expr::IntImm { value, ty } => Expr::IntImm { value: -value, ty },
        Expr::FloatImm { value, ty } => Expr::FloatImm { value: -value, ty },
        other => Expr::binary(BinOp::Sub, Expr::int(0), other),
    }
}

#[derive(Clone, Copy)]
enum Unary {
    Neg,
    Not,
}

// ── Main parser builder ──

fn pipeline_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Pipeline, extra::Err<Rich<'tokens, Token, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident = select! { Token::Ident(name) => name };

    let ty = ident.clone().try_map(|name: String, span| {
        Type::from_keyword(&name)
            .ok_or_else(|| Rich::custom(span, format!("unknown type `{}`", name)))
    });
    let type_annot = just(Token::Colon).ignore_then(ty.clone());
    let angle_type = ty.clone().delimited_by(just(Token::Lt), just(Token::Gt));

    // ── Expressions ──

    let expr = recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let literal = select! {
            Token::Int(v) => Expr::int(v),
            Token::Float32(v) => Expr::FloatImm { value: v, ty: Type::float(32) },
            Token::Float64(v) => Expr::FloatImm { value: v, ty: Type::float(64) },
            Token::Str(s) => Expr::StringImm(s),
        };

        let cast = just(Token::Cast)
            .ignore_then(angle_type.clone())
            .then(
                expr.clone()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(ty, value)| Expr::Cast {
                ty,
                value: Box::new(value),
            });

        let load = just(Token::Load)
            .ignore_then(angle_type.clone())
            .then(
                ident
                    .clone()
                    .then_ignore(just(Token::Comma))
                    .then(expr.clone())
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(ty, (name, index))| Expr::load(name, ty, index));

        let call = ident
            .clone()
            .then(args)
            .then(type_annot.clone().or_not())
            .try_map(|((name, args), ty), span| {
                call_expr(name, args, ty).map_err(|m| Rich::custom(span, m))
            });

        let var = ident
            .clone()
            .then(type_annot.clone().or_not())
            .map(|(name, ty)| Expr::var(name, ty.unwrap_or(Type::int(32))));

        let atom = choice((
            literal,
            cast,
            load,
            call,
            var,
            expr.delimited_by(just(Token::LParen), just(Token::RParen)),
        ))
        .boxed();

        let unary = choice((
            just(Token::Minus).to(Unary::Neg),
            just(Token::Bang).to(Unary::Not),
        ))
        .repeated()
        .foldr(atom, |op, e| match op {
            Unary::Neg => negate(e),
            Unary::Not => Expr::Not(Box::new(e)),
        })
        .boxed();

        let product = unary.clone().foldl(
            choice((
                just(Token::Star).to(BinOp::Mul),
                just(Token::Slash).to(BinOp::Div),
                just(Token::Percent).to(BinOp::Mod),
            ))
            .then(unary)
            .repeated(),
            |a, (op, b)| Expr::binary(op, a, b),
        );

        let sum = product.clone().foldl(
            choice((
                just(Token::Plus).to(BinOp::Add),
                just(Token::Minus).to(BinOp::Sub),
            ))
            .then(product)
            .repeated(),
            |a, (op, b)| Expr::binary(op, a, b),
        );

        let comparison = sum.clone().foldl(
            choice((
                just(Token::EqEq).to(BinOp::Eq),
                just(Token::NotEq).to(BinOp::Ne),
                just(Token::Le).to(BinOp::Le),
                just(Token::Ge).to(BinOp::Ge),
                just(Token::Lt).to(BinOp::Lt),
                just(Token::Gt).to(BinOp::Gt),
            ))
            .then(sum)
            .repeated(),
            |a, (op, b)| Expr::binary(op, a, b),
        );

        let conjunction = comparison.clone().foldl(
            just(Token::AndAnd)
                .to(BinOp::And)
                .then(comparison)
                .repeated(),
            |a, (op, b)| Expr::binary(op, a, b),
        );

        conjunction
            .clone()
            .foldl(
                just(Token::OrOr).to(BinOp::Or).then(conjunction).repeated(),
                |a, (op, b)| Expr::binary(op, a, b),
            )
            .boxed()
    });

    // ── Statements ──

    let semis = just(Token::Semi).repeated();

    let block = recursive(|block| {
        let call_args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let let_stmt = just(Token::Let)
            .ignore_then(ident.clone())
            .then_ignore(just(Token::Assign))
            .then(expr.clone())
            .then(block.clone())
            .map(|((name, value), body)| Stmt::let_stmt(name, value, body));

        let for_stmt = just(Token::For)
            .ignore_then(
                ident
                    .clone()
                    .then_ignore(just(Token::Comma))
                    .then(expr.clone())
                    .then_ignore(just(Token::Comma))
                    .then(expr.clone())
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then(block.clone())
            .map(|(((name, min), extent), body)| Stmt::for_loop(name, min, extent, body));

        let if_stmt = just(Token::If)
            .ignore_then(
                expr.clone()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then(block.clone())
            .then(just(Token::Else).ignore_then(block.clone()).or_not())
            .map(|((condition, then_case), else_case)| Stmt::IfThenElse {
                condition,
                then_case: Box::new(then_case),
                else_case: else_case.map(Box::new),
            });

        let allocate = just(Token::Allocate)
            .ignore_then(ident.clone())
            .then(angle_type.clone())
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket)),
            )
            .then(block.clone())
            .map(|(((name, ty), extents), body)| Stmt::allocate(name, ty, extents, body));

        let free = just(Token::Free)
            .ignore_then(ident.clone())
            .then_ignore(just(Token::Semi))
            .map(|name| Stmt::Free { name });

        let range = expr
            .clone()
            .then_ignore(just(Token::Comma))
            .then(expr.clone())
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(|(min, extent)| Range::new(min, extent));

        let realize = just(Token::Realize)
            .ignore_then(ident.clone())
            .then(angle_type.clone())
            .then(
                range
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then(block.clone())
            .map(|(((name, ty), bounds), body)| Stmt::realize(name, ty, bounds, body));

        let producer_consumer = choice((
            just(Token::Produce).to(true),
            just(Token::Consume).to(false),
        ))
        .then(ident.clone())
        .then(block.clone())
        .map(|((is_producer, name), body)| Stmt::ProducerConsumer {
            name,
            is_producer,
            body: Box::new(body),
        });

        let assert_stmt = just(Token::Assert)
            .ignore_then(
                expr.clone()
                    .then_ignore(just(Token::Comma))
                    .then(select! { Token::Str(s) => s })
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then_ignore(just(Token::Semi))
            .map(|(condition, message)| Stmt::AssertStmt { condition, message });

        let store = ident
            .clone()
            .then(
                expr.clone()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket)),
            )
            .then_ignore(just(Token::Assign))
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .map(|((name, index), value)| Stmt::store(name, value, index));

        let provide = ident
            .clone()
            .then(call_args)
            .then_ignore(just(Token::Assign))
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .map(|((name, args), value)| Stmt::Provide { name, value, args });

        let evaluate = expr
            .clone()
            .then_ignore(just(Token::Semi))
            .map(Stmt::Evaluate);

        let stmt = choice((
            let_stmt,
            for_stmt,
            if_stmt,
            allocate,
            free,
            realize,
            producer_consumer,
            assert_stmt,
            store,
            provide,
            evaluate,
        ))
        .boxed();

        semis
            .clone()
            .ignore_then(stmt.then_ignore(semis.clone()).repeated().collect::<Vec<_>>())
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(Stmt::block)
    });

    // ── Function ──

    let param = choice((
        just(Token::Buffer).to(ParamKind::Buffer),
        just(Token::Scalar).to(ParamKind::Scalar),
    ))
    .then(ident.clone())
    .then_ignore(just(Token::Colon))
    .then(ty.clone())
    .map(|((kind, name), ty)| Param { name, kind, ty });

    just(Token::Func)
        .ignore_then(ident.clone())
        .then(
            param
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .then(block)
        .map(|((name, params), body)| Pipeline { name, params, body })
}

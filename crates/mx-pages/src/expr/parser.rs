//! Expression grammar.
//!
//! Each precedence level is a parser that folds its operators over the next
//! tighter level, from `;`-separated statements down to primaries:
//!
//! ```text
//! assignment  = conditional [ ("=" | "+=" | "-=" | "*=" | "/=") assignment ]
//! conditional = nullish [ "?" assignment ":" assignment ]
//! nullish     = or { "??" or }
//! or          = and { "||" and }
//! and         = equality { "&&" equality }
//! equality    = relational { ("===" | "!==" | "==" | "!=") relational }
//! relational  = additive { ("<=" | ">=" | "<" | ">") additive }
//! additive    = term { ("+" | "-") term }
//! term        = unary { ("*" | "/" | "%") unary }
//! unary       = ("!" | "-" | "+" | "typeof" | "++" | "--") unary | update
//! update      = postfix { "++" | "--" }
//! postfix     = primary { "." name | "?." name | "[" expr "]" | "(" args ")" }
//! ```

use nom::{
	IResult, Parser,
	branch::alt,
	character::complete::char,
	combinator::{eof, map, opt, value, verify},
	error::{Error, ErrorKind},
	multi::{fold_many0, many0_count, many1_count, separated_list0, separated_list1},
	sequence::{delimited, pair, preceded, terminated},
};

use super::ExprError;
use super::ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, UnaryOp};
use super::lexer::{identifier, index, keyword, number, optional_chain, punct, question, string, ws};

/// Parses a directive expression. Statements may be separated by `;`.
pub fn parse_expression(source: &str) -> Result<Expr, ExprError> {
	let separator = || many1_count(ws(char(';')));
	let mut program = delimited(
		many0_count(ws(char(';'))),
		separated_list0(separator(), assignment),
		pair(many0_count(ws(char(';'))), ws(eof)),
	);
	let (_, mut statements) = program.parse(source).map_err(syntax_error)?;
	match statements.len() {
		0 => Ok(Expr::Literal(Literal::Undefined)),
		1 => Ok(statements.remove(0)),
		_ => Ok(Expr::Sequence(statements)),
	}
}

fn syntax_error(err: nom::Err<Error<&str>>) -> ExprError {
	let (input, code) = match err {
		nom::Err::Incomplete(_) => return ExprError::Syntax("unexpected end of expression".to_string()),
		nom::Err::Error(err) | nom::Err::Failure(err) => (err.input.trim_start(), err.code),
	};
	if code == ErrorKind::Verify {
		return ExprError::Syntax("invalid assignment target".to_string());
	}
	match input.chars().next() {
		Some(c) => ExprError::Syntax(format!("unexpected character '{}' in '{}'", c, input)),
		None => ExprError::Syntax("unexpected end of expression".to_string()),
	}
}

fn boxed(expr: Expr) -> Box<Expr> {
	Box::new(expr)
}

fn assign_op(input: &str) -> IResult<&str, AssignOp> {
	alt((
		value(AssignOp::Add, punct("+=", "")),
		value(AssignOp::Sub, punct("-=", "")),
		value(AssignOp::Mul, punct("*=", "")),
		value(AssignOp::Div, punct("/=", "")),
		value(AssignOp::Assign, punct("=", "=")),
	))
	.parse(input)
}

/// Right associative. Only names, members and indexes can be assigned to.
fn assignment(input: &str) -> IResult<&str, Expr> {
	let (rest, target) = conditional(input)?;
	let Ok((after, op)) = assign_op(rest) else {
		return Ok((rest, target));
	};
	if !matches!(target, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }) {
		return Err(nom::Err::Failure(Error::new(rest, ErrorKind::Verify)));
	}
	let (rest, value) = assignment(after)?;
	Ok((
		rest,
		Expr::Assign {
			op,
			target: boxed(target),
			value: boxed(value),
		},
	))
}

fn conditional(input: &str) -> IResult<&str, Expr> {
	let (input, test) = nullish(input)?;
	let branches = pair(preceded(question, assignment), preceded(ws(char(':')), assignment));
	map(opt(branches), move |branches| match branches {
		Some((consequent, alternate)) => Expr::Conditional {
			test: boxed(test.clone()),
			consequent: boxed(consequent),
			alternate: boxed(alternate),
		},
		None => test.clone(),
	})
	.parse(input)
}

/// Folds `operator operand` pairs onto the first operand, left to right.
fn chain<'a, O>(
	input: &'a str,
	operand: fn(&'a str) -> IResult<&'a str, Expr>,
	operator: fn(&'a str) -> IResult<&'a str, O>,
	build: fn(O, Expr, Expr) -> Expr,
) -> IResult<&'a str, Expr> {
	let (input, first) = operand(input)?;
	fold_many0(
		pair(operator, operand),
		move || first.clone(),
		move |left, (op, right)| build(op, left, right),
	)
	.parse(input)
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
	Expr::Logical {
		op,
		left: boxed(left),
		right: boxed(right),
	}
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
	Expr::Binary {
		op,
		left: boxed(left),
		right: boxed(right),
	}
}

fn nullish(input: &str) -> IResult<&str, Expr> {
	chain(input, or, |input| value(LogicalOp::Nullish, punct("??", "")).parse(input), logical)
}

fn or(input: &str) -> IResult<&str, Expr> {
	chain(input, and, |input| value(LogicalOp::Or, punct("||", "")).parse(input), logical)
}

fn and(input: &str) -> IResult<&str, Expr> {
	chain(input, equality, |input| value(LogicalOp::And, punct("&&", "")).parse(input), logical)
}

fn equality_op(input: &str) -> IResult<&str, BinaryOp> {
	alt((
		value(BinaryOp::StrictEq, punct("===", "")),
		value(BinaryOp::StrictNotEq, punct("!==", "")),
		value(BinaryOp::Eq, punct("==", "")),
		value(BinaryOp::NotEq, punct("!=", "")),
	))
	.parse(input)
}

fn equality(input: &str) -> IResult<&str, Expr> {
	chain(input, relational, equality_op, binary)
}

fn relational_op(input: &str) -> IResult<&str, BinaryOp> {
	alt((
		value(BinaryOp::Le, punct("<=", "")),
		value(BinaryOp::Ge, punct(">=", "")),
		value(BinaryOp::Lt, punct("<", "")),
		value(BinaryOp::Gt, punct(">", "")),
	))
	.parse(input)
}

fn relational(input: &str) -> IResult<&str, Expr> {
	chain(input, additive, relational_op, binary)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOp> {
	alt((
		value(BinaryOp::Add, punct("+", "+=")),
		value(BinaryOp::Sub, punct("-", "-=")),
	))
	.parse(input)
}

fn additive(input: &str) -> IResult<&str, Expr> {
	chain(input, term, additive_op, binary)
}

fn term_op(input: &str) -> IResult<&str, BinaryOp> {
	alt((
		value(BinaryOp::Mul, punct("*", "=")),
		value(BinaryOp::Div, punct("/", "=")),
		value(BinaryOp::Rem, punct("%", "")),
	))
	.parse(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
	chain(input, unary, term_op, binary)
}

fn update_op(input: &str) -> IResult<&str, bool> {
	alt((value(true, punct("++", "")), value(false, punct("--", "")))).parse(input)
}

fn unary_op(input: &str) -> IResult<&str, UnaryOp> {
	alt((
		value(UnaryOp::Not, punct("!", "=")),
		value(UnaryOp::Neg, punct("-", "-=")),
		value(UnaryOp::Plus, punct("+", "+=")),
		value(UnaryOp::TypeOf, keyword("typeof")),
	))
	.parse(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
	alt((
		map(pair(unary_op, unary), |(op, operand)| Expr::Unary {
			op,
			operand: boxed(operand),
		}),
		map(pair(update_op, unary), |(increment, target)| Expr::Update {
			increment,
			prefix: true,
			target: boxed(target),
		}),
		update,
	))
	.parse(input)
}

fn update(input: &str) -> IResult<&str, Expr> {
	let (input, first) = postfix(input)?;
	fold_many0(update_op, move || first.clone(), |target, increment| Expr::Update {
		increment,
		prefix: false,
		target: boxed(target),
	})
	.parse(input)
}

#[derive(Clone)]
enum Suffix {
	Member(String, bool),
	Index(Expr, bool),
	Call(Vec<Expr>),
}

fn numeric_index(n: f64) -> Expr {
	Expr::Literal(Literal::Number(n))
}

fn bracketed(input: &str) -> IResult<&str, Expr> {
	delimited(ws(char('[')), assignment, ws(char(']'))).parse(input)
}

/// Comma separated expressions up to `close`, trailing comma allowed.
fn list<'a>(close: char) -> impl Parser<&'a str, Output = Vec<Expr>, Error = Error<&'a str>> {
	terminated(
		map(
			opt(terminated(separated_list1(ws(char(',')), assignment), opt(ws(char(','))))),
			Option::unwrap_or_default,
		),
		ws(char(close)),
	)
}

fn arguments(input: &str) -> IResult<&str, Vec<Expr>> {
	preceded(ws(char('(')), list(')')).parse(input)
}

fn suffix(input: &str) -> IResult<&str, Suffix> {
	let member = preceded(
		ws(char('.')),
		alt((
			map(identifier, |name| Suffix::Member(name.to_string(), false)),
			map(index, |n| Suffix::Index(numeric_index(n), false)),
		)),
	);
	let optional = preceded(
		optional_chain,
		alt((
			map(identifier, |name| Suffix::Member(name.to_string(), true)),
			map(index, |n| Suffix::Index(numeric_index(n), true)),
			map(arguments, Suffix::Call),
			map(bracketed, |index| Suffix::Index(index, true)),
		)),
	);
	alt((
		member,
		optional,
		map(bracketed, |index| Suffix::Index(index, false)),
		map(arguments, Suffix::Call),
	))
	.parse(input)
}

/// Member access, indexing and calls.
fn postfix(input: &str) -> IResult<&str, Expr> {
	let (input, first) = primary(input)?;
	fold_many0(suffix, move || first.clone(), |object, suffix| match suffix {
		Suffix::Member(property, optional) => Expr::Member {
			object: boxed(object),
			property,
			optional,
		},
		Suffix::Index(index, optional) => Expr::Index {
			object: boxed(object),
			index: boxed(index),
			optional,
		},
		Suffix::Call(args) => Expr::Call {
			callee: boxed(object),
			args,
		},
	})
	.parse(input)
}

fn word(name: &str) -> Expr {
	match name {
		"true" => Expr::Literal(Literal::Bool(true)),
		"false" => Expr::Literal(Literal::Bool(false)),
		"null" => Expr::Literal(Literal::Null),
		"undefined" => Expr::Literal(Literal::Undefined),
		"this" => Expr::This,
		_ => Expr::Ident(name.to_string()),
	}
}

fn object_key(input: &str) -> IResult<&str, String> {
	alt((
		map(identifier, str::to_string),
		string,
		map(number, crate::value::format_number),
	))
	.parse(input)
}

fn object_entry(input: &str) -> IResult<&str, (String, Expr)> {
	let (input, key) = object_key(input)?;
	// shorthand `{ name }`
	map(opt(preceded(ws(char(':')), assignment)), move |value| {
		let value = value.unwrap_or_else(|| Expr::Ident(key.clone()));
		(key.clone(), value)
	})
	.parse(input)
}

fn object(input: &str) -> IResult<&str, Expr> {
	let entries = terminated(
		map(
			opt(terminated(separated_list1(ws(char(',')), object_entry), opt(ws(char(','))))),
			Option::unwrap_or_default,
		),
		ws(char('}')),
	);
	map(preceded(ws(char('{')), entries), Expr::Object).parse(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
	alt((
		map(number, |n| Expr::Literal(Literal::Number(n))),
		map(string, |s| Expr::Literal(Literal::String(s))),
		map(verify(identifier, |name: &str| name != "typeof"), word),
		delimited(ws(char('(')), assignment, ws(char(')'))),
		map(preceded(ws(char('[')), list(']')), Expr::Array),
		object,
	))
	.parse(input)
}

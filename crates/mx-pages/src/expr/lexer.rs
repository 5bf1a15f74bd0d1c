//! Token-level parsers for directive expressions.
//!
//! Every parser here skips leading whitespace, so the grammar in
//! `parser.rs` never deals with blanks itself.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{escaped_transform, is_not, tag, take_while},
	character::complete::{anychar, char, digit1, one_of, satisfy},
	combinator::{map, map_res, not, opt, recognize, value, verify},
	error::Error,
	sequence::{delimited, pair, preceded, terminated},
};

/// Skips leading whitespace before `inner`.
pub(crate) fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
	F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
	preceded(take_while(char::is_whitespace), inner)
}

fn is_ident_start(c: char) -> bool {
	c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '$'
}

/// `count`, `$store`, `_private`.
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
	ws(recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))).parse(input)
}

/// A reserved word, not followed by further identifier characters.
pub(crate) fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
	ws(terminated(tag(word), not(satisfy(is_ident_char))))
}

fn digit(input: &str) -> IResult<&str, char> {
	satisfy(|c| c.is_ascii_digit()).parse(input)
}

/// `12`, `1.5`, `.5`, `2e-3`.
pub(crate) fn number(input: &str) -> IResult<&str, f64> {
	let mantissa = alt((
		recognize(pair(digit1, opt(pair(char('.'), digit1)))),
		recognize(pair(char('.'), digit1)),
	));
	let exponent = opt((one_of("eE"), opt(one_of("+-")), digit1));
	ws(map_res(recognize(pair(mantissa, exponent)), str::parse::<f64>)).parse(input)
}

/// Digits only. After `.` a number is an index (`items.0.name`), never a fraction.
pub(crate) fn index(input: &str) -> IResult<&str, f64> {
	ws(map_res(digit1, str::parse::<f64>)).parse(input)
}

fn escape(input: &str) -> IResult<&str, &str> {
	alt((
		value("\n", char('n')),
		value("\t", char('t')),
		value("\r", char('r')),
		value("\0", char('0')),
		recognize(anychar),
	))
	.parse(input)
}

fn quoted<'a>(quote: char, stop: &'static str) -> impl Parser<&'a str, Output = String, Error = Error<&'a str>> {
	delimited(
		char(quote),
		map(opt(escaped_transform(is_not(stop), '\\', escape)), Option::unwrap_or_default),
		char(quote),
	)
}

/// `'single'`, `"double"` or `` `backtick` `` quoted text with `\` escapes.
pub(crate) fn string(input: &str) -> IResult<&str, String> {
	ws(alt((quoted('\'', "\\'"), quoted('"', "\\\""), quoted('`', "\\`")))).parse(input)
}

/// A punctuator that is not the prefix of a longer one (`+` but not `++` or `+=`).
pub(crate) fn punct<'a>(
	text: &'static str,
	not_before: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
	ws(terminated(
		tag(text),
		not(verify(anychar, move |c: &char| not_before.contains(*c))),
	))
}

/// `?.` optional chaining. `a?.5:1` is a conditional instead.
pub(crate) fn optional_chain(input: &str) -> IResult<&str, &str> {
	ws(terminated(tag("?."), not(digit))).parse(input)
}

/// The `?` of a conditional.
pub(crate) fn question(input: &str) -> IResult<&str, char> {
	ws(terminated(
		char('?'),
		not(alt((char('?'), terminated(char('.'), not(digit))))),
	))
	.parse(input)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("42", 42.0)]
	#[case(" 1.5", 1.5)]
	#[case(".25", 0.25)]
	#[case("2e3", 2000.0)]
	#[case("1e-1", 0.1)]
	fn test_number(#[case] source: &str, #[case] expected: f64) {
		assert_eq!(number(source).unwrap(), ("", expected));
	}

	#[rstest]
	fn test_number_leaves_member_access() {
		assert_eq!(number("1.toFixed").unwrap(), (".toFixed", 1.0));
	}

	#[rstest]
	#[case(r"'x\'y'", "x'y")]
	#[case(r#""a\nb""#, "a\nb")]
	#[case("`tpl`", "tpl")]
	#[case("''", "")]
	fn test_string(#[case] source: &str, #[case] expected: &str) {
		assert_eq!(string(source).unwrap(), ("", expected.to_string()));
	}

	#[rstest]
	fn test_unterminated_string_fails() {
		assert!(string("'open").is_err());
	}

	#[rstest]
	fn test_identifier_and_keyword() {
		assert_eq!(identifier("  $store.items").unwrap(), (".items", "$store"));
		assert!(keyword("typeof").parse("typeofx").is_err());
		assert_eq!(keyword("typeof").parse("typeof x").unwrap(), (" x", "typeof"));
	}

	#[rstest]
	#[case("+", "+=", "+ b", true)]
	#[case("+", "+=", "++b", false)]
	#[case("+", "+=", "+=b", false)]
	#[case("=", "=", "== b", false)]
	fn test_punct_respects_longer_operators(
		#[case] text: &'static str,
		#[case] not_before: &'static str,
		#[case] source: &str,
		#[case] accepted: bool,
	) {
		assert_eq!(punct(text, not_before).parse(source).is_ok(), accepted);
	}

	#[rstest]
	fn test_question_versus_optional_chain() {
		assert!(optional_chain("?.name").is_ok());
		assert!(optional_chain("?.5").is_err());
		assert!(question("?.5 : 1").is_ok());
		assert!(question("?? b").is_err());
		assert!(question("?.b").is_err());
	}
}

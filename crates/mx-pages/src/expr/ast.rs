//! Expression syntax tree.

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
	Number(f64),
	String(String),
	Bool(bool),
	Null,
	Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Not,
	Neg,
	Plus,
	TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	NotEq,
	StrictEq,
	StrictNotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
	And,
	Or,
	Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
	Assign,
	Add,
	Sub,
	Mul,
	Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Literal(Literal),
	Ident(String),
	This,
	Array(Vec<Expr>),
	Object(Vec<(String, Expr)>),
	Member {
		object: Box<Expr>,
		property: String,
		optional: bool,
	},
	Index {
		object: Box<Expr>,
		index: Box<Expr>,
		optional: bool,
	},
	Call {
		callee: Box<Expr>,
		args: Vec<Expr>,
	},
	Unary {
		op: UnaryOp,
		operand: Box<Expr>,
	},
	/// `++x`, `x--`, ...
	Update {
		increment: bool,
		prefix: bool,
		target: Box<Expr>,
	},
	Binary {
		op: BinaryOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Logical {
		op: LogicalOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Conditional {
		test: Box<Expr>,
		consequent: Box<Expr>,
		alternate: Box<Expr>,
	},
	Assign {
		op: AssignOp,
		target: Box<Expr>,
		value: Box<Expr>,
	},
	/// `a; b; c` evaluates to the last expression.
	Sequence(Vec<Expr>),
}

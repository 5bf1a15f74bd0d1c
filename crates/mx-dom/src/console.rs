//! Recording console.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
	Log,
	Info,
	Warn,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
	pub level: ConsoleLevel,
	pub message: String,
}

/// Window console. Every message is kept for inspection and forwarded to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct Console {
	entries: Rc<RefCell<Vec<ConsoleEntry>>>,
}

impl Console {
	pub fn new() -> Self {
		Self::default()
	}

	fn record(&self, level: ConsoleLevel, message: String) {
		match level {
			ConsoleLevel::Log => tracing::debug!(target: "mx", "{}", message),
			ConsoleLevel::Info => tracing::info!(target: "mx", "{}", message),
			ConsoleLevel::Warn => tracing::warn!(target: "mx", "{}", message),
			ConsoleLevel::Error => tracing::error!(target: "mx", "{}", message),
		}
		self.entries.borrow_mut().push(ConsoleEntry { level, message });
	}

	pub fn log(&self, message: impl Into<String>) {
		self.record(ConsoleLevel::Log, message.into());
	}

	pub fn info(&self, message: impl Into<String>) {
		self.record(ConsoleLevel::Info, message.into());
	}

	pub fn warn(&self, message: impl Into<String>) {
		self.record(ConsoleLevel::Warn, message.into());
	}

	pub fn error(&self, message: impl Into<String>) {
		self.record(ConsoleLevel::Error, message.into());
	}

	pub fn entries(&self) -> Vec<ConsoleEntry> {
		self.entries.borrow().clone()
	}

	fn messages(&self, level: ConsoleLevel) -> Vec<String> {
		self.entries
			.borrow()
			.iter()
			.filter(|entry| entry.level == level)
			.map(|entry| entry.message.clone())
			.collect()
	}

	pub fn warnings(&self) -> Vec<String> {
		self.messages(ConsoleLevel::Warn)
	}

	pub fn errors(&self) -> Vec<String> {
		self.messages(ConsoleLevel::Error)
	}

	pub fn clear(&self) {
		self.entries.borrow_mut().clear();
	}
}

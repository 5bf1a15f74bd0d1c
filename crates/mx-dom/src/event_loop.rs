//! Cooperative single-threaded event loop.
//!
//! The loop never runs on its own: tests and embedders drive it explicitly with
//! [`EventLoop::flush`], [`EventLoop::run_animation_frame`], [`EventLoop::advance`]
//! or [`EventLoop::run_until_idle`]. This keeps microtask and frame ordering
//! deterministic.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

/// Nominal duration of one animation frame in milliseconds.
pub const FRAME_MS: f64 = 16.0;

const IDLE_ITERATION_LIMIT: usize = 10_000;

type Task = Box<dyn FnOnce()>;
type FrameCallback = Box<dyn FnOnce(f64)>;

/// Handle to the loop shared by a window and its document.
#[derive(Clone)]
pub struct EventLoop {
	inner: Rc<LoopInner>,
}

struct LoopInner {
	microtasks: RefCell<VecDeque<Task>>,
	frames: RefCell<Vec<(u64, FrameCallback)>>,
	timers: RefCell<BTreeMap<(u64, u64), Task>>,
	now: Cell<f64>,
	next_id: Cell<u64>,
	pool: RefCell<LocalPool>,
	spawner: LocalSpawner,
}

impl Default for EventLoop {
	fn default() -> Self {
		Self::new()
	}
}

impl EventLoop {
	pub fn new() -> Self {
		let pool = LocalPool::new();
		let spawner = pool.spawner();
		Self {
			inner: Rc::new(LoopInner {
				microtasks: RefCell::new(VecDeque::new()),
				frames: RefCell::new(Vec::new()),
				timers: RefCell::new(BTreeMap::new()),
				now: Cell::new(0.0),
				next_id: Cell::new(0),
				pool: RefCell::new(pool),
				spawner,
			}),
		}
	}

	fn next_id(&self) -> u64 {
		let id = self.inner.next_id.get() + 1;
		self.inner.next_id.set(id);
		id
	}

	/// Current loop time in milliseconds.
	pub fn now(&self) -> f64 {
		self.inner.now.get()
	}

	pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
		self.inner.microtasks.borrow_mut().push_back(Box::new(task));
	}

	/// Schedules `callback` for the next animation frame and returns its handle.
	pub fn request_animation_frame(&self, callback: impl FnOnce(f64) + 'static) -> u64 {
		let id = self.next_id();
		self.inner.frames.borrow_mut().push((id, Box::new(callback)));
		id
	}

	pub fn cancel_animation_frame(&self, id: u64) {
		self.inner.frames.borrow_mut().retain(|(frame, _)| *frame != id);
	}

	/// Schedules `task` to run once `delay_ms` of loop time has passed.
	pub fn set_timeout(&self, task: impl FnOnce() + 'static, delay_ms: u64) -> u64 {
		let id = self.next_id();
		let due = self.now().max(0.0) as u64 + delay_ms;
		self.inner.timers.borrow_mut().insert((due, id), Box::new(task));
		id
	}

	pub fn clear_timeout(&self, id: u64) {
		self.inner.timers.borrow_mut().retain(|(_, timer), _| *timer != id);
	}

	/// Spawns a future on the local pool. It makes progress whenever the loop is flushed.
	pub fn spawn_local(&self, future: impl Future<Output = ()> + 'static) {
		if let Err(error) = self.inner.spawner.spawn_local(future) {
			tracing::error!(target: "mx", "failed to spawn local task: {}", error);
		}
	}

	/// Runs queued microtasks, including ones queued while draining. Returns how many ran.
	pub fn run_microtasks(&self) -> usize {
		let mut ran = 0;
		loop {
			let task = self.inner.microtasks.borrow_mut().pop_front();
			let Some(task) = task else {
				break;
			};
			task();
			ran += 1;
		}
		ran
	}

	/// Drains microtasks and polls spawned futures until neither makes progress.
	pub fn flush(&self) {
		for _ in 0..IDLE_ITERATION_LIMIT {
			self.run_microtasks();
			// A future polled by the pool may itself flush; the nested call skips the pool.
			if let Ok(mut pool) = self.inner.pool.try_borrow_mut() {
				pool.run_until_stalled();
			}
			if self.inner.microtasks.borrow().is_empty() {
				return;
			}
		}
		tracing::warn!(target: "mx", "event loop flush did not settle");
	}

	/// Runs every callback scheduled before this frame started, flushing microtasks after each.
	pub fn run_animation_frame(&self) -> usize {
		self.flush();
		let now = self.now() + FRAME_MS;
		self.inner.now.set(now);
		let frames = std::mem::take(&mut *self.inner.frames.borrow_mut());
		let count = frames.len();
		for (_, callback) in frames {
			callback(now);
			self.flush();
		}
		count
	}

	pub fn run_animation_frames(&self, count: usize) {
		for _ in 0..count {
			self.run_animation_frame();
		}
	}

	/// Moves loop time forward by `ms`, firing due timers in order.
	pub fn advance(&self, ms: u64) {
		self.flush();
		let target = self.now().max(0.0) as u64 + ms;
		loop {
			let next = {
				let mut timers = self.inner.timers.borrow_mut();
				let key = timers.keys().next().copied();
				match key {
					Some(key) if key.0 <= target => timers.remove(&key).map(|task| (key.0, task)),
					_ => None,
				}
			};
			let Some((due, task)) = next else {
				break;
			};
			if (due as f64) > self.now() {
				self.inner.now.set(due as f64);
			}
			task();
			self.flush();
		}
		if (target as f64) > self.now() {
			self.inner.now.set(target as f64);
		}
	}

	/// Drives microtasks, frames and timers until nothing is pending.
	pub fn run_until_idle(&self) {
		for _ in 0..IDLE_ITERATION_LIMIT {
			self.flush();
			if self.pending_frames() > 0 {
				self.run_animation_frame();
				continue;
			}
			let next_due = self.inner.timers.borrow().keys().next().map(|(due, _)| *due);
			match next_due {
				Some(due) => {
					let now = self.now().max(0.0) as u64;
					self.advance(due.saturating_sub(now));
				}
				None => return,
			}
		}
		tracing::warn!(target: "mx", "event loop did not become idle");
	}

	pub fn pending_microtasks(&self) -> usize {
		self.inner.microtasks.borrow().len()
	}

	pub fn pending_frames(&self) -> usize {
		self.inner.frames.borrow().len()
	}

	pub fn pending_timers(&self) -> usize {
		self.inner.timers.borrow().len()
	}
}

impl fmt::Debug for EventLoop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventLoop")
			.field("now", &self.now())
			.field("microtasks", &self.pending_microtasks())
			.field("frames", &self.pending_frames())
			.field("timers", &self.pending_timers())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn FnOnce()>) {
		let log = Rc::new(RefCell::new(Vec::new()));
		let handle = log.clone();
		let push = move |label: &str| -> Box<dyn FnOnce()> {
			let handle = handle.clone();
			let label = label.to_string();
			Box::new(move || handle.borrow_mut().push(label))
		};
		(log, push)
	}

	#[rstest]
	fn test_microtasks_run_in_fifo_order_including_nested() {
		let event_loop = EventLoop::new();
		let (log, push) = recorder();
		let nested = push("nested");
		let inner_loop = event_loop.clone();
		event_loop.queue_microtask(push("first"));
		event_loop.queue_microtask(move || inner_loop.queue_microtask(nested));
		event_loop.queue_microtask(push("second"));

		assert_eq!(event_loop.run_microtasks(), 4);
		assert_eq!(*log.borrow(), vec!["first", "second", "nested"]);
	}

	#[rstest]
	fn test_frames_scheduled_during_a_frame_wait_for_the_next() {
		let event_loop = EventLoop::new();
		let (log, push) = recorder();
		let later = push("second frame");
		let inner_loop = event_loop.clone();
		event_loop.request_animation_frame(move |_| {
			inner_loop.request_animation_frame(move |_| later());
		});

		assert_eq!(event_loop.run_animation_frame(), 1);
		assert!(log.borrow().is_empty());
		assert_eq!(event_loop.run_animation_frame(), 1);
		assert_eq!(*log.borrow(), vec!["second frame"]);
	}

	#[rstest]
	fn test_timers_fire_in_due_order() {
		let event_loop = EventLoop::new();
		let (log, push) = recorder();
		event_loop.set_timeout(push("slow"), 50);
		event_loop.set_timeout(push("fast"), 10);
		let cancelled = event_loop.set_timeout(push("never"), 20);
		event_loop.clear_timeout(cancelled);

		event_loop.advance(20);
		assert_eq!(*log.borrow(), vec!["fast"]);
		event_loop.run_until_idle();
		assert_eq!(*log.borrow(), vec!["fast", "slow"]);
		assert_eq!(event_loop.pending_timers(), 0);
	}

	#[rstest]
	fn test_flush_drives_spawned_futures() {
		let event_loop = EventLoop::new();
		let done = Rc::new(Cell::new(false));
		let flag = done.clone();
		event_loop.spawn_local(async move {
			flag.set(true);
		});

		assert!(!done.get());
		event_loop.flush();
		assert!(done.get());
	}
}

//! HTML-over-the-wire swaps.
//!
//! A swap applies server-rendered markup to the live document, either through
//! explicit `{select?, target}` strategies or, without any, through smart swap
//! (morph by `id`, or morph the body for a full document). Swaps with a
//! history option snapshot what they touch so `popstate` can restore it.

mod engine;
pub mod morph;
mod smart;
mod strategy;
mod template;

pub use engine::{swap, swap_into};
pub use strategy::{SelectorSpec, SwapMode, SwapOptions, SwapStrategy};
pub use template::{Template, TemplateSwapOptions, render, swap_template};

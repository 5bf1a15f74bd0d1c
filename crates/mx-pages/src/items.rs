//! Repeated `mx-item` collections.
//!
//! ```html
//! <ul mx-data="todos">
//!   <li mx-item="todos" ::text="title">Write docs</li>
//! </ul>
//! ```
//!
//! hydrates `todos` into an [`ItemArray`] holding one item proxy per `<li>`.
//! `$item` inside an item refers to its proxy, and `todos.add({title: 'x'})`
//! clones the first item (or a `<template mx-item>`) for the new entry.

mod array;
mod hydrate;
mod sub_array;

pub use array::ItemArray;
pub use sub_array::SubArray;

pub(crate) use hydrate::{hydrate_items, item_scope};

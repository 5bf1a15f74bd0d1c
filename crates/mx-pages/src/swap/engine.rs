//! Applying HTML to the document.

use mx_dom::{Node, Selector, is_full_document};

use crate::error::Result;
use crate::history;
use crate::registry::Mx;
use crate::{debug_log, error_log, warn_log};

use super::smart::{self, SmartTarget};
use super::strategy::{SelectorSpec, SwapMode, SwapOptions, SwapStrategy};

/// A parsed response: a fragment, or the `<html>` element of a full document.
struct Source {
	root: Node,
	full_document: bool,
}

impl Source {
	fn parse(mx: &Mx, html: &str) -> Self {
		let full_document = is_full_document(html);
		let root = if full_document {
			mx.document().parse_html(html)
		} else {
			mx.document().parse_fragment(html)
		};
		Self { root, full_document }
	}

	/// Children of the response body.
	fn body_content(&self) -> Vec<Node> {
		if !self.full_document {
			return self.root.child_nodes();
		}
		Selector::parse("body")
			.ok()
			.and_then(|body| self.root.select_first(&body))
			.map(|body| body.child_nodes())
			.unwrap_or_default()
	}

	/// First element of the response matching `selector`.
	fn select_first(&self, selector: &str) -> Option<Node> {
		let selector = Selector::parse(selector).ok()?;
		self.root.select_first(&selector)
	}
}

/// What a selection contributes: the matched element itself for
/// `outerHTML`, its children for every other mode.
fn picked(element: Node, mode: SwapMode) -> Vec<Node> {
	if mode == SwapMode::OuterHtml {
		return vec![element];
	}
	element.child_nodes()
}

/// Resolves an explicit `select` (default `innerHTML`) against the response.
/// Logs and yields `None` when nothing matches.
fn selected(mx: &Mx, source: &Source, select: &SelectorSpec) -> Option<Vec<Node>> {
	match source.select_first(&select.selector) {
		Some(element) => Some(picked(element, select.mode)),
		None => {
			error_log!(mx, "swap select '{}' not found in response", select.selector);
			None
		}
	}
}

fn content_for(mx: &Mx, source: &Source, strategy: &SwapStrategy, target: &SelectorSpec) -> Option<Vec<Node>> {
	if let Some(select) = strategy.select_spec() {
		return selected(mx, source, &select);
	}
	// Without a select the target selector is tried against the response.
	let Some(element) = source.select_first(&target.selector) else {
		return Some(source.body_content());
	};
	let mode = match target.mode {
		SwapMode::OuterHtml => SwapMode::OuterHtml,
		_ => SwapMode::InnerHtml,
	};
	Some(picked(element, mode))
}

/// Applies `nodes` (cloned) to `element` in `mode`.
fn insert(mx: &Mx, element: &Node, mode: SwapMode, nodes: &[Node]) -> Result<()> {
	let fragment = mx.document().create_document_fragment();
	for node in nodes {
		fragment.append_child(&node.clone_node(true))?;
	}
	match mode.insert_position() {
		Some(position) => element.insert_adjacent(position, &fragment)?,
		None if mode == SwapMode::OuterHtml => element.replace_with(&fragment)?,
		None => {
			for child in element.child_nodes() {
				child.remove();
			}
			element.append_child(&fragment)?;
		}
	}
	Ok(())
}

fn apply_strategy(mx: &Mx, source: &Source, strategy: &SwapStrategy) -> Result<()> {
	let target = strategy.target_spec();
	let elements = mx.document().query_selector_all(&target.selector)?;
	if elements.is_empty() {
		error_log!(mx, "swap target '{}' not found", target.selector);
		return Ok(());
	}
	let Some(nodes) = content_for(mx, source, strategy, &target) else {
		return Ok(());
	};
	for element in &elements {
		insert(mx, element, target.mode, &nodes)?;
	}
	debug_log!("swapped {} node(s) into {}", nodes.len(), target);
	Ok(())
}

enum Plan {
	Strategies(Vec<SwapStrategy>),
	Smart(Vec<SmartTarget>),
}

impl Plan {
	fn touched(&self) -> Vec<SelectorSpec> {
		match self {
			Self::Strategies(strategies) => strategies.iter().map(SwapStrategy::target_spec).collect(),
			Self::Smart(targets) => targets.iter().map(SmartTarget::snapshot_spec).collect(),
		}
	}

	fn apply(&self, mx: &Mx, source: &Source) {
		match self {
			Self::Strategies(strategies) => {
				for strategy in strategies {
					if let Err(err) = apply_strategy(mx, source, strategy) {
						error_log!(mx, "swap into '{}' failed: {}", strategy.target, err);
					}
				}
			}
			Self::Smart(targets) => {
				for target in targets {
					if let Err(err) = target.apply(mx) {
						error_log!(mx, "smart swap into {} failed: {}", target.snapshot_spec(), err);
					}
				}
			}
		}
	}
}

/// Applies `html` with `strategies`, or with smart swap when there are none.
///
/// With a history-affecting option the touched elements are snapshotted into
/// the current history entry before anything changes, and a new entry is
/// pushed afterwards.
pub fn swap(mx: &Mx, html: &str, strategies: Option<&[SwapStrategy]>, options: &SwapOptions) -> Result<()> {
	let source = Source::parse(mx, html);
	let plan = match strategies {
		Some(strategies) => Plan::Strategies(strategies.to_vec()),
		None => {
			let targets = smart::resolve(mx, &source.root, source.full_document);
			if targets.is_empty() {
				warn_log!(mx, "smart swap found no target for the response; nothing was swapped");
				return Ok(());
			}
			Plan::Smart(targets)
		}
	};

	if options.affects_history() {
		let state = history::capture(mx, &plan.touched());
		history::remember(mx, &state)?;
	}
	plan.apply(mx, &source);
	if let Some(title) = &options.title {
		mx.document().set_title(title);
	}
	if options.affects_history() {
		let title = mx.document().title();
		mx.history()
			.push_state(None, &title, options.push_url.as_deref())?;
	}
	Ok(())
}

/// Swaps `html` into `element` itself (default `innerHTML`), optionally
/// picking `select` out of it.
pub fn swap_into(mx: &Mx, element: &Node, html: &str, select: Option<&str>) -> Result<()> {
	let source = Source::parse(mx, html);
	let nodes = match select {
		Some(select) => match selected(mx, &source, &SelectorSpec::parse(select, SwapMode::InnerHtml)) {
			Some(nodes) => nodes,
			None => return Ok(()),
		},
		None => source.body_content(),
	};
	insert(mx, element, SwapMode::InnerHtml, &nodes)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn mx_with(body: &str) -> Mx {
		let mx = Mx::new();
		mx.document().body().set_inner_html(body);
		mx
	}

	fn body(mx: &Mx) -> String {
		mx.document().body().inner_html()
	}

	#[rstest]
	#[case("#box", r#"<p>n</p>"#, r#"<p>n</p>"#)]
	#[case("#box:innerHTML", r#"<p>n</p>"#, r#"<div id="box"><p>n</p></div>"#)]
	#[case("#box:beforebegin", "<i></i>", r#"<i></i><div id="box"><b>o</b></div>"#)]
	#[case("#box:afterbegin", "<i></i>", r#"<div id="box"><i></i><b>o</b></div>"#)]
	#[case("#box:beforeend", "<i></i>", r#"<div id="box"><b>o</b><i></i></div>"#)]
	#[case("#box:afterend", "<i></i>", r#"<div id="box"><b>o</b></div><i></i>"#)]
	fn test_target_modes(#[case] target: &str, #[case] html: &str, #[case] expected: &str) {
		let mx = mx_with(r#"<div id="box"><b>o</b></div>"#);
		swap(&mx, html, Some(&[SwapStrategy::new(target)]), &SwapOptions::new()).unwrap();
		assert_eq!(body(&mx), expected);
	}

	#[rstest]
	fn test_target_as_select_and_explicit_select() {
		let mx = mx_with(r#"<main id="main">old</main><aside id="side">s</aside>"#);
		let html = r#"<main id="main">new</main><section class="extra"><em>x</em></section>"#;
		swap(
			&mx,
			html,
			Some(&[SwapStrategy::new("#main"), SwapStrategy::new("#side:innerHTML").select(".extra")]),
			&SwapOptions::new(),
		)
		.unwrap();
		assert_eq!(body(&mx), r#"<main id="main">new</main><aside id="side"><em>x</em></aside>"#);
	}

	#[rstest]
	fn test_every_target_gets_its_own_copy() {
		let mx = mx_with(r#"<ul class="list"></ul><ul class="list"></ul>"#);
		swap(&mx, "<li>a</li>", Some(&[SwapStrategy::new(".list:beforeend")]), &SwapOptions::new()).unwrap();
		assert_eq!(body(&mx), r#"<ul class="list"><li>a</li></ul><ul class="list"><li>a</li></ul>"#);
	}

	#[rstest]
	fn test_missing_target_or_select_skips_only_that_strategy() {
		let mx = mx_with(r#"<div id="a">1</div><div id="b">2</div>"#);
		let strategies = [
			SwapStrategy::new("#missing"),
			SwapStrategy::new("#a:innerHTML").select("#nope"),
			SwapStrategy::new("#b:innerHTML"),
		];
		swap(&mx, "<span>3</span>", Some(&strategies), &SwapOptions::new()).unwrap();
		assert_eq!(body(&mx), r#"<div id="a">1</div><div id="b"><span>3</span></div>"#);
		assert_eq!(mx.console().errors().len(), 2);
	}

	#[rstest]
	fn test_smart_swap_morphs_matching_id() {
		let mx = mx_with(r#"<header>h</header><div id="content"><p>old</p></div>"#);
		let header = mx.document().body().first_child().unwrap();
		let content = mx.document().get_element_by_id("content").unwrap();
		swap(&mx, r#"<div id="content"><p>new</p><p>more</p></div>"#, None, &SwapOptions::new()).unwrap();
		assert_eq!(body(&mx), r#"<header>h</header><div id="content"><p>new</p><p>more</p></div>"#);
		assert_eq!(mx.document().get_element_by_id("content").unwrap(), content);
		assert_eq!(mx.document().body().first_child().unwrap(), header);
	}

	#[rstest]
	fn test_smart_swap_full_document_morphs_body() {
		let mx = mx_with("<p>old</p>");
		swap(
			&mx,
			"<!DOCTYPE html><html><head><title>T</title></head><body><p>new</p></body></html>",
			None,
			&SwapOptions::new(),
		)
		.unwrap();
		assert_eq!(body(&mx), "<p>new</p>");
		assert_eq!(mx.document().title(), "T");
	}

	#[rstest]
	fn test_smart_swap_without_match_changes_nothing() {
		let mx = mx_with(r#"<div id="content">keep</div>"#);
		let before = body(&mx);
		swap(&mx, "<p>stray</p>", None, &SwapOptions::new()).unwrap();
		assert_eq!(body(&mx), before);
		assert_eq!(mx.console().warnings().len(), 1);
	}

	#[rstest]
	#[case(Some("p:outerHTML"), "<p>b</p>")]
	#[case(Some("p"), "b")]
	#[case(Some("p:innerHTML"), "b")]
	#[case(None, "<h1>t</h1><p>b</p><p>c</p>")]
	fn test_swap_into_element(#[case] select: Option<&str>, #[case] expected: &str) {
		let mx = mx_with(r#"<div id="slot">x</div>"#);
		let slot = mx.document().get_element_by_id("slot").unwrap();
		swap_into(&mx, &slot, "<h1>t</h1><p>b</p><p>c</p>", select).unwrap();
		assert_eq!(slot.inner_html(), expected);
	}

	#[rstest]
	fn test_select_takes_first_match_in_both_entry_points() {
		let html = r#"<p class="x">one</p><p class="x">two</p>"#;
		let mx = mx_with(r#"<div id="a"></div><div id="b"></div>"#);
		swap(
			&mx,
			html,
			Some(&[SwapStrategy::new("#a:innerHTML").select(".x")]),
			&SwapOptions::new(),
		)
		.unwrap();
		let b = mx.document().get_element_by_id("b").unwrap();
		swap_into(&mx, &b, html, Some(".x")).unwrap();
		assert_eq!(mx.document().get_element_by_id("a").unwrap().inner_html(), "one");
		assert_eq!(b.inner_html(), "one");
	}
}

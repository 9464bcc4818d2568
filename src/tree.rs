//! Category tree.
//!
//! Pages are flat; their `category` path places them in a forest. A page with
//! category `[a, b]` becomes a child of the page with slug `b`, which must
//! itself be a child of the top-level page with slug `a`:
//!
//! ```text
//! docs            category []
//! └── guide       category [docs]
//!     └── install category [docs, guide]
//! ```
//!
//! The forest is an index arena over the page list. Pages whose ancestor chain
//! is broken are orphans: logged and left out of the forest, though they still
//! count in the `categories` buckets.

use crate::page::Page;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategoryForest {
    /// Top-level pages (empty category).
    pub roots: Vec<usize>,
    /// Children of each page, by page index.
    pub children: Vec<Vec<usize>>,
    /// First category segment → pages in that category, in page order.
    pub categories: BTreeMap<String, Vec<usize>>,
    pub orphans: Vec<usize>,
}

/// Stable-sort `pages` by category depth and link them into a forest.
///
/// Indices in the result refer to the sorted order.
pub fn build_tree(pages: &mut [Page]) -> CategoryForest {
    pages.sort_by_key(|p| p.meta.category.len());

    let mut forest = CategoryForest {
        children: vec![Vec::new(); pages.len()],
        ..CategoryForest::default()
    };

    for (idx, page) in pages.iter().enumerate() {
        let category = &page.meta.category;
        if let Some(top) = category.first() {
            forest.categories.entry(top.clone()).or_default().push(idx);
        }

        let mut parent: Option<usize> = None;
        let mut resolved = true;
        for segment in category {
            let siblings = match parent {
                None => &forest.roots,
                Some(p) => &forest.children[p],
            };
            match siblings.iter().find(|&&s| pages[s].meta.slug == *segment) {
                Some(&found) => parent = Some(found),
                None => {
                    resolved = false;
                    break;
                }
            }
        }
        if !resolved {
            error!(
                "It looks like the page \"{}\" is an orphan! Expected a parent page with category path {}",
                page.meta.slug,
                category.join("/")
            );
            forest.orphans.push(idx);
            continue;
        }

        let siblings = match parent {
            None => &mut forest.roots,
            Some(p) => &mut forest.children[p],
        };
        if siblings.iter().any(|&s| pages[s].meta.slug == page.meta.slug) {
            warn!(
                "Duplicate slug \"{}\" under /{}; the first page wins for child lookups",
                page.meta.slug,
                category.join("/")
            );
        }
        debug!("placing {} under /{}", page.meta.slug, category.join("/"));
        siblings.push(idx);
    }
    forest
}

/// Fill each page's `subpages` with the metas of its children.
pub fn link_subpages(pages: &mut [Page], forest: &CategoryForest) {
    // Children always sort after their parent, so walking backwards links
    // the deepest levels first.
    for idx in (0..pages.len()).rev() {
        let subpages = forest.children[idx]
            .iter()
            .map(|&child| pages[child].meta_value())
            .collect();
        pages[idx].subpages = subpages;
    }
}

/// `categories` as a template value: top segment → list of metas.
pub fn categories_value(pages: &[Page], forest: &CategoryForest) -> Value {
    let map: Map<String, Value> = forest
        .categories
        .iter()
        .map(|(name, members)| {
            let metas = members.iter().map(|&i| pages[i].meta_value()).collect();
            (name.clone(), Value::Array(metas))
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{capture_logs, page_env, page_in, slugs, subpage_slugs};
    use tempfile::TempDir;

    fn pages(specs: &[(&str, &str)]) -> (TempDir, Vec<Page>) {
        let tmp = TempDir::new().unwrap();
        let env = page_env(tmp.path());
        let pages = specs
            .iter()
            .map(|(title, category)| page_in(&env, title, category))
            .collect();
        (tmp, pages)
    }

    #[test]
    fn sorts_by_depth_stably() {
        let (_tmp, mut pages) = pages(&[
            ("install", "docs/guide"),
            ("guide", "docs"),
            ("docs", ""),
            ("about", ""),
        ]);
        build_tree(&mut pages);
        assert_eq!(slugs(&pages), vec!["docs", "about", "guide", "install"]);
    }

    #[test]
    fn nested_categories_link_up() {
        let (_tmp, mut pages) = pages(&[
            ("docs", ""),
            ("guide", "docs"),
            ("install", "docs/guide"),
            ("faq", "docs"),
        ]);
        let forest = build_tree(&mut pages);
        link_subpages(&mut pages, &forest);

        assert!(forest.orphans.is_empty());
        assert_eq!(forest.roots, vec![0]);
        let docs = &pages[0];
        assert_eq!(subpage_slugs(docs), vec!["guide", "faq"]);
        assert_eq!(docs.subpages[0]["subpages"][0]["slug"], "install");
        assert_eq!(forest.categories["docs"].len(), 3);
    }

    #[test]
    fn orphan_detected_and_not_inserted() {
        let (_tmp, mut pages) = pages(&[("docs", ""), ("lost", "missing/deeper")]);
        let forest = build_tree(&mut pages);
        link_subpages(&mut pages, &forest);

        assert_eq!(forest.orphans, vec![1]);
        assert!(forest.children.iter().all(|c| !c.contains(&1)));
        assert_eq!(forest.roots, vec![0]);
        // Still bucketed under its top-level category.
        assert_eq!(forest.categories["missing"], vec![1]);
    }

    #[test]
    fn lone_child_without_parent_is_logged_orphan() {
        let (_tmp, mut pages) = pages(&[("b", "a")]);
        let (forest, logs) = capture_logs(|| build_tree(&mut pages));

        assert_eq!(forest.orphans, vec![0]);
        assert!(forest.roots.is_empty());
        assert!(forest.children.iter().all(Vec::is_empty));
        assert!(logs.contains("ERROR"), "{logs}");
        assert!(logs.contains(r#"the page "b" is an orphan"#), "{logs}");
    }

    #[test]
    fn orphan_when_middle_link_missing() {
        let (_tmp, mut pages) = pages(&[("docs", ""), ("install", "docs/guide")]);
        let forest = build_tree(&mut pages);
        assert_eq!(forest.orphans, vec![1]);
        assert!(forest.children[0].is_empty());
    }

    #[test]
    fn duplicate_sibling_slug_first_wins() {
        let (_tmp, mut pages) = pages(&[("docs", ""), ("docs", ""), ("guide", "docs")]);
        let forest = build_tree(&mut pages);
        assert_eq!(forest.roots, vec![0, 1]);
        assert_eq!(forest.children[0], vec![2]);
        assert!(forest.children[1].is_empty());
    }

    #[test]
    fn categories_value_lists_metas() {
        let (_tmp, mut pages) = pages(&[("blog", ""), ("post", "blog")]);
        let forest = build_tree(&mut pages);
        link_subpages(&mut pages, &forest);
        let value = categories_value(&pages, &forest);
        assert_eq!(value["blog"][0]["slug"], "post");
        assert!(value.get("").is_none());
    }
}

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::Result;
use colored::Colorize;

use crate::error::Error;
use crate::models::Compartment;
use crate::oci::OciClient;

pub const ROOT_LABEL: &str = "root";

/// OCI nests compartments at most six levels deep; anything past this is a
/// broken parent relation.
const MAX_DEPTH: usize = 64;

/// Snapshot of a tenancy's compartments, indexed once and resolved on demand.
pub struct CompartmentTree {
    root_id: String,
    nodes: Vec<Compartment>,
    by_id: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    full_names: RefCell<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: String,
    pub full_name: String,
    pub depth: usize,
    pub active: bool,
}

impl CompartmentTree {
    pub fn new(root_id: impl Into<String>, compartments: Vec<Compartment>) -> Self {
        let root_id = root_id.into();
        let mut by_id = HashMap::with_capacity(compartments.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, compartment) in compartments.iter().enumerate() {
            by_id.insert(compartment.id.clone(), idx);
            children
                .entry(compartment.parent_id.clone())
                .or_default()
                .push(idx);
        }
        Self {
            root_id,
            nodes: compartments,
            by_id,
            children,
            full_names: RefCell::new(HashMap::new()),
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn get(&self, id: &str) -> Option<&Compartment> {
        self.by_id.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Compartments in the order they were loaded, root excluded.
    pub fn compartments(&self) -> &[Compartment] {
        &self.nodes
    }

    /// Colon-separated path from the root, e.g. `"Finance:Payroll"`.
    /// The root itself resolves to `"root"`.
    pub fn full_name(&self, id: &str) -> Result<String, Error> {
        if id == self.root_id {
            return Ok(ROOT_LABEL.to_string());
        }
        if let Some(name) = self.full_names.borrow().get(id) {
            return Ok(name.clone());
        }

        // Walk up until the root or an already-resolved ancestor.
        let mut chain: Vec<&Compartment> = Vec::new();
        let mut prefix: Option<String> = None;
        let mut current = id;
        loop {
            let compartment = match self.get(current) {
                Some(compartment) => compartment,
                None if chain.is_empty() => {
                    return Err(Error::CompartmentNotFound(id.to_string()))
                }
                None => {
                    return Err(Error::MalformedHierarchy {
                        id: current.to_string(),
                        reason: "parent compartment is missing",
                    })
                }
            };
            if chain.len() >= MAX_DEPTH {
                return Err(Error::MalformedHierarchy {
                    id: id.to_string(),
                    reason: "parent chain is too deep or cyclic",
                });
            }
            chain.push(compartment);
            if compartment.parent_id == self.root_id {
                break;
            }
            if let Some(known) = self.full_names.borrow().get(&compartment.parent_id) {
                prefix = Some(known.clone());
                break;
            }
            current = &compartment.parent_id;
        }

        let mut cache = self.full_names.borrow_mut();
        let mut name = prefix.unwrap_or_default();
        for compartment in chain.iter().rev() {
            if !name.is_empty() {
                name.push(':');
            }
            name.push_str(&compartment.name);
            cache.insert(compartment.id.clone(), name.clone());
        }
        Ok(name)
    }

    /// Full name for display; falls back to the raw id when unresolvable.
    pub fn display_name(&self, id: &str) -> String {
        self.full_name(id).unwrap_or_else(|_| id.to_string())
    }

    /// Root first, then every compartment depth-first with children in load
    /// order. Deleted compartments and everything below them are skipped
    /// unless `include_deleted`.
    pub fn walk(&self, include_deleted: bool) -> Result<Vec<TreeEntry>, Error> {
        let mut entries = vec![TreeEntry {
            id: self.root_id.clone(),
            full_name: ROOT_LABEL.to_string(),
            depth: 0,
            active: true,
        }];
        let mut stack: Vec<(usize, usize)> = self
            .child_indices(&self.root_id)
            .iter()
            .rev()
            .map(|&idx| (idx, 1))
            .collect();
        while let Some((idx, depth)) = stack.pop() {
            let compartment = &self.nodes[idx];
            if !include_deleted && compartment.is_deleted() {
                continue;
            }
            if depth > MAX_DEPTH || entries.len() > self.nodes.len() {
                return Err(Error::MalformedHierarchy {
                    id: compartment.id.clone(),
                    reason: "parent chain is too deep or cyclic",
                });
            }
            entries.push(TreeEntry {
                id: compartment.id.clone(),
                full_name: self.full_name(&compartment.id)?,
                depth,
                active: compartment.is_active(),
            });
            stack.extend(
                self.child_indices(&compartment.id)
                    .iter()
                    .rev()
                    .map(|&child| (child, depth + 1)),
            );
        }
        Ok(entries)
    }

    fn child_indices(&self, parent_id: &str) -> &[usize] {
        self.children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Fetches the root id and every compartment below it.
pub async fn load(client: &OciClient) -> Result<CompartmentTree> {
    let root_id = client.root_compartment_id().await?;
    let compartments = client.list_compartments(&root_id).await?;
    tracing::info!(count = compartments.len(), "compartments loaded");
    Ok(CompartmentTree::new(root_id, compartments))
}

pub async fn list(client: &OciClient, include_deleted: bool) -> Result<()> {
    let tree = load(client).await?;
    for entry in tree.walk(include_deleted)? {
        println!("{}", render_entry(&entry));
    }
    Ok(())
}

fn render_entry(entry: &TreeEntry) -> String {
    if entry.active {
        format!(
            "{}{} {}",
            "ACTIVE  ".yellow(),
            entry.id,
            entry.full_name.green()
        )
    } else {
        format!(
            "{}{} {}",
            "DELETED ".red(),
            entry.id.bright_black(),
            entry.full_name.blue()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ROOT: &str = "ocid1.tenancy.oc1..root";

    fn cpt(id: &str, parent: &str, name: &str, state: &str) -> Compartment {
        Compartment {
            id: id.to_string(),
            parent_id: parent.to_string(),
            name: name.to_string(),
            lifecycle_state: state.to_string(),
        }
    }

    fn sample() -> Vec<Compartment> {
        vec![
            cpt("a", ROOT, "A", "ACTIVE"),
            cpt("b", "a", "B", "ACTIVE"),
            cpt("c", "b", "C", "ACTIVE"),
            cpt("d", ROOT, "D", "DELETED"),
            cpt("e", "d", "E", "ACTIVE"),
            cpt("f", "a", "F", "DELETED"),
        ]
    }

    #[test]
    fn nested_compartment_resolves_colon_path() {
        let tree = CompartmentTree::new(ROOT, sample());
        assert_eq!(tree.full_name("b").expect("b"), "A:B");
        assert_eq!(tree.full_name("c").expect("c"), "A:B:C");
        assert_eq!(tree.full_name("a").expect("a"), "A");
    }

    #[test]
    fn root_resolves_to_label() {
        let tree = CompartmentTree::new(ROOT, sample());
        assert_eq!(tree.full_name(ROOT).expect("root"), "root");
        let empty = CompartmentTree::new(ROOT, Vec::new());
        assert_eq!(empty.full_name(ROOT).expect("root"), "root");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let tree = CompartmentTree::new(ROOT, sample());
        let err = tree.full_name("zzz").unwrap_err();
        assert!(matches!(err, Error::CompartmentNotFound(id) if id == "zzz"));
        assert_eq!(tree.display_name("zzz"), "zzz");
    }

    #[test]
    fn cycle_is_reported_not_looped() {
        let tree = CompartmentTree::new(
            ROOT,
            vec![cpt("x", "y", "X", "ACTIVE"), cpt("y", "x", "Y", "ACTIVE")],
        );
        let err = tree.full_name("x").unwrap_err();
        assert!(matches!(err, Error::MalformedHierarchy { .. }));
    }

    #[test]
    fn dangling_parent_is_malformed() {
        let tree = CompartmentTree::new(ROOT, vec![cpt("x", "ghost", "X", "ACTIVE")]);
        let err = tree.full_name("x").unwrap_err();
        assert!(matches!(err, Error::MalformedHierarchy { id, .. } if id == "ghost"));
    }

    #[test]
    fn cached_ancestor_is_reused() {
        let tree = CompartmentTree::new(ROOT, sample());
        assert_eq!(tree.full_name("b").expect("b"), "A:B");
        assert_eq!(tree.full_names.borrow().len(), 2);
        assert_eq!(tree.full_name("c").expect("c"), "A:B:C");
        assert_eq!(tree.full_names.borrow().get("c").map(String::as_str), Some("A:B:C"));
    }

    #[test]
    fn walk_skips_deleted_subtrees() {
        let tree = CompartmentTree::new(ROOT, sample());
        let names: Vec<_> = tree
            .walk(false)
            .expect("walk")
            .into_iter()
            .map(|entry| entry.full_name)
            .collect();
        assert_eq!(names, vec!["root", "A", "A:B", "A:B:C"]);
    }

    #[test]
    fn walk_with_deleted_is_preorder() {
        let tree = CompartmentTree::new(ROOT, sample());
        let entries = tree.walk(true).expect("walk");
        let names: Vec<_> = entries.iter().map(|e| e.full_name.as_str()).collect();
        assert_eq!(names, vec!["root", "A", "A:B", "A:B:C", "A:F", "D", "D:E"]);
        let depths: Vec<_> = entries.iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 3, 2, 1, 2]);
        assert!(!entries[4].active);
    }

    fn chain(depth: usize) -> Vec<Compartment> {
        (0..depth)
            .map(|level| {
                let parent = if level == 0 {
                    ROOT.to_string()
                } else {
                    format!("c{}", level - 1)
                };
                cpt(&format!("c{}", level), &parent, &format!("n{}", level), "ACTIVE")
            })
            .collect()
    }

    proptest! {
        #[test]
        fn colon_count_tracks_depth(depth in 1usize..12) {
            let tree = CompartmentTree::new(ROOT, chain(depth));
            let leaf = format!("c{}", depth - 1);
            let name = tree.full_name(&leaf).expect("leaf");
            prop_assert_eq!(name.matches(':').count(), depth - 1);
            prop_assert_eq!(tree.full_name(ROOT).expect("root"), "root");
        }

        #[test]
        fn resolution_ignores_input_order(
            order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let base = chain(4)
                .into_iter()
                .chain(vec![
                    cpt("s1", "c1", "side", "ACTIVE"),
                    cpt("s2", ROOT, "top", "ACTIVE"),
                    cpt("s3", "s2", "leaf", "DELETED"),
                    cpt("s4", "c3", "deep", "ACTIVE"),
                ])
                .collect::<Vec<_>>();
            let shuffled: Vec<_> = order.iter().map(|&i| base[i].clone()).collect();
            let ordered = CompartmentTree::new(ROOT, base.clone());
            let reordered = CompartmentTree::new(ROOT, shuffled);
            for compartment in &base {
                prop_assert_eq!(
                    ordered.full_name(&compartment.id).expect("ordered"),
                    reordered.full_name(&compartment.id).expect("reordered")
                );
            }
        }
    }
}

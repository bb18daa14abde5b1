//! Group forest over entity ids.
//!
//! Membership is a table from member id to parent group id, plus the
//! reverse children sets. A member has at most one parent, so the graph is
//! always a forest. Leaves are clips or compositions; inner nodes are
//! groups. The tree only stores links; the store turns each change into an
//! undoable step.

use splice_core::{Id, Result, TimelineError};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTree {
    parent: HashMap<Id, Id>,
    children: HashMap<Id, BTreeSet<Id>>,
}

impl GroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_group(&self, id: Id) -> bool {
        self.children.contains_key(&id)
    }

    /// True if `id` has a parent group.
    pub fn is_in_group(&self, id: Id) -> bool {
        self.parent.contains_key(&id)
    }

    pub fn parent(&self, id: Id) -> Option<Id> {
        self.parent.get(&id).copied()
    }

    pub fn children(&self, group: Id) -> Option<&BTreeSet<Id>> {
        self.children.get(&group)
    }

    /// Topmost ancestor of `id` (itself when it has no parent).
    pub fn root(&self, id: Id) -> Id {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// True if `ancestor` is `id` or one of its parents, transitively.
    pub fn is_ancestor(&self, ancestor: Id, id: Id) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Leaves under `id`; `{id}` if it is not a group.
    pub fn leaves(&self, id: Id) -> BTreeSet<Id> {
        let mut leaves = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match self.children.get(&node) {
                Some(children) => stack.extend(children.iter().copied()),
                None => {
                    leaves.insert(node);
                }
            }
        }
        leaves
    }

    /// Flattened leaves of the topmost group containing `id`.
    pub fn members_of(&self, id: Id) -> BTreeSet<Id> {
        self.leaves(self.root(id))
    }

    /// Groups under `group` (itself included), parents before children.
    pub fn subtree_groups(&self, group: Id) -> Vec<Id> {
        let mut order = Vec::new();
        let mut stack = vec![group];
        while let Some(node) = stack.pop() {
            if let Some(children) = self.children.get(&node) {
                order.push(node);
                stack.extend(children.iter().rev().copied());
            }
        }
        order
    }

    /// Ids of every group, sorted.
    pub fn group_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.children.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Create `group` adopting `children`. None of them may have a parent.
    pub fn insert_group(&mut self, group: Id, children: &BTreeSet<Id>) -> Result<()> {
        if self.children.contains_key(&group) || self.parent.contains_key(&group) {
            return Err(TimelineError::InvalidGroup(format!("group {group} already exists")));
        }
        if let Some(taken) = children.iter().find(|c| self.parent.contains_key(c)) {
            return Err(TimelineError::InvalidGroup(format!(
                "{taken} already belongs to group {}",
                self.root(*taken)
            )));
        }
        if children.contains(&group) {
            return Err(TimelineError::InvalidGroup(format!("group {group} cannot contain itself")));
        }
        for &child in children {
            self.parent.insert(child, group);
        }
        self.children.insert(group, children.clone());
        Ok(())
    }

    /// Remove `group`, leaving its children parentless.
    /// Returns the group's former parent and children.
    pub fn remove_group(&mut self, group: Id) -> Result<(Option<Id>, BTreeSet<Id>)> {
        let children = self
            .children
            .remove(&group)
            .ok_or_else(|| TimelineError::InvalidGroup(format!("{group} is not a group")))?;
        for child in &children {
            self.parent.remove(child);
        }
        let parent = self.unlink(group);
        Ok((parent, children))
    }

    /// Attach `child` to the existing group `parent`.
    pub fn link(&mut self, child: Id, parent: Id) -> Result<()> {
        if let Some(existing) = self.parent(child) {
            return Err(TimelineError::InvalidGroup(format!(
                "{child} already belongs to group {existing}"
            )));
        }
        if self.is_ancestor(child, parent) {
            return Err(TimelineError::InvalidGroup(format!(
                "linking {child} under {parent} would form a cycle"
            )));
        }
        let siblings = self
            .children
            .get_mut(&parent)
            .ok_or_else(|| TimelineError::InvalidGroup(format!("{parent} is not a group")))?;
        siblings.insert(child);
        self.parent.insert(child, parent);
        Ok(())
    }

    /// Detach `child` from its parent, returning the parent.
    pub fn unlink(&mut self, child: Id) -> Option<Id> {
        let parent = self.parent.remove(&child)?;
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.remove(&child);
        }
        Some(parent)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Check that parent links and children sets mirror each other and
    /// that every group reaches a root.
    pub fn verify(&self) -> Result<()> {
        for (group, children) in &self.children {
            if let Some(child) = children.iter().find(|c| self.parent(**c) != Some(*group)) {
                return Err(TimelineError::InvalidGroup(format!(
                    "group {group} lists {child} but its parent is {:?}",
                    self.parent(*child)
                )));
            }
        }
        for (child, parent) in &self.parent {
            let listed = self.children.get(parent).map_or(false, |c| c.contains(child));
            if !listed {
                return Err(TimelineError::InvalidGroup(format!(
                    "{child} points at group {parent}, which does not list it"
                )));
            }
        }
        for group in self.children.keys() {
            let mut current = *group;
            let mut hops = 0;
            while let Some(parent) = self.parent(current) {
                hops += 1;
                if hops > self.children.len() {
                    return Err(TimelineError::InvalidGroup(format!(
                        "group {group} is part of a cycle"
                    )));
                }
                current = parent;
            }
        }
        Ok(())
    }
}

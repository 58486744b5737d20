use std::collections::BTreeMap;

use crate::errors::CoreError;

/// Handle to an element inside a [`Document`].
///
/// Carries the generation of its slot, so a handle to a discarded element
/// never aliases whatever reuses the slot later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// A single element. Text is stored directly on the element rather than as
/// separate text nodes.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn has_classes(&self, classes: &[&str]) -> bool {
        classes.iter().all(|c| self.has_class(c))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    element: Option<Element>,
}

/// Arena-backed element tree standing in for the host page DOM.
///
/// [`remove`](Self::remove) only detaches a node, the same way a detached DOM
/// node keeps existing while something holds it. [`discard`](Self::discard)
/// detaches and frees the whole subtree; its slots are reused by later
/// `create_element` calls.
///
/// Accessors panic when handed a handle to a discarded node.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
}

impl Document {
    /// Empty document with an `html` root element.
    pub fn new() -> Self {
        let root = Element {
            tag: "html".into(),
            ..Default::default()
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                element: Some(root),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let element = Element {
            tag: tag.to_string(),
            ..Default::default()
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.element = Some(element);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            element: Some(element),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Create a detached element with a whitespace-separated class list.
    pub fn create_element_with(&mut self, tag: &str, class_list: &str) -> NodeId {
        let node = self.create_element(tag);
        self.set_class_list(node, class_list);
        node
    }

    /// True if `node` refers to an element that has not been discarded.
    pub fn contains(&self, node: NodeId) -> bool {
        self.slots
            .get(node.index)
            .is_some_and(|s| s.generation == node.generation && s.element.is_some())
    }

    /// Live elements, attached or not.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Slots allocated so far, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn element(&self, node: NodeId) -> &Element {
        match self.slots.get(node.index) {
            Some(Slot {
                generation,
                element: Some(el),
            }) if *generation == node.generation => el,
            _ => panic!("stale or foreign {node:?}"),
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> &mut Element {
        match self.slots.get_mut(node.index) {
            Some(Slot {
                generation,
                element: Some(el),
            }) if *generation == node.generation => el,
            _ => panic!("stale or foreign {node:?}"),
        }
    }

    pub fn set_id(&mut self, node: NodeId, id: impl Into<String>) {
        self.element_mut(node).id = Some(id.into());
    }

    pub fn set_class_list(&mut self, node: NodeId, class_list: &str) {
        self.element_mut(node).classes = class_list.split_whitespace().map(String::from).collect();
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        self.element_mut(node).text = text.into();
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        self.element_mut(node)
            .attributes
            .insert(name.to_string(), value.into());
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.element(node).children
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    }

    /// Append `child` as the last child of `parent`, moving it if already attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), CoreError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. Moves `child` if it is already attached somewhere.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), CoreError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(CoreError::Dom("node has been discarded".into()));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(CoreError::Dom("cannot insert a node into its own subtree".into()));
        }
        if let Some(r) = reference {
            if !self.contains(r) || self.parent(r) != Some(parent) {
                return Err(CoreError::Dom("reference node is not a child of parent".into()));
            }
            if r == child {
                // Already in place
                return Ok(());
            }
        }

        self.remove(child);

        let siblings = &mut self.element_mut(parent).children;
        let index = match reference {
            Some(r) => siblings
                .iter()
                .position(|&c| c == r)
                .unwrap_or(siblings.len()),
            None => siblings.len(),
        };
        siblings.insert(index, child);
        self.element_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detach `node` from its parent. Returns false if it was already detached.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.element_mut(node).parent.take() else {
            return false;
        };
        self.element_mut(parent).children.retain(|&c| c != node);
        true
    }

    /// Detach `node` and free it together with its whole subtree.
    ///
    /// Returns the number of elements freed; 0 for the root or a handle that
    /// was already discarded.
    pub fn discard(&mut self, node: NodeId) -> usize {
        if node == self.root || !self.contains(node) {
            return 0;
        }
        self.remove(node);

        let mut doomed = self.descendants(node);
        doomed.push(node);
        for n in &doomed {
            let slot = &mut self.slots[n.index];
            slot.element = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(n.index);
        }
        doomed.len()
    }

    /// True if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_iter(node).any(|p| p == ancestor)
    }

    /// Strict ancestors of `node`, nearest first, walked lazily.
    pub fn ancestors_iter(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&p| self.parent(p))
    }

    /// Strict descendants of `node` in document (pre-)order, walked lazily so
    /// searches can stop at the first hit.
    pub fn descendants_iter(&self, node: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(node).iter().rev().copied().collect(),
        }
    }

    /// Strict descendants of `node` in document (pre-)order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants_iter(node).collect()
    }

    /// Attached elements carrying `id`, in document order.
    pub fn elements_by_id(&self, id: &str) -> Vec<NodeId> {
        self.descendants_iter(self.root)
            .filter(|&n| self.element(n).id.as_deref() == Some(id))
            .collect()
    }

    /// First attached element carrying `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants_iter(self.root)
            .find(|&n| self.element(n).id.as_deref() == Some(id))
    }

    /// Concatenated text of `node` and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = self.element(node).text.clone();
        for d in self.descendants_iter(node) {
            text.push_str(&self.element(d).text);
        }
        text
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order walk below a node. See [`Document::descendants_iter`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let n = self.stack.pop()?;
        self.stack.extend(self.doc.children(n).iter().rev());
        Some(n)
    }
}

use std::collections::{BTreeMap, btree_map::Entry};

use crate::{InferErr, Result};

/// A dense, row-major block of `f32` values together with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `shape` - The size of each dimension, outermost first.
    /// * `data` - The values in row-major order.
    ///
    /// # Returns
    /// A new `Tensor` or an error if the amount of values does not match the shape.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(InferErr::ShapeMismatch {
                what: "tensor data length",
                expected,
                got: data.len(),
            });
        }

        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// A named collection of nodes, iterated in lexicographic order of their names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    children: BTreeMap<String, Node>,
}

/// A node of a hierarchical weight container.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(Group),
    Dataset(Tensor),
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the child named `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Returns the child group named `name`, if any.
    pub fn group(&self, name: &str) -> Option<&Group> {
        match self.children.get(name)? {
            Node::Group(group) => Some(group),
            Node::Dataset(_) => None,
        }
    }

    /// Iterates over the direct children sorted by name.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Iterates over the direct child groups sorted by name.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.children().filter_map(|(name, node)| match node {
            Node::Group(group) => Some((name, group)),
            Node::Dataset(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Inserts `node` under `name`, replacing any previous child with that name.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) {
        self.children.insert(name.into(), node);
    }

    /// Inserts `node` under `name`.
    ///
    /// # Returns
    /// An error if a child with that name already exists.
    pub fn try_insert(&mut self, name: &str, node: Node) -> Result<()> {
        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => Err(InferErr::WeightStoreReadError {
                what: format!("'{name}' is defined more than once"),
            }),
            Entry::Vacant(entry) => {
                entry.insert(node);
                Ok(())
            }
        }
    }

    /// Returns the group at the `/`-separated `path`, creating every missing group along the way.
    ///
    /// # Returns
    /// The group or an error if a dataset is in the middle of the path.
    pub fn group_mut_or_insert(&mut self, path: &str) -> Result<&mut Group> {
        let mut curr = self;

        for name in path.split('/').filter(|name| !name.is_empty()) {
            let node = curr
                .children
                .entry(name.to_string())
                .or_insert_with(|| Node::Group(Group::new()));

            curr = match node {
                Node::Group(group) => group,
                Node::Dataset(_) => {
                    return Err(InferErr::WeightStoreReadError {
                        what: format!("'{name}' in '{path}' is a dataset, not a group"),
                    });
                }
            };
        }

        Ok(curr)
    }

    /// Walks every node below this group depth first, in lexicographic order.
    ///
    /// # Arguments
    /// * `f` - Called with the full `/`-separated path and the node.
    pub fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&str, &Node),
    {
        self.visit_prefixed("", f);
    }

    fn visit_prefixed<F>(&self, prefix: &str, f: &mut F)
    where
        F: FnMut(&str, &Node),
    {
        for (name, node) in self.children() {
            let path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };

            f(&path, node);

            if let Node::Group(group) = node {
                group.visit_prefixed(&path, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(v: f32) -> Node {
        Node::Dataset(Tensor::new(vec![1], vec![v]).unwrap())
    }

    #[test]
    fn tensor_rejects_wrong_length() {
        let err = Tensor::new(vec![2, 3], vec![0.; 5]).unwrap_err();
        assert!(matches!(
            err,
            InferErr::ShapeMismatch {
                expected: 6,
                got: 5,
                ..
            }
        ));
    }

    #[test]
    fn children_are_sorted() {
        let mut group = Group::new();
        group.insert("dense_1", scalar(0.));
        group.insert("conv2d", scalar(1.));
        group.insert("dense", scalar(2.));

        let names: Vec<_> = group.children().map(|(name, _)| name).collect();
        assert_eq!(names, ["conv2d", "dense", "dense_1"]);
    }

    #[test]
    fn try_insert_keeps_the_first_child() {
        let mut group = Group::new();
        group.try_insert("bias", scalar(1.)).unwrap();

        let err = group.try_insert("bias", scalar(2.)).unwrap_err();
        assert!(matches!(err, InferErr::WeightStoreReadError { .. }));
        assert_eq!(group.get("bias"), Some(&scalar(1.)));
    }

    #[test]
    fn nested_insert_and_visit() {
        let mut root = Group::new();
        root.group_mut_or_insert("a/b")
            .unwrap()
            .insert("kernel", scalar(1.));
        root.group_mut_or_insert("a/c").unwrap();

        let mut paths = Vec::new();
        root.visit(&mut |path, _| paths.push(path.to_string()));

        assert_eq!(paths, ["a", "a/b", "a/b/kernel", "a/c"]);
    }

    #[test]
    fn dataset_in_path_is_an_error() {
        let mut root = Group::new();
        root.insert("kernel", scalar(1.));

        assert!(root.group_mut_or_insert("kernel/inner").is_err());
    }
}

use super::{Group, Node, Tensor};

/// Layer groups that never hold parameters.
pub const PLACEHOLDER_GROUPS: &[&str] = &["top_level_model_weights"];

/// The name tokens identifying one of the two datasets of a layer.
///
/// `strong` is always tried first; `weak` is only a fallback for containers written by tools
/// that use single letter names, and is ignored as soon as a strong match exists.
struct TokenFamily {
    strong: &'static str,
    weak: &'static str,
}

const KERNEL: TokenFamily = TokenFamily {
    strong: "kernel",
    weak: "W",
};

const BIAS: TokenFamily = TokenFamily {
    strong: "bias",
    weak: "b",
};

/// The kernel and bias found below a layer group.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'c> {
    /// The name of the layer group directly below the top level group.
    pub group: &'c str,
    pub kernel: &'c Tensor,
    pub bias: &'c Tensor,
}

/// The layer candidates found in a container, classified by kernel rank and sorted by group name.
#[derive(Debug, Default)]
pub struct Discovery<'c> {
    pub conv: Vec<Candidate<'c>>,
    pub dense: Vec<Candidate<'c>>,
}

/// Datasets matched below a single layer group, bucketed by token family and strength.
#[derive(Default)]
struct Matches<'c> {
    kernel: Vec<&'c Tensor>,
    weak_kernel: Vec<&'c Tensor>,
    bias: Vec<&'c Tensor>,
    weak_bias: Vec<&'c Tensor>,
}

impl<'c> Matches<'c> {
    /// Recursively visits every node below `group`.
    fn collect(&mut self, group: &'c Group) {
        for (name, node) in group.children() {
            match node {
                Node::Group(inner) => self.collect(inner),
                Node::Dataset(tensor) => self.classify(name, tensor),
            }
        }
    }

    /// A name matching the kernel family is never counted as a bias as well.
    fn classify(&mut self, name: &str, tensor: &'c Tensor) {
        if name.contains(KERNEL.strong) {
            self.kernel.push(tensor);
        } else if name.contains(BIAS.strong) {
            self.bias.push(tensor);
        } else if name.contains(KERNEL.weak) {
            self.weak_kernel.push(tensor);
        } else if name.contains(BIAS.weak) {
            self.weak_bias.push(tensor);
        }
    }
}

/// The outcome of searching a token family below one layer group.
enum Pick<'c> {
    Found(&'c Tensor),
    Missing,
    Ambiguous(usize),
}

fn pick<'c>(strong: &[&'c Tensor], weak: &[&'c Tensor]) -> Pick<'c> {
    let matches = if strong.is_empty() { weak } else { strong };

    match matches {
        [] => Pick::Missing,
        &[tensor] => Pick::Found(tensor),
        many => Pick::Ambiguous(many.len()),
    }
}

/// Searches every layer group of `top` for its kernel and bias.
///
/// The direct child groups of `top` are taken in lexicographic order, skipping the
/// [`PLACEHOLDER_GROUPS`]. Groups without exactly one kernel-like and one bias-like dataset,
/// or whose kernel is neither rank 4 nor rank 2, are not candidates.
pub fn discover(top: &Group) -> Discovery<'_> {
    let mut discovery = Discovery::default();

    for (name, group) in top.groups() {
        if PLACEHOLDER_GROUPS.contains(&name) {
            continue;
        }

        let mut matches = Matches::default();
        matches.collect(group);

        let kernel = pick(&matches.kernel, &matches.weak_kernel);
        let bias = pick(&matches.bias, &matches.weak_bias);

        let (kernel, bias) = match (kernel, bias) {
            (Pick::Found(kernel), Pick::Found(bias)) => (kernel, bias),
            (Pick::Ambiguous(n), _) => {
                log::warn!("skipping '{name}': {n} kernel-like datasets");
                continue;
            }
            (_, Pick::Ambiguous(n)) => {
                log::warn!("skipping '{name}': {n} bias-like datasets");
                continue;
            }
            _ => {
                log::debug!("'{name}' holds no parameters");
                continue;
            }
        };

        let candidate = Candidate {
            group: name,
            kernel,
            bias,
        };

        match kernel.rank() {
            4 => discovery.conv.push(candidate),
            2 => discovery.dense.push(candidate),
            rank => log::debug!("ignoring '{name}': rank {rank} kernel"),
        }
    }

    discovery.conv.sort_by_key(|c| c.group);
    discovery.dense.sort_by_key(|c| c.group);
    discovery
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(shape: &[usize]) -> Node {
        let len = shape.iter().product();
        Node::Dataset(Tensor::new(shape.to_vec(), vec![0.; len]).unwrap())
    }

    fn layer(top: &mut Group, path: &str, kernel: &[usize], bias: &[usize]) {
        let group = top.group_mut_or_insert(path).unwrap();
        group.insert("kernel:0", dataset(kernel));
        group.insert("bias:0", dataset(bias));
    }

    #[test]
    fn classifies_by_rank_in_name_order() {
        let mut top = Group::new();
        layer(&mut top, "dense_1/sequential/dense_1", &[8, 6], &[6]);
        layer(&mut top, "conv2d_1/sequential/conv2d_1", &[3, 3, 4, 8], &[8]);
        layer(&mut top, "dense/sequential/dense", &[32, 8], &[8]);
        layer(&mut top, "conv2d/sequential/conv2d", &[3, 3, 1, 4], &[4]);
        top.group_mut_or_insert("flatten").unwrap();
        top.group_mut_or_insert("max_pooling2d").unwrap();

        let found = discover(&top);
        let conv: Vec<_> = found.conv.iter().map(|c| c.group).collect();
        let dense: Vec<_> = found.dense.iter().map(|c| c.group).collect();

        assert_eq!(conv, ["conv2d", "conv2d_1"]);
        assert_eq!(dense, ["dense", "dense_1"]);
        assert_eq!(found.conv[1].kernel.shape(), [3, 3, 4, 8]);
    }

    #[test]
    fn placeholder_groups_are_ignored() {
        let mut top = Group::new();
        layer(&mut top, "top_level_model_weights", &[2, 2], &[2]);

        let found = discover(&top);
        assert!(found.conv.is_empty() && found.dense.is_empty());
    }

    #[test]
    fn weak_tokens_are_a_fallback() {
        let mut top = Group::new();
        let group = top.group_mut_or_insert("fc").unwrap();
        group.insert("W", dataset(&[4, 2]));
        group.insert("b", dataset(&[2]));

        let found = discover(&top);
        assert_eq!(found.dense.len(), 1);
        assert_eq!(found.dense[0].kernel.shape(), [4, 2]);
        assert_eq!(found.dense[0].bias.shape(), [2]);
    }

    #[test]
    fn strong_tokens_win_over_weak_ones() {
        let mut top = Group::new();
        let group = top.group_mut_or_insert("fc").unwrap();
        group.insert("kernel", dataset(&[4, 2]));
        group.insert("bias", dataset(&[2]));
        group.insert("W_backup", dataset(&[9, 9]));

        let found = discover(&top);
        assert_eq!(found.dense[0].kernel.shape(), [4, 2]);
    }

    #[test]
    fn ambiguous_groups_are_skipped() {
        let mut top = Group::new();
        let group = top.group_mut_or_insert("fc").unwrap();
        group.insert("kernel", dataset(&[4, 2]));
        group.insert("recurrent_kernel", dataset(&[2, 2]));
        group.insert("bias", dataset(&[2]));

        assert!(discover(&top).dense.is_empty());
    }

    #[test]
    fn groups_missing_a_bias_are_skipped() {
        let mut top = Group::new();
        top.group_mut_or_insert("fc")
            .unwrap()
            .insert("kernel", dataset(&[4, 2]));

        assert!(discover(&top).dense.is_empty());
    }
}

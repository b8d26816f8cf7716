use std::{collections::HashMap, fs, io, path::Path};

use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use super::{Group, Node, Tensor};
use crate::{InferErr, Result};

/// The metadata entry listing the groups that hold no dataset, since safetensors only stores
/// tensors.
const GROUPS_KEY: &str = "groups";

/// A read-only hierarchical weight container.
///
/// On disk it is a safetensors file whose tensor names are `/`-separated paths, the last
/// component being the dataset name and the rest the chain of groups holding it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    root: Group,
}

impl Container {
    /// Creates a new `Container` out of an already built tree.
    pub fn new(root: Group) -> Self {
        Self { root }
    }

    /// The root group of the container.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Opens and decodes the container stored at `path`.
    ///
    /// # Returns
    /// The container, `WeightStoreNotFound` if there is no file at `path` or
    /// `WeightStoreReadError` if it could not be read or decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => InferErr::WeightStoreNotFound {
                path: path.to_path_buf(),
            },
            _ => e.into(),
        })?;

        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_safetensors_bytes(&bytes)
    }

    /// Decodes a container from a safetensors buffer.
    pub fn from_safetensors_bytes(bytes: &[u8]) -> Result<Self> {
        let (_, metadata) = SafeTensors::read_metadata(bytes)?;
        let tensors = SafeTensors::deserialize(bytes)?;
        let mut root = Group::new();

        if let Some(groups) = metadata.metadata().as_ref().and_then(|m| m.get(GROUPS_KEY)) {
            let groups: Vec<String> =
                serde_json::from_str(groups).map_err(|e| InferErr::WeightStoreReadError {
                    what: format!("invalid '{GROUPS_KEY}' metadata: {e}"),
                })?;

            for path in &groups {
                root.group_mut_or_insert(path)?;
            }
        }

        // The header is a map, sorting makes clashing paths fail the same way on every read.
        let mut tensors = tensors.tensors();
        tensors.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (name, view) in tensors {
            let (parent, leaf) = name.rsplit_once('/').unwrap_or(("", name.as_str()));
            let data = decode(&name, view.dtype(), view.data())?;
            let tensor = Tensor::new(view.shape().to_vec(), data)?;

            root.group_mut_or_insert(parent)?
                .try_insert(leaf, Node::Dataset(tensor))?;
        }

        Ok(Self { root })
    }

    /// Encodes the container as a safetensors buffer of little endian `f32` values.
    pub fn to_safetensors_bytes(&self) -> Result<Vec<u8>> {
        let mut datasets = Vec::new();
        let mut empty_groups = Vec::new();

        self.root.visit(&mut |path, node| match node {
            Node::Dataset(tensor) => {
                let bytes: Vec<u8> = tensor.data().iter().flat_map(|v| v.to_le_bytes()).collect();
                datasets.push((path.to_string(), tensor.shape().to_vec(), bytes));
            }
            Node::Group(group) if group.is_empty() => empty_groups.push(path.to_string()),
            Node::Group(_) => {}
        });

        let views = datasets
            .iter()
            .map(|(name, shape, bytes)| {
                let view = TensorView::new(Dtype::F32, shape.clone(), bytes)?;
                Ok((name.as_str(), view))
            })
            .collect::<Result<Vec<_>>>()?;

        let metadata = if empty_groups.is_empty() {
            None
        } else {
            let groups =
                serde_json::to_string(&empty_groups).map_err(|e| InferErr::WeightStoreReadError {
                    what: format!("cannot encode '{GROUPS_KEY}' metadata: {e}"),
                })?;
            Some(HashMap::from([(GROUPS_KEY.to_string(), groups)]))
        };

        Ok(safetensors::serialize(views, &metadata)?)
    }

    /// Writes the container to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_safetensors_bytes()?;
        fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Walks every group and dataset depth first, in lexicographic order.
    ///
    /// # Arguments
    /// * `f` - Called with the full path, the depth (0 for the root's children) and the node.
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(&str, usize, &Node),
    {
        self.root
            .visit(&mut |path, node| f(path, path.matches('/').count(), node));
    }
}

/// Converts the raw little endian bytes of a dataset into `f32` values.
fn decode(name: &str, dtype: Dtype, data: &[u8]) -> Result<Vec<f32>> {
    let values = match dtype {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| half::bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        other => {
            return Err(InferErr::WeightStoreReadError {
                what: format!("dataset '{name}' has unsupported dtype {other:?}"),
            });
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        let mut root = Group::new();
        let layer = root.group_mut_or_insert("model_weights/dense/dense").unwrap();
        layer.insert(
            "kernel",
            Node::Dataset(Tensor::new(vec![2, 3], (0..6).map(|i| i as f32).collect()).unwrap()),
        );
        layer.insert(
            "bias",
            Node::Dataset(Tensor::new(vec![3], vec![0.5, -0.5, 1.5]).unwrap()),
        );
        root.group_mut_or_insert("model_weights/flatten").unwrap();

        Container::new(root)
    }

    #[test]
    fn bytes_preserve_tree_and_empty_groups() {
        let container = sample();
        let bytes = container.to_safetensors_bytes().unwrap();
        let decoded = Container::from_safetensors_bytes(&bytes).unwrap();

        assert_eq!(decoded, container);
    }

    fn f32_view(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn dataset_clashing_with_a_group_is_always_a_read_error() {
        let kernel = f32_view(&[1., 2., 3., 4.]);
        let bias = f32_view(&[0.5, 0.5]);
        let bytes = safetensors::serialize(
            [
                (
                    "m/dense/kernel",
                    TensorView::new(Dtype::F32, vec![2, 2], &kernel).unwrap(),
                ),
                (
                    "m/dense",
                    TensorView::new(Dtype::F32, vec![2], &bias).unwrap(),
                ),
            ],
            &None,
        )
        .unwrap();

        for _ in 0..50 {
            let err = Container::from_safetensors_bytes(&bytes).unwrap_err();
            assert!(matches!(err, InferErr::WeightStoreReadError { .. }));
        }
    }

    #[test]
    fn dataset_clashing_with_an_empty_group_is_a_read_error() {
        let bias = f32_view(&[0.5]);
        let metadata = HashMap::from([(GROUPS_KEY.to_string(), r#"["m/flatten"]"#.to_string())]);
        let bytes = safetensors::serialize(
            [(
                "m/flatten",
                TensorView::new(Dtype::F32, vec![1], &bias).unwrap(),
            )],
            &Some(metadata),
        )
        .unwrap();

        let err = Container::from_safetensors_bytes(&bytes).unwrap_err();
        assert!(matches!(err, InferErr::WeightStoreReadError { .. }));
    }

    #[test]
    fn group_names_with_commas_survive() {
        let mut root = Group::new();
        root.group_mut_or_insert("model_weights/a,b").unwrap();
        let container = Container::new(root);

        let bytes = container.to_safetensors_bytes().unwrap();
        let decoded = Container::from_safetensors_bytes(&bytes).unwrap();

        let top = decoded.root().group("model_weights").unwrap();
        let names: Vec<_> = top.children().map(|(name, _)| name).collect();
        assert_eq!(names, ["a,b"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Container::open("/definitely/not/here/weights.safetensors").unwrap_err();
        assert!(matches!(err, InferErr::WeightStoreNotFound { .. }));
    }

    #[test]
    fn garbage_is_a_read_error() {
        let err = Container::from_safetensors_bytes(b"not a container").unwrap_err();
        assert!(matches!(err, InferErr::WeightStoreReadError { .. }));
    }

    #[test]
    fn f16_datasets_are_widened() {
        let raw: Vec<u8> = [1.5f32, -2.0]
            .iter()
            .flat_map(|&v| half::f16::from_f32(v).to_le_bytes())
            .collect();
        let view = TensorView::new(Dtype::F16, vec![2], &raw).unwrap();
        let bytes = safetensors::serialize([("g/bias", view)], &None).unwrap();

        let container = Container::from_safetensors_bytes(&bytes).unwrap();
        let Some(Node::Group(g)) = container.root().get("g") else {
            panic!("missing group");
        };
        let Some(Node::Dataset(bias)) = g.get("bias") else {
            panic!("missing dataset");
        };

        assert_eq!(bias.data(), [1.5, -2.0]);
    }

    #[test]
    fn visit_reports_depth() {
        let container = sample();
        let mut seen = Vec::new();
        container.visit(|path, depth, _| seen.push((path.to_string(), depth)));

        assert_eq!(seen[0], ("model_weights".to_string(), 0));
        assert!(seen.contains(&("model_weights/dense/dense/kernel".to_string(), 3)));
    }
}

use super::{Container, Group, Node, TOP_LEVEL_GROUP, Tensor};
use crate::{
    Result,
    arch::{ConvParams, DenseParams, ParameterSet},
};

/// Layers without parameters that Keras still records as empty groups.
const STATELESS_LAYERS: [&str; 4] = [
    "flatten",
    "max_pooling2d",
    "max_pooling2d_1",
    "top_level_model_weights",
];

/// Lays `params` out the way Keras stores a sequential model:
/// `model_weights/<layer>/sequential/<layer>/{kernel, bias}`, plus an empty group per stateless
/// layer.
pub fn to_keras_container(params: &ParameterSet) -> Result<Container> {
    let mut root = Group::new();
    let [conv1, conv2] = params.conv();
    let [dense1, dense2] = params.dense();

    insert_layer(&mut root, "conv2d", conv_tensors(conv1)?)?;
    insert_layer(&mut root, "conv2d_1", conv_tensors(conv2)?)?;
    insert_layer(&mut root, "dense", dense_tensors(dense1)?)?;
    insert_layer(&mut root, "dense_1", dense_tensors(dense2)?)?;

    for name in STATELESS_LAYERS {
        root.group_mut_or_insert(&format!("{TOP_LEVEL_GROUP}/{name}"))?;
    }

    Ok(Container::new(root))
}

fn insert_layer(root: &mut Group, name: &str, (kernel, bias): (Tensor, Tensor)) -> Result<()> {
    let group = root.group_mut_or_insert(&format!("{TOP_LEVEL_GROUP}/{name}/sequential/{name}"))?;
    group.insert("kernel", Node::Dataset(kernel));
    group.insert("bias", Node::Dataset(bias));
    Ok(())
}

fn conv_tensors(conv: &ConvParams) -> Result<(Tensor, Tensor)> {
    let kernel = conv.kernel();
    Ok((
        Tensor::new(kernel.shape().to_vec(), kernel.iter().copied().collect())?,
        Tensor::new(vec![conv.out_channels()], conv.bias().to_vec())?,
    ))
}

fn dense_tensors(dense: &DenseParams) -> Result<(Tensor, Tensor)> {
    let weights = dense.weights();
    Ok((
        Tensor::new(weights.shape().to_vec(), weights.iter().copied().collect())?,
        Tensor::new(vec![dense.outputs()], dense.bias().to_vec())?,
    ))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{initialization::Architecture, store::load};

    #[test]
    fn written_layout_loads_back() {
        let arch = Architecture {
            side: 12,
            filters: [2, 3],
            hidden: 5,
            ..Architecture::default()
        };
        let params = arch.he_normal(StdRng::seed_from_u64(42)).unwrap();

        let container = to_keras_container(&params).unwrap();
        let bytes = container.to_safetensors_bytes().unwrap();
        let loaded = load(&Container::from_safetensors_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(loaded, params);
    }

    #[test]
    fn stateless_layers_are_empty_groups() {
        let params = Architecture {
            side: 12,
            filters: [1, 1],
            hidden: 2,
            ..Architecture::default()
        }
        .he_normal(StdRng::seed_from_u64(0))
        .unwrap();

        let container = to_keras_container(&params).unwrap();
        let top = container.root().group(TOP_LEVEL_GROUP).unwrap();

        for name in STATELESS_LAYERS {
            assert!(top.group(name).unwrap().is_empty());
        }
    }
}

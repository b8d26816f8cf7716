use std::path::Path;

use super::{Container, Group, discovery};
use crate::{
    InferErr, Result,
    arch::{ConvParams, DenseParams, ParameterSet},
};

/// The conventional name of the group holding one group per layer.
pub const TOP_LEVEL_GROUP: &str = "model_weights";

/// Opens the container at `path` and loads its parameters, see [`load`].
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<ParameterSet> {
    let path = path.as_ref();
    log::info!("loading weights from {}", path.display());

    let container = Container::open(path)?;
    load(&container)
}

/// Extracts two convolutional and two dense layers out of `container`.
///
/// Layer groups are discovered by name tokens rather than fixed paths, see
/// [`discovery::discover`]. The first two candidates of each kind, by ascending group name,
/// become the first and second layer of that kind; this relies on the writer naming layers in
/// depth order.
///
/// # Returns
/// The parameter set or `MalformedWeightStore` with the counts found if there are fewer than
/// two candidates of either kind.
pub fn load(container: &Container) -> Result<ParameterSet> {
    let Some(top) = top_level(container.root()) else {
        log::warn!("no '{TOP_LEVEL_GROUP}' group in the weight store");
        return Err(InferErr::MalformedWeightStore { conv: 0, dense: 0 });
    };

    let found = discovery::discover(top);
    let (conv, dense) = (found.conv.len(), found.dense.len());

    let (Some((conv1, conv2)), Some((dense1, dense2))) = (first_two(&found.conv), first_two(&found.dense))
    else {
        return Err(InferErr::MalformedWeightStore { conv, dense });
    };

    if conv > 2 || dense > 2 {
        log::warn!("ignoring {} extra layer candidates", conv + dense - 4);
    }

    for candidate in [conv1, conv2, dense1, dense2] {
        log::debug!(
            "layer '{}': kernel {:?}, bias {:?}",
            candidate.group,
            candidate.kernel.shape(),
            candidate.bias.shape()
        );
    }

    let params = ParameterSet::new(
        ConvParams::from_tensors(conv1.kernel, conv1.bias)?,
        ConvParams::from_tensors(conv2.kernel, conv2.bias)?,
        DenseParams::from_tensors(dense1.kernel, dense1.bias)?,
        DenseParams::from_tensors(dense2.kernel, dense2.bias)?,
    )?;

    log::info!(
        "loaded {conv} conv and {dense} dense layers, {} labels",
        params.num_labels()
    );

    Ok(params)
}

/// The top level group: [`TOP_LEVEL_GROUP`], or the only group of the root if there is no such
/// group.
fn top_level(root: &Group) -> Option<&Group> {
    if let Some(top) = root.group(TOP_LEVEL_GROUP) {
        return Some(top);
    }

    let mut groups = root.groups();
    match (groups.next(), groups.next()) {
        (Some((_, only)), None) => Some(only),
        _ => None,
    }
}

fn first_two<T: Copy>(items: &[T]) -> Option<(T, T)> {
    match items {
        [first, second, ..] => Some((*first, *second)),
        _ => None,
    }
}

//! Geometry and paint-order edits applied to the selected layers.

use crate::geometry::Bounds;
use crate::layers::LayerId;
use crate::store::{LayerStorage, StoreResult};
use kurbo::Vec2;

/// Move every listed layer by `offset`. Missing ids are skipped.
pub fn translate_layers(
    storage: &mut dyn LayerStorage,
    ids: &[LayerId],
    offset: Vec2,
) -> StoreResult<()> {
    for id in ids {
        if let Some(mut layer) = storage.layer(id) {
            layer.translate(offset);
            storage.set_layer(*id, layer)?;
        }
    }
    Ok(())
}

/// Replace a layer's bounds. Returns `false` if the layer is missing.
pub fn resize_layer(storage: &mut dyn LayerStorage, id: &LayerId, bounds: Bounds) -> StoreResult<bool> {
    let Some(mut layer) = storage.layer(id) else {
        return Ok(false);
    };
    layer.set_bounds(bounds);
    storage.set_layer(*id, layer)?;
    Ok(true)
}

/// Order indices of the listed ids, ascending. Ids not in the order are ignored.
fn selected_indices(storage: &dyn LayerStorage, ids: &[LayerId]) -> Vec<usize> {
    storage
        .layer_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| ids.contains(*id))
        .map(|(index, _)| index)
        .collect()
}

/// Move the listed layers to the top of the paint order, keeping their relative order.
pub fn move_to_front(storage: &mut dyn LayerStorage, ids: &[LayerId]) -> StoreResult<()> {
    let indices = selected_indices(storage, ids);
    let len = storage.layer_ids().len();
    let n = indices.len();
    // Walk from the topmost so earlier moves do not shift pending indices
    for (i, index) in indices.iter().enumerate().rev() {
        storage.move_layer_id(*index, len - n + i)?;
    }
    Ok(())
}

/// Move the listed layers to the bottom of the paint order, keeping their relative order.
pub fn move_to_back(storage: &mut dyn LayerStorage, ids: &[LayerId]) -> StoreResult<()> {
    let indices = selected_indices(storage, ids);
    for (i, index) in indices.iter().enumerate() {
        storage.move_layer_id(*index, i)?;
    }
    Ok(())
}

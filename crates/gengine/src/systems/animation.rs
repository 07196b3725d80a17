//! Animation system: advances sprite frames of every activated instance.

use crate::core::collection::InstanceCollection;

/// Advance the animation of every activated instance by one step.
///
/// Called once per draw step, or once per logic step when animation runs on
/// the logic cadence.
pub fn animate_instances(instances: &mut InstanceCollection) {
    for inst in instances.iter_mut_keep_order() {
        if inst.activated {
            inst.animation_step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Size;
    use crate::components::object::GameObject;
    use crate::components::sprite::{SpriteHandle, TextureId};
    use std::sync::Arc;

    #[test]
    fn only_activated_instances_advance() {
        let obj = Arc::new(
            GameObject::new("walker")
                .with_sprite(SpriteHandle::new(TextureId(0), "walk", 3, Size::new(8, 8))),
        );
        let mut coll = InstanceCollection::new();
        coll.add(obj.create_instance());
        let mut idle = obj.create_instance();
        idle.activated = false;
        coll.add(idle);

        animate_instances(&mut coll);
        animate_instances(&mut coll);

        let frames: Vec<u32> = coll.iter().map(|i| i.image_index()).collect();
        assert_eq!(frames, vec![2, 0]);
    }

    #[test]
    fn animation_does_not_unsort() {
        let obj = Arc::new(GameObject::new("still"));
        let mut coll = InstanceCollection::new();
        coll.add(obj.create_instance());
        coll.sort_by_depth(false);
        animate_instances(&mut coll);
        assert!(coll.is_sorted());
    }
}

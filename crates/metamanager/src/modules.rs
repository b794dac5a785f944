//! Names of the modules and groups on the node's bus.

/// The metadata engine itself.
pub const META_MANAGER: &str = "metamanager";
/// The on-node workload manager.
pub const EDGED: &str = "edged";
/// The hub module that carries messages to and from the cloud.
pub const EDGE_HUB: &str = "websocket";
/// Cloud-side controller that originates cluster-state changes.
pub const CLOUD_CONTROLLER: &str = "edgecontroller";
/// Cloud-side function manager.
pub const CLOUD_FUNCTION: &str = "funcmgr";
/// Node-local function runtime.
pub const EDGE_FUNCTION: &str = "edgefunction";

pub const META_GROUP: &str = "meta";
pub const HUB_GROUP: &str = "hub";
pub const EDGED_GROUP: &str = "edged";
pub const FUNC_GROUP: &str = "func";
/// Group stamped on resource messages the engine originates.
pub const RESOURCE_GROUP: &str = "resource";

/// `true` for modules running on the node next to the engine, as opposed to the cloud side
/// or the engine itself.
pub fn is_local_runtime(source: &str) -> bool {
    matches!(source, EDGED | EDGE_FUNCTION)
}

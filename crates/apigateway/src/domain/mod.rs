mod entity;
mod fetched;

pub use self::entity::{
    CreateResourceRequest, DeleteResponse, EntityResponse, ResourceEntity, UpdateResourceRequest,
};
pub use self::fetched::Fetched;

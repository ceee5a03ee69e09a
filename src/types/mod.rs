// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Image references, container names, port bindings, and record ids.

mod container_name;
mod id;
mod image_ref;
mod port_mapping;
mod runtime;

pub use container_name::{ContainerName, ContainerNameError};
pub use id::{Id, RecordId};
pub use image_ref::{ImageReference, ParseImageRefError};
pub use port_mapping::{PortMapping, PortMappingError, Protocol};
pub use runtime::RuntimeType;

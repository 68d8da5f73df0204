pub mod color;
pub mod layout;
pub mod orientation;
pub mod transform;

pub mod descriptor;
pub mod key;
pub mod location;
pub mod names;

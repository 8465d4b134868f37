pub mod envelope;
pub mod filters;
pub mod grenade;
pub mod image;
pub mod shared;

pub mod grenade;
pub mod image;

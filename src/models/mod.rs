pub mod country;
pub mod map;
pub mod map_country;
pub mod trip;

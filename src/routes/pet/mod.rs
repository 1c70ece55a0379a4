mod handler;
mod model;
mod photo;

pub use handler::{NearbyQuery, find_nearby_pets};
pub use model::{
    Coordinates, LocationRecord, NearbyPet, NearbySearch, OwnerProfile, PetRecord, Snapshot,
    rank_nearby,
};
pub use photo::{PhotoResolver, PhotoSource, ResolvedPhotos, placeholder_url};

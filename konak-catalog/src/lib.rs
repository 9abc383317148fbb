pub mod hotel;

pub use hotel::{Hotel, HotelDraft, HotelError, HotelStatus, RatingUpdate, HOTEL_SEARCH_FIELDS};

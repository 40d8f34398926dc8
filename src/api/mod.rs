mod client;
mod models;

pub use client::{HttpShowsApi, ShowsApi};
pub use models::{GetByShowNumbersRequest, Guest, MediaFile, Show, ShowDetails};

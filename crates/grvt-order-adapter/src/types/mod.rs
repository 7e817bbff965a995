/*
[INPUT]:  Exchange schema definitions
[OUTPUT]: Typed Rust structs and enums for orders, requests and responses
[POS]:    Data layer - shared types across http, signing and ws modules
[UPDATE]: When API schema changes or new types added
*/

pub mod enums;
pub mod models;
pub mod requests;
pub mod responses;

pub use enums::*;
pub use models::*;
pub use requests::*;
pub use responses::*;

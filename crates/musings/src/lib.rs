pub mod blog;
pub mod clock;
pub mod error;
pub mod feeds;
pub mod parsing;
pub mod post;
pub mod site;
pub mod theme;
pub mod types;
pub mod xml;

pub use blog::*;
pub use clock::*;
pub use error::*;
pub use post::*;
pub use site::*;
pub use theme::*;
pub use types::*;

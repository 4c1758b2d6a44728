pub mod comment;
pub mod item;

pub use comment::Comment;
pub use item::{Item, ItemId};

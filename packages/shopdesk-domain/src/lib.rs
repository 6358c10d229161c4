pub mod catalog;
pub mod conversation;
pub mod intent;
pub mod text;
pub mod when;

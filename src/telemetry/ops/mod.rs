pub mod fetch;
pub mod catalog;
pub mod inspect;

pub mod object;
pub mod path;
pub mod poll;
pub mod prefixer;

pub mod shuffle;
pub mod time;
pub mod token;

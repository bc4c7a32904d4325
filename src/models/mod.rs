pub mod question;
pub mod quiz;
pub mod quiz_result;

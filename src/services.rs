pub mod access_control;
pub(crate) mod backend;
pub mod report_card;

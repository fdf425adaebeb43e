pub mod html;
pub mod time_utils;

pub mod bar;
pub mod joined;
pub mod tick;
pub mod timestamp;
pub mod window;

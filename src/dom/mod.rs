pub mod controls;
pub mod dom_model;
pub mod events;
pub mod html;
pub mod style;

pub mod fill_pass;
pub mod injector;
pub mod options;

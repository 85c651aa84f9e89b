mod common;

mod settings;

pub mod prelude;

pub mod cdn_settings;
pub mod doctype_meta;
pub mod files;

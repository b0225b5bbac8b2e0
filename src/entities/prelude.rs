pub use super::cdn_settings::Entity as CdnSettings;
pub use super::doctype_meta::Entity as DoctypeMeta;
pub use super::files::Entity as Files;

pub const MAX_RESOURCES: usize = 10_000;
pub const MAX_RESERVATIONS_PER_RESOURCE: usize = 10_000;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_LABEL_LEN: usize = 1024;
pub const MAX_CONTACT_LEN: usize = 512;
/// Upper bound on the configurable axis length (one week of minutes).
pub const MAX_AXIS_LEN: u32 = 7 * 1440;

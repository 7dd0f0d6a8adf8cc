//! Small helpers shared by the rest of the toolkit.

mod config_file;
mod fs;
mod short_id;
mod signature;
mod time;

pub use config_file::{deep_update, load_config, sort_list};
pub use fs::{absolute_path, ensure_dir, normalize_path};
pub use short_id::{short_id, DEFAULT_ID_LEN, MAX_ID_LEN};
pub use signature::hmac_sha256;
pub use time::{get_timestamp, timestamp_to_datetime, utc2datetime, DEFAULT_TIMEZONE};

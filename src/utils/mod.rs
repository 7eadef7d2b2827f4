pub mod data_loader;
pub mod paths;
pub mod time;

pub use data_loader::{SessionLoader, find_json_files, find_session_title, parse_interaction_file};
pub use paths::{default_messages_dir, default_storage_dir, expand_home};
pub use time::{
    DateRange, date_in_range, datetime_in_range, format_date_range, month_range, parse_date,
    parse_month, week_range, year_range,
};

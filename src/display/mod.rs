//! Display formatting for terminal output

pub mod item;

pub use item::{
    format_heal_report, format_item_details, format_item_line, format_item_list,
    format_rotation_report, format_status, format_undo_report,
};

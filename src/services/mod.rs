//! Service layer for dredge
//!
//! Business logic on top of the storage layer. Public write operations take
//! the vault lock themselves; services calling each other use the unlocked
//! variants so a single operation never contends with itself.

pub mod heal;
pub mod item;
pub mod link;
pub mod password;
pub mod status;
pub mod trash;

pub use heal::HealReport;
pub use item::ItemService;
pub use link::LinkService;
pub use password::{rotate, RotationReport};
pub use status::{status, VaultStatus};
pub use trash::{TrashService, UndoReport};

mod hash;
mod hypertree;
mod ltree;
mod merkle;
mod utils;
mod wots_plus;

pub mod error;
pub mod params;
pub mod scheme;
pub mod state;

pub use crate::error::{Error, Result};
pub use crate::merkle::CancelToken;
pub use crate::scheme::{PublicKey, Signature, Xmss};
pub use crate::state::in_memory::InMemoryStateStore;
pub use crate::state::{SigningKey, StateStore};

#[cfg(feature = "in-disk")]
pub use crate::state::in_disk::SledStateStore;

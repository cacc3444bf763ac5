//! # RouterView-RS: Live Router Data Tables
//!
//! Reactive data layer for browsing routers over their API. Every resource
//! path (leases, ARP entries, wireless registrations, ...) is mirrored into a
//! [`DataTable`] that is loaded from a snapshot and then kept current from the
//! device's update stream, while UI code binds to it through observable
//! contracts.
//!
//! ## Architecture
//!
//! - **Binding**: listener sets, dispatchers, observable values and the
//!   NOT/AND/OR algebra used to gate UI state
//! - **Table**: one reconciliation thread per table, `select!`ing between the
//!   update stream and cancellation, readers behind an `RwLock`
//! - **Views**: exact-match searches, existence checks and merges across tables
//!   of several routers
//! - **Neighbors**: routers announcing themselves by broadcast, decoded into an
//!   observable list
//! - **Device**: the connection seam, with an in-memory mock
//!
//! ## Configuration
//!
//! Settings (`config.toml`) and state (`app_state.json`) live in the
//! platform-appropriate data directory under `dev.hxyulin.routerview-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.routerview-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.routerview-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.routerview-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use routerview_rs::{
//!     binding::Dispatcher,
//!     catalog::LEASE_PATH,
//!     config::AppConfig,
//!     lookup, DataTable, MergeView,
//! };
//!
//! let config = AppConfig::load_or_default();
//! let dispatcher = Dispatcher::from_mode(config.notify);
//!
//! let leases: Vec<DataTable> = targets
//!     .iter()
//!     .map(|t| DataTable::open(&connector, t, LEASE_PATH, dispatcher.clone()))
//!     .collect::<Result<_, _>>()?;
//!
//! let unknown = lookup::mac_unknown(&leases, "AA:BB:CC:00:11:22");
//! let all = MergeView::new(leases.iter().map(|t| Arc::new(t.clone()) as _).collect());
//! ```

pub mod binding;
pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod lookup;
pub mod merge;
pub mod neighbor;
pub mod table;

// Re-export commonly used types
pub use binding::{DataBinding, DataItem, DataList, Dispatcher, Observable};
pub use config::{AppConfig, AppState};
pub use device::{ConnectionTarget, Connector, DeviceClient};
pub use error::{Result, RouterViewError};
pub use merge::MergeView;
pub use neighbor::NeighborList;
pub use table::{DataTable, Record, Row, SearchView};

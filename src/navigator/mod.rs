//! Move-destination navigation.
//!
//! A [`cursor::DestinationNavigator`] exists only for the lifetime of one
//! move dialog. The host loop executes the [`cursor::NavCommand`] values it
//! returns (directory listings, the 300 ms double-activation timer) and
//! feeds completions back in; `tests/navigator_flow.rs` shows the shape of
//! such a loop.

pub mod cursor;

pub use cursor::{
    DestinationNavigator, FolderEntry, MoveRequest, NavCommand, NavigatorState, RequestToken,
};

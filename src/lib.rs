//! Keeps the frame trees of tabs whose frames live in several content
//! processes, and speaks a single frame based protocol about them.
//!
//! The parent process feeds the [`Handler`] with structural and navigation
//! notifications of content units and with the messages read from content
//! process transports. Protocol clients attach sessions and issue commands
//! through a [`Page`].
//!
//! # Example
//! ```no_run
//! # use std::sync::Arc;
//! # use frameoxide::conn::MpscTransportFactory;
//! # use frameoxide::handler::bootstrap::SharedBootstrap;
//! # use frameoxide::protocol::{AttachReason, BrowserId, ContentUnit, StructuralNotification};
//! # use frameoxide::{HandlerConfig, Host};
//! use futures::StreamExt;
//! # async fn demo() -> frameoxide::error::Result<()> {
//! let (factory, _outbound) = MpscTransportFactory::new();
//! let (host, mut handler) = Host::new(
//!     HandlerConfig::default(),
//!     Arc::new(factory),
//!     Arc::new(SharedBootstrap::new()),
//! );
//! async_std::task::spawn(async move {
//!     while let Some(_event) = handler.next().await {}
//! });
//! host.notify_structural(StructuralNotification::Attached {
//!     unit: ContentUnit::top_level(1, 1),
//!     why: AttachReason::Attach,
//! })
//! .await?;
//! let page = host.page(BrowserId(1)).await?;
//! let main = page.main_frame().await?;
//! # Ok(())
//! # }
//! ```

pub use frameoxide_types as types;

pub use crate::handler::{Handler, PageEvent};
pub use crate::host::{HandlerConfig, Host};
pub use crate::page::Page;

pub mod conn;
pub mod error;
pub mod handler;
pub mod host;
pub mod page;
pub mod protocol;
pub mod utils;

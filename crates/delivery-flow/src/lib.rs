//! Delivery flow: from a trigger to text sitting (and usually sent) in the
//! destination's composer.
//!
//! The [`SessionOrchestrator`] finds or opens a destination tab and waits
//! for it to be ready. The [`InjectionAutomaton`] searches, inserts and
//! submits inside one tab. The [`DeliveryCoordinator`] adds the backstop
//! attempt and the fallback tab, and [`FanOut`] runs several actions at
//! once. Triggers are routed by [`Dispatcher`].

pub mod automaton;
pub mod cdp_host;
pub mod coordinator;
pub mod descriptors;
pub mod destination;
pub mod errors;
pub mod fanout;
pub mod guard;
pub mod host;
pub mod metrics;
pub mod policy;
pub mod prompt;
pub mod session;
pub mod shortcut;
pub mod trigger;

pub use automaton::{InjectionAutomaton, InjectionReport, InjectionState, Injector, MANUAL_PASTE_NOTICE};
pub use cdp_host::CdpTabHost;
pub use coordinator::{DeliveryCoordinator, DeliveryPath, DeliveryReport, PAGE_LOST_PROMPT};
pub use descriptors::{ActionDescriptor, Catalog, GlobalSettings, MenuDescriptor};
pub use destination::DestinationIdentity;
pub use errors::{SessionError, TriggerError};
pub use fanout::{Branch, BranchReport, FanOut};
pub use guard::{DedupGuard, GuardVerdict};
pub use host::{SessionHandle, TabEvent, TabHost, TabInfo};
pub use policy::DeliveryTimings;
pub use prompt::compose_prompt;
pub use session::SessionOrchestrator;
pub use shortcut::{find_shortcut, has_modifier, normalize_shortcut, ShortcutTarget};
pub use trigger::{plan, Dispatcher, TriggerOutcome, TriggerPlan, TriggerRequest, TriggerSelector};

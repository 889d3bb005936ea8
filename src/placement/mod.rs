/*!

The placement engine: Components C through F of the mapper. [`state`] owns
the mutable placement state, [`cost`] answers cost queries against it,
[`movegen`] proposes trial targets, and [`sa`] drives the whole thing
through its WARM/RUN/DONE lifecycle.

*/

pub mod state;
pub mod cost;
pub mod movegen;
pub mod sa;

pub use cost::{ChannelCostKind,CostModel};
pub use movegen::{CachedMoveGenerator,MoveGenerator,UncachedMoveGenerator};
pub use sa::{Cooler,Doner,Limiter,PlaceOptions,PlacementReport,Warmer};
pub use state::{Grid,Location,PlacementState,SaChannel,SaNode};

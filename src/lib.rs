/*!

Simulated-annealing placement and negotiated-congestion (Pathfinder-style)
routing for spatial, grid-organized reconfigurable architectures.

Given a hierarchical [`arch::TopLevel`] and a [`taskgraph::Taskgraph`], a
[`ruleset::RuleSet`] implementation supplies the fabric-specific
mappability oracle, and [`map::place`]/[`map::route`] produce a
transcribed [`map::Map`] with a verified placement and routing.

*/

pub mod quantify;
pub mod error;
pub mod address;
pub mod arch;
pub mod taskgraph;
pub mod ruleset;
pub mod matrix;
pub mod distance;
pub mod maptable;
pub mod placement;
pub mod routing;
pub mod verify;
pub mod map;

pub mod prelude
{
	pub use crate::address::{Address,AddressSpace};
	pub use crate::arch::{Component,Direction,Link,Path,Port,TopLevel};
	pub use crate::error::Error;
	pub use crate::map::{Map,MetricValue,place,place_with_state,route};
	pub use crate::placement::{PlaceOptions,PlacementState};
	pub use crate::routing::RoutingOptions;
	pub use crate::ruleset::{DefaultRuleSet,RuleSet};
	pub use crate::taskgraph::{Taskgraph,TaskgraphEdge,TaskgraphNode};
}

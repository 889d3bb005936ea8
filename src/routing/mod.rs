/*!

The routing engine: Components G through I. [`graph`] builds the directed
routing graph from an architecture, [`channels`] turns task-graph edges
into routable start/stop vertex groups, and [`pathfinder`] negotiates
congestion across them to a fixed point.

*/

pub mod graph;
pub mod channels;
pub mod pathfinder;

pub use channels::{RoutingChannel,build_channels};
pub use graph::{RoutingGraph,RoutingLink};
pub use pathfinder::{RoutingOptions,RoutingReport,route};

/*!

Error kinds for the mapper. Setup paths (construction of the architecture,
the initial placement) return `Result<_,Error>` and abort the caller's
workflow on `Err`. In-loop anomalies, such as a move generator proposing an
illegal swap, are never reported through this type: they are recovered
locally by rejecting the move, per spec.

*/

use std::fmt;

/// Every fallible, fatal outcome the mapper can produce.
#[derive(Debug,Clone)]
pub enum Error
{
	/// The architecture violates a precondition: a duplicate port, a
	/// disconnected mandatory link, or an empty mappable-address set for a
	/// task class that is present in the task graph.
	Construction(String),
	/// The initial placement could not seat every task, e.g. a special
	/// class has an empty whitelist of addresses.
	PlacementInfeasible(String),
	/// A placement verifier invariant failed after the SA driver finished.
	/// Carries the offending node indices for diagnosis.
	PlacementInconsistency
	{
		message: String,
		offending_nodes: Vec<usize>,
	},
	/// A channel has no path to one of its start/stop groups even ignoring
	/// congestion.
	RoutingConnectivity
	{
		channel_index: usize,
		message: String,
	},
	/// Pathfinder exhausted its iteration budget while some routing
	/// vertices remain overused.
	RoutingCongestion
	{
		iterations: usize,
		overused_vertices: usize,
	},
}

impl fmt::Display for Error
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		match self
		{
			Error::Construction(message) => write!(f,"construction error: {message}"),
			Error::PlacementInfeasible(message) => write!(f,"placement infeasible: {message}"),
			Error::PlacementInconsistency{message,offending_nodes} =>
				write!(f,"placement inconsistency: {message} (nodes {offending_nodes:?})"),
			Error::RoutingConnectivity{channel_index,message} =>
				write!(f,"routing connectivity error on channel {channel_index}: {message}"),
			Error::RoutingCongestion{iterations,overused_vertices} =>
				write!(f,"routing congestion: did not converge after {iterations} iterations ({overused_vertices} vertices overused)"),
		}
	}
}

impl std::error::Error for Error {}

/*!

The `RuleSet` is the single seam between this crate's generic placement and
routing engines and a caller's fabric-specific mappability oracle (spec §6,
§9 "Polymorphism"). It is dispatch over a small closed capability set — a
trait object, not class inheritance — so concrete rule sets live in user
code and override only where they differ from the defaults.

*/

use std::fmt::Debug;
use crate::arch::{Component,Port,Path};
use crate::taskgraph::{TaskgraphNode,TaskgraphEdge};

/// Dispatch token selecting concrete implementations of the mappability oracle.
///
/// All methods default to permissive behavior (`true` / capacity `1`) except
/// [`RuleSet::is_special`], which defaults to `false`, matching spec §6.
pub trait RuleSet: Debug
{
	/// Whether two task nodes belong to the same equivalence class, and so may share a map-table.
	fn is_equivalent(&self, a: &TaskgraphNode, b: &TaskgraphNode) -> bool
	{
		let _ = (a,b);
		true
	}
	/// Whether a task node belongs to a "special" class with a restricted, explicitly enumerated
	/// address list (§4.B, §4.D).
	fn is_special(&self, node: &TaskgraphNode) -> bool
	{
		let _ = node;
		false
	}
	/// Whether a component is a mappable slot at all (used by the `PathTable` DFS, §4.B).
	fn is_mappable(&self, component: &Component) -> bool
	{
		let _ = component;
		true
	}
	/// Whether `node` may be placed onto `component`.
	fn can_map(&self, node: &TaskgraphNode, component: &Component) -> bool
	{
		let _ = (node,component);
		true
	}
	/// Whether a routing vertex at `vertex` may carry traffic for `channel_index`.
	fn can_use(&self, vertex: &Path, channel_index: usize) -> bool
	{
		let _ = (vertex,channel_index);
		true
	}
	/// The capacity of the routing vertex at `vertex`.
	fn get_capacity(&self, vertex: &Path) -> usize
	{
		let _ = vertex;
		1
	}
	/// Whether `port` on a mapped source task is a valid entry point for `edge`.
	fn is_source_port(&self, port: &Port, edge: &TaskgraphEdge) -> bool
	{
		let _ = edge;
		port.direction==crate::arch::Direction::Output
	}
	/// Whether `port` on a mapped sink task is a valid exit point for `edge`.
	fn is_sink_port(&self, port: &Port, edge: &TaskgraphEdge) -> bool
	{
		let _ = edge;
		port.direction==crate::arch::Direction::Input
	}
	/// Whether a task-graph edge must be routed at all (some edges, e.g. self-loops used purely
	/// for placement cost, may be exempt; see boundary scenario S1).
	fn needs_routing(&self, edge: &TaskgraphEdge) -> bool
	{
		let _ = edge;
		true
	}
	/// Opaque annotation a rule set may want attached to a routing vertex at construction time.
	/// The core never inspects the contents; it is provided purely for the rule set's own later
	/// use (stashed in the vertex's own metadata by the caller, not read by this crate).
	fn annotate(&self, component: &Component) -> crate::arch::Metadata
	{
		let _ = component;
		crate::arch::Metadata::new()
	}
	/// A priority key for routing `edge` before or after other channels; lower routes first
	/// (§4.H default: ascending fanout then ascending group size — a rule set may override with
	/// fabric-specific criticality).
	fn routing_channel_priority(&self, edge: &TaskgraphEdge) -> i64
	{
		let _ = edge;
		0
	}
}

/// The all-permissive rule set: anything maps anywhere, every vertex has capacity 1, every edge
/// needs routing, nothing is special. Useful standalone for architectures where the mappability
/// oracle truly has no constraints, and as the rule set for the boundary scenarios of spec §8.
#[derive(Debug,Default)]
pub struct DefaultRuleSet;

impl RuleSet for DefaultRuleSet {}

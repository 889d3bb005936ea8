/*!

Component H: routing channels. One [`RoutingChannel`] per task-graph edge
that `needs_routing`, carrying the start and stop vertex groups Pathfinder
must connect. Channels order by priority so Pathfinder can route the
hardest ones first (§4.H).

*/

use std::cmp::Ordering;
use std::mem::size_of;
use crate::arch::{Path,TopLevel};
use crate::quantify::Quantifiable;
use crate::routing::graph::RoutingGraph;
use crate::ruleset::RuleSet;
use crate::taskgraph::Taskgraph;

/// The routable form of one task-graph edge: for each source task, the group of vertices that
/// may emit its signal; for each sink task, the group of vertices that may receive it.
#[derive(Clone,Debug)]
pub struct RoutingChannel
{
	pub edge_index: usize,
	pub start_groups: Vec<Vec<usize>>,
	pub stop_groups: Vec<Vec<usize>>,
	pub(crate) priority: i64,
}

impl RoutingChannel
{
	pub fn fanout(&self) -> usize
	{
		self.stop_groups.len()
	}
	/// Total vertex count across every start and stop group, the secondary tie-break key.
	pub fn group_size(&self) -> usize
	{
		self.start_groups.iter().chain(self.stop_groups.iter()).map(|g|g.len()).sum()
	}
}

impl PartialEq for RoutingChannel
{
	fn eq(&self, other: &Self) -> bool
	{
		self.cmp(other)==Ordering::Equal
	}
}
impl Eq for RoutingChannel {}

impl PartialOrd for RoutingChannel
{
	fn partial_cmp(&self, other: &Self) -> Option<Ordering>
	{
		Some(self.cmp(other))
	}
}

/// Lower priority routes first; ties break on ascending fanout, then ascending total group size —
/// the default from §4.H, which is the only ordering that matters once every channel shares the
/// rule set's default priority of zero.
impl Ord for RoutingChannel
{
	fn cmp(&self, other: &Self) -> Ordering
	{
		self.priority.cmp(&other.priority)
			.then_with(||self.fanout().cmp(&other.fanout()))
			.then_with(||self.group_size().cmp(&other.group_size()))
	}
}

/// Build one `RoutingChannel` per task-graph edge with `needs_routing(edge) == true`.
/// `placements[node_index]` is the architecture path the task is seated on, as produced by the
/// placement engine.
pub fn build_channels(taskgraph: &Taskgraph, placements: &[Path], top: &TopLevel, graph: &RoutingGraph, rules: &dyn RuleSet) -> Vec<RoutingChannel>
{
	let mut channels = Vec::new();
	for (edge_index,edge) in taskgraph.edges()
	{
		if !rules.needs_routing(edge)
		{
			continue;
		}
		let start_groups = edge.sources.iter().map(|name|
		{
			let node_index = taskgraph.node_index(name).expect("edge source task must exist");
			port_group(placements,node_index,top,graph,rules,|p|rules.is_source_port(p,edge))
		}).collect();
		let stop_groups = edge.sinks.iter().map(|name|
		{
			let node_index = taskgraph.node_index(name).expect("edge sink task must exist");
			port_group(placements,node_index,top,graph,rules,|p|rules.is_sink_port(p,edge))
		}).collect();
		channels.push(RoutingChannel{ edge_index, start_groups, stop_groups, priority: rules.routing_channel_priority(edge) });
	}
	channels
}

fn port_group(placements: &[Path], node_index: usize, top: &TopLevel, graph: &RoutingGraph, _rules: &dyn RuleSet, predicate: impl Fn(&crate::arch::Port) -> bool) -> Vec<usize>
{
	let path = &placements[node_index];
	let Some(component) = top.resolve(path) else { return Vec::new() };
	component.ports().filter(|p|predicate(p))
		.filter_map(|p|graph.index_of(&path.child(p.name.clone())))
		.collect()
}

impl Quantifiable for RoutingChannel
{
	fn total_memory(&self) -> usize
	{
		size_of::<RoutingChannel>()+self.start_groups.total_memory()+self.stop_groups.total_memory()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn chan(priority: i64, fanout: usize, group_size: usize) -> RoutingChannel
	{
		RoutingChannel{
			edge_index: 0,
			start_groups: vec![vec![0;group_size.min(1)]],
			stop_groups: (0..fanout).map(|_|vec![0usize;if fanout==0 {0} else {(group_size.saturating_sub(group_size.min(1)))/fanout.max(1)}]).collect(),
			priority,
		}
	}

	#[test]
	fn orders_by_priority_then_fanout()
	{
		let a = chan(0,1,2);
		let b = chan(1,0,0);
		assert!(a<b);
	}

	#[test]
	fn ties_on_priority_break_by_fanout()
	{
		let narrow = chan(0,1,2);
		let wide = chan(0,3,4);
		assert!(narrow<wide);
	}
}

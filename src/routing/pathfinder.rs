/*!

Component I: the negotiated-congestion router. Iteratively rips up and
reroutes every channel with a multi-source/multi-sink shortest-path
search, then grows present-penalty and history-cost fields on overused
vertices until a legal routing is found or the iteration budget runs out
(§4.I).

*/

use std::cmp::Ordering;
use std::collections::{BinaryHeap,HashSet};
use crate::error::Error;
use crate::routing::channels::RoutingChannel;
use crate::routing::graph::RoutingGraph;
use crate::ruleset::RuleSet;

/// Tunables for [`route`]; defaults match §4.I's rationale of near-greedy early iterations.
#[derive(Clone,Copy,Debug)]
pub struct RoutingOptions
{
	pub max_iterations: usize,
	pub h_factor: f64,
	pub p_initial: f64,
	pub p_growth: f64,
}

impl Default for RoutingOptions
{
	fn default() -> RoutingOptions
	{
		RoutingOptions{ max_iterations: 50, h_factor: 1.0, p_initial: 1.0, p_growth: 1.3 }
	}
}

/// Outcome of a complete Pathfinder run: one vertex subgraph per channel (in the same order as
/// the input `channels` slice), plus the metrics §6 asks a caller to attach to the map.
#[derive(Debug)]
pub struct RoutingReport
{
	pub iterations: usize,
	pub passed: bool,
	pub routes: Vec<HashSet<usize>>,
	pub global_links: usize,
}

/// Route every channel to a fixed point, or exhaust `options.max_iterations` trying. A
/// disconnected channel (no path to some stop group even ignoring congestion) is fatal and
/// returned as [`Error::RoutingConnectivity`] immediately; persistent overuse after the iteration
/// budget is not an `Err` — it is reported through `RoutingReport::passed == false`, per §7.
pub fn route(graph: &mut RoutingGraph, channels: &[RoutingChannel], rules: &dyn RuleSet, options: &RoutingOptions) -> Result<RoutingReport,Error>
{
	let mut order: Vec<usize> = (0..channels.len()).collect();
	order.sort_by(|&a,&b|channels[a].cmp(&channels[b]));
	let mut routes: Vec<Option<HashSet<usize>>> = vec![None;channels.len()];

	for iteration in 1..=options.max_iterations.max(1)
	{
		for &ci in &order
		{
			let channel = &channels[ci];
			if let Some(old) = &routes[ci]
			{
				for &v in old
				{
					graph.link_mut(v).occupants.remove(&channel.edge_index);
				}
			}
			let (dist,prev,is_root) = dijkstra(graph,channel,rules);
			for group in &channel.stop_groups
			{
				if group.iter().all(|&v|!dist[v].is_finite())
				{
					return Err(Error::RoutingConnectivity{ channel_index: channel.edge_index, message: "no path to a stop group ignoring congestion".to_string() });
				}
			}
			let subgraph = stitch(channel,&dist,&prev,&is_root);
			for &v in &subgraph
			{
				graph.link_mut(v).occupants.insert(channel.edge_index);
			}
			routes[ci] = Some(subgraph);
		}

		let mut any_overused = false;
		for v in 0..graph.num_vertices()
		{
			let link = graph.link(v);
			let occupancy = link.occupancy() as i64;
			let capacity = link.capacity as i64;
			let overuse = occupancy-capacity;
			if overuse>0
			{
				any_overused = true;
			}
			let factor = std::cmp::max(1,overuse+1) as f64;
			let link = graph.link_mut(v);
			link.history_cost += options.h_factor*overuse.max(0) as f64;
			link.present_penalty = options.p_initial*options.p_growth.powi(iteration as i32)*factor;
		}
		if !any_overused
		{
			let routes: Vec<HashSet<usize>> = routes.into_iter().map(|r|r.unwrap_or_default()).collect();
			let global_links = routes.iter().flatten().collect::<HashSet<_>>().len();
			return Ok(RoutingReport{ iterations: iteration, passed: true, routes, global_links });
		}
	}

	let routes: Vec<HashSet<usize>> = routes.into_iter().map(|r|r.unwrap_or_default()).collect();
	let global_links = routes.iter().flatten().collect::<HashSet<_>>().len();
	Ok(RoutingReport{ iterations: options.max_iterations, passed: false, routes, global_links })
}

#[derive(PartialEq,Clone,Copy)]
struct HeapKey(f64);
impl Eq for HeapKey {}
impl PartialOrd for HeapKey
{
	fn partial_cmp(&self, other: &Self) -> Option<Ordering>
	{
		Some(self.cmp(other))
	}
}
impl Ord for HeapKey
{
	// Reversed so `BinaryHeap` (a max-heap) behaves as a min-heap over cost.
	fn cmp(&self, other: &Self) -> Ordering
	{
		other.0.partial_cmp(&self.0).unwrap_or(Ordering::Equal)
	}
}

fn weight(graph: &RoutingGraph, v: usize) -> f64
{
	let link = graph.link(v);
	graph.base_cost(v)*(1.0+link.present_penalty)+link.history_cost
}

/// Multi-source Dijkstra from every vertex of every start group, subject to `can_use`. Returns
/// per-vertex distance, predecessor, and a root flag marking the initial frontier.
fn dijkstra(graph: &RoutingGraph, channel: &RoutingChannel, rules: &dyn RuleSet) -> (Vec<f64>,Vec<Option<usize>>,Vec<bool>)
{
	let n = graph.num_vertices();
	let mut dist = vec![f64::INFINITY;n];
	let mut prev: Vec<Option<usize>> = vec![None;n];
	let mut is_root = vec![false;n];
	let mut visited = vec![false;n];
	let mut heap = BinaryHeap::new();

	for group in &channel.start_groups
	{
		for &v in group
		{
			if rules.can_use(graph.vertex_path(v),channel.edge_index)
			{
				let w = weight(graph,v);
				if w<dist[v]
				{
					dist[v] = w;
					is_root[v] = true;
					heap.push((HeapKey(w),v));
				}
			}
		}
	}

	while let Some((HeapKey(d),u)) = heap.pop()
	{
		if visited[u]
		{
			continue;
		}
		visited[u] = true;
		for &v in graph.successors(u)
		{
			if visited[v] || !rules.can_use(graph.vertex_path(v),channel.edge_index)
			{
				continue;
			}
			let candidate = d+weight(graph,v);
			if candidate<dist[v]
			{
				dist[v] = candidate;
				prev[v] = Some(u);
				heap.push((HeapKey(candidate),v));
			}
		}
	}
	(dist,prev,is_root)
}

/// Retrace every stop group's best-reached vertex back to a root, sharing structure with any
/// previously-retraced path that already reached the same vertex (classic Pathfinder tree
/// growth): once a retrace hits a vertex already in the accumulated subgraph, it stops.
fn stitch(channel: &RoutingChannel, dist: &[f64], prev: &[Option<usize>], is_root: &[bool]) -> HashSet<usize>
{
	let mut subgraph = HashSet::new();
	for group in &channel.stop_groups
	{
		let Some(&best) = group.iter()
			.filter(|&&v|dist[v].is_finite())
			.min_by(|&&a,&&b|dist[a].partial_cmp(&dist[b]).unwrap_or(Ordering::Equal))
			else { continue };
		let mut cur = best;
		loop
		{
			if !subgraph.insert(cur)
			{
				break;
			}
			if is_root[cur]
			{
				break;
			}
			match prev[cur]
			{
				Some(p) => cur = p,
				None => break,
			}
		}
	}
	subgraph
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::address::AddressSpace;
	use crate::arch::{Component,Direction,Link,Path,Port,TopLevel};
	use crate::routing::channels::build_channels;
	use crate::ruleset::DefaultRuleSet;
	use crate::taskgraph::{Taskgraph,TaskgraphEdge,TaskgraphNode};

	/// Two tiles, each with an `out`/`in` port, joined by a single capacity-1 link.
	fn line_top() -> TopLevel
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![2]));
		let a0 = top.address_space().unpack(0);
		let a1 = top.address_space().unpack(1);
		let mut t0 = Component::new("tile").with_primitive("tile");
		t0.add_port(Port::new("out",Direction::Output)).unwrap();
		let mut t1 = Component::new("tile").with_primitive("tile");
		t1.add_port(Port::new("in",Direction::Input)).unwrap();
		t0.add_link(Link::new("wire",vec![Path::at_address(a0.clone(),vec!["out".to_string()])],vec![Path::at_address(a1.clone(),vec!["in".to_string()])],1)).unwrap();
		top.set_tile(a0,t0).unwrap();
		top.set_tile(a1,t1).unwrap();
		top
	}

	#[test]
	fn routes_a_single_point_to_point_channel()
	{
		let top = line_top();
		let rules = DefaultRuleSet;
		let mut graph = RoutingGraph::build(&top,&rules);
		let nodes = vec![TaskgraphNode::new("a"),TaskgraphNode::new("b")];
		let taskgraph = Taskgraph::build(nodes,vec![TaskgraphEdge::point_to_point("a","b")]).unwrap();
		let a0 = top.address_space().unpack(0);
		let a1 = top.address_space().unpack(1);
		let placements = vec![Path::at_address(a0,vec![]),Path::at_address(a1,vec![])];
		let channels = build_channels(&taskgraph,&placements,&top,&graph,&rules);
		assert_eq!(channels.len(),1);
		let report = route(&mut graph,&channels,&rules,&RoutingOptions::default()).unwrap();
		assert!(report.passed);
		assert!(!report.routes[0].is_empty());
	}

	#[test]
	fn disconnected_channel_is_a_connectivity_error()
	{
		let top = line_top();
		let rules = DefaultRuleSet;
		let mut graph = RoutingGraph::build(&top,&rules);
		// A channel whose start group is empty can never reach its stop group.
		let channel = RoutingChannel{ edge_index: 0, start_groups: vec![vec![]], stop_groups: vec![vec![graph.index_of(&Path::at_address(top.address_space().unpack(1),vec!["in".to_string()])).unwrap()]], priority: 0 };
		let result = route(&mut graph,std::slice::from_ref(&channel),&rules,&RoutingOptions::default());
		assert!(matches!(result,Err(Error::RoutingConnectivity{..})));
	}

	/// A 4-tile chain, `0 -> 1 -> 2 -> 3`, where the `1 -> 2` wire has capacity 1. Two channels both
	/// originate at tile 0's `out` port and fan out to tiles 2 and 3 respectively, so both must
	/// cross that single wire: no reroute can ever clear the overuse, and `passed` must stay
	/// `false` however many iterations are given.
	fn bottleneck_chain_top() -> TopLevel
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![4]));
		let a0 = top.address_space().unpack(0);
		let a1 = top.address_space().unpack(1);
		let a2 = top.address_space().unpack(2);
		let a3 = top.address_space().unpack(3);

		let mut t0 = Component::new("tile").with_primitive("tile");
		t0.add_port(Port::new("out",Direction::Output)).unwrap();
		t0.add_link(Link::new("w01",vec![Path::at_address(a0.clone(),vec!["out".to_string()])],vec![Path::at_address(a1.clone(),vec!["in".to_string()])],1)).unwrap();
		top.set_tile(a0,t0).unwrap();

		let mut t1 = Component::new("tile").with_primitive("tile");
		t1.add_port(Port::new("in",Direction::Input)).unwrap();
		t1.add_port(Port::new("out",Direction::Output)).unwrap();
		t1.add_link(Link::new("bottleneck",vec![Path::at_address(a1.clone(),vec!["out".to_string()])],vec![Path::at_address(a2.clone(),vec!["in".to_string()])],1)).unwrap();
		top.set_tile(a1,t1).unwrap();

		let mut t2 = Component::new("tile").with_primitive("tile");
		t2.add_port(Port::new("in",Direction::Input)).unwrap();
		t2.add_port(Port::new("out",Direction::Output)).unwrap();
		t2.add_link(Link::new("w23",vec![Path::at_address(a2.clone(),vec!["out".to_string()])],vec![Path::at_address(a3.clone(),vec!["in".to_string()])],1)).unwrap();
		top.set_tile(a2,t2).unwrap();

		let mut t3 = Component::new("tile").with_primitive("tile");
		t3.add_port(Port::new("in",Direction::Input)).unwrap();
		top.set_tile(a3,t3).unwrap();

		top
	}

	#[test]
	fn shared_bottleneck_never_converges_and_history_cost_keeps_growing()
	{
		let top = bottleneck_chain_top();
		let rules = DefaultRuleSet;
		let a0 = top.address_space().unpack(0);
		let a1 = top.address_space().unpack(1);
		let a2 = top.address_space().unpack(2);
		let a3 = top.address_space().unpack(3);
		let graph_template = RoutingGraph::build(&top,&rules);
		let start = graph_template.index_of(&Path::at_address(a0,vec!["out".to_string()])).unwrap();
		let stop_near = graph_template.index_of(&Path::at_address(a2.clone(),vec!["in".to_string()])).unwrap();
		let stop_far = graph_template.index_of(&Path::at_address(a3,vec!["in".to_string()])).unwrap();
		let channels = vec![
			RoutingChannel{ edge_index: 0, start_groups: vec![vec![start]], stop_groups: vec![vec![stop_near]], priority: 0 },
			RoutingChannel{ edge_index: 1, start_groups: vec![vec![start]], stop_groups: vec![vec![stop_far]], priority: 0 },
		];

		let mut history_by_iterations = Vec::new();
		for &iterations in &[1usize,3,5]
		{
			let mut graph = RoutingGraph::build(&top,&rules);
			let options = RoutingOptions{ max_iterations: iterations, ..RoutingOptions::default() };
			let report = route(&mut graph,&channels,&rules,&options).unwrap();
			assert!(!report.passed,"two channels sharing a capacity-1 wire can never both fit");
			let bottleneck = graph.index_of(&Path::at_address(a1.clone(),vec!["bottleneck".to_string()])).unwrap();
			history_by_iterations.push(graph.link(bottleneck).history_cost);
		}
		assert!(history_by_iterations[0]<history_by_iterations[1]);
		assert!(history_by_iterations[1]<history_by_iterations[2]);
	}
}
